use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Command;

mod converter;

pub use converter::ArkToolsConverter;

#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: PathBuf,
        source: std::io::Error,
    },
    #[error("{program} exited with {status}: {stderr}")]
    ToolFailed {
        program: PathBuf,
        status: String,
        stderr: String,
    },
}

pub trait ToolRunner: Send + Sync {
    /// Runs the tool with `args` appended to its configured arguments and returns stdout.
    fn run(&self, args: &[OsString]) -> Result<String, ShellError>;
}

#[derive(Debug, Clone)]
pub struct ProcessRunner {
    program: PathBuf,
    base_args: Vec<String>,
}

impl ProcessRunner {
    pub fn new(program: impl Into<PathBuf>, base_args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            base_args,
        }
    }
}

impl ToolRunner for ProcessRunner {
    fn run(&self, args: &[OsString]) -> Result<String, ShellError> {
        tracing::debug!(program = %self.program.display(), ?args, "running external tool");

        let output = Command::new(&self.program)
            .args(&self.base_args)
            .args(args)
            .output()
            .map_err(|source| ShellError::Launch {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ShellError::ToolFailed {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

pub fn update_data(runner: &dyn ToolRunner) -> Result<(), ShellError> {
    runner.run(&[OsString::from("update-data")]).map(|_| ())
}
