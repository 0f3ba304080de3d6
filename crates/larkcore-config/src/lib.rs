use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub mod marker;

pub const PROGRAM_NAME: &str = "Larkator";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed settings in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to encode settings: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub save_file: PathBuf,
    pub output_dir: Option<PathBuf>,
    pub convert_delay_ms: u64,
    pub level_step: i32,
    pub max_level: i32,
    pub tool: ToolSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            save_file: PathBuf::new(),
            output_dir: None,
            convert_delay_ms: 2000,
            level_step: 5,
            max_level: 150,
            tool: ToolSettings::default(),
        }
    }
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            program: PathBuf::from("ark-tools"),
            args: Vec::new(),
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_else(|err| {
            tracing::warn!("using default settings: {err}");
            Self::default()
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        write_creating_parent(path, content.as_bytes())
    }

    pub fn convert_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.convert_delay_ms)
    }

    pub fn resolved_output_dir(&self) -> PathBuf {
        match &self.output_dir {
            Some(dir) if !dir.as_os_str().is_empty() => dir.clone(),
            _ => default_output_dir(),
        }
    }

    /// Fills a blank output directory with the temp default and creates it.
    ///
    /// Returns `true` when the settings changed and should be persisted.
    pub fn ensure_output_dir(&mut self) -> Result<bool, ConfigError> {
        let blank = self
            .output_dir
            .as_ref()
            .map_or(true, |dir| dir.as_os_str().is_empty());
        let dir = self.resolved_output_dir();

        if !dir.is_dir() {
            std::fs::create_dir_all(&dir).map_err(|source| ConfigError::Write {
                path: dir.clone(),
                source,
            })?;
        }

        if blank {
            self.output_dir = Some(dir);
        }
        Ok(blank)
    }
}

pub fn config_root() -> PathBuf {
    let base = env::var("LOCALAPPDATA").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(base).join(PROGRAM_NAME)
}

pub fn settings_path() -> PathBuf {
    config_root().join("settings.json")
}

pub fn searches_path() -> PathBuf {
    config_root().join("searches.json")
}

pub fn default_output_dir() -> PathBuf {
    env::temp_dir().join(PROGRAM_NAME)
}

pub(crate) fn write_creating_parent(path: &Path, content: &[u8]) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }

    std::fs::write(path, content).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}
