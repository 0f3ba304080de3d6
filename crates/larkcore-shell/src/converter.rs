use std::ffi::OsString;
use std::path::Path;
use std::time::SystemTime;

use larkcore_index::{ConversionTarget, Converter, Dino, IndexError, Partition, PartitionRecords};

use crate::ToolRunner;

const STAMP_FILE_NAME: &str = ".converted";

/// Converts saves with an external tool that writes one `<species>.json` per species.
///
/// Output lands in `<output_dir>/<save name>/<partition>/`. A partition is only
/// reconverted when forced or when the save file is newer than the last run.
pub struct ArkToolsConverter<R> {
    runner: R,
}

impl<R: ToolRunner> ArkToolsConverter<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }
}

impl<R: ToolRunner> Converter for ArkToolsConverter<R> {
    fn convert(
        &self,
        partition: Partition,
        force: bool,
        target: &ConversionTarget,
    ) -> Result<PartitionRecords, IndexError> {
        let dir = target.partition_dir(partition);

        if force || needs_conversion(&dir, target.save_file()) {
            tracing::info!(%partition, force, dir = %dir.display(), "converting save");
            std::fs::create_dir_all(&dir).map_err(|source| IndexError::Io {
                path: dir.clone(),
                source,
            })?;

            let args = [
                OsString::from(partition.label()),
                target.save_file().as_os_str().to_os_string(),
                dir.as_os_str().to_os_string(),
            ];
            self.runner
                .run(&args)
                .map_err(|err| IndexError::Conversion {
                    partition,
                    message: err.to_string(),
                })?;

            let stamp = dir.join(STAMP_FILE_NAME);
            std::fs::write(&stamp, b"").map_err(|source| IndexError::Io {
                path: stamp,
                source,
            })?;
        } else {
            tracing::debug!(%partition, "converted data is up to date");
        }

        Ok(PartitionRecords::new(list_species(&dir)?))
    }

    fn load_species(
        &self,
        partition: Partition,
        species: &str,
        target: &ConversionTarget,
    ) -> Result<Option<Vec<Dino>>, IndexError> {
        if species.is_empty() || species.contains(['/', '\\']) || species.starts_with('.') {
            return Ok(None);
        }

        let path = target
            .partition_dir(partition)
            .join(format!("{species}.json"));
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(IndexError::Io { path, source }),
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|err| IndexError::Malformed {
                path,
                message: err.to_string(),
            })
    }
}

fn needs_conversion(dir: &Path, save_file: &Path) -> bool {
    let Some(converted_at) = modified(&dir.join(STAMP_FILE_NAME)) else {
        return true;
    };

    // Unknown save time: let the tool decide and report.
    modified(save_file).map_or(true, |saved_at| saved_at > converted_at)
}

fn modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|meta| meta.modified()).ok()
}

fn list_species(dir: &Path) -> Result<Vec<String>, IndexError> {
    let entries = std::fs::read_dir(dir).map_err(|source| IndexError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut species: Vec<String> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .filter_map(|path| species_name(&path))
        .collect();
    species.sort();
    Ok(species)
}

fn species_name(path: &Path) -> Option<String> {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.starts_with('.'))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Mutex;

    use super::*;
    use crate::ShellError;

    /// Writes canned species files into the directory it is pointed at.
    struct FakeTool {
        calls: Mutex<Vec<Vec<OsString>>>,
        fail: bool,
    }

    impl FakeTool {
        fn new(fail: bool) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail,
            }
        }

        fn calls(&self) -> Vec<Vec<OsString>> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl ToolRunner for FakeTool {
        fn run(&self, args: &[OsString]) -> Result<String, ShellError> {
            self.calls.lock().unwrap().push(args.to_vec());
            if self.fail {
                return Err(ShellError::ToolFailed {
                    program: PathBuf::from("ark-tools"),
                    status: "exit status: 1".to_string(),
                    stderr: "corrupt save".to_string(),
                });
            }

            let dir = PathBuf::from(args.last().unwrap());
            std::fs::write(
                dir.join("Rex.json"),
                r#"[{ "id": 1, "type": "Rex", "name": "Chompy", "location": { "lat": 10.0, "lon": 20.0 }, "level": 120, "female": true }]"#,
            )
            .unwrap();
            std::fs::write(dir.join("Dodo.json"), "[]").unwrap();
            Ok(String::new())
        }
    }

    fn target(root: &Path) -> ConversionTarget {
        let save = root.join("TheIsland.ark");
        std::fs::write(&save, b"save").unwrap();
        ConversionTarget::new(save, root.join("out"))
    }

    #[test]
    fn convert_lists_species_files() {
        let root = tempfile::tempdir().unwrap();
        let target = target(root.path());
        let converter = ArkToolsConverter::new(FakeTool::new(false));

        let records = converter.convert(Partition::Wild, false, &target).unwrap();

        assert_eq!(records.all_species(), ["Dodo", "Rex"]);
        let calls = converter.runner().calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0][0], OsString::from("wild"));
    }

    #[test]
    fn up_to_date_partition_is_not_reconverted_unless_forced() {
        let root = tempfile::tempdir().unwrap();
        let target = target(root.path());
        let converter = ArkToolsConverter::new(FakeTool::new(false));

        converter.convert(Partition::Tamed, false, &target).unwrap();
        converter.convert(Partition::Tamed, false, &target).unwrap();
        assert_eq!(converter.runner().calls().len(), 1);

        converter.convert(Partition::Tamed, true, &target).unwrap();
        assert_eq!(converter.runner().calls().len(), 2);
    }

    #[test]
    fn tool_failure_becomes_conversion_error() {
        let root = tempfile::tempdir().unwrap();
        let target = target(root.path());
        let converter = ArkToolsConverter::new(FakeTool::new(true));

        let err = converter
            .convert(Partition::Wild, true, &target)
            .unwrap_err();
        assert!(matches!(
            err,
            IndexError::Conversion {
                partition: Partition::Wild,
                ..
            }
        ));
        assert!(err.to_string().contains("corrupt save"));
    }

    #[test]
    fn load_species_reads_records() {
        let root = tempfile::tempdir().unwrap();
        let target = target(root.path());
        let converter = ArkToolsConverter::new(FakeTool::new(false));
        converter.convert(Partition::Wild, true, &target).unwrap();

        let rex = converter
            .load_species(Partition::Wild, "Rex", &target)
            .unwrap()
            .unwrap();
        assert_eq!(rex.len(), 1);
        assert_eq!(rex[0].name.as_deref(), Some("Chompy"));
        assert_eq!(rex[0].level, Some(120));
    }

    #[test]
    fn unknown_species_loads_nothing() {
        let root = tempfile::tempdir().unwrap();
        let target = target(root.path());
        let converter = ArkToolsConverter::new(FakeTool::new(false));
        converter.convert(Partition::Wild, true, &target).unwrap();

        assert_eq!(
            converter
                .load_species(Partition::Wild, "Wyvern", &target)
                .unwrap(),
            None
        );
        assert_eq!(
            converter
                .load_species(Partition::Wild, "../Rex", &target)
                .unwrap(),
            None
        );
    }

    #[test]
    fn malformed_species_file_is_reported() {
        let root = tempfile::tempdir().unwrap();
        let target = target(root.path());
        let converter = ArkToolsConverter::new(FakeTool::new(false));
        converter.convert(Partition::Wild, true, &target).unwrap();
        std::fs::write(
            target.partition_dir(Partition::Wild).join("Rex.json"),
            "{ broken",
        )
        .unwrap();

        assert!(matches!(
            converter.load_species(Partition::Wild, "Rex", &target),
            Err(IndexError::Malformed { .. })
        ));
    }
}
