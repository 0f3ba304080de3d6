use std::path::{Path, PathBuf};

use crate::{write_creating_parent, ConfigError};

pub const MARKER_FILE_NAME: &str = "last-ark.txt";

pub fn marker_path(output_dir: &Path) -> PathBuf {
    output_dir.join(MARKER_FILE_NAME)
}

pub fn load_last_source(output_dir: &Path) -> Result<String, ConfigError> {
    let path = marker_path(output_dir);
    std::fs::read_to_string(&path).map_err(|source| ConfigError::Read { path, source })
}

pub fn persist_last_source(output_dir: &Path, source_file: &Path) -> Result<(), ConfigError> {
    write_creating_parent(
        &marker_path(output_dir),
        source_file.to_string_lossy().as_bytes(),
    )
}

/// Whether the marker in `output_dir` disagrees with `source_file`.
///
/// A missing or unreadable marker counts as stale.
pub fn is_stale(output_dir: &Path, source_file: &Path) -> bool {
    match load_last_source(output_dir) {
        Ok(last) => last != source_file.to_string_lossy(),
        Err(err) => {
            tracing::debug!("marker unavailable, treating as stale: {err}");
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_marker_is_stale() {
        let dir = tempfile::tempdir().unwrap();
        assert!(is_stale(dir.path(), Path::new("/saves/TheIsland.ark")));
    }

    #[test]
    fn matching_marker_is_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let source = Path::new("/saves/TheIsland.ark");
        persist_last_source(dir.path(), source).unwrap();

        assert!(!is_stale(dir.path(), source));
        assert_eq!(load_last_source(dir.path()).unwrap(), "/saves/TheIsland.ark");
    }

    #[test]
    fn changed_source_flips_staleness() {
        let dir = tempfile::tempdir().unwrap();
        persist_last_source(dir.path(), Path::new("/saves/TheIsland.ark")).unwrap();

        assert!(is_stale(dir.path(), Path::new("/saves/Ragnarok.ark")));
    }

    #[test]
    fn marker_comparison_is_exact() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(marker_path(dir.path()), "/saves/TheIsland.ark\n").unwrap();

        assert!(is_stale(dir.path(), Path::new("/saves/TheIsland.ark")));
    }
}
