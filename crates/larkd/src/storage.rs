use std::path::{Path, PathBuf};

use larkcore_query::SearchCriterion;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoragePaths {
    pub settings: PathBuf,
    pub searches: PathBuf,
}

impl StoragePaths {
    pub fn default_locations() -> Self {
        Self {
            settings: larkcore_config::settings_path(),
            searches: larkcore_config::searches_path(),
        }
    }

    pub fn in_dir(dir: &Path) -> Self {
        Self {
            settings: dir.join("settings.json"),
            searches: dir.join("searches.json"),
        }
    }
}

pub(crate) fn load_saved_searches(path: &Path) -> Vec<SearchCriterion> {
    let Ok(content) = std::fs::read_to_string(path) else {
        return Vec::new();
    };
    if content.trim().is_empty() {
        return Vec::new();
    }

    match serde_json::from_str(&content) {
        Ok(searches) => searches,
        Err(err) => {
            tracing::warn!(path = %path.display(), "skipping malformed saved searches: {err}");
            Vec::new()
        }
    }
}

pub(crate) fn persist_saved_searches(path: &Path, searches: &[SearchCriterion]) {
    if let Some(parent) = path.parent() {
        if std::fs::create_dir_all(parent).is_err() {
            tracing::warn!(dir = %parent.display(), "cannot create searches directory");
            return;
        }
    }

    let content = match serde_json::to_string_pretty(searches) {
        Ok(content) => content,
        Err(err) => {
            tracing::error!("failed to encode saved searches: {err}");
            return;
        }
    };

    if let Err(err) = std::fs::write(path, content) {
        tracing::warn!(path = %path.display(), "failed to save searches: {err}");
    }
}
