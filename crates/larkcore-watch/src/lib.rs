use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

pub mod debounce;

pub use debounce::Debouncer;
pub use larkcore_config::marker::is_stale;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Renamed,
    Deleted,
}

impl ChangeKind {
    pub fn from_event_kind(kind: &EventKind) -> Option<Self> {
        match kind {
            EventKind::Create(_) => Some(ChangeKind::Created),
            EventKind::Modify(ModifyKind::Name(_)) => Some(ChangeKind::Renamed),
            EventKind::Modify(_) | EventKind::Any => Some(ChangeKind::Modified),
            EventKind::Remove(_) => Some(ChangeKind::Deleted),
            EventKind::Access(_) | EventKind::Other => None,
        }
    }

    /// Saves are written elsewhere and then moved over the old file, so only
    /// renames and fresh files count as a finished save.
    fn replaces_file(self) -> bool {
        matches!(self, ChangeKind::Created | ChangeKind::Renamed)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("failed to start save watcher: {0}")]
    Init(notify::Error),
    #[error("save file {0} has no parent directory")]
    NoDirectory(PathBuf),
    #[error("failed to watch {path}: {source}")]
    Watch {
        path: PathBuf,
        source: notify::Error,
    },
}

pub fn is_candidate_change(event: &Event, target: &Path) -> bool {
    let replaces = ChangeKind::from_event_kind(&event.kind).is_some_and(ChangeKind::replaces_file);
    replaces && event.paths.iter().any(|path| path == target)
}

struct WatchTarget {
    file: PathBuf,
    quiet_window: Duration,
}

/// Watches the directory of one save file and debounces replacements of it.
///
/// Every candidate change calls `on_change` right away and pushes the reload
/// debouncer out to `now + quiet window`.
pub struct ChangeMonitor {
    watcher: RecommendedWatcher,
    target: Arc<Mutex<WatchTarget>>,
    watched_dir: Option<PathBuf>,
}

impl ChangeMonitor {
    pub fn start(
        file: PathBuf,
        quiet_window: Duration,
        reload: Debouncer<()>,
        on_change: impl Fn() + Send + 'static,
    ) -> Result<Self, WatchError> {
        let target = Arc::new(Mutex::new(WatchTarget { file, quiet_window }));
        let handler_target = Arc::clone(&target);

        let watcher = notify::recommended_watcher(move |result: notify::Result<Event>| {
            let event = match result {
                Ok(event) => event,
                Err(err) => {
                    tracing::warn!("save watcher error: {err}");
                    return;
                }
            };

            let (file, quiet_window) = {
                let target = handler_target
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                (target.file.clone(), target.quiet_window)
            };
            if !is_candidate_change(&event, &file) {
                return;
            }

            tracing::info!(path = %file.display(), "detected change to save file");
            on_change();
            reload.schedule_in(quiet_window, ());
        })
        .map_err(WatchError::Init)?;

        let mut monitor = Self {
            watcher,
            target,
            watched_dir: None,
        };
        monitor.bind()?;
        Ok(monitor)
    }

    pub fn target(&self) -> PathBuf {
        self.lock_target().file.clone()
    }

    pub fn watched_dir(&self) -> Option<&Path> {
        self.watched_dir.as_deref()
    }

    /// Points the monitor at a new save file, moving the directory watch if needed.
    ///
    /// The new target is kept even when the directory cannot be watched.
    pub fn retarget(&mut self, file: PathBuf) -> Result<(), WatchError> {
        self.lock_target().file = file;
        self.bind()
    }

    pub fn set_quiet_window(&self, quiet_window: Duration) {
        self.lock_target().quiet_window = quiet_window;
    }

    fn bind(&mut self) -> Result<(), WatchError> {
        let file = self.target();
        let dir = file
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .ok_or_else(|| WatchError::NoDirectory(file.clone()))?;

        if self.watched_dir.as_deref() == Some(dir.as_path()) {
            return Ok(());
        }

        if let Some(old) = self.watched_dir.take() {
            if let Err(err) = self.watcher.unwatch(&old) {
                tracing::warn!("failed to unwatch {}: {err}", old.display());
            }
        }

        self.watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|source| WatchError::Watch {
                path: dir.clone(),
                source,
            })?;
        tracing::debug!(dir = %dir.display(), "watching save directory");
        self.watched_dir = Some(dir);
        Ok(())
    }

    fn lock_target(&self) -> std::sync::MutexGuard<'_, WatchTarget> {
        self.target.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
