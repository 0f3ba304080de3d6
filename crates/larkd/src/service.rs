//! The coordination loop.
//!
//! One task owns the [`AppState`] and applies requests in arrival order.
//! Conversion, species loading and tool updates run on the blocking pool and
//! post their results back into the same queue.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use larkcore_index::Converter;
use larkcore_shell::ToolRunner;
use larkcore_watch::{ChangeMonitor, Debouncer};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::loader::load_species;
use crate::pipeline::run_conversion;
use crate::state::{AppState, Command, Effect, StateSnapshot};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("service loop has stopped")]
    Stopped,
}

enum Request {
    Command(Command),
    Snapshot(oneshot::Sender<StateSnapshot>),
    Shutdown,
}

#[derive(Clone)]
pub struct ServiceHandle {
    tx: mpsc::UnboundedSender<Request>,
}

impl ServiceHandle {
    pub fn send(&self, command: Command) -> Result<(), ServiceError> {
        self.tx
            .send(Request::Command(command))
            .map_err(|_| ServiceError::Stopped)
    }

    pub async fn snapshot(&self) -> Result<StateSnapshot, ServiceError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Request::Snapshot(reply))
            .map_err(|_| ServiceError::Stopped)?;
        rx.await.map_err(|_| ServiceError::Stopped)
    }
}

pub struct AppService {
    handle: ServiceHandle,
    task: JoinHandle<()>,
}

impl AppService {
    /// Spawns the loop on the current tokio runtime.
    ///
    /// Nothing happens until [`Command::Start`] is sent.
    pub fn spawn(state: AppState, converter: Arc<dyn Converter>, tool: Arc<dyn ToolRunner>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let runtime = Handle::current();

        let reload_tx = tx.clone();
        let reload = Debouncer::new(runtime.clone(), move |()| {
            let _ = reload_tx.send(Request::Command(Command::ReloadDue));
        });
        let highlight_tx = tx.clone();
        let highlight = Debouncer::new(runtime, move |text: String| {
            let _ = highlight_tx.send(Request::Command(Command::HighlightDue(text)));
        });

        let worker = Worker {
            state,
            converter,
            tool,
            tx: tx.clone(),
            reload,
            highlight,
            monitor: None,
        };
        let task = tokio::spawn(worker.run(rx));

        Self {
            handle: ServiceHandle { tx },
            task,
        }
    }

    pub fn handle(&self) -> ServiceHandle {
        self.handle.clone()
    }

    pub async fn shutdown(self) {
        let _ = self.handle.tx.send(Request::Shutdown);
        if let Err(err) = self.task.await {
            tracing::error!("service loop ended abnormally: {err}");
        }
    }
}

struct Worker {
    state: AppState,
    converter: Arc<dyn Converter>,
    tool: Arc<dyn ToolRunner>,
    tx: mpsc::UnboundedSender<Request>,
    reload: Debouncer<()>,
    highlight: Debouncer<String>,
    monitor: Option<ChangeMonitor>,
}

impl Worker {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Request>) {
        while let Some(request) = rx.recv().await {
            match request {
                Request::Command(command) => {
                    for effect in self.state.handle(command) {
                        self.apply(effect);
                    }
                }
                Request::Snapshot(reply) => {
                    let _ = reply.send(self.state.snapshot());
                }
                Request::Shutdown => break,
            }
        }
        tracing::debug!("service loop stopped");
    }

    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::UpdateToolData => {
                let tool = Arc::clone(&self.tool);
                self.in_background(move || {
                    let result = larkcore_shell::update_data(tool.as_ref()).map_err(|err| {
                        tracing::warn!("failed to update tool data: {err}");
                        err.to_string()
                    });
                    Command::ToolDataUpdated(result)
                });
            }
            Effect::Convert(request) => {
                let converter = Arc::clone(&self.converter);
                self.in_background(move || {
                    Command::ConversionFinished(run_conversion(converter.as_ref(), &request))
                });
            }
            Effect::LoadSpecies(request) => {
                let converter = Arc::clone(&self.converter);
                self.in_background(move || {
                    Command::SpeciesLoaded(load_species(converter.as_ref(), &request))
                });
            }
            Effect::ScheduleHighlight { text, window } => {
                self.highlight.schedule_in(window.delay(), text);
            }
            Effect::WatchSave { file, quiet_window } => self.watch(file, quiet_window),
        }
    }

    fn in_background(&self, job: impl FnOnce() -> Command + Send + 'static) {
        let tx = self.tx.clone();
        tokio::task::spawn_blocking(move || {
            let _ = tx.send(Request::Command(job()));
        });
    }

    fn watch(&mut self, file: PathBuf, quiet_window: Duration) {
        if let Some(monitor) = &mut self.monitor {
            monitor.set_quiet_window(quiet_window);
            if let Err(err) = monitor.retarget(file) {
                tracing::warn!("cannot watch save file: {err}");
            }
            return;
        }

        let tx = self.tx.clone();
        let on_change = move || {
            let _ = tx.send(Request::Command(Command::SaveChangeDetected));
        };
        match ChangeMonitor::start(file, quiet_window, self.reload.clone(), on_change) {
            Ok(monitor) => self.monitor = Some(monitor),
            Err(err) => tracing::warn!("cannot watch save file: {err}"),
        }
    }
}
