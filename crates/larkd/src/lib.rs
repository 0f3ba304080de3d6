pub mod highlight;
pub mod loader;
pub mod pipeline;
pub mod service;
pub mod state;
mod storage;

pub use highlight::{HighlightWindow, ResultRow};
pub use pipeline::{ConversionOutcome, ConversionRequest, ForceFlags, PipelineError};
pub use service::{AppService, ServiceError, ServiceHandle};
pub use state::{AppState, Command, Effect, StateSnapshot, Status, View};
pub use storage::StoragePaths;
