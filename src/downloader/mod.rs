// Downloader module - URL in, bounded local file out

pub mod backends;
pub mod classifier;
pub mod errors;
pub mod fetch;
pub mod lifecycle;
pub mod messages;
pub mod models;
pub mod orchestrator;
pub mod pool;
pub mod traits;
pub mod utils;

pub use classifier::UrlClassifier;
pub use errors::{
    AdapterError, BackendFailure, ExtractionError, FetchError, LifecycleError, OrchestratorError,
};
pub use fetch::{FetchEngine, FetchLimits};
pub use lifecycle::{FailureReason, RequestLifecycle, State, StateKind};
pub use models::{FetchResult, MediaRequest, RequestId, ResolvedMedia};
pub use orchestrator::DownloadOrchestrator;
pub use pool::WorkerPool;
pub use traits::{ChatAdapter, ExtractionBackend};
