// Error types for the download pipeline

use std::fmt;

use thiserror::Error;

use super::backends::diagnostics::BlockingReason;
use super::lifecycle::StateKind;

/// Failure of a single extraction backend. Recovered by trying the next one.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Network failure talking to the backend
    #[error("backend unreachable: {0}")]
    Unreachable(String),

    /// Backend answered with a non-success HTTP status
    #[error("backend returned HTTP {0}")]
    Status(u16),

    /// Extraction tool refused the URL (private, geo-blocked, ...)
    #[error("extraction rejected ({reason}): {message}")]
    Rejected {
        reason: BlockingReason,
        message: String,
    },

    /// Response body could not be parsed
    #[error("parse error: {0}")]
    Parse(String),

    /// Response parsed but carried no usable media URL
    #[error("no media location found")]
    NoMediaLocation,

    /// External tool (yt-dlp, python) is missing
    #[error("tool not found: {0}")]
    ToolNotFound(String),

    /// Backend call exceeded its own timeout
    #[error("backend timed out after {0}s")]
    TimedOut(u64),
}

/// Failure while streaming the resolved media to disk
#[derive(Debug, Error)]
pub enum FetchError {
    /// Payload is larger than the configured limit.
    ///
    /// Carries the advertised Content-Length when the host sent one. Without
    /// it, the value is the byte count at the chunk where the download stopped,
    /// which is at most one chunk past the limit.
    #[error("payload too large: {0} bytes")]
    TooLarge(u64),

    /// Media host answered with a non-success status
    #[error("remote rejected the download with HTTP {0}")]
    RemoteRejected(u16),

    /// Media host returned success but no bytes
    #[error("remote returned an empty payload")]
    EmptyPayload,

    /// Overall download budget elapsed
    #[error("download timed out")]
    TimedOut,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::TimedOut
        } else {
            Self::Transport(e.to_string())
        }
    }
}

/// One backend's recorded failure inside a fallback chain
#[derive(Debug)]
pub struct BackendFailure {
    pub backend: &'static str,
    pub error: ExtractionError,
}

impl fmt::Display for BackendFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.backend, self.error)
    }
}

/// Classified outcome of a failed `DownloadOrchestrator::handle`
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("URL is not a supported video link")]
    NotSupportedUrl,

    #[error("all backends failed ({} attempted)", .0.len())]
    AllBackendsFailed(Vec<BackendFailure>),

    #[error("fetch failed: {0}")]
    FetchFailed(#[source] FetchError),
}

/// Attempted lifecycle transition that would break monotonic ordering
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("illegal transition {from:?} -> {to:?}")]
pub struct LifecycleError {
    pub from: StateKind,
    pub to: StateKind,
}

/// Failure reported by the chat front end while relaying an event
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("adapter I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("adapter error: {0}")]
    Other(String),
}
