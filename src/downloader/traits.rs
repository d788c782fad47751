// Backend and front-end trait definitions

use std::path::Path;

use async_trait::async_trait;

use super::errors::{AdapterError, ExtractionError};
use super::lifecycle::State;
use super::models::{RequestId, ResolvedMedia};

/// Trait for extraction backend implementations
#[async_trait]
pub trait ExtractionBackend: Send + Sync {
    /// Name of the backend (for logging)
    fn name(&self) -> &'static str;

    /// Turn a page URL into a directly fetchable media location
    async fn resolve(&self, url: &str) -> Result<ResolvedMedia, ExtractionError>;
}

/// Chat front end that relays lifecycle events to the user
#[async_trait]
pub trait ChatAdapter: Send + Sync {
    /// Called once per lifecycle transition
    async fn notify(&self, request_id: RequestId, state: &State) -> Result<(), AdapterError>;

    /// Transmit the downloaded file. The file is deleted after this returns.
    async fn send_file(
        &self,
        request_id: RequestId,
        path: &Path,
        caption: &str,
    ) -> Result<(), AdapterError>;

    /// Report a terminal failure
    async fn send_failure(&self, request_id: RequestId, message: &str) -> Result<(), AdapterError>;
}
