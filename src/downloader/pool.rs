// Bounded worker pool - runs request lifecycles off the front end's loop

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use super::lifecycle::{FailureReason, RequestLifecycle, State};
use super::models::RequestId;
use super::orchestrator::DownloadOrchestrator;
use super::traits::ChatAdapter;

/// Dispatches each request onto its own task, at most `capacity` running at once
#[derive(Clone)]
pub struct WorkerPool {
    orchestrator: Arc<DownloadOrchestrator>,
    permits: Arc<Semaphore>,
    capacity: usize,
}

impl WorkerPool {
    pub fn new(orchestrator: Arc<DownloadOrchestrator>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            orchestrator,
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Requests currently holding a slot
    pub fn in_flight(&self) -> usize {
        self.capacity - self.permits.available_permits()
    }

    /// Queue `text` for processing. The handle resolves to the terminal state;
    /// a panic inside the request is contained and reported as `Failed(Internal)`.
    pub fn submit(&self, text: impl Into<String>, adapter: Arc<dyn ChatAdapter>) -> JoinHandle<State> {
        let lifecycle = RequestLifecycle::new(text);
        let request_id = lifecycle.request_id();
        let orchestrator = Arc::clone(&self.orchestrator);
        let permits = Arc::clone(&self.permits);

        tokio::spawn(async move {
            let _permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    error!(%request_id, "worker pool closed");
                    return report_internal(adapter.as_ref(), request_id).await;
                }
            };
            debug!(%request_id, "worker slot acquired");

            let worker_adapter = Arc::clone(&adapter);
            let worker = tokio::spawn(async move {
                lifecycle
                    .run(orchestrator.as_ref(), worker_adapter.as_ref())
                    .await
            });

            match worker.await {
                Ok(state) => state,
                Err(e) => {
                    error!(%request_id, error = %e, "request task aborted");
                    report_internal(adapter.as_ref(), request_id).await
                }
            }
        })
    }

    /// Stop accepting work; queued requests resolve to `Failed(Internal)`
    pub fn close(&self) {
        self.permits.close();
    }
}

async fn report_internal(adapter: &dyn ChatAdapter, request_id: RequestId) -> State {
    let message = FailureReason::Internal.user_message();
    if let Err(e) = adapter.send_failure(request_id, &message).await {
        error!(%request_id, error = %e, "failure message not delivered");
    }
    State::Failed(FailureReason::Internal)
}
