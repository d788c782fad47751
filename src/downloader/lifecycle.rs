// Request lifecycle - per-request state machine driving user-visible status

use tracing::{error, info, warn, Instrument};

use super::errors::{FetchError, LifecycleError, OrchestratorError};
use super::messages::format_size;
use super::models::{FetchResult, MediaRequest, RequestId};
use super::orchestrator::DownloadOrchestrator;
use super::traits::ChatAdapter;
use super::utils::TempFileGuard;

/// User-facing classification of a terminal failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// Input is not a link to a supported host
    UnsupportedUrl,
    /// Every backend failed to resolve the link
    CouldNotFetch,
    /// File is larger than the configured limit
    TooLarge { limit_bytes: u64 },
    /// Resolved, but the media download failed
    DownloadFailed,
    /// Adapter, disk or runtime failure outside the pipeline
    Internal,
}

impl FailureReason {
    /// Map a pipeline error to what the user is told
    pub fn from_error(error: &OrchestratorError, limit_bytes: u64) -> Self {
        match error {
            OrchestratorError::NotSupportedUrl => Self::UnsupportedUrl,
            OrchestratorError::AllBackendsFailed(_) => Self::CouldNotFetch,
            OrchestratorError::FetchFailed(FetchError::TooLarge(_)) => Self::TooLarge { limit_bytes },
            OrchestratorError::FetchFailed(_) => Self::DownloadFailed,
        }
    }

    /// Message for the chat front end. Never includes backend details.
    pub fn user_message(&self) -> String {
        match self {
            Self::UnsupportedUrl => "❌ Please send a valid TikTok video URL.\n\n\
                 Example: https://www.tiktok.com/@username/video/1234567890"
                .to_string(),
            Self::CouldNotFetch => "❌ Could not fetch video information. \
                 Please check the URL and try again."
                .to_string(),
            Self::TooLarge { limit_bytes } => format!(
                "❌ The video exceeds the {} limit and cannot be sent.",
                format_size(*limit_bytes)
            ),
            Self::DownloadFailed => "❌ Failed to download video.\n\n\
                 Possible reasons:\n\
                 • Video is private or deleted\n\
                 • The download service is temporarily unavailable\n\
                 • Video is region-restricted\n\n\
                 Please try again in a few minutes or with a different video."
                .to_string(),
            Self::Internal => {
                "❌ An error occurred while processing the video. Please try again later."
                    .to_string()
            }
        }
    }
}

/// Lifecycle states, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum State {
    Received,
    Classifying,
    Resolving,
    Downloading,
    Sending,
    Completed,
    Failed(FailureReason),
}

/// Payload-free view of `State`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StateKind {
    Received,
    Classifying,
    Resolving,
    Downloading,
    Sending,
    Completed,
    Failed,
}

impl State {
    pub fn kind(&self) -> StateKind {
        match self {
            Self::Received => StateKind::Received,
            Self::Classifying => StateKind::Classifying,
            Self::Resolving => StateKind::Resolving,
            Self::Downloading => StateKind::Downloading,
            Self::Sending => StateKind::Sending,
            Self::Completed => StateKind::Completed,
            Self::Failed(_) => StateKind::Failed,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed(_))
    }

    /// Progress text shown to the user on entering this state, if any
    pub fn status_text(&self) -> Option<&'static str> {
        match self {
            Self::Resolving => Some("🔄 Processing your TikTok video..."),
            Self::Downloading => Some("⬇️ Downloading video..."),
            Self::Sending => Some("📤 Sending video..."),
            _ => None,
        }
    }

    fn successor(&self) -> Option<StateKind> {
        match self.kind() {
            StateKind::Received => Some(StateKind::Classifying),
            StateKind::Classifying => Some(StateKind::Resolving),
            StateKind::Resolving => Some(StateKind::Downloading),
            StateKind::Downloading => Some(StateKind::Sending),
            StateKind::Sending => Some(StateKind::Completed),
            StateKind::Completed | StateKind::Failed => None,
        }
    }
}

/// Tracks one request from submission to its terminal state
#[derive(Debug)]
pub struct RequestLifecycle {
    request: MediaRequest,
    state: State,
}

impl RequestLifecycle {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            request: MediaRequest::new(text),
            state: State::Received,
        }
    }

    pub fn request(&self) -> &MediaRequest {
        &self.request
    }

    pub fn request_id(&self) -> RequestId {
        self.request.request_id()
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    /// Move to `next`. Only the immediate successor, or `Failed` from a
    /// non-terminal state, is accepted.
    pub fn advance(&mut self, next: State) -> Result<(), LifecycleError> {
        let allowed = match &next {
            State::Failed(_) => !self.state.is_terminal(),
            other => self.state.successor() == Some(other.kind()),
        };

        if !allowed {
            return Err(LifecycleError {
                from: self.state.kind(),
                to: next.kind(),
            });
        }

        self.state = next;
        Ok(())
    }

    /// Drive the request through the orchestrator, reporting every transition
    /// to `adapter`. Always ends in a terminal state; the fetched file is
    /// removed before this returns.
    pub async fn run(self, orchestrator: &DownloadOrchestrator, adapter: &dyn ChatAdapter) -> State {
        let span = tracing::info_span!("request", request_id = %self.request_id());
        self.run_inner(orchestrator, adapter).instrument(span).await
    }

    async fn run_inner(mut self, orchestrator: &DownloadOrchestrator, adapter: &dyn ChatAdapter) -> State {
        let limit = orchestrator.limits().max_bytes;
        let url = self.request.raw_url().to_string();
        info!(url = %url, "request received");

        if let Err(reason) = self.enter(State::Classifying, adapter).await {
            return self.fail(reason, adapter).await;
        }
        if let Err(e) = orchestrator.classify(&url) {
            info!("rejected: not a supported URL");
            return self.fail(FailureReason::from_error(&e, limit), adapter).await;
        }
        self.request.mark_classified();

        if let Err(reason) = self.enter(State::Resolving, adapter).await {
            return self.fail(reason, adapter).await;
        }
        let resolved = match orchestrator.resolve(&url).await {
            Ok(resolved) => resolved,
            Err(e) => return self.fail(FailureReason::from_error(&e, limit), adapter).await,
        };

        if let Err(reason) = self.enter(State::Downloading, adapter).await {
            return self.fail(reason, adapter).await;
        }
        let caption = caption(&url, resolved.title.as_deref());
        let fetched = match orchestrator.fetch(resolved, self.request_id()).await {
            Ok(fetched) => fetched,
            Err(e) => return self.fail(FailureReason::from_error(&e, limit), adapter).await,
        };

        self.deliver(fetched, &caption, adapter).await
    }

    /// Sending stage. The file is deleted on every path out of here.
    async fn deliver(mut self, fetched: FetchResult, caption: &str, adapter: &dyn ChatAdapter) -> State {
        let file = TempFileGuard::new(fetched.local_path);

        if let Err(reason) = self.enter(State::Sending, adapter).await {
            drop(file);
            return self.fail(reason, adapter).await;
        }

        let sent = adapter.send_file(self.request_id(), file.path(), caption).await;
        drop(file);

        match sent {
            Ok(()) => {
                info!(bytes = fetched.byte_size, "delivered");
                if let Err(reason) = self.enter(State::Completed, adapter).await {
                    warn!(?reason, "completion notice not delivered");
                }
                self.state
            }
            Err(e) => {
                error!(error = %e, "sending file failed");
                self.fail(FailureReason::Internal, adapter).await
            }
        }
    }

    /// Transition and notify. A notification failure is reported as `Internal`.
    async fn enter(&mut self, next: State, adapter: &dyn ChatAdapter) -> Result<(), FailureReason> {
        if let Err(e) = self.advance(next) {
            error!(error = %e, "lifecycle bug");
            return Err(FailureReason::Internal);
        }
        adapter
            .notify(self.request_id(), &self.state)
            .await
            .map_err(|e| {
                error!(error = %e, state = ?self.state.kind(), "status notification failed");
                FailureReason::Internal
            })
    }

    async fn fail(mut self, reason: FailureReason, adapter: &dyn ChatAdapter) -> State {
        if self.advance(State::Failed(reason)).is_err() {
            return self.state;
        }
        info!(?reason, "request failed");

        if let Err(e) = adapter.notify(self.request_id(), &self.state).await {
            warn!(error = %e, "failure notification not delivered");
        }
        if let Err(e) = adapter
            .send_failure(self.request_id(), &reason.user_message())
            .await
        {
            error!(error = %e, "failure message not delivered");
        }
        self.state
    }
}

/// Caption attached to a delivered video
pub fn caption(url: &str, title: Option<&str>) -> String {
    match title {
        Some(title) => format!("🎵 {}\n\nOriginal URL: {}", title, url),
        None => format!("🎵 Downloaded TikTok Video\n\nOriginal URL: {}", url),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::errors::{BackendFailure, ExtractionError};

    const MIB: u64 = 1024 * 1024;

    #[test]
    fn test_forward_transitions() {
        let mut lc = RequestLifecycle::new("https://vm.tiktok.com/a/");
        for next in [
            State::Classifying,
            State::Resolving,
            State::Downloading,
            State::Sending,
            State::Completed,
        ] {
            lc.advance(next.clone()).unwrap();
            assert_eq!(lc.state(), &next);
        }
        assert!(lc.state().is_terminal());
    }

    #[test]
    fn test_no_skipping_or_going_back() {
        let mut lc = RequestLifecycle::new("x");
        assert!(lc.advance(State::Downloading).is_err());
        lc.advance(State::Classifying).unwrap();
        lc.advance(State::Resolving).unwrap();

        let err = lc.advance(State::Classifying).unwrap_err();
        assert_eq!(err.from, StateKind::Resolving);
        assert_eq!(err.to, StateKind::Classifying);
        assert_eq!(lc.state(), &State::Resolving);
    }

    #[test]
    fn test_failed_from_any_non_terminal() {
        for steps in 0..5 {
            let mut lc = RequestLifecycle::new("x");
            let path = [
                State::Classifying,
                State::Resolving,
                State::Downloading,
                State::Sending,
            ];
            for s in path.iter().take(steps) {
                lc.advance(s.clone()).unwrap();
            }
            lc.advance(State::Failed(FailureReason::Internal)).unwrap();
        }
    }

    #[test]
    fn test_terminal_is_final() {
        let mut lc = RequestLifecycle::new("x");
        lc.advance(State::Failed(FailureReason::UnsupportedUrl)).unwrap();
        assert!(lc.advance(State::Failed(FailureReason::Internal)).is_err());
        assert!(lc.advance(State::Classifying).is_err());
        assert_eq!(lc.state(), &State::Failed(FailureReason::UnsupportedUrl));
    }

    #[test]
    fn test_failure_mapping() {
        let limit = 50 * MIB;
        assert_eq!(
            FailureReason::from_error(&OrchestratorError::NotSupportedUrl, limit),
            FailureReason::UnsupportedUrl
        );
        assert_eq!(
            FailureReason::from_error(
                &OrchestratorError::AllBackendsFailed(vec![BackendFailure {
                    backend: "rapidapi",
                    error: ExtractionError::Status(500),
                }]),
                limit
            ),
            FailureReason::CouldNotFetch
        );
        assert_eq!(
            FailureReason::from_error(
                &OrchestratorError::FetchFailed(FetchError::TooLarge(60 * MIB)),
                limit
            ),
            FailureReason::TooLarge { limit_bytes: limit }
        );
        assert_eq!(
            FailureReason::from_error(&OrchestratorError::FetchFailed(FetchError::TimedOut), limit),
            FailureReason::DownloadFailed
        );
    }

    #[test]
    fn test_user_messages_hide_internals() {
        let msg = FailureReason::CouldNotFetch.user_message();
        assert!(!msg.contains("rapidapi"));
        assert!(FailureReason::TooLarge { limit_bytes: 50 * MIB }
            .user_message()
            .contains("50 MB"));
    }

    #[test]
    fn test_too_large_message_for_small_limit() {
        let msg = FailureReason::TooLarge { limit_bytes: 512 * 1024 }.user_message();
        assert!(msg.contains("512 KB"), "{msg}");
        assert!(!msg.contains("0 MB"));
    }

    #[test]
    fn test_caption() {
        let url = "https://vm.tiktok.com/a/";
        assert!(caption(url, None).starts_with("🎵 Downloaded TikTok Video"));
        assert!(caption(url, Some("dance")).contains("dance"));
        assert!(caption(url, Some("dance")).ends_with(url));
    }

    #[test]
    fn test_status_texts() {
        assert!(State::Received.status_text().is_none());
        assert!(State::Downloading.status_text().is_some());
        assert!(State::Failed(FailureReason::Internal).status_text().is_none());
    }
}
