// Orchestrator with fallback logic

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::backends::metadata::METADATA_TIMEOUT_SECS;
use super::backends::{MetadataBackend, RapidApiBackend, YtDlpInvocation};
use super::classifier::UrlClassifier;
use super::errors::{BackendFailure, FetchError, OrchestratorError};
use super::fetch::{FetchEngine, FetchLimits};
use super::models::{FetchResult, MediaRequest, RequestId, ResolvedMedia};
use super::traits::ExtractionBackend;
use crate::config::{Config, ConfigError};

/// Composes classification, backend fallback and the bounded fetch
pub struct DownloadOrchestrator {
    classifier: UrlClassifier,
    backends: Vec<Box<dyn ExtractionBackend>>,
    fetcher: FetchEngine,
    limits: FetchLimits,
    work_dir: PathBuf,
}

impl DownloadOrchestrator {
    pub fn new(
        classifier: UrlClassifier,
        fetcher: FetchEngine,
        limits: FetchLimits,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            classifier,
            backends: Vec::new(),
            fetcher,
            limits,
            work_dir: work_dir.into(),
        }
    }

    /// Build the production pipeline: yt-dlp first, RapidAPI second when configured
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let client = config.http_client()?;

        let mut orchestrator = Self::new(
            UrlClassifier::new(),
            FetchEngine::new(client.clone()),
            config.fetch_limits(),
            config.work_dir.clone(),
        );

        let invocation =
            YtDlpInvocation::detect(config.ytdlp_path.as_deref(), config.ytdlp_python.as_deref());
        // Metadata extraction never gets more time than the whole download
        let extraction_secs = config.download_timeout.as_secs().min(METADATA_TIMEOUT_SECS);
        orchestrator.add_backend(Box::new(
            MetadataBackend::new(invocation)
                .with_proxy(config.proxy.clone())
                .with_timeout(extraction_secs),
        ));

        if let Some(creds) = &config.rapidapi {
            orchestrator.add_backend(Box::new(RapidApiBackend::new(
                client,
                creds.api_key.clone(),
                creds.api_host.clone(),
            )));
        }

        Ok(orchestrator)
    }

    pub fn add_backend(&mut self, backend: Box<dyn ExtractionBackend>) {
        self.backends.push(backend);
    }

    pub fn backend_names(&self) -> Vec<&'static str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    pub fn limits(&self) -> FetchLimits {
        self.limits
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Step 1: reject anything outside the allow-list before any backend is called
    pub fn classify(&self, url: &str) -> Result<(), OrchestratorError> {
        if self.classifier.is_supported(url) {
            Ok(())
        } else {
            Err(OrchestratorError::NotSupportedUrl)
        }
    }

    /// Steps 2-3: try each backend in order, stop at the first success
    pub async fn resolve(&self, url: &str) -> Result<ResolvedMedia, OrchestratorError> {
        let mut failures = Vec::new();

        for backend in &self.backends {
            info!(backend = backend.name(), "trying backend");

            match backend.resolve(url).await {
                Ok(media) => {
                    info!(backend = backend.name(), id = %media.suggested_id, "resolved");
                    return Ok(media);
                }
                Err(error) => {
                    warn!(backend = backend.name(), %error, "backend failed");
                    failures.push(BackendFailure {
                        backend: backend.name(),
                        error,
                    });
                }
            }
        }

        Err(OrchestratorError::AllBackendsFailed(failures))
    }

    /// Step 4: fetch the first successful resolution; no fallback on fetch failure
    pub async fn fetch(
        &self,
        resolved: ResolvedMedia,
        request_id: RequestId,
    ) -> Result<FetchResult, OrchestratorError> {
        tokio::fs::create_dir_all(&self.work_dir)
            .await
            .map_err(|e| OrchestratorError::FetchFailed(FetchError::Io(e)))?;

        let destination = resolved.destination_in(&self.work_dir, request_id);
        self.fetcher
            .fetch(
                &resolved,
                &destination,
                self.limits.max_bytes,
                self.limits.timeout,
            )
            .await
            .map_err(|e| {
                warn!(backend = resolved.backend, error = %e, "fetch failed");
                OrchestratorError::FetchFailed(e)
            })
    }

    /// Run the whole pipeline for one URL.
    ///
    /// On success the caller owns the returned file and must delete it.
    pub async fn handle(&self, url: &str) -> Result<FetchResult, OrchestratorError> {
        let request = MediaRequest::new(url);
        self.classify(request.raw_url())?;
        let resolved = self.resolve(request.raw_url()).await?;
        self.fetch(resolved, request.request_id()).await
    }
}
