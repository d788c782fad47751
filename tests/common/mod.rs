// Shared fixtures for the integration tests
#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tiktok_downloader_lib::downloader::{
    AdapterError, ChatAdapter, DownloadOrchestrator, ExtractionBackend, ExtractionError,
    FetchEngine, FetchLimits, RequestId, ResolvedMedia, State, StateKind, UrlClassifier,
};

pub const MIB: u64 = 1024 * 1024;
pub const TIKTOK_URL: &str = "https://www.tiktok.com/@user/video/7301234567890";

/// What a stub backend does when asked to resolve
#[derive(Clone)]
pub enum Outcome {
    Resolve { direct_url: String, id: String },
    Fail(u16),
    Panic,
}

/// Backend with a scripted outcome that counts its calls
pub struct StubBackend {
    name: &'static str,
    outcome: Outcome,
    delay: Duration,
    calls: Arc<AtomicUsize>,
    running: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl StubBackend {
    pub fn new(name: &'static str, outcome: Outcome) -> Self {
        Self {
            name,
            outcome,
            delay: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
            running: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn resolving(name: &'static str, direct_url: impl Into<String>) -> Self {
        Self::new(
            name,
            Outcome::Resolve {
                direct_url: direct_url.into(),
                id: "7301234567890".to_string(),
            },
        )
    }

    pub fn failing(name: &'static str, status: u16) -> Self {
        Self::new(name, Outcome::Fail(status))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    /// Highest number of concurrent `resolve` calls observed
    pub fn peak(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.peak)
    }
}

#[async_trait]
impl ExtractionBackend for StubBackend {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn resolve(&self, _url: &str) -> Result<ResolvedMedia, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.running.fetch_sub(1, Ordering::SeqCst);

        match &self.outcome {
            Outcome::Resolve { direct_url, id } => {
                Ok(ResolvedMedia::new(self.name, direct_url.clone(), id, "mp4"))
            }
            Outcome::Fail(status) => Err(ExtractionError::Status(*status)),
            Outcome::Panic => panic!("backend exploded"),
        }
    }
}

pub fn orchestrator(work_dir: &Path, max_bytes: u64, timeout: Duration) -> DownloadOrchestrator {
    DownloadOrchestrator::new(
        UrlClassifier::new(),
        FetchEngine::new(reqwest::Client::new()),
        FetchLimits { max_bytes, timeout },
        work_dir,
    )
}

/// Everything the front end was asked to do, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Notify(StateKind),
    File { bytes: u64, caption: String },
    Failure(String),
}

/// Adapter that records calls and can be told to fail
#[derive(Default)]
pub struct RecordingAdapter {
    events: Mutex<Vec<Event>>,
    sent_paths: Mutex<Vec<std::path::PathBuf>>,
    fail_send: bool,
    fail_notify_on: Option<StateKind>,
}

impl RecordingAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_send() -> Self {
        Self {
            fail_send: true,
            ..Self::default()
        }
    }

    pub fn failing_notify_on(kind: StateKind) -> Self {
        Self {
            fail_notify_on: Some(kind),
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn notified(&self) -> Vec<StateKind> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Notify(kind) => Some(kind),
                _ => None,
            })
            .collect()
    }

    pub fn failures(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Failure(msg) => Some(msg),
                _ => None,
            })
            .collect()
    }

    pub fn sent_paths(&self) -> Vec<std::path::PathBuf> {
        self.sent_paths.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatAdapter for RecordingAdapter {
    async fn notify(&self, _request_id: RequestId, state: &State) -> Result<(), AdapterError> {
        self.events.lock().unwrap().push(Event::Notify(state.kind()));
        if self.fail_notify_on == Some(state.kind()) {
            return Err(AdapterError::Other("chat unavailable".to_string()));
        }
        Ok(())
    }

    async fn send_file(
        &self,
        _request_id: RequestId,
        path: &Path,
        caption: &str,
    ) -> Result<(), AdapterError> {
        let bytes = tokio::fs::metadata(path).await?.len();
        self.sent_paths.lock().unwrap().push(path.to_path_buf());
        self.events.lock().unwrap().push(Event::File {
            bytes,
            caption: caption.to_string(),
        });
        if self.fail_send {
            return Err(AdapterError::Other("upload rejected".to_string()));
        }
        Ok(())
    }

    async fn send_failure(&self, _request_id: RequestId, message: &str) -> Result<(), AdapterError> {
        self.events
            .lock()
            .unwrap()
            .push(Event::Failure(message.to_string()));
        Ok(())
    }
}

pub fn is_empty_dir(dir: &Path) -> bool {
    match std::fs::read_dir(dir) {
        Ok(mut entries) => entries.next().is_none(),
        Err(_) => true,
    }
}

/// Serves `chunks` chunks of `chunk_size` bytes with `Transfer-Encoding: chunked`,
/// so no Content-Length is sent. With `stall` the body never finishes.
pub async fn chunked_server(chunk_size: usize, chunks: usize, stall: bool) -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut head = Vec::new();
                let mut buf = [0u8; 4096];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => head.extend_from_slice(&buf[..n]),
                    }
                }

                let preamble = "HTTP/1.1 200 OK\r\ncontent-type: video/mp4\r\ntransfer-encoding: chunked\r\n\r\n";
                if socket.write_all(preamble.as_bytes()).await.is_err() {
                    return;
                }
                let data = vec![7u8; chunk_size];
                for _ in 0..chunks {
                    let size_line = format!("{:x}\r\n", chunk_size);
                    let frame = [size_line.as_bytes(), &data[..], &b"\r\n"[..]].concat();
                    if socket.write_all(&frame).await.is_err() {
                        return;
                    }
                }
                if stall {
                    let _ = socket.flush().await;
                    tokio::time::sleep(Duration::from_secs(60)).await;
                } else {
                    let _ = socket.write_all(b"0\r\n\r\n").await;
                }
            });
        }
    });

    format!("http://{}/v.mp4", addr)
}
