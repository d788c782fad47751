// Metadata backend - resolves media through the yt-dlp extraction tool
//
// yt-dlp is asked for JSON metadata only (`--dump-json`); the selected
// format's direct URL is then fetched by the FetchEngine, so size and time
// limits are enforced in one place.

use async_trait::async_trait;
use std::process::Command as StdCommand;
use tracing::{debug, warn};

use super::diagnostics::{diagnose_error, last_error_line, BlockingReason};
use crate::downloader::errors::ExtractionError;
use crate::downloader::models::ResolvedMedia;
use crate::downloader::traits::ExtractionBackend;
use crate::downloader::utils::{run_output_with_timeout, url_digest};

/// Default time budget for one metadata extraction
pub const METADATA_TIMEOUT_SECS: u64 = 60;

/// Same selector the bot always used: best single file under 50 MB, else best
pub const DEFAULT_FORMAT: &str = "best[filesize<50M]/best";

/// How the extraction tool is started
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum YtDlpInvocation {
    /// Native `yt-dlp` binary at the given path
    Binary(String),
    /// `<python> -m yt_dlp`
    PythonModule(String),
}

impl YtDlpInvocation {
    /// Pick an invocation from explicit settings, falling back to binary discovery
    pub fn detect(binary: Option<&str>, python: Option<&str>) -> Self {
        match (binary, python) {
            (Some(path), _) => Self::Binary(path.to_string()),
            (None, Some(py)) => Self::PythonModule(py.to_string()),
            (None, None) => Self::Binary(find_ytdlp()),
        }
    }

    fn program(&self) -> &str {
        match self {
            Self::Binary(path) => path,
            Self::PythonModule(python) => python,
        }
    }

    fn leading_args(&self) -> Vec<String> {
        match self {
            Self::Binary(_) => Vec::new(),
            Self::PythonModule(_) => vec!["-m".to_string(), "yt_dlp".to_string()],
        }
    }
}

/// Find yt-dlp binary
fn find_ytdlp() -> String {
    let common_paths = [
        "/opt/homebrew/bin/yt-dlp",
        "/usr/local/bin/yt-dlp",
        "/usr/bin/yt-dlp",
    ];

    for path in common_paths {
        if std::path::Path::new(path).exists() {
            return path.to_string();
        }
    }

    if let Ok(output) = StdCommand::new("which").arg("yt-dlp").output() {
        if output.status.success() {
            if let Ok(path) = String::from_utf8(output.stdout) {
                let trimmed = path.trim();
                if !trimmed.is_empty() {
                    return trimmed.to_string();
                }
            }
        }
    }

    "yt-dlp".to_string()
}

/// Backend that delegates to yt-dlp for metadata and direct-stream resolution
pub struct MetadataBackend {
    invocation: YtDlpInvocation,
    proxy: Option<String>,
    timeout_secs: u64,
}

impl MetadataBackend {
    pub fn new(invocation: YtDlpInvocation) -> Self {
        Self {
            invocation,
            proxy: None,
            timeout_secs: METADATA_TIMEOUT_SECS,
        }
    }

    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_secs = seconds.max(1);
        self
    }

    /// Build command arguments
    fn build_args(&self, url: &str) -> Vec<String> {
        let mut args = self.invocation.leading_args();
        args.extend(
            [
                "--dump-json",
                "--no-playlist",
                "--no-warnings",
                "--no-check-certificates",
                "--geo-bypass-country",
                "US",
                "--socket-timeout",
            ]
            .iter()
            .map(|s| s.to_string()),
        );
        args.push(self.timeout_secs.min(30).to_string());
        args.push("-f".to_string());
        args.push(DEFAULT_FORMAT.to_string());

        if let Some(proxy) = &self.proxy {
            args.push("--proxy".to_string());
            args.push(proxy.clone());
        }

        args.push(url.to_string());
        args
    }

    /// Parse `--dump-json` output into a resolution
    pub(crate) fn parse_json(
        backend: &'static str,
        url: &str,
        stdout: &[u8],
    ) -> Result<ResolvedMedia, ExtractionError> {
        let json_str = String::from_utf8_lossy(stdout);
        let json: serde_json::Value = serde_json::from_str(json_str.trim())
            .map_err(|e| ExtractionError::Parse(format!("Invalid JSON: {}", e)))?;

        let selected = Some(&json)
            .filter(|root| non_empty_str(&root["url"]).is_some())
            .or_else(|| last_format(&json["requested_formats"]))
            .or_else(|| last_format(&json["formats"]))
            .ok_or(ExtractionError::NoMediaLocation)?;
        let direct_url = non_empty_str(&selected["url"]).ok_or(ExtractionError::NoMediaLocation)?;

        // The media CDN checks these; a format's own headers win over the top-level set
        let mut headers = header_pairs(&selected["http_headers"]);
        if headers.is_empty() {
            headers = header_pairs(&json["http_headers"]);
        }

        let id = non_empty_str(&json["id"])
            .map(str::to_string)
            .unwrap_or_else(|| url_digest(url));
        let ext = non_empty_str(&selected["ext"])
            .or_else(|| non_empty_str(&json["ext"]))
            .unwrap_or("mp4");
        let title = non_empty_str(&json["title"]).map(str::to_string);

        Ok(ResolvedMedia::new(backend, direct_url, &id, ext)
            .with_title(title)
            .with_headers(headers))
    }
}

fn non_empty_str(value: &serde_json::Value) -> Option<&str> {
    value.as_str().map(str::trim).filter(|s| !s.is_empty())
}

/// Last entry with a URL that is not audio-only; yt-dlp orders formats worst to best
fn last_format(formats: &serde_json::Value) -> Option<&serde_json::Value> {
    formats.as_array()?.iter().rev().find(|f| {
        f["vcodec"].as_str() != Some("none") && non_empty_str(&f["url"]).is_some()
    })
}

/// `{"Referer": "...", ...}` as name/value pairs; non-string values are skipped
fn header_pairs(headers: &serde_json::Value) -> Vec<(String, String)> {
    headers
        .as_object()
        .map(|map| {
            map.iter()
                .filter_map(|(name, value)| Some((name.clone(), value.as_str()?.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl ExtractionBackend for MetadataBackend {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn resolve(&self, url: &str) -> Result<ResolvedMedia, ExtractionError> {
        let args = self.build_args(url);
        debug!(program = self.invocation.program(), args = %args.join(" "), "running extraction tool");

        let output =
            run_output_with_timeout(self.invocation.program(), args, self.timeout_secs).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = diagnose_error(&stderr).unwrap_or(BlockingReason::Unknown);
            let message = last_error_line(&stderr);
            warn!(
                backend = self.name(),
                %reason,
                fallback_useful = reason.other_backend_might_help(),
                permanent = reason.is_permanent(),
                "extraction tool failed: {}",
                message
            );
            return Err(ExtractionError::Rejected { reason, message });
        }

        Self::parse_json(self.name(), url, &output.stdout)
    }
}
