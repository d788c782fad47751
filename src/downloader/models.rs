// Data carried through one download request

use std::fmt;
use std::path::{Path, PathBuf};

use uuid::Uuid;

/// Opaque per-request token, also used to keep transient file names unique
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Short form used in file names
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..12].to_string()
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Inbound URL as received from the chat front end
#[derive(Debug, Clone)]
pub struct MediaRequest {
    raw_url: String,
    classified: bool,
    request_id: RequestId,
}

impl MediaRequest {
    pub fn new(raw_url: impl Into<String>) -> Self {
        Self {
            raw_url: raw_url.into().trim().to_string(),
            classified: false,
            request_id: RequestId::new(),
        }
    }

    pub fn raw_url(&self) -> &str {
        &self.raw_url
    }

    pub fn is_classified(&self) -> bool {
        self.classified
    }

    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Record that the classifier accepted the URL. Later calls are no-ops.
    pub(crate) fn mark_classified(&mut self) {
        self.classified = true;
    }
}

/// Direct media location returned by an extraction backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMedia {
    pub direct_url: String,
    pub suggested_id: String,
    pub suggested_filename: String,
    pub title: Option<String>,
    /// Name of the backend that produced this resolution
    pub backend: &'static str,
    /// Request headers the media host expects (Referer, User-Agent, Cookie)
    pub http_headers: Vec<(String, String)>,
}

impl ResolvedMedia {
    /// Build a resolution, deriving the file name from the (sanitized) id
    pub fn new(
        backend: &'static str,
        direct_url: impl Into<String>,
        suggested_id: &str,
        extension: &str,
    ) -> Self {
        let id = super::utils::sanitize_id(suggested_id);
        let ext = super::utils::sanitize_id(extension);
        let ext = if ext == "unknown" { "mp4".to_string() } else { ext };

        Self {
            direct_url: direct_url.into(),
            suggested_filename: format!("tiktok_{}.{}", id, ext),
            suggested_id: id,
            title: None,
            backend,
            http_headers: Vec::new(),
        }
    }

    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = title.filter(|t| !t.trim().is_empty());
        self
    }

    pub fn with_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.http_headers = headers;
        self
    }

    /// Request-unique destination inside `dir`: `tiktok_<id>-<request>.<ext>`
    pub fn destination_in(&self, dir: &Path, request_id: RequestId) -> PathBuf {
        let file = Path::new(&self.suggested_filename);
        let stem = file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "tiktok".to_string());
        let ext = file
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_else(|| "mp4".to_string());

        dir.join(format!("{}-{}.{}", stem, request_id.short(), ext))
    }
}

/// A fully downloaded file waiting to be handed to the front end
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResult {
    pub local_path: PathBuf,
    pub byte_size: u64,
}
