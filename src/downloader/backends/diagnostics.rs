// Extraction diagnostics - classifies yt-dlp failures
//
// The classification only feeds logs and `ExtractionError::Rejected`; users
// never see the raw tool output.

use std::fmt;

use regex::Regex;

lazy_static::lazy_static! {
    static ref HTTP_ERROR_RE: Regex = Regex::new(r"(?i)HTTP Error (\d{3})").unwrap();
}

/// Reasons why an extraction tool might refuse a video
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockingReason {
    /// HTTP 403 Forbidden from the platform
    Http403Forbidden,

    /// Rate limiting (429 or similar)
    RateLimited,

    /// Video not available in the server's region
    GeoBlocked,

    /// Private video, or account-only content
    PrivateVideo,

    /// Video deleted or otherwise gone
    VideoUnavailable,

    /// Tool does not recognise the URL
    UnsupportedUrl,

    /// Login or cookies required
    LoginRequired,

    /// Network timeout or connection failure
    NetworkTimeout,

    /// Generic/unknown failure
    Unknown,
}

impl BlockingReason {
    /// Another backend has a realistic chance where this one failed
    pub fn other_backend_might_help(&self) -> bool {
        matches!(
            self,
            Self::Http403Forbidden
                | Self::RateLimited
                | Self::GeoBlocked
                | Self::NetworkTimeout
                | Self::UnsupportedUrl
                | Self::Unknown
        )
    }

    /// Permanent restriction, no backend can work around it
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::PrivateVideo | Self::VideoUnavailable)
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Http403Forbidden => "access denied (HTTP 403)",
            Self::RateLimited => "rate limited",
            Self::GeoBlocked => "region-restricted",
            Self::PrivateVideo => "private video",
            Self::VideoUnavailable => "video unavailable",
            Self::UnsupportedUrl => "unsupported URL",
            Self::LoginRequired => "login required",
            Self::NetworkTimeout => "network timeout",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for BlockingReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Analyze tool output and return the blocking reason; `None` for empty output
pub fn diagnose_error(error: &str) -> Option<BlockingReason> {
    if error.trim().is_empty() {
        return None;
    }

    let lower = error.to_lowercase();

    if lower.contains("private video")
        || lower.contains("video is private")
        || lower.contains("this account is private")
    {
        return Some(BlockingReason::PrivateVideo);
    }

    if lower.contains("video unavailable")
        || lower.contains("video is unavailable")
        || lower.contains("video has been removed")
        || lower.contains("video currently unavailable")
        || lower.contains("http error 404")
    {
        return Some(BlockingReason::VideoUnavailable);
    }

    if lower.contains("not available in your country")
        || lower.contains("not available in your region")
        || lower.contains("geo restriction")
        || lower.contains("geo-restricted")
    {
        return Some(BlockingReason::GeoBlocked);
    }

    if lower.contains("unsupported url") {
        return Some(BlockingReason::UnsupportedUrl);
    }

    if lower.contains("log in")
        || lower.contains("login required")
        || lower.contains("use --cookies")
    {
        return Some(BlockingReason::LoginRequired);
    }

    if let Some(status) = http_status(error) {
        match status {
            429 => return Some(BlockingReason::RateLimited),
            403 => return Some(BlockingReason::Http403Forbidden),
            _ => {}
        }
    }

    if lower.contains("rate limit") || lower.contains("too many requests") {
        return Some(BlockingReason::RateLimited);
    }

    if lower.contains("timed out")
        || lower.contains("timeout")
        || lower.contains("connection refused")
        || lower.contains("network is unreachable")
    {
        return Some(BlockingReason::NetworkTimeout);
    }

    Some(BlockingReason::Unknown)
}

/// HTTP status embedded in an `HTTP Error NNN` message
pub fn http_status(error: &str) -> Option<u16> {
    HTTP_ERROR_RE
        .captures(error)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Last non-empty line of tool output, which is where yt-dlp puts the error
pub fn last_error_line(stderr: &str) -> String {
    stderr
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .next_back()
        .unwrap_or("extraction tool failed without output")
        .to_string()
}
