// Process configuration, read once at startup

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::downloader::backends::rapidapi::DEFAULT_API_HOST;
use crate::downloader::FetchLimits;

pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;
pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_MAX_CONCURRENT_DOWNLOADS: usize = 3;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// RapidAPI credentials; the key is never printed
#[derive(Clone)]
pub struct RapidApiCredentials {
    pub api_key: String,
    pub api_host: String,
}

impl fmt::Debug for RapidApiCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RapidApiCredentials")
            .field("api_key", &"<redacted>")
            .field("api_host", &self.api_host)
            .finish()
    }
}

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Largest file that will be delivered, in bytes
    pub max_file_size: u64,
    /// Overall budget for one media download
    pub download_timeout: Duration,
    /// Where transient downloads live
    pub work_dir: PathBuf,
    /// Worker pool size
    pub max_concurrent_downloads: usize,
    /// HTTP or SOCKS5 proxy for every outbound call
    pub proxy: Option<String>,
    pub rapidapi: Option<RapidApiCredentials>,
    /// Explicit yt-dlp binary
    pub ytdlp_path: Option<String>,
    /// Python interpreter for `-m yt_dlp`
    pub ytdlp_python: Option<String>,
    /// Console front end copies delivered files here
    pub delivery_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            download_timeout: Duration::from_secs(DEFAULT_DOWNLOAD_TIMEOUT_SECS),
            work_dir: std::env::temp_dir().join("tiktok-downloader"),
            max_concurrent_downloads: DEFAULT_MAX_CONCURRENT_DOWNLOADS,
            proxy: None,
            rapidapi: None,
            ytdlp_path: None,
            ytdlp_python: None,
            delivery_dir: dirs::download_dir().unwrap_or_else(|| PathBuf::from(".")),
        }
    }
}

impl Config {
    /// Read the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset or blank keys keep their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(v) = get("MAX_FILE_SIZE") {
            config.max_file_size = parse_positive("MAX_FILE_SIZE", &v)?;
        }
        if let Some(v) = get("DOWNLOAD_TIMEOUT") {
            config.download_timeout = Duration::from_secs(parse_positive("DOWNLOAD_TIMEOUT", &v)?);
        }
        if let Some(v) = get("MAX_CONCURRENT_DOWNLOADS") {
            config.max_concurrent_downloads = parse_positive("MAX_CONCURRENT_DOWNLOADS", &v)? as usize;
        }
        if let Some(v) = get("DOWNLOAD_DIR") {
            config.work_dir = PathBuf::from(v);
        }
        if let Some(v) = get("DELIVERY_DIR") {
            config.delivery_dir = PathBuf::from(v);
        }

        config.proxy = get("DOWNLOAD_PROXY");
        config.ytdlp_path = get("YTDLP_PATH");
        config.ytdlp_python = get("YTDLP_PYTHON");
        config.rapidapi = get("RAPIDAPI_KEY").map(|api_key| RapidApiCredentials {
            api_key,
            api_host: get("RAPIDAPI_HOST").unwrap_or_else(|| DEFAULT_API_HOST.to_string()),
        });

        Ok(config)
    }

    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    pub fn with_download_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout = timeout;
        self
    }

    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = dir.into();
        self
    }

    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn with_rapidapi(mut self, api_key: impl Into<String>, api_host: impl Into<String>) -> Self {
        self.rapidapi = Some(RapidApiCredentials {
            api_key: api_key.into(),
            api_host: api_host.into(),
        });
        self
    }

    pub fn fetch_limits(&self) -> FetchLimits {
        FetchLimits {
            max_bytes: self.max_file_size,
            timeout: self.download_timeout,
        }
    }

    /// Shared HTTP client, routed through the proxy when one is configured
    pub fn http_client(&self) -> Result<reqwest::Client, ConfigError> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(15))
            .user_agent(concat!("tiktok-downloader/", env!("CARGO_PKG_VERSION")));

        if let Some(proxy) = &self.proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy.as_str())?);
        }

        Ok(builder.build()?)
    }
}

fn parse_positive(key: &'static str, value: &str) -> Result<u64, ConfigError> {
    match value.parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
        }),
    }
}
