// Fetch engine - streams resolved media to disk under size and time limits

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use super::errors::FetchError;
use super::models::{FetchResult, ResolvedMedia};
use super::utils::TempFileGuard;

/// Size and time bounds applied to every fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchLimits {
    pub max_bytes: u64,
    pub timeout: Duration,
}

/// Streaming HTTP downloader
#[derive(Debug, Clone)]
pub struct FetchEngine {
    client: reqwest::Client,
}

impl FetchEngine {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Stream `resolved.direct_url` into `destination`.
    ///
    /// Bytes land in a `.part` sibling first and are renamed onto `destination`
    /// only once the payload is complete and within `max_bytes`. Any failure,
    /// including the overall `timeout`, removes the partial file.
    pub async fn fetch(
        &self,
        resolved: &ResolvedMedia,
        destination: &Path,
        max_bytes: u64,
        timeout: Duration,
    ) -> Result<FetchResult, FetchError> {
        let part = TempFileGuard::new(part_path(destination));
        let mut file = File::create(part.path()).await?;

        let streamed = tokio::time::timeout(
            timeout,
            self.stream_to(resolved, &mut file, max_bytes),
        )
        .await;
        drop(file);

        let written = match streamed {
            Ok(result) => result?,
            Err(_) => {
                warn!(url = %resolved.direct_url, timeout_secs = timeout.as_secs(), "download timed out");
                return Err(FetchError::TimedOut);
            }
        };

        tokio::fs::rename(part.path(), destination).await?;
        let _ = part.disarm();

        let finished = TempFileGuard::new(destination);
        let byte_size = tokio::fs::metadata(finished.path()).await?.len();
        if byte_size != written {
            warn!(written, byte_size, "size on disk differs from bytes streamed");
        }
        if byte_size > max_bytes {
            return Err(FetchError::TooLarge(byte_size));
        }

        info!(path = %destination.display(), bytes = byte_size, "download complete");
        Ok(FetchResult {
            local_path: finished.disarm(),
            byte_size,
        })
    }

    async fn stream_to(
        &self,
        resolved: &ResolvedMedia,
        file: &mut File,
        max_bytes: u64,
    ) -> Result<u64, FetchError> {
        let response = self
            .client
            .get(&resolved.direct_url)
            .headers(header_map(&resolved.http_headers))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::RemoteRejected(status.as_u16()));
        }

        if let Some(advertised) = response.content_length() {
            if advertised > max_bytes {
                debug!(advertised, max_bytes, "content-length over limit");
                return Err(FetchError::TooLarge(advertised));
            }
        }

        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            written += chunk.len() as u64;
            if written > max_bytes {
                return Err(FetchError::TooLarge(written));
            }
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        if written == 0 {
            return Err(FetchError::EmptyPayload);
        }
        Ok(written)
    }
}

/// Headers handed over by the backend; names or values reqwest rejects are dropped
fn header_map(pairs: &[(String, String)]) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in pairs {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => debug!(header = %name, "skipping invalid media header"),
        }
    }
    headers
}

/// `<destination>.part`
fn part_path(destination: &Path) -> PathBuf {
    let mut name: OsString = destination
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("download"));
    name.push(".part");
    destination.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_map_skips_invalid() {
        let headers = header_map(&[
            ("Referer".to_string(), "https://www.tiktok.com/".to_string()),
            ("Bad Name".to_string(), "x".to_string()),
            ("Cookie".to_string(), "a\nb".to_string()),
        ]);
        assert_eq!(headers.len(), 1);
        assert_eq!(headers["referer"], "https://www.tiktok.com/");
    }

    #[test]
    fn test_part_path() {
        assert_eq!(
            part_path(Path::new("/tmp/w/tiktok_1-abc.mp4")),
            PathBuf::from("/tmp/w/tiktok_1-abc.mp4.part")
        );
    }
}
