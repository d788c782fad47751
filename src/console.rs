// Console front end - stdin/stdout stand-in for a chat bot

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::downloader::{AdapterError, ChatAdapter, RequestId, State};

/// Prints status updates and copies delivered videos into `delivery_dir`
#[derive(Debug, Clone)]
pub struct ConsoleAdapter {
    delivery_dir: PathBuf,
}

impl ConsoleAdapter {
    pub fn new(delivery_dir: impl Into<PathBuf>) -> Self {
        Self {
            delivery_dir: delivery_dir.into(),
        }
    }

    pub fn delivery_dir(&self) -> &Path {
        &self.delivery_dir
    }

    /// Where a delivered file ends up. The request prefix is stripped from
    /// the working file name so the copy reads `tiktok_<id>.<ext>`.
    fn delivery_path(&self, path: &Path) -> PathBuf {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(strip_request_suffix)
            .unwrap_or_else(|| "video.mp4".to_string());
        self.delivery_dir.join(name)
    }
}

fn strip_request_suffix(name: &str) -> String {
    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) => (stem, Some(ext)),
        None => (name, None),
    };
    let stem = stem.rsplit_once('-').map(|(head, _)| head).unwrap_or(stem);
    match ext {
        Some(ext) => format!("{}.{}", stem, ext),
        None => stem.to_string(),
    }
}

#[async_trait]
impl ChatAdapter for ConsoleAdapter {
    async fn notify(&self, request_id: RequestId, state: &State) -> Result<(), AdapterError> {
        debug!(%request_id, state = ?state.kind(), "status");
        if let Some(text) = state.status_text() {
            println!("[{}] {}", request_id.short(), text);
        }
        Ok(())
    }

    async fn send_file(
        &self,
        request_id: RequestId,
        path: &Path,
        caption: &str,
    ) -> Result<(), AdapterError> {
        tokio::fs::create_dir_all(&self.delivery_dir).await?;
        let target = self.delivery_path(path);
        let bytes = tokio::fs::copy(path, &target).await?;

        info!(%request_id, target = %target.display(), bytes, "file delivered");
        println!("[{}] ✅ Saved to {}\n{}", request_id.short(), target.display(), caption);
        Ok(())
    }

    async fn send_failure(&self, request_id: RequestId, message: &str) -> Result<(), AdapterError> {
        println!("[{}] {}", request_id.short(), message);
        Ok(())
    }
}
