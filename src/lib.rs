pub mod config;
pub mod console;
pub mod downloader;

use std::sync::Arc;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use config::{Config, ConfigError};
use console::ConsoleAdapter;
use downloader::messages::{help_text, welcome_text};
use downloader::{ChatAdapter, DownloadOrchestrator, WorkerPool};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),
}

/// One line of chat input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Empty,
    /// Anything else is treated as a link to download
    Download(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let text = line.trim();
        // `/help@SomeBot` addresses a specific bot in group chats
        let command = text.split('@').next().unwrap_or(text);
        match command {
            "" => Self::Empty,
            "/start" => Self::Start,
            "/help" => Self::Help,
            _ => Self::Download(text.to_string()),
        }
    }
}

/// Read messages from stdin until EOF, one request per line
pub async fn run(config: Config) -> Result<(), AppError> {
    let orchestrator = DownloadOrchestrator::from_config(&config)?;
    let console = ConsoleAdapter::new(config.delivery_dir.clone());
    info!(
        backends = ?orchestrator.backend_names(),
        max_file_size = config.max_file_size,
        work_dir = %orchestrator.work_dir().display(),
        delivery_dir = %console.delivery_dir().display(),
        "pipeline ready"
    );

    let pool = WorkerPool::new(Arc::new(orchestrator), config.max_concurrent_downloads);
    info!(workers = pool.capacity(), "worker pool started");
    let adapter: Arc<dyn ChatAdapter> = Arc::new(console);

    println!("{}", welcome_text());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut pending = Vec::new();

    while let Some(line) = lines.next_line().await? {
        match Command::parse(&line) {
            Command::Empty => {}
            Command::Start => println!("{}", welcome_text()),
            Command::Help => println!("{}", help_text(config.max_file_size)),
            Command::Download(text) => pending.push(pool.submit(text, Arc::clone(&adapter))),
        }
    }

    info!(pending = pending.len(), "input closed, waiting for in-flight requests");
    for outcome in futures::future::join_all(pending).await {
        if let Err(e) = outcome {
            warn!(error = %e, "request task did not finish");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("/start"), Command::Start);
        assert_eq!(Command::parse("  /help\n"), Command::Help);
        assert_eq!(Command::parse("/help@TikTokSaverBot"), Command::Help);
        assert_eq!(Command::parse("   "), Command::Empty);
        assert_eq!(
            Command::parse(" https://vm.tiktok.com/ZM123/ "),
            Command::Download("https://vm.tiktok.com/ZM123/".to_string())
        );
        assert_eq!(
            Command::parse("hello there"),
            Command::Download("hello there".to_string())
        );
    }
}
