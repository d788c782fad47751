use tiktok_downloader_lib::config::Config;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| {
            "tiktok_downloader=info,tiktok_downloader_lib=info".to_string()
        }))
        .with_writer(std::io::stderr)
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(error) => {
            eprintln!("Configuration error: {}", error);
            std::process::exit(2);
        }
    };

    if let Err(error) = tiktok_downloader_lib::run(config).await {
        eprintln!("Fatal error: {}", error);
        std::process::exit(1);
    }
}
