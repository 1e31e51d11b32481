use tracing_subscriber::{EnvFilter, fmt};
use tracing::info;

use presetd::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))?;
    fmt().with_env_filter(filter).init();

    let args: Vec<String> = std::env::args().collect();
    let cfg = ServerConfig::from_env_and_args(&args);

    // Startup banner at info level so something always prints at default verbosity
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    info!(
        target: "presetd",
        "presetd starting: RUST_LOG='{}', http_port={}, data_root='{}', content_root='{}'",
        rust_log, cfg.http_port, cfg.data_root.display(), cfg.content_root.display()
    );

    presetd::server::run(cfg).await
}
