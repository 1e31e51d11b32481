//!
//! presetd server binary
//! ---------------------
//! Command-line entry point for the preset store HTTP server. Supports
//! configuration via CLI flags and environment variables.

use anyhow::Result;
use std::env;

use presetd::config::{has_flag, ServerConfig, USAGE};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber with env filter if provided
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let args: Vec<String> = env::args().collect();

    if has_flag(&args, "--help") || has_flag(&args, "-h") {
        println!("{}", USAGE);
        return Ok(());
    }

    let cfg = ServerConfig::from_env_and_args(&args);
    println!(
        "presetd starting: http={}, data_root={}, content_root={}",
        cfg.http_port,
        cfg.data_root.display(),
        cfg.content_root.display()
    );
    tracing::info!("Using port: http={}, data_root={}", cfg.http_port, cfg.data_root.display());
    presetd::server::run(cfg).await
}
