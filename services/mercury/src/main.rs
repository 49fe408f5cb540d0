//! Mercury CLI
//!
//! Command-line interface for the scan-then-poll fraud status monitor.

use std::path::PathBuf;

use clap::Parser;
use mercury::{load_config, Config, ScanResult};
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mercury")]
#[command(about = "Scan-then-poll fraud status monitor")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Status URL to decode at start-up instead of waiting for a scan
    #[arg(short, long)]
    url: Option<String>,

    /// Polling interval in milliseconds (overrides config file)
    #[arg(long)]
    polling_interval_ms: Option<u64>,

    /// Log level, used when RUST_LOG is not set
    #[arg(short, long, default_value = "info")]
    log_level: Level,
}

/// `RUST_LOG` wins over `--log-level` when it parses
fn log_filter(rust_log: Option<&str>, level: Level) -> EnvFilter {
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(level.as_str()))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(rust_log.as_deref(), args.log_level))
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(
        "Parsed command line arguments: config={:?}, url={:?}, polling_interval_ms={:?}, log_level={:?}",
        args.config,
        args.url,
        args.polling_interval_ms,
        args.log_level
    );

    let mut config = if let Some(config_path) = &args.config {
        tracing::debug!("Loading configuration from {:?}", config_path);
        load_config(config_path)?
    } else {
        tracing::debug!("Using default configuration");
        Config::default()
    };

    if let Some(polling_interval_ms) = args.polling_interval_ms {
        config.polling_interval_ms = polling_interval_ms;
    }

    tracing::info!("Starting mercury service");
    tracing::debug!(
        "Polling interval: {:?}, rescan command: {:?}",
        config.polling_interval(),
        config.rescan_command
    );

    mercury::run(config, args.url.map(ScanResult::from)).await?;

    Ok(())
}
