//! Mercury - scan-then-poll fraud status monitor
//!
//! Reads decoded codes, fetches the JSON status each one points at, and keeps
//! refreshing it on a fixed period until the scanner is re-armed.

pub mod client;
pub mod config;
pub mod display;
pub mod engine;
pub mod error;
pub mod io;
pub mod monitor;
pub mod payload;
pub mod scanner;
pub mod timer;

pub use config::{load_config, Config};
pub use engine::{Engine, MonitorHandle};
pub use error::{MercuryError, Result};
pub use monitor::{MonitorState, StatusMonitor};
pub use payload::{ScanResult, StatusPayload};

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::client::StatusClient;
use crate::display::Banner;
use crate::io::ReqwestHttpClient;
use crate::scanner::{LineScanner, ScannerAction};

/// Run the mercury service with the given configuration.
///
/// `initial` is decoded before any scanner input is read. Codes are then read
/// line by line from stdin; once stdin closes, the current session keeps
/// polling until Ctrl-C.
pub async fn run(config: Config, initial: Option<ScanResult>) -> Result<()> {
    config.validate()?;

    let http: Arc<dyn io::HttpClient> = Arc::new(ReqwestHttpClient::default());
    let cancel = CancellationToken::new();

    let (engine, handle) = Engine::new(
        StatusClient::new(http),
        config.polling_interval(),
        cancel.clone(),
    );
    let engine_task = tokio::spawn(engine.run());

    // Setup shutdown handler
    let cancel_for_signal = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {}", e);
        } else {
            tracing::info!("Shutdown signal received");
        }
        cancel_for_signal.cancel();
    });

    tokio::spawn(render_states(handle.subscribe(), cancel.clone()));

    let mut scanner = LineScanner::new(config.rescan_command.clone());
    if let Some(code) = initial {
        if let ScannerAction::Decode(result) = scanner.feed(code.as_str()) {
            tracing::info!("Decoding {} from command line", result);
            handle.code_decoded(result)?;
        }
    }

    tracing::info!("Mercury started, waiting for scans");

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    if let Err(e) = scanner::run_scanner(stdin, scanner, handle.clone(), cancel.clone()).await {
        tracing::error!("Scanner input failed: {}", e);
        cancel.cancel();
        if let Err(join_err) = join_engine(engine_task).await {
            tracing::error!("{}", join_err);
        }
        return Err(e);
    }

    cancel.cancelled().await;
    join_engine(engine_task).await?;
    tracing::info!("Mercury stopped");

    Ok(())
}

async fn join_engine(task: JoinHandle<()>) -> Result<()> {
    task.await
        .map_err(|e| MercuryError::Engine(format!("engine task failed: {}", e)))
}

/// Print a banner for the current state and for every change after it
async fn render_states(mut states: watch::Receiver<MonitorState>, cancel: CancellationToken) {
    let banner = Banner::from(&*states.borrow_and_update());
    println!("{}", banner);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let banner = Banner::from(&*states.borrow_and_update());
                println!("{}", banner);
            }
        }
    }
}
