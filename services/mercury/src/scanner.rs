//! Line-oriented code scanner input
//!
//! A hardware scanner in keyboard mode types one decoded code per line. The
//! scan lock lets the first code through and holds the rest back until the
//! rescan command re-arms it.

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;

use crate::engine::MonitorHandle;
use crate::payload::ScanResult;

/// The "scanned" flag: armed until a code is accepted
#[derive(Debug)]
pub struct ScanLock {
    armed: bool,
}

impl Default for ScanLock {
    fn default() -> Self {
        Self { armed: true }
    }
}

impl ScanLock {
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Accept `code` if armed, disarming the lock
    pub fn try_accept(&mut self, code: &str) -> Option<ScanResult> {
        if !self.armed {
            return None;
        }
        self.armed = false;
        Some(ScanResult::new(code))
    }

    /// Re-arm. Returns `false` if already armed.
    pub fn rearm(&mut self) -> bool {
        !std::mem::replace(&mut self.armed, true)
    }
}

/// What a line of scanner input means
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScannerAction {
    Decode(ScanResult),
    Rescan,
    Ignored,
}

/// Turns raw input lines into scanner actions
#[derive(Debug)]
pub struct LineScanner {
    lock: ScanLock,
    rescan_command: String,
}

impl LineScanner {
    pub fn new(rescan_command: impl Into<String>) -> Self {
        Self {
            lock: ScanLock::default(),
            rescan_command: rescan_command.into(),
        }
    }

    pub fn is_armed(&self) -> bool {
        self.lock.is_armed()
    }

    pub fn feed(&mut self, line: &str) -> ScannerAction {
        let line = line.trim();
        if line.is_empty() {
            return ScannerAction::Ignored;
        }

        if !self.lock.is_armed() && line == self.rescan_command {
            self.lock.rearm();
            return ScannerAction::Rescan;
        }

        // Rescan command while armed is not a URL either
        if line == self.rescan_command {
            tracing::debug!("Scanner already armed");
            return ScannerAction::Ignored;
        }

        match self.lock.try_accept(line) {
            Some(result) => ScannerAction::Decode(result),
            None => {
                tracing::debug!("Scanner locked, ignoring {:?}", line);
                ScannerAction::Ignored
            }
        }
    }
}

/// Feed lines from `reader` to the engine until EOF or cancellation
pub async fn run_scanner<R>(
    reader: R,
    mut scanner: LineScanner,
    handle: MonitorHandle,
    cancel: CancellationToken,
) -> crate::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => break,
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            tracing::debug!("Scanner input closed");
            break;
        };

        match scanner.feed(&line) {
            ScannerAction::Decode(result) => {
                tracing::info!("Scanned code: {}", result);
                handle.code_decoded(result)?;
            }
            ScannerAction::Rescan => {
                tracing::info!("Scanner re-armed");
                handle.reset()?;
            }
            ScannerAction::Ignored => {}
        }
    }
    Ok(())
}
