//! Banner text for whatever renders the monitor state

use std::fmt;

use serde::Serialize;

use crate::monitor::MonitorState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Ok,
    Error,
}

/// One line of user-facing status
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Banner {
    pub severity: Severity,
    pub message: String,
}

impl Banner {
    fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }
}

impl From<&MonitorState> for Banner {
    fn from(state: &MonitorState) -> Self {
        match state {
            MonitorState::Idle => Banner::new(Severity::Info, "Scan a barcode to start your job."),
            MonitorState::AwaitingFirstFetch => Banner::new(Severity::Info, "Fetching status..."),
            MonitorState::Fraud(payload) => {
                Banner::new(Severity::Error, format!("Error: {}", payload.fraud_reason()))
            }
            MonitorState::Clear(_) => Banner::new(Severity::Ok, "Dashboard Menu"),
            MonitorState::FetchError => Banner::new(Severity::Error, "Error fetching QR data"),
        }
    }
}

impl fmt::Display for Banner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            Severity::Info => "INFO",
            Severity::Ok => " OK ",
            Severity::Error => "FAIL",
        };
        write!(f, "[{}] {}", tag, self.message)
    }
}
