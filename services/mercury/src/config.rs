//! Configuration types for the mercury service

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Refresh period once a status has been fetched
    #[serde(default = "default_polling_interval")]
    pub polling_interval_ms: u64,
    /// Line that re-arms the scanner and resets the monitor
    #[serde(default = "default_rescan_command")]
    pub rescan_command: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            polling_interval_ms: default_polling_interval(),
            rescan_command: default_rescan_command(),
        }
    }
}

impl Config {
    pub fn polling_interval(&self) -> Duration {
        Duration::from_millis(self.polling_interval_ms)
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.polling_interval_ms == 0 {
            return Err(crate::MercuryError::Config(
                "polling_interval_ms must be greater than 0".to_string(),
            ));
        }
        if self.rescan_command.trim().is_empty() {
            return Err(crate::MercuryError::Config(
                "rescan_command must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_polling_interval() -> u64 {
    15_000
}

fn default_rescan_command() -> String {
    "rescan".to_string()
}

/// Load configuration from a JSON file
pub fn load_config(path: &Path) -> crate::Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        crate::MercuryError::Config(format!("Failed to read config file {:?}: {}", path, e))
    })?;
    let config: Config = serde_json::from_str(&content)?;
    Ok(config)
}
