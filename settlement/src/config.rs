//! Configuration for the settlement engine

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Settlement engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Milestone store data directory
    pub milestone_data_dir: PathBuf,

    /// Actor mailbox capacity
    pub mailbox_capacity: usize,

    /// Notification buffer size (entries dropped with a warning when full)
    pub notification_buffer: usize,

    /// Wallet core configuration
    pub wallet: wallet_core::Config,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "settlement-engine".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            milestone_data_dir: PathBuf::from("./data/milestones"),
            mailbox_capacity: 1000,
            notification_buffer: 256,
            wallet: wallet_core::Config::default(),
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(dir) = std::env::var("SETTLEMENT_MILESTONE_DIR") {
            config.milestone_data_dir = PathBuf::from(dir);
        }

        if let Ok(dir) = std::env::var("WALLET_DATA_DIR") {
            config.wallet.data_dir = PathBuf::from(dir);
        }

        if let Ok(buffer) = std::env::var("SETTLEMENT_NOTIFICATION_BUFFER") {
            config.notification_buffer = buffer
                .parse()
                .map_err(|e| crate::Error::Config(format!("Bad notification buffer: {}", e)))?;
        }

        Ok(config)
    }
}
