//! Configuration for the relay bridge engine
//!
//! Handles configuration loading and validation. Defaults match the relay
//! network's wire constants; the port and reconnect delay are configurable
//! so tests can run against ephemeral scripted peers.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::network::frame::DEFAULT_PORT;

/// Logging configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log filter, e.g. "info" or "relay_bridge=debug" (RUST_LOG wins)
    pub filter: Option<String>,

    /// Emit JSON log lines (requires the `json-logging` feature)
    #[serde(default)]
    pub json_format: bool,
}

/// Relay client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Relay node host name or address
    pub server: String,

    /// Relay node TCP port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Delay before re-dialing a lost connection, in milliseconds
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    /// Logging configuration
    pub logging: Option<LoggingConfig>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_reconnect_delay_ms() -> u64 {
    1_000
}

impl RelayConfig {
    /// Configuration pointing at `server` with protocol defaults everywhere
    /// else.
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            port: default_port(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            logging: None,
        }
    }

    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config = toml::from_str(&raw)?;
        Ok(config)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}
