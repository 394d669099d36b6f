//! Application configuration.

use crate::error::{AppError, AppResult};
use lbwatch_monitor::MonitorConfig;
use lbwatch_stream::PriceStreamConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Live price channel configuration subset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveConfig {
    /// Whether the mark-price stream runs at all.
    #[serde(default = "default_live_enabled")]
    pub enabled: bool,
    /// Stream endpoint URL.
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    /// Base delay for reconnection backoff (ms).
    #[serde(default = "default_reconnect_base_delay_ms")]
    pub reconnect_base_delay_ms: u64,
    /// Maximum delay for reconnection backoff (ms).
    #[serde(default = "default_reconnect_max_delay_ms")]
    pub reconnect_max_delay_ms: u64,
}

fn default_live_enabled() -> bool {
    true
}

fn default_ws_url() -> String {
    "wss://fstream.binance.com/ws".to_string()
}

fn default_reconnect_base_delay_ms() -> u64 {
    1000
}

fn default_reconnect_max_delay_ms() -> u64 {
    60000
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            enabled: default_live_enabled(),
            ws_url: default_ws_url(),
            reconnect_base_delay_ms: default_reconnect_base_delay_ms(),
            reconnect_max_delay_ms: default_reconnect_max_delay_ms(),
        }
    }
}

impl From<LiveConfig> for PriceStreamConfig {
    fn from(cfg: LiveConfig) -> Self {
        Self {
            url: cfg.ws_url,
            reconnect_base_delay_ms: cfg.reconnect_base_delay_ms,
            reconnect_max_delay_ms: cfg.reconnect_max_delay_ms,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Leaderboard position endpoint URL.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Identifier to monitor. Opaque; may also arrive via `--uid`.
    #[serde(default)]
    pub uid: Option<String>,
    /// Candidate poll intervals; one is chosen at random each cycle.
    #[serde(default = "default_poll_intervals_ms")]
    pub poll_intervals_ms: Vec<u64>,
    /// Live price channel configuration.
    #[serde(default)]
    pub live: LiveConfig,
}

fn default_api_url() -> String {
    lbwatch_source::DEFAULT_API_URL.to_string()
}

fn default_poll_intervals_ms() -> Vec<u64> {
    MonitorConfig::default().poll_intervals_ms
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            uid: None,
            poll_intervals_ms: default_poll_intervals_ms(),
            live: LiveConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration, falling back to defaults when the file is
    /// missing.
    pub fn load(path: &str) -> AppResult<Self> {
        if Path::new(path).exists() {
            Self::from_file(path)
        } else {
            tracing::warn!(path, "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;

        toml::from_str(&content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }

    /// Scheduler configuration derived from this config.
    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            poll_intervals_ms: self.poll_intervals_ms.clone(),
        }
    }
}
