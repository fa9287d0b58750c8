//! Runtime configuration: JSON file defaults overridden by CLI flags.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::latency::{LatencyThresholds, DEFAULT_WINDOW};

/// Dashboard settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashConfig {
    /// Base HTTP URL of the backend, e.g. `http://192.168.1.10:5000`.
    pub backend_url: String,
    /// Number of latency samples kept for the chart.
    pub window: usize,
    pub thresholds: LatencyThresholds,
    /// Address of the embedded web UI.
    pub bind: String,
    pub reconnect_delay_secs: u64,
    /// Auto-refresh period of the HTML page.
    pub refresh_secs: u64,
}

impl Default for DashConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://127.0.0.1:5000".into(),
            window: DEFAULT_WINDOW,
            thresholds: LatencyThresholds::default(),
            bind: "127.0.0.1:8080".into(),
            reconnect_delay_secs: 5,
            refresh_secs: 2,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in config: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("config validation failed: {0}")]
    ValidationFailed(String),
}

impl DashConfig {
    /// Load settings from a JSON file; missing keys keep their defaults.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: DashConfig = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window == 0 {
            return Err(ConfigError::ValidationFailed(
                "window must hold at least one sample".into(),
            ));
        }
        if self.thresholds.good_below_ms >= self.thresholds.degraded_below_ms {
            return Err(ConfigError::ValidationFailed(format!(
                "good_below_ms ({}) must be lower than degraded_below_ms ({})",
                self.thresholds.good_below_ms, self.thresholds.degraded_below_ms
            )));
        }
        if !(self.backend_url.starts_with("http://") || self.backend_url.starts_with("https://")) {
            return Err(ConfigError::ValidationFailed(format!(
                "backend_url must be an http(s) URL: {}",
                self.backend_url
            )));
        }
        Ok(())
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }

    /// `GET` endpoint serving [`SystemInfo`](crate::types::SystemInfo).
    pub fn system_info_url(&self) -> String {
        format!("{}/system_info", self.backend_url.trim_end_matches('/'))
    }

    /// Socket.IO WebSocket endpoint derived from the backend URL.
    pub fn socket_url(&self) -> String {
        let base = self.backend_url.trim_end_matches('/');
        let ws_base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            base.to_string()
        };
        format!("{ws_base}/socket.io/?EIO=4&transport=websocket")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = DashConfig::from_json_str(r#"{"window": 10}"#).unwrap();
        assert_eq!(cfg.window, 10);
        assert_eq!(cfg.thresholds, LatencyThresholds::default());
        assert_eq!(cfg.bind, "127.0.0.1:8080");
    }

    #[test]
    fn inverted_thresholds_rejected() {
        let err = DashConfig::from_json_str(
            r#"{"thresholds": {"good_below_ms": 300, "degraded_below_ms": 200}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::ValidationFailed(_)));
    }

    #[test]
    fn zero_window_rejected() {
        assert!(DashConfig::from_json_str(r#"{"window": 0}"#).is_err());
    }

    #[test]
    fn derived_urls() {
        let cfg = DashConfig {
            backend_url: "https://dash.lan:5000/".into(),
            ..Default::default()
        };
        assert_eq!(cfg.system_info_url(), "https://dash.lan:5000/system_info");
        assert_eq!(
            cfg.socket_url(),
            "wss://dash.lan:5000/socket.io/?EIO=4&transport=websocket"
        );
    }
}
