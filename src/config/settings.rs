use std::time::Duration;

use serde::Deserialize;

/// Top-level configuration settings for the client.
///
/// Includes settings for the broker connection and for the logging sink.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    pub bridge: BridgeSettings,
    pub logging: LoggingSettings,
}

/// Where the broker lives and how the connection lifecycle is paced.
#[derive(Debug, Deserialize, Clone)]
pub struct BridgeSettings {
    pub host: String,
    pub port: u16,
    pub scheme: String,
    /// Upper bound on the Connecting state.
    pub connect_timeout_ms: u64,
    /// Pause between a dropped connection and the next dial; `0` re-dials immediately.
    pub reconnect_delay_ms: u64,
    /// How long a local close waits for the peer's close handshake.
    pub close_timeout_ms: u64,
}

impl BridgeSettings {
    /// The broker endpoint, e.g. `ws://localhost:9090`.
    pub fn url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn close_timeout(&self) -> Duration {
        Duration::from_millis(self.close_timeout_ms)
    }
}

/// Configuration of the logging sink handed to the bridge.
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    pub enabled: bool,
    pub level: String,
}

/// Partial configuration settings loaded from files or environment.
///
/// Settings given only in part. Missing values are filled from defaults.
#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub bridge: Option<PartialBridgeSettings>,
    pub logging: Option<PartialLoggingSettings>,
}

#[derive(Debug, Deserialize)]
pub struct PartialBridgeSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub scheme: Option<String>,
    pub connect_timeout_ms: Option<u64>,
    pub reconnect_delay_ms: Option<u64>,
    pub close_timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct PartialLoggingSettings {
    pub enabled: Option<bool>,
    pub level: Option<String>,
}

/// Defaults point at a rosbridge server on the local machine.
impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 9090,
            scheme: "ws".to_string(),
            connect_timeout_ms: 5000,
            reconnect_delay_ms: 1000,
            close_timeout_ms: 2000,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
        }
    }
}

impl PartialBridgeSettings {
    pub(crate) fn merge_over(self, default: BridgeSettings) -> BridgeSettings {
        BridgeSettings {
            host: self.host.unwrap_or(default.host),
            port: self.port.unwrap_or(default.port),
            scheme: self.scheme.unwrap_or(default.scheme),
            connect_timeout_ms: self
                .connect_timeout_ms
                .unwrap_or(default.connect_timeout_ms),
            reconnect_delay_ms: self
                .reconnect_delay_ms
                .unwrap_or(default.reconnect_delay_ms),
            close_timeout_ms: self.close_timeout_ms.unwrap_or(default.close_timeout_ms),
        }
    }
}

impl PartialLoggingSettings {
    pub(crate) fn merge_over(self, default: LoggingSettings) -> LoggingSettings {
        LoggingSettings {
            enabled: self.enabled.unwrap_or(default.enabled),
            level: self.level.unwrap_or(default.level),
        }
    }
}
