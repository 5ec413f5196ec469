//! Feed connection configuration.

use crate::FeedError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Public endpoint of the Bitfinex v2 websocket API.
pub const BITFINEX_WS_URL: &str = "wss://api.bitfinex.com/ws/2";

/// Configuration for the account feed connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// WebSocket URL
    pub ws_url: String,
    /// Reconnect when no heartbeat arrived within this window (ms)
    pub heartbeat_timeout_ms: u64,
    /// Connection timeout (ms)
    pub connect_timeout_ms: u64,
    /// Capacity of the frame channel between transport and dispatcher
    pub channel_capacity: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            ws_url: BITFINEX_WS_URL.to_string(),
            heartbeat_timeout_ms: 15_000,
            connect_timeout_ms: 10_000,
            channel_capacity: 1000,
        }
    }
}

impl FeedConfig {
    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_millis(self.heartbeat_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Check the URL scheme and that the timers are usable.
    pub fn validate(&self) -> Result<(), FeedError> {
        let url = url::Url::parse(&self.ws_url)?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(FeedError::InvalidConfig(format!(
                "expected ws:// or wss:// URL, got {}",
                self.ws_url
            )));
        }
        if self.heartbeat_timeout_ms == 0 {
            return Err(FeedError::InvalidConfig(
                "heartbeat_timeout_ms must be positive".to_string(),
            ));
        }
        if self.channel_capacity == 0 {
            return Err(FeedError::InvalidConfig(
                "channel_capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// API key pair for the authenticated channel.
#[derive(Clone, Default)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.api_key.is_empty() || self.api_secret.is_empty()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key.chars().take(6).collect::<String>())
            .field("api_secret", &"<redacted>")
            .finish()
    }
}
