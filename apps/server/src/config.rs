//! Application configuration.

use bfxgram_feeds::{Credentials, FeedConfig, FeedError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid feed settings: {0}")]
    Feed(#[from] FeedError),

    #[error("Missing environment variable {0}")]
    MissingEnv(&'static str),
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Account feed settings.
    pub feed: FeedConfig,
    /// SQLite URL of the chat preference store.
    pub database_url: String,
    /// Capacity of the channel between the dispatcher and the notifier.
    pub delivery_capacity: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            feed: FeedConfig::default(),
            database_url: "sqlite:bfxgram.db".to_string(),
            delivery_capacity: 256,
        }
    }
}

impl AppConfig {
    /// Load the config file, or the defaults when it does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Io {
                path: path.display().to_string(),
                source,
            }),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.feed.validate()?;
        Ok(())
    }
}

/// Secrets read from the environment (or `.env`).
#[derive(Clone)]
pub struct Secrets {
    pub telegram_token: String,
    pub auth_pass: String,
    pub credentials: Credentials,
}

impl Secrets {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Empty values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &'static str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or(ConfigError::MissingEnv(key))
        };

        Ok(Self {
            telegram_token: require("TELEGRAM_TOKEN")?,
            auth_pass: require("AUTH_PASS")?,
            credentials: Credentials::new(
                require("BFX_TELEGRAM_KEY")?,
                require("BFX_TELEGRAM_SECRET")?,
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();
        assert_eq!(config.feed.heartbeat_timeout_ms, 15_000);
        assert_eq!(config.database_url, "sqlite:bfxgram.db");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"feed": {"heartbeat_timeout_ms": 5000}}"#).unwrap();
        assert_eq!(config.feed.heartbeat_timeout_ms, 5000);
        assert_eq!(config.feed.ws_url, "wss://api.bitfinex.com/ws/2");
        assert_eq!(config.delivery_capacity, 256);
    }

    #[test]
    fn test_invalid_feed_url_rejected() {
        let mut config = AppConfig::default();
        config.feed.ws_url = "https://api.bitfinex.com/ws/2".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Feed(_))));
    }

    #[test]
    fn test_missing_config_file_gives_defaults() {
        let config = AppConfig::load("/nonexistent/bfxgram.json").unwrap();
        assert_eq!(config.delivery_capacity, AppConfig::default().delivery_capacity);
    }

    #[test]
    fn test_secrets_from_lookup() {
        let env: HashMap<&str, &str> = [
            ("TELEGRAM_TOKEN", "123:abc"),
            ("AUTH_PASS", "hunter2"),
            ("BFX_TELEGRAM_KEY", "key"),
            ("BFX_TELEGRAM_SECRET", "secret"),
        ]
        .into_iter()
        .collect();

        let secrets = Secrets::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(secrets.telegram_token, "123:abc");
        assert_eq!(secrets.auth_pass, "hunter2");
        assert_eq!(secrets.credentials.api_key, "key");
        assert_eq!(secrets.credentials.api_secret, "secret");
    }

    #[test]
    fn test_secrets_empty_value_is_missing() {
        let result = Secrets::from_lookup(|k| match k {
            "AUTH_PASS" => Some("  ".to_string()),
            _ => Some("x".to_string()),
        });
        assert!(matches!(result, Err(ConfigError::MissingEnv("AUTH_PASS"))));
    }
}
