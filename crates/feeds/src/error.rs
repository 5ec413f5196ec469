//! Error types for feed operations.

use thiserror::Error;

/// Errors that can occur while talking to the account feed.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("WebSocket connection failed: {0}")]
    ConnectionFailed(String),

    #[error("WebSocket disconnected: {0}")]
    Disconnected(String),

    #[error("Failed to parse message: {0}")]
    ParseError(String),

    #[error("Malformed '{tag}' payload: {reason}")]
    MalformedPayload { tag: String, reason: String },

    #[error("Unknown info code: {0}")]
    UnknownInfoCode(i64),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

}

impl From<tokio_tungstenite::tungstenite::Error> for FeedError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        FeedError::ConnectionFailed(err.to_string())
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(err: serde_json::Error) -> Self {
        FeedError::ParseError(err.to_string())
    }
}

impl From<url::ParseError> for FeedError {
    fn from(err: url::ParseError) -> Self {
        FeedError::InvalidConfig(err.to_string())
    }
}

impl FeedError {
    pub(crate) fn malformed(tag: &str, reason: impl Into<String>) -> Self {
        FeedError::MalformedPayload {
            tag: tag.to_string(),
            reason: reason.into(),
        }
    }

    /// Returns true if the error only concerns a single frame.
    /// The connection stays up and later frames are processed normally.
    pub fn is_frame_scoped(&self) -> bool {
        matches!(
            self,
            FeedError::ParseError(_)
                | FeedError::MalformedPayload { .. }
                | FeedError::UnknownInfoCode(_)
        )
    }
}
