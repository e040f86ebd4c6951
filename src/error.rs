//! Error handling

use std::time::Duration;

use thiserror::Error;

pub type StreamResult<T> = Result<T, StreamError>;

#[derive(Debug, Error)]
pub enum StreamError {
    // Configuration errors
    #[error("Invalid stream endpoint '{0}': expected a ws:// URL")]
    InvalidEndpoint(String),

    // Connection errors
    #[error("Failed to connect to {endpoint}: {reason}")]
    ConnectFailed { endpoint: String, reason: String },

    #[error("Handshake with {endpoint} timed out after {timeout:?}")]
    ConnectTimeout { endpoint: String, timeout: Duration },

    #[error("Transport error: {0}")]
    Transport(String),

    // Payload errors
    #[error("Malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Malformed frame: expected a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("Malformed frame: binary payload is not valid UTF-8")]
    NotUtf8,
}

impl StreamError {
    /// Whether the error concerns a single frame rather than the connection
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            StreamError::Malformed(_) | StreamError::NotAnObject(_) | StreamError::NotUtf8
        )
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for StreamError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        StreamError::Transport(err.to_string())
    }
}
