//! Configuration module

use std::env;
use std::time::Duration;

use crate::error::{StreamError, StreamResult};

/// Default intrusion event stream (local detection backend)
pub const DEFAULT_STREAM_URL: &str = "ws://127.0.0.1:8000/ws";

/// Default capacity of the connector -> session queue
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Default WebSocket handshake timeout (seconds)
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// WebSocket endpoint emitting intrusion events
    pub stream_url: String,

    /// Capacity of the hand-off queue between connector and session
    pub queue_capacity: usize,

    /// Handshake timeout in seconds
    pub connect_timeout_secs: u64,

    /// Emit logs as JSON lines instead of text
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            stream_url: DEFAULT_STREAM_URL.to_string(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            log_json: false,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            stream_url: env::var("ALERT_STREAM_URL")
                .unwrap_or_else(|_| DEFAULT_STREAM_URL.to_string()),

            queue_capacity: env::var("ALERT_QUEUE_CAPACITY")
                .ok()
                .and_then(|c| c.parse::<usize>().ok())
                .filter(|c| *c > 0)
                .unwrap_or(DEFAULT_QUEUE_CAPACITY),

            connect_timeout_secs: env::var("ALERT_CONNECT_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),

            log_json: env::var("LOG_FORMAT")
                .map(|f| f.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
        }
    }

    /// Build a config pointing at a specific endpoint, other values default
    pub fn with_endpoint(stream_url: impl Into<String>) -> Self {
        Self {
            stream_url: stream_url.into(),
            ..Self::default()
        }
    }

    /// Reject endpoints this build cannot connect to. Only plain `ws://` is
    /// supported; the client is built without TLS.
    pub fn validate(&self) -> StreamResult<()> {
        let rest = self
            .stream_url
            .trim()
            .strip_prefix("ws://")
            .ok_or_else(|| StreamError::InvalidEndpoint(self.stream_url.clone()))?;

        if rest.is_empty() || rest.starts_with('/') {
            return Err(StreamError::InvalidEndpoint(self.stream_url.clone()));
        }

        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}
