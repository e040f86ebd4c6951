//! Stream Connector
//!
//! Owns one WebSocket connection to the detection backend. [`start`] spawns
//! the connection task and returns at once; the task decodes every inbound
//! frame and hands it to the session through a single-producer queue.
//!
//! ```text
//!   backend ──ws──▶ connection task ──mpsc──▶ session loop ──▶ AlertLog
//!                    (decode, drop malformed)   (single writer)
//! ```
//!
//! There is no reconnection: when the connection fails or closes the task
//! reports it and exits.

use std::fmt;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tracing::Instrument;
use uuid::Uuid;

use super::frame::{classify, Frame};
use crate::error::StreamError;
use crate::models::Event;

/// Lifecycle of the single connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    Open,
    Closed { reason: Option<String> },
    Failed { error: String },
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting => write!(f, "connecting"),
            Self::Open => write!(f, "open"),
            Self::Closed { reason: Some(r) } => write!(f, "closed ({})", r),
            Self::Closed { reason: None } => write!(f, "closed"),
            Self::Failed { error } => write!(f, "failed: {}", error),
        }
    }
}

/// Items travelling from the connection task to the session
#[derive(Debug)]
pub enum StreamMessage {
    Event(Event),
    /// A frame was dropped because it could not be decoded
    Malformed { reason: String },
    Status(ConnectionStatus),
}

/// Handle to a running connection, used only to tear it down.
///
/// Dropping the handle stops the connection.
pub struct ConnectionHandle {
    id: Uuid,
    endpoint: String,
    stop: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl ConnectionHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Close the connection. Safe to call any number of times, including
    /// after the peer already went away. Nothing is forwarded once this
    /// returns.
    pub fn stop(&mut self) {
        // Waits for any in-flight forward to finish before flipping
        if self.stop.send_replace(true) {
            return;
        }

        tracing::info!(connection = %self.id, endpoint = %self.endpoint, "Stream connection stopped");
    }

    pub fn is_stopped(&self) -> bool {
        *self.stop.borrow()
    }

    /// Whether the connection task has exited
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Wait for the connection task to exit
    pub async fn join(&mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!(connection = %self.id, "Stream task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for ConnectionHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Open a connection to `endpoint` and forward decoded frames into `queue`.
///
/// Returns immediately; the handshake runs in a spawned task. Must be called
/// from within a tokio runtime.
pub fn start(
    endpoint: &str,
    connect_timeout: Duration,
    queue: mpsc::Sender<StreamMessage>,
) -> ConnectionHandle {
    let id = Uuid::new_v4();
    let (stop_tx, stop_rx) = watch::channel(false);

    let forwarder = Forwarder {
        queue,
        stop: stop_rx,
    };
    let task = tokio::spawn(
        run_connection(endpoint.to_string(), connect_timeout, forwarder)
            .instrument(tracing::info_span!("stream", connection = %id)),
    );

    ConnectionHandle {
        id,
        endpoint: endpoint.to_string(),
        stop: stop_tx,
        task: Some(task),
    }
}

/// Queue sender that goes quiet once the handle is stopped
struct Forwarder {
    queue: mpsc::Sender<StreamMessage>,
    stop: watch::Receiver<bool>,
}

impl Forwarder {
    /// Resolves once stop was requested or the handle is gone
    async fn stop_requested(&self) {
        let mut stop = self.stop.clone();
        let _ = stop.wait_for(|stopped| *stopped).await;
    }

    /// Returns false when nothing more should be sent.
    ///
    /// Waiting for queue space races against stop, and the final hand-off
    /// happens under the stop flag's read lock, so `stop()` cannot return
    /// while a message is being delivered.
    async fn send(&self, message: StreamMessage) -> bool {
        if *self.stop.borrow() {
            return false;
        }

        let permit = tokio::select! {
            biased;
            _ = self.stop_requested() => return false,
            permit = self.queue.reserve() => match permit {
                Ok(permit) => permit,
                Err(_) => return false,
            },
        };

        let stopped = self.stop.borrow();
        if *stopped {
            return false;
        }
        permit.send(message);
        true
    }

    async fn status(&self, status: ConnectionStatus) -> bool {
        self.send(StreamMessage::Status(status)).await
    }
}

async fn run_connection(
    endpoint: String,
    connect_timeout: Duration,
    forwarder: Forwarder,
) {
    if !forwarder.status(ConnectionStatus::Connecting).await {
        return;
    }
    tracing::info!("Connecting to {}", endpoint);

    let handshake = tokio::time::timeout(connect_timeout, connect_async(endpoint.as_str()));
    let connected = tokio::select! {
        biased;
        _ = forwarder.stop_requested() => {
            tracing::debug!("Stopped before handshake completed");
            return;
        }
        result = handshake => match result {
            Ok(Ok((ws, _response))) => Ok(ws),
            Ok(Err(e)) => Err(StreamError::ConnectFailed {
                endpoint: endpoint.clone(),
                reason: e.to_string(),
            }),
            Err(_) => Err(StreamError::ConnectTimeout {
                endpoint: endpoint.clone(),
                timeout: connect_timeout,
            }),
        },
    };

    let mut ws = match connected {
        Ok(ws) => ws,
        Err(e) => {
            tracing::error!("{}", e);
            forwarder
                .status(ConnectionStatus::Failed { error: e.to_string() })
                .await;
            return;
        }
    };

    tracing::info!("Stream connected: {}", endpoint);
    if !forwarder.status(ConnectionStatus::Open).await {
        let _ = ws.close(None).await;
        return;
    }

    let mut frames: u64 = 0;
    let mut discarded: u64 = 0;

    let outcome = loop {
        tokio::select! {
            biased;
            _ = forwarder.stop_requested() => {
                if let Err(e) = ws.close(None).await {
                    tracing::debug!("Close handshake failed: {}", e);
                }
                break None;
            }
            next = ws.next() => {
                let message = match next {
                    Some(Ok(message)) => message,
                    Some(Err(e)) => {
                        let e = StreamError::from(e);
                        tracing::warn!("Stream lost: {}", e);
                        break Some(ConnectionStatus::Failed { error: e.to_string() });
                    }
                    None => break Some(ConnectionStatus::Closed { reason: None }),
                };

                match classify(message) {
                    Frame::Event(event) => {
                        frames += 1;
                        if !forwarder.send(StreamMessage::Event(event)).await {
                            let _ = ws.close(None).await;
                            break None;
                        }
                    }
                    Frame::Malformed(e) => {
                        discarded += 1;
                        tracing::warn!("Discarding frame: {}", e);
                        let reason = e.to_string();
                        if !forwarder.send(StreamMessage::Malformed { reason }).await {
                            let _ = ws.close(None).await;
                            break None;
                        }
                    }
                    Frame::Close(reason) => break Some(ConnectionStatus::Closed { reason }),
                    Frame::Control => {}
                }
            }
        }
    };

    tracing::info!(
        frames,
        discarded,
        "Stream task exiting"
    );

    if let Some(status) = outcome {
        tracing::info!("Stream {}", status);
        forwarder.status(status).await;
    }
}
