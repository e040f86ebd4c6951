//! Session loop
//!
//! A session owns exactly one stream connection and one [`AlertLog`]. It is
//! the single consumer of the connector's queue and the only writer to the
//! log: messages are applied one at a time, in the order they were
//! received, and the display re-renders after every append.
//!
//! The connection is released on every exit path. [`Session::run`] stops it
//! explicitly when the loop ends, and dropping a session (early return,
//! cancelled future, panic unwinding) stops it through the handle's `Drop`.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::accumulator::AlertLog;
use crate::config::Config;
use crate::display::AlertDisplay;
use crate::error::StreamResult;
use crate::stream::{self, ConnectionHandle, ConnectionStatus, StreamMessage};

/// Counters reported when a session ends
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub endpoint: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub events_received: u64,
    pub alerts_raised: u64,
    pub malformed_discarded: u64,
    #[serde(skip)]
    pub last_status: Option<ConnectionStatus>,
}

pub struct Session<D: AlertDisplay> {
    log: AlertLog,
    handle: ConnectionHandle,
    inbox: mpsc::Receiver<StreamMessage>,
    display: D,
    summary: SessionSummary,
}

impl<D: AlertDisplay> Session<D> {
    /// Connect to the configured stream and start from an empty log.
    ///
    /// Does not wait for the handshake.
    pub fn start(config: &Config, display: D) -> StreamResult<Self> {
        config.validate()?;

        let (tx, inbox) = mpsc::channel(config.queue_capacity.max(1));
        let handle = stream::start(&config.stream_url, config.connect_timeout(), tx);

        let summary = SessionSummary {
            session_id: Uuid::new_v4(),
            endpoint: config.stream_url.clone(),
            started_at: Utc::now(),
            ended_at: None,
            events_received: 0,
            alerts_raised: 0,
            malformed_discarded: 0,
            last_status: None,
        };

        tracing::info!(
            session = %summary.session_id,
            connection = %handle.id(),
            endpoint = %handle.endpoint(),
            "Session started"
        );

        Ok(Self {
            log: AlertLog::initialize(),
            handle,
            inbox,
            display,
            summary,
        })
    }

    /// Current alerts
    pub fn alerts(&self) -> &AlertLog {
        &self.log
    }

    /// Apply one queued message; re-render if the log grew
    fn apply(&mut self, message: StreamMessage) {
        match message {
            StreamMessage::Event(event) => {
                self.summary.events_received += 1;

                let before = self.log.len();
                self.log = std::mem::take(&mut self.log).on_event(&event);
                if self.log.len() > before {
                    self.summary.alerts_raised += 1;
                    tracing::warn!(
                        session = %self.summary.session_id,
                        position = before,
                        "Intrusion detected"
                    );
                    self.display.render(self.log.snapshot());
                }
            }
            StreamMessage::Malformed { reason } => {
                self.summary.malformed_discarded += 1;
                tracing::debug!(session = %self.summary.session_id, "Malformed frame dropped: {}", reason);
            }
            StreamMessage::Status(status) => {
                tracing::info!(session = %self.summary.session_id, "Connection {}", status);
                self.summary.last_status = Some(status);
            }
        }
    }

    /// Drive the session until `shutdown` resolves or the stream ends.
    ///
    /// Returns the final log and summary; the connection is stopped before
    /// this returns.
    pub async fn run<F>(mut self, shutdown: F) -> (AlertLog, SessionSummary)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        self.display.render(self.log.snapshot());

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    tracing::info!(session = %self.summary.session_id, "Shutdown requested");
                    break;
                }
                message = self.inbox.recv() => match message {
                    Some(message) => self.apply(message),
                    None => {
                        tracing::info!(session = %self.summary.session_id, "Stream ended");
                        break;
                    }
                },
            }
        }

        self.finish()
    }

    fn finish(mut self) -> (AlertLog, SessionSummary) {
        self.handle.stop();
        self.inbox.close();

        let mut summary = self.summary.clone();
        summary.ended_at = Some(Utc::now());

        tracing::info!(
            session = %summary.session_id,
            events = summary.events_received,
            alerts = summary.alerts_raised,
            malformed = summary.malformed_discarded,
            "Session ended"
        );

        (std::mem::take(&mut self.log), summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AlertEntry, INTRUSION_ALERT};
    use futures::{SinkExt, StreamExt};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;
    use tokio_tungstenite::tungstenite::Message;

    /// Display that records every snapshot it is handed
    #[derive(Clone, Default)]
    struct RecordingDisplay {
        renders: Arc<Mutex<Vec<Vec<String>>>>,
    }

    impl RecordingDisplay {
        fn latest_len(&self) -> usize {
            self.renders.lock().unwrap().last().map_or(0, Vec::len)
        }
    }

    impl AlertDisplay for RecordingDisplay {
        fn render(&mut self, alerts: &[AlertEntry]) {
            let messages = alerts.iter().map(|a| a.message().to_string()).collect();
            self.renders.lock().unwrap().push(messages);
        }
    }

    /// Serve `bodies` as text frames to one client, then close
    async fn backend(bodies: Vec<&'static str>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(tcp).await.unwrap();
            for body in bodies {
                ws.send(Message::Text(body.to_string())).await.unwrap();
            }
            let _ = ws.close(None).await;
        });

        format!("ws://{}/ws", addr)
    }

    fn never() -> impl Future<Output = ()> {
        std::future::pending()
    }

    #[tokio::test]
    async fn test_end_to_end_order() {
        let url = backend(vec![
            r#"{"intrusion": 0}"#,
            r#"{"intrusion": 1}"#,
            r#"{"intrusion": 1}"#,
            r#"{"intrusion": 0}"#,
            r#"{"intrusion": 1}"#,
        ])
        .await;

        let display = RecordingDisplay::default();
        let session = Session::start(&Config::with_endpoint(url), display.clone()).unwrap();
        let (log, summary) = session.run(never()).await;

        assert_eq!(log.len(), 3);
        assert_eq!(summary.events_received, 5);
        assert_eq!(summary.alerts_raised, 3);
        assert!(summary.ended_at.is_some());

        // Initial empty render, then one per growth
        let renders = display.renders.lock().unwrap();
        let sizes: Vec<usize> = renders.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![0, 1, 2, 3]);
        assert!(renders[3].iter().all(|m| m == INTRUSION_ALERT));
    }

    #[tokio::test]
    async fn test_malformed_and_non_alert_frames() {
        let url = backend(vec![
            r#"{"intrusion": "1"}"#,
            r#"{"intrusion": 2"#,
            "<html>",
            r#"{"intrusion": -1}"#,
            r#"{"score": 0.7}"#,
            r#"{"intrusion": 1, "src": "10.0.0.9"}"#,
        ])
        .await;

        let session = Session::start(&Config::with_endpoint(url), RecordingDisplay::default()).unwrap();
        let (log, summary) = session.run(never()).await;

        assert_eq!(log.len(), 1);
        assert_eq!(summary.malformed_discarded, 2);
        assert_eq!(summary.events_received, 4);
        assert!(matches!(
            summary.last_status,
            Some(ConnectionStatus::Closed { .. })
        ));
    }

    #[tokio::test]
    async fn test_unreachable_backend_yields_no_alerts() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let config = Config::with_endpoint(format!("ws://{}/ws", addr));
        let session = Session::start(&config, RecordingDisplay::default()).unwrap();
        let (log, summary) = session.run(never()).await;

        assert!(log.is_empty());
        assert!(matches!(
            summary.last_status,
            Some(ConnectionStatus::Failed { .. })
        ));
    }

    #[tokio::test]
    async fn test_invalid_endpoint_rejected() {
        let result = Session::start(
            &Config::with_endpoint("http://127.0.0.1:8000/ws"),
            RecordingDisplay::default(),
        );
        assert!(matches!(result, Err(crate::error::StreamError::InvalidEndpoint(_))));

        let result = Session::start(
            &Config::with_endpoint("wss://127.0.0.1:8443/ws"),
            RecordingDisplay::default(),
        );
        assert!(matches!(result, Err(crate::error::StreamError::InvalidEndpoint(_))));
    }

    #[tokio::test]
    async fn test_no_events_applied_after_shutdown() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}/ws", listener.local_addr().unwrap());

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(tcp).await.unwrap();
            for _ in 0..2 {
                ws.send(Message::Text(r#"{"intrusion": 1}"#.to_string())).await.unwrap();
            }
            // Wait for the client's close, then keep pushing
            while let Some(Ok(message)) = ws.next().await {
                if message.is_close() {
                    break;
                }
            }
            for _ in 0..3 {
                if ws.send(Message::Text(r#"{"intrusion": 1}"#.to_string())).await.is_err() {
                    break;
                }
            }
        });

        let display = RecordingDisplay::default();
        let watcher = display.clone();
        let shutdown = async move {
            while watcher.latest_len() < 2 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        };

        let session = Session::start(&Config::with_endpoint(url), display.clone()).unwrap();
        let (log, _summary) = session.run(shutdown).await;

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(log.len(), 2);
        assert_eq!(display.latest_len(), 2);
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let first = backend(vec![r#"{"intrusion": 1}"#, r#"{"intrusion": 1}"#]).await;
        let session = Session::start(&Config::with_endpoint(first), RecordingDisplay::default()).unwrap();
        let (log, _) = session.run(never()).await;
        assert_eq!(log.len(), 2);

        let second = backend(vec![r#"{"intrusion": 0}"#]).await;
        let session = Session::start(&Config::with_endpoint(second), RecordingDisplay::default()).unwrap();
        assert!(session.alerts().is_empty());
        let (log, _) = session.run(never()).await;
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn test_dropping_session_stops_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}/ws", listener.local_addr().unwrap());
        let (closed_tx, closed_rx) = tokio::sync::oneshot::channel::<bool>();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(tcp).await.unwrap();
            ws.send(Message::Text(r#"{"intrusion": 1}"#.to_string())).await.unwrap();
            let mut saw_close = false;
            while let Some(Ok(message)) = ws.next().await {
                if message.is_close() {
                    saw_close = true;
                    break;
                }
            }
            let _ = closed_tx.send(saw_close);
        });

        let display = RecordingDisplay::default();
        let watcher = display.clone();
        let session = Session::start(&Config::with_endpoint(url), display).unwrap();

        // Cancel the run future once the first alert shows up
        tokio::select! {
            _ = session.run(never()) => panic!("session ended on its own"),
            _ = async {
                while watcher.latest_len() < 1 {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
            } => {}
        }

        let saw_close = tokio::time::timeout(Duration::from_secs(5), closed_rx)
            .await
            .unwrap()
            .unwrap();
        assert!(saw_close);
    }
}
