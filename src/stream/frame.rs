//! Frame decoding
//!
//! Turns raw WebSocket messages into [`Event`]s. Decoding never panics; a
//! frame that is not a JSON object comes back as [`Frame::Malformed`] and is
//! the caller's to drop.

use serde_json::Value;
use tokio_tungstenite::tungstenite::Message;

use crate::error::{StreamError, StreamResult};
use crate::models::Event;

/// What a single inbound message means to the connector
#[derive(Debug)]
pub enum Frame {
    Event(Event),
    Malformed(StreamError),
    /// Peer closed the stream, with its stated reason if any
    Close(Option<String>),
    /// Ping/pong and raw frames, answered by the WebSocket layer
    Control,
}

/// Decode a text body as an event record
pub fn decode_text(text: &str) -> StreamResult<Event> {
    let value: Value = serde_json::from_str(text)?;
    match value {
        Value::Object(_) => Ok(serde_json::from_value(value)?),
        other => Err(StreamError::NotAnObject(json_kind(&other))),
    }
}

/// Classify one WebSocket message
pub fn classify(message: Message) -> Frame {
    match message {
        Message::Text(text) => into_frame(decode_text(&text)),
        Message::Binary(bytes) => match std::str::from_utf8(&bytes) {
            Ok(text) => into_frame(decode_text(text)),
            Err(_) => Frame::Malformed(StreamError::NotUtf8),
        },
        Message::Close(close) => Frame::Close(
            close
                .map(|c| c.reason.to_string())
                .filter(|reason| !reason.is_empty()),
        ),
        Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => Frame::Control,
    }
}

fn into_frame(result: StreamResult<Event>) -> Frame {
    match result {
        Ok(event) => Frame::Event(event),
        Err(e) => Frame::Malformed(e),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
