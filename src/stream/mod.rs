//! Stream Module - Backend to Dashboard Communication
//!
//! This module handles:
//! - WebSocket connection lifecycle (start / stop)
//! - Frame decoding into intrusion events
//! - Hand-off of decoded events to the session loop

pub mod connector;
pub mod frame;

pub use connector::{start, ConnectionHandle, ConnectionStatus, StreamMessage};
pub use frame::{classify, decode_text, Frame};
