//! One-Shield Intrusion Dashboard
//!
//! Real-time alert viewer for the intrusion-detection backend.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                   INTRUSION DASHBOARD                        │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐   mpsc   ┌──────────────┐   ┌───────────┐ │
//! │  │  Stream      │ ───────▶ │  Session     │ ─▶│  Display  │ │
//! │  │  Connector   │          │  (AlertLog)  │   │           │ │
//! │  │  (WebSocket) │          └──────────────┘   └───────────┘ │
//! │  └──────┬───────┘                                           │
//! │         ▲                                                   │
//! │   ws://127.0.0.1:8000/ws                                    │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod accumulator;
pub mod config;
pub mod display;
pub mod error;
pub mod models;
pub mod session;
pub mod stream;

pub use accumulator::AlertLog;
pub use config::Config;
pub use display::{AlertDisplay, TerminalDisplay};
pub use error::{StreamError, StreamResult};
pub use session::{Session, SessionSummary};
