//! Data models

pub mod event;
pub mod alert;

pub use event::*;
pub use alert::*;
