//! Alert entry model

/// Banner shown for every detected intrusion
pub const INTRUSION_ALERT: &str = "🚨 Intrusion Detected!";

/// One line of the dashboard. Immutable once created; `position` is its
/// index in the log and doubles as the display key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertEntry {
    position: usize,
    message: String,
}

impl AlertEntry {
    pub(crate) fn new(position: usize, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
