//! Alert Accumulator
//!
//! Decides which events are alert-worthy and keeps the append-only log the
//! dashboard renders. The log is a plain value threaded through
//! [`AlertLog::on_event`]; whoever holds it (the session loop) is the only
//! place alert state lives.

use crate::models::{AlertEntry, Event, INTRUSION_ALERT};

/// Ordered alerts, oldest first. Only ever grows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlertLog {
    entries: Vec<AlertEntry>,
}

impl AlertLog {
    /// Empty log for a fresh session
    pub fn initialize() -> Self {
        Self::default()
    }

    /// Apply one event and return the next state.
    ///
    /// Appends a single [`INTRUSION_ALERT`] entry when the event is
    /// alert-worthy; otherwise the state comes back unchanged.
    #[must_use]
    pub fn on_event(mut self, event: &Event) -> Self {
        if event.is_intrusion() {
            let position = self.entries.len();
            self.entries.push(AlertEntry::new(position, INTRUSION_ALERT));
            tracing::debug!(position, "Alert appended");
        }
        self
    }

    /// Read-only view for the display surface
    pub fn snapshot(&self) -> &[AlertEntry] {
        &self.entries
    }

    /// Display strings in log order
    pub fn messages(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(AlertEntry::message)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
