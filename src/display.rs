//! Display surface
//!
//! The session hands the full, read-only alert snapshot to an
//! [`AlertDisplay`] every time the log grows. Implementations render
//! whatever they have not shown yet and must never reorder entries.

use std::io::{self, Write};

use crate::models::AlertEntry;

pub const DASHBOARD_TITLE: &str = "Intrusion Detection Dashboard";

pub trait AlertDisplay {
    fn render(&mut self, alerts: &[AlertEntry]);
}

/// Line-oriented terminal view: title once, then one line per new alert
pub struct TerminalDisplay<W: Write> {
    out: W,
    rendered: usize,
    heading_shown: bool,
}

impl TerminalDisplay<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TerminalDisplay<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            rendered: 0,
            heading_shown: false,
        }
    }

    /// Number of entries already written
    pub fn rendered(&self) -> usize {
        self.rendered
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_new(&mut self, alerts: &[AlertEntry]) -> io::Result<()> {
        if !self.heading_shown {
            writeln!(self.out, "{}", DASHBOARD_TITLE)?;
            writeln!(self.out, "{}", "=".repeat(DASHBOARD_TITLE.len()))?;
            self.heading_shown = true;
        }

        for entry in alerts.iter().skip(self.rendered) {
            writeln!(self.out, "[#{}] {}", entry.position(), entry.message())?;
            self.rendered += 1;
        }

        self.out.flush()
    }
}

impl<W: Write> AlertDisplay for TerminalDisplay<W> {
    fn render(&mut self, alerts: &[AlertEntry]) {
        if let Err(e) = self.write_new(alerts) {
            tracing::warn!("Display write failed: {}", e);
        }
    }
}
