//! Host-side event capture.

use hostbridge_protocol::{Event, Severity};

/// Ordered log of events raised while one command runs.
///
/// Every event is also traced on the host so the host keeps its own record
/// after the log is shipped to the client.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event.
    pub fn record(&mut self, event: Event) {
        match event.severity {
            Severity::Error => tracing::error!(target: "hostbridge::events", "{}", event.message),
            Severity::Warning => tracing::warn!(target: "hostbridge::events", "{}", event.message),
            Severity::Note => tracing::info!(target: "hostbridge::events", "{}", event.message),
        }
        self.events.push(event);
    }

    /// Records an error.
    pub fn error(&mut self, message: impl Into<String>) {
        self.record(Event::error(message));
    }

    /// Records a warning.
    pub fn warning(&mut self, message: impl Into<String>) {
        self.record(Event::warning(message));
    }

    /// Records a note.
    pub fn note(&mut self, message: impl Into<String>) {
        self.record(Event::note(message));
    }

    /// Events recorded so far.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Number of events of `severity`.
    pub fn count(&self, severity: Severity) -> usize {
        self.events.iter().filter(|e| e.severity == severity).count()
    }

    /// Takes every event, leaving the log empty.
    pub fn drain(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }
}
