//! Replaying host events into the client's diagnostics.

use hostbridge_protocol::{Event, Severity};
use parking_lot::Mutex;

/// Destination for events captured on the host.
pub trait EventSink: Send + Sync {
    /// Records one event.
    fn emit(&self, event: &Event);
}

/// Re-emits events through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &Event) {
        match event.severity {
            Severity::Error => tracing::error!(target: "hostbridge::host", "{}", event.message),
            Severity::Warning => tracing::warn!(target: "hostbridge::host", "{}", event.message),
            Severity::Note => tracing::info!(target: "hostbridge::host", "{}", event.message),
        }
    }
}

/// Keeps events in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<Event>>,
}

impl MemorySink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded events.
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    /// Removes and returns the recorded events.
    pub fn take(&self) -> Vec<Event> {
        std::mem::take(&mut *self.events.lock())
    }

    /// Number of recorded events with `severity`.
    pub fn count(&self, severity: Severity) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| e.severity == severity)
            .count()
    }

    /// Number of recorded events.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Returns true if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: &Event) {
        self.events.lock().push(event.clone());
    }
}

/// Emits `events` into `sink` in their original order.
pub fn replay(events: &[Event], sink: &dyn EventSink) {
    for event in events {
        sink.emit(event);
    }
}
