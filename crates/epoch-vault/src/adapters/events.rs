//! Event sinks.

use crate::events::VaultEvent;
use crate::ports::outbound::EventSink;
use parking_lot::Mutex;
use tracing::info;

/// Keeps every published event in order.
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<VaultEvent>>,
}

impl RecordingEventSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far.
    #[must_use]
    pub fn events(&self) -> Vec<VaultEvent> {
        self.events.lock().clone()
    }

    /// Drains the recorded events.
    pub fn take(&self) -> Vec<VaultEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    /// Number of recorded events published under `topic`.
    #[must_use]
    pub fn count_topic(&self, topic: &str) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|event| event.topic() == topic)
            .count()
    }
}

impl EventSink for RecordingEventSink {
    fn publish(&self, event: &VaultEvent) {
        self.events.lock().push(event.clone());
    }
}

/// Mirrors every event into the log as JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn publish(&self, event: &VaultEvent) {
        match serde_json::to_string(event) {
            Ok(payload) => info!(topic = event.topic(), %payload, "vault event"),
            Err(e) => info!(topic = event.topic(), error = %e, "vault event (unserializable)"),
        }
    }
}
