//! EventSink の実装

use std::sync::Mutex;

use super::lock;
use crate::domain::{DomainEvent, UploadState};
use crate::ports::EventSink;

/// Logs every event through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: &DomainEvent) {
        match event {
            DomainEvent::SessionChanged {
                kind,
                principal_id,
                generation,
            } => tracing::info!(?kind, ?principal_id, generation, "session changed"),
            DomainEvent::ProfileCreated { principal_id } => {
                tracing::info!(%principal_id, "profile record created")
            }
            DomainEvent::UploadTransition {
                attempt_id,
                principal_id,
                from,
                to,
            } => tracing::debug!(%attempt_id, %principal_id, ?from, ?to, "upload transition"),
            DomainEvent::StaleResultDiscarded {
                principal_id,
                generation,
            } => tracing::debug!(%principal_id, generation, "stale result discarded"),
        }
    }
}

/// Keeps events in memory (tests, CLI summaries).
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<DomainEvent>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DomainEvent> {
        lock(&self.events).clone()
    }

    /// Terminal states reached by upload attempts, in order.
    pub fn upload_terminals(&self) -> Vec<UploadState> {
        lock(&self.events)
            .iter()
            .filter_map(|e| match e {
                DomainEvent::UploadTransition { to, .. } if to.is_terminal() => Some(*to),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for RecordingEventSink {
    fn emit(&self, event: &DomainEvent) {
        lock(&self.events).push(event.clone());
    }
}
