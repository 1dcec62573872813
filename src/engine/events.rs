//! One-way event channel from the engine to its observers.
//!
//! The UI layer subscribes here and talks back only through `approve` /
//! `dismiss`, so there is no ownership cycle between engine and overlay.

use tokio::sync::broadcast;

use super::machine::PulseState;
use super::suggestion::Suggestion;

const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub enum PulseEvent {
    /// Fired after every accepted transition, once the new state is
    /// visible to readers.
    StateChanged {
        previous: PulseState,
        new: PulseState,
    },
    SuggestionReady(Suggestion),
    SuggestionDismissed,
    ExecutionError(String),
}

/// Broadcast bus for [`PulseEvent`]. `emit` never awaits; a lagged
/// subscriber drops events instead of blocking the engine.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PulseEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Returns the number of subscribers that received the event; zero
    /// when nobody is listening, which is fine.
    pub fn emit(&self, event: PulseEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PulseEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
