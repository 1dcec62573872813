use log::warn;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

use super::events::{EventBus, PulseEvent};
use super::suggestion::{Suggestion, SuggestionState};

/// Lifecycle phase of the perception-to-action cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PulseState {
    Idle,
    Capturing,
    IntentDetected,
    ProcessingCloud,
    AwaitingApproval,
    Executing,
    Cooling,
}

/// The transition table. Everything not listed is rejected.
fn allowed(from: PulseState, to: PulseState) -> bool {
    use PulseState::*;
    matches!(
        (from, to),
        (Idle, Capturing)
            | (Capturing, IntentDetected)
            | (Capturing, Idle)
            | (IntentDetected, ProcessingCloud)
            | (IntentDetected, Capturing)
            | (ProcessingCloud, AwaitingApproval)
            | (ProcessingCloud, Idle)
            | (AwaitingApproval, Executing)
            | (AwaitingApproval, Idle)
            | (Executing, Cooling)
            | (Executing, Idle)
            | (Cooling, Idle)
    )
}

struct MachineInner {
    state: PulseState,
    suggestion: Option<Suggestion>,
}

/// Deterministic state machine owning the cycle state and the current
/// suggestion.
///
/// All mutation happens under one lock, held only for the read or write
/// itself, never across a suspension point. State-change events fire after
/// the new state is visible.
pub struct PulseMachine {
    inner: Mutex<MachineInner>,
    events: EventBus,
}

impl PulseMachine {
    pub fn new(events: EventBus) -> Self {
        Self {
            inner: Mutex::new(MachineInner {
                state: PulseState::Idle,
                suggestion: None,
            }),
            events,
        }
    }

    pub fn state(&self) -> PulseState {
        self.inner.lock().unwrap().state
    }

    /// Attempt `current → to`. Rejected transitions log a warning and
    /// leave the state untouched.
    pub fn transition(&self, to: PulseState) -> bool {
        let previous = {
            let mut inner = self.inner.lock().unwrap();
            if !allowed(inner.state, to) {
                warn!("rejected transition {:?} -> {to:?}", inner.state);
                return false;
            }
            let previous = inner.state;
            inner.state = to;
            previous
        };

        self.events.emit(PulseEvent::StateChanged { previous, new: to });
        true
    }

    /// Force the machine back to Idle and drop any suggestion, whatever
    /// the current state.
    pub fn reset(&self) {
        let previous = {
            let mut inner = self.inner.lock().unwrap();
            inner.suggestion = None;
            let previous = inner.state;
            inner.state = PulseState::Idle;
            previous
        };

        if previous != PulseState::Idle {
            self.events.emit(PulseEvent::StateChanged {
                previous,
                new: PulseState::Idle,
            });
        }
    }

    /// Attach a freshly built suggestion. Replaces any prior one, which
    /// keeps the at-most-one-live invariant trivially true.
    pub fn set_suggestion(&self, suggestion: Suggestion) {
        self.inner.lock().unwrap().suggestion = Some(suggestion);
    }

    /// Snapshot of the current suggestion.
    pub fn suggestion(&self) -> Option<Suggestion> {
        self.inner.lock().unwrap().suggestion.clone()
    }

    /// Move the current suggestion into `state` and return the updated
    /// snapshot.
    pub fn mark_suggestion(&self, state: SuggestionState) -> Option<Suggestion> {
        let mut inner = self.inner.lock().unwrap();
        match inner.suggestion.as_mut() {
            Some(suggestion) => {
                suggestion.state = state;
                Some(suggestion.clone())
            }
            None => None,
        }
    }

    pub fn clear_suggestion(&self) -> Option<Suggestion> {
        self.inner.lock().unwrap().suggestion.take()
    }
}
