mod controller;
mod driver;
mod events;
mod machine;
mod suggestion;

pub use controller::EngineController;
pub use driver::PulseEngine;
pub use events::{EventBus, PulseEvent};
pub use machine::{PulseMachine, PulseState};
pub use suggestion::{Suggestion, SuggestionState};
