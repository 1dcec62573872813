//! DeskPulse: a predictive desktop layer.
//!
//! Watches the screen at a steady cadence, notices when the user pauses,
//! asks a remote vision model what they likely want next, and performs the
//! predicted action with synthesized input once a human approves it.

pub mod action;
pub mod brain;
pub mod capture;
pub mod engine;
pub mod idle;
pub mod journal;
pub mod metrics;
pub mod settings;
pub mod utils;

pub use action::{Action, ActionExecutor, ActionPlan, InputSynthesizer, Region, ScrollDirection};
pub use brain::{CloudBrainClient, PredictionResponse, Predictor};
pub use capture::{CaptureContext, Frame, FrameRing, FrameSource};
pub use engine::{
    EngineController, EventBus, PulseEngine, PulseEvent, PulseMachine, PulseState, Suggestion,
    SuggestionState,
};
pub use idle::IdleSensor;
pub use journal::Journal;
pub use settings::{Settings, SettingsStore};
