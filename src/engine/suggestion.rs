use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::action::ActionPlan;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SuggestionState {
    Pending,
    Executed,
    Dismissed,
    Failed,
}

impl SuggestionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Executed => "Executed",
            Self::Dismissed => "Dismissed",
            Self::Failed => "Failed",
        }
    }

    /// Terminal states are journaled; a Pending suggestion is still live.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// A predicted action plan awaiting human approval.
///
/// At most one suggestion exists in a non-terminal state at any moment;
/// the machine destroys it when the cycle returns to Idle.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub id: String,
    pub description: String,
    pub confidence: f64,
    pub plan: ActionPlan,
    pub state: SuggestionState,
    pub created_at: DateTime<Utc>,
}

impl Suggestion {
    pub fn new(description: String, confidence: f64, plan: ActionPlan) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            description,
            confidence,
            plan,
            state: SuggestionState::Pending,
            created_at: Utc::now(),
        }
    }
}
