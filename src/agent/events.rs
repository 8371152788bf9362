//! Progress events emitted while a task runs

use serde::Serialize;

use crate::agent::loop_state::AgentPhase;
use crate::agent::safety::SafetyPrompt;

/// Something a UI may want to render
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    PhaseChanged {
        phase: AgentPhase,
    },
    /// Answer text of a model turn
    Reasoning {
        text: String,
    },
    ThoughtSummary {
        text: String,
    },
    ActionStarted {
        action: String,
    },
    ActionFinished {
        action: String,
        success: bool,
        url: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    SafetyPrompt {
        prompt: SafetyPrompt,
    },
    SafetyResolved {
        action: String,
        allowed: bool,
    },
    /// Malformed function call, the turn is being re-issued
    RetryingTurn,
    Error {
        message: String,
    },
}
