//! Agent loop state management
//!
//! Tracks the lifecycle phase of a session, the per-invocation state of the
//! turn loop, and the observations recorded for each executed action.

use serde::{Deserialize, Serialize};

use crate::core::ActionResult;

/// Lifecycle phase of an agent session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentPhase {
    /// No task in progress
    #[default]
    Idle,
    /// The turn loop is running
    Running,
    /// The model asked the user something and awaits a follow-up
    Waiting,
    /// Stop was requested; the in-flight step is finishing
    Stopping,
    /// A task ended with an error (transient, followed by Idle)
    Error,
}

impl std::fmt::Display for AgentPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentPhase::Idle => write!(f, "idle"),
            AgentPhase::Running => write!(f, "running"),
            AgentPhase::Waiting => write!(f, "waiting"),
            AgentPhase::Stopping => write!(f, "stopping"),
            AgentPhase::Error => write!(f, "error"),
        }
    }
}

/// Phrases that mark a final answer as a question for the user
const QUESTION_PHRASES: [&str; 9] = [
    "please confirm",
    "should i",
    "would you like",
    "which one",
    "do you want",
    "can you tell",
    "can you provide",
    "can you specify",
    "let me know",
];

/// Whether a final answer asks the user for input
pub fn is_question(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.ends_with('?') {
        return true;
    }
    let lower = trimmed.to_lowercase();
    QUESTION_PHRASES.iter().any(|p| lower.contains(p))
}

/// How a task invocation ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// The model answered without further actions
    Completed(String),
    /// The model asked the user a question
    NeedsInput(String),
    /// Stop was requested
    Stopped,
    /// A gated action was denied under the terminate policy
    Denied(String),
    /// The model call failed
    Failed(String),
}

impl TaskOutcome {
    /// Phase the session settles in after this outcome
    pub fn final_phase(&self) -> AgentPhase {
        match self {
            TaskOutcome::NeedsInput(_) => AgentPhase::Waiting,
            _ => AgentPhase::Idle,
        }
    }
}

/// State of one loop invocation
#[derive(Debug, Clone, Default)]
pub struct AgentLoopState {
    /// Model turns received so far
    pub turn: usize,
    /// Re-issued calls after malformed function calls
    pub retried_turns: usize,
    /// Re-issued calls since the last usable reply
    pub consecutive_retries: usize,
    /// Observations collected from executed actions
    pub observations: Vec<Observation>,
}

impl AgentLoopState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment the turn counter
    pub fn next_turn(&mut self) {
        self.turn += 1;
        self.consecutive_retries = 0;
    }

    /// Count a re-issued turn, returning how many happened in a row
    pub fn retry_turn(&mut self) -> usize {
        self.retried_turns += 1;
        self.consecutive_retries += 1;
        self.consecutive_retries
    }

    pub fn add_observation(&mut self, observation: Observation) {
        self.observations.push(observation);
    }

    /// One line per observation, for logs and summaries
    pub fn format_observations(&self) -> String {
        self.observations
            .iter()
            .enumerate()
            .map(|(i, obs)| {
                let status = if obs.success { "ok" } else { "failed" };
                match obs.error {
                    Some(ref err) => format!("{}. {} [{}] {}", i + 1, obs.action, status, err),
                    None => format!("{}. {} [{}] {}", i + 1, obs.action, status, obs.url),
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Record of one executed (or refused) action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Formatted action, e.g. `click_at(412, 780)`
    pub action: String,
    pub success: bool,
    /// Page location afterwards
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Observation {
    pub fn from_result(action: impl Into<String>, result: &ActionResult) -> Self {
        Self {
            action: action.into(),
            success: result.success,
            url: result.url.clone(),
            error: result.error.clone(),
        }
    }
}
