//! Safety gate - human approval for actions the model flags as sensitive
//!
//! The model marks a call by putting
//! `safety_decision: {decision: "require_confirmation", explanation}` in its
//! arguments. Such calls must not run until an [`Approver`] says yes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tracing::warn;

use crate::core::FunctionCall;

/// Decision value that requires confirmation
pub const REQUIRE_CONFIRMATION: &str = "require_confirmation";

/// Explanation shown when the model gave none
pub const DEFAULT_EXPLANATION: &str =
    "The model flagged this action as potentially sensitive and asked for confirmation.";

/// Outcome of inspecting one call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafetyCheck {
    pub required: bool,
    pub explanation: Option<String>,
}

/// Inspect a call for a confirmation request
pub fn check(call: &FunctionCall) -> SafetyCheck {
    let decision = call.args.get("safety_decision");
    let required = decision
        .and_then(|d| d.get("decision"))
        .and_then(|d| d.as_str())
        == Some(REQUIRE_CONFIRMATION);

    if !required {
        return SafetyCheck {
            required: false,
            explanation: None,
        };
    }

    let explanation = decision
        .and_then(|d| d.get("explanation"))
        .and_then(|e| e.as_str())
        .filter(|e| !e.trim().is_empty())
        .unwrap_or(DEFAULT_EXPLANATION)
        .to_string();

    SafetyCheck {
        required: true,
        explanation: Some(explanation),
    }
}

/// What the approver is shown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyPrompt {
    /// Formatted action, e.g. `click_at(412, 780)`
    pub action: String,
    pub explanation: String,
}

/// Trait for approval collaborators
#[async_trait]
pub trait Approver: Send + Sync {
    /// Block until the user allows (`true`) or denies (`false`) the action
    async fn confirm(&self, prompt: &SafetyPrompt) -> bool;
}

/// A pending decision delivered to a UI
#[derive(Debug)]
pub struct ApprovalRequest {
    pub prompt: SafetyPrompt,
    responder: oneshot::Sender<bool>,
}

impl ApprovalRequest {
    /// Supply the decision
    pub fn resolve(self, allowed: bool) {
        if self.responder.send(allowed).is_err() {
            warn!(action = %self.prompt.action, "approval arrived after the agent stopped waiting");
        }
    }

    pub fn approve(self) {
        self.resolve(true)
    }

    pub fn deny(self) {
        self.resolve(false)
    }
}

/// Approver that forwards prompts over a channel
#[derive(Clone)]
pub struct ChannelApprover {
    tx: mpsc::Sender<ApprovalRequest>,
}

/// Create a channel approver and the receiving end a UI listens on
pub fn approval_channel(buffer: usize) -> (ChannelApprover, mpsc::Receiver<ApprovalRequest>) {
    let (tx, rx) = mpsc::channel(buffer.max(1));
    (ChannelApprover { tx }, rx)
}

#[async_trait]
impl Approver for ChannelApprover {
    async fn confirm(&self, prompt: &SafetyPrompt) -> bool {
        let (responder, decision) = oneshot::channel();
        let request = ApprovalRequest {
            prompt: prompt.clone(),
            responder,
        };
        if self.tx.send(request).await.is_err() {
            warn!("approval receiver dropped, treating as denial");
            return false;
        }
        // A dropped request counts as a denial.
        decision.await.unwrap_or(false)
    }
}
