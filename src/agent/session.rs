//! Session state owned by the agent
//!
//! Holds everything that lives for one session: the conversation, the
//! running and stop flags, the outstanding safety confirmation and the
//! settings of the current invocation. Constructed on task start and
//! destroyed on reset.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;

use crate::agent::conversation::Conversation;
use crate::agent::loop_state::AgentPhase;
use crate::agent::safety::SafetyPrompt;
use crate::core::Settings;

/// Snapshot of the session for UIs
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AgentStatus {
    pub phase: AgentPhase,
    pub is_running: bool,
    pub conversation_length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_confirmation: Option<SafetyPrompt>,
}

/// Cloneable handle that requests a running task to stop.
///
/// The flag is observed at the top of each turn and between actions. An
/// action already in flight always completes.
#[derive(Clone)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
    status: Arc<watch::Sender<AgentStatus>>,
}

impl StopHandle {
    pub(crate) fn new(status: Arc<watch::Sender<AgentStatus>>) -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            status,
        }
    }

    /// Request a stop. No effect on an idle session.
    pub fn stop(&self) {
        let mut running = false;
        self.status.send_if_modified(|status| {
            running = status.is_running;
            if running && status.phase != AgentPhase::Stopping {
                status.phase = AgentPhase::Stopping;
                true
            } else {
                false
            }
        });
        if running {
            self.flag.store(true, Ordering::SeqCst);
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    pub(crate) fn clear(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Mutable state of one agent session
pub struct Session {
    pub conversation: Conversation,
    pub phase: AgentPhase,
    pub is_running: bool,
    /// At most one outstanding confirmation
    pub pending_confirmation: Option<SafetyPrompt>,
    /// Captured at the start of each invocation
    pub settings: Option<Settings>,
}

impl Session {
    pub fn new(max_recent_screenshots: usize) -> Self {
        Self {
            conversation: Conversation::new(max_recent_screenshots),
            phase: AgentPhase::Idle,
            is_running: false,
            pending_confirmation: None,
            settings: None,
        }
    }

    pub fn status(&self) -> AgentStatus {
        AgentStatus {
            phase: self.phase,
            is_running: self.is_running,
            conversation_length: self.conversation.len(),
            pending_confirmation: self.pending_confirmation.clone(),
        }
    }
}
