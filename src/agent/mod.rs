//! Agent module - orchestration, session state and conversation management
//!
//! Contains the turn loop that coordinates model calls, the safety gate and
//! browser action execution.

pub mod conversation;
pub mod events;
pub mod loop_state;
pub mod orchestrator;
pub mod safety;
pub mod session;

pub use conversation::Conversation;
pub use events::AgentEvent;
pub use loop_state::{is_question, AgentLoopState, AgentPhase, Observation, TaskOutcome};
pub use orchestrator::Agent;
pub use safety::{approval_channel, ApprovalRequest, Approver, ChannelApprover, SafetyPrompt};
pub use session::{AgentStatus, StopHandle};
