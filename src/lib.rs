//! Webpilot - browser agent driven by a computer-use model
//!
//! Gives a natural-language task to a Gemini computer-use model, executes
//! the browser actions it requests, and feeds screenshots and page state
//! back until the model answers without acting.
//!
//! # Architecture
//!
//! - **Core**: Shared types, configuration, and error handling
//! - **LLM**: Model gateway with retry and response classification, Gemini transport
//! - **Tools**: Browser action vocabulary, coordinate mapping, actuator and executor
//! - **Agent**: Turn loop, safety gate, session state and context pruning
//! - **CLI**: Command-line interface and REPL
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use webpilot::agent::approval_channel;
//! use webpilot::{Agent, Config};
//!
//! #[tokio::main]
//! async fn main() -> webpilot::Result<()> {
//!     let config = Config::load();
//!     let settings = config.settings();
//!     let (approver, _requests) = approval_channel(1);
//!     let mut agent = Agent::from_config(config, Arc::new(approver))?;
//!
//!     let outcome = agent.start_task("What is the weather in Paris?", settings).await?;
//!     println!("{:?}", outcome);
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod core;
pub mod llm;
pub mod tools;

// Re-export commonly used items
pub use agent::{Agent, AgentEvent, AgentPhase, AgentStatus, TaskOutcome};
pub use cli::Repl;
pub use core::{Config, PilotError, Result, Settings};
