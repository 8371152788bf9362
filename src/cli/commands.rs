//! CLI commands
//!
//! Special commands that can be executed in the REPL.

use crate::agent::{Agent, AgentPhase};
use crate::core::config::{DenialPolicy, ThinkingLevel};
use crate::core::Result;

/// Result of parsing a command
#[derive(Debug, PartialEq, Eq)]
pub enum CommandResult {
    /// Start a new task with this prompt
    Task(String),
    /// Send this text as a follow-up to a waiting session
    FollowUp(String),
    /// Command was handled, show output
    Handled(String),
    /// Exit the REPL
    Exit,
    /// Session was reset
    Reset,
}

/// Parse and handle special commands
pub fn handle_command(input: &str, agent: &mut Agent) -> Result<CommandResult> {
    let input = input.trim();
    let parts: Vec<&str> = input.splitn(2, ' ').collect();
    let cmd = parts[0].to_lowercase();
    let args = parts.get(1).map(|s| s.trim()).unwrap_or("");

    match cmd.as_str() {
        "exit" | "quit" | "q" => Ok(CommandResult::Exit),

        "reset" | "clear" => {
            agent.reset()?;
            Ok(CommandResult::Reset)
        }

        "help" | "?" => Ok(CommandResult::Handled(help_text())),

        "stop" => Ok(CommandResult::Handled("Nothing is running.".to_string())),

        "status" => Ok(CommandResult::Handled(status_text(agent))),

        "debug" => {
            let new_state = !agent.config().agent.debug;
            agent.set_debug(new_state);
            Ok(CommandResult::Handled(format!(
                "Debug mode: {}",
                if new_state { "ON" } else { "OFF" }
            )))
        }

        "set" => handle_set_command(args, agent),

        "save" => {
            let path = agent.config().save()?;
            Ok(CommandResult::Handled(format!(
                "Configuration saved to {}",
                path.display()
            )))
        }

        _ => {
            if input.starts_with('/') {
                return Ok(CommandResult::Handled(format!(
                    "Unknown command: {}. Type 'help' for available commands.",
                    cmd
                )));
            }
            if agent.status().phase == AgentPhase::Waiting {
                Ok(CommandResult::FollowUp(input.to_string()))
            } else {
                Ok(CommandResult::Task(input.to_string()))
            }
        }
    }
}

fn status_text(agent: &Agent) -> String {
    let status = agent.status();
    let config = agent.config();
    format!(
        "Webpilot Status:\n\
         ─────────────────────────────\n\
         State:        {}\n\
         Running:      {}\n\
         Model:        {}\n\
         Thinking:     {:?}\n\
         Backend:      {}\n\
         History:      {} turns\n\
         On denial:    {:?}\n\
         Debug:        {}",
        status.phase,
        status.is_running,
        config.model.name,
        config.model.thinking_level,
        if config.api.use_vertex_ai {
            "Vertex AI"
        } else {
            "Gemini API"
        },
        status.conversation_length,
        config.agent.denial_policy,
        if config.agent.debug { "on" } else { "off" }
    )
}

/// Handle 'set' subcommands
fn handle_set_command(args: &str, agent: &mut Agent) -> Result<CommandResult> {
    let parts: Vec<&str> = args.splitn(2, ' ').collect();

    if parts.is_empty() || parts[0].is_empty() {
        return Ok(CommandResult::Handled(
            "Usage: set <model|thinking|highlight|denial|debug> <value>\n\
             Examples:\n\
               set model gemini-2.5-computer-use-preview-10-2025\n\
               set thinking high\n\
               set denial terminate"
                .to_string(),
        ));
    }

    let key = parts[0].to_lowercase();
    let value = parts.get(1).map(|s| s.trim()).unwrap_or("");
    let enabled = matches!(value.to_lowercase().as_str(), "on" | "true" | "1" | "yes");

    match key.as_str() {
        "model" => {
            if value.is_empty() {
                return Ok(CommandResult::Handled(format!(
                    "Current model: {}",
                    agent.config().model.name
                )));
            }
            agent.config_mut().model.name = value.to_string();
            Ok(CommandResult::Handled(format!("Model set to: {}", value)))
        }

        "thinking" => {
            let level: ThinkingLevel = value.parse()?;
            agent.config_mut().model.thinking_level = level;
            Ok(CommandResult::Handled(format!("Thinking level: {:?}", level)))
        }

        "highlight" => {
            agent.config_mut().browser.highlight_mouse = enabled;
            Ok(CommandResult::Handled(format!(
                "Mouse highlight: {}",
                if enabled { "ON" } else { "OFF" }
            )))
        }

        "denial" => {
            let policy = match value.to_lowercase().as_str() {
                "skip" => DenialPolicy::Skip,
                "terminate" => DenialPolicy::Terminate,
                _ => {
                    return Ok(CommandResult::Handled(
                        "Usage: set denial <skip|terminate>".to_string(),
                    ))
                }
            };
            agent.config_mut().agent.denial_policy = policy;
            Ok(CommandResult::Handled(format!("On denial: {:?}", policy)))
        }

        "debug" => {
            agent.set_debug(enabled);
            Ok(CommandResult::Handled(format!(
                "Debug mode: {}",
                if enabled { "ON" } else { "OFF" }
            )))
        }

        _ => Ok(CommandResult::Handled(format!(
            "Unknown setting: {}. Available: model, thinking, highlight, denial, debug",
            key
        ))),
    }
}

/// Generate help text
fn help_text() -> String {
    r#"Webpilot Commands:
─────────────────────────────────────────────
  help, ?          Show this help message
  exit, quit, q    Exit webpilot
  reset, clear     Discard the conversation
  status           Show session state and configuration
  stop             Stop the running task
  debug            Toggle debug mode
  save             Save the configuration to disk

  set model <name>              Set the model
  set thinking <off|low|high>   Set the thinking level
  set highlight <on|off>        Draw the cursor while acting
  set denial <skip|terminate>   What a denied action does

Anything else starts a task. When the agent asked a
question, your next line answers it.

Keyboard Shortcuts:
  Ctrl+C           Stop the running task
  Ctrl+D           Exit webpilot
─────────────────────────────────────────────"#
        .to_string()
}
