//! Interactive REPL for webpilot
//!
//! Provides the main user interaction loop. Stdin is read on a background
//! thread so the user can stop a task or answer a safety prompt while the
//! agent is running.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::agent::{
    approval_channel, Agent, AgentEvent, AgentPhase, AgentStatus, ApprovalRequest, SafetyPrompt,
    StopHandle, TaskOutcome,
};
use crate::cli::commands::{handle_command, CommandResult};
use crate::core::{Config, Result};
use crate::tools::browser::BridgeActuator;

/// Interactive REPL (Read-Eval-Print Loop)
pub struct Repl {
    agent: Agent,
    events: mpsc::UnboundedReceiver<AgentEvent>,
    approvals: mpsc::Receiver<ApprovalRequest>,
    lines: mpsc::UnboundedReceiver<String>,
    stdin_open: bool,
}

impl Repl {
    /// Create a REPL with custom configuration
    pub fn with_config(config: Config) -> Result<Self> {
        let (approver, approvals) = approval_channel(1);
        let (events_tx, events) = mpsc::unbounded_channel();
        let agent = Agent::from_config(config, Arc::new(approver))?.with_events(events_tx);

        Ok(Self {
            agent,
            events,
            approvals,
            lines: spawn_line_reader(),
            stdin_open: true,
        })
    }

    /// Check that the settings are usable and the bridge can be started
    pub async fn initialize(&self) -> Result<()> {
        self.agent.config().settings().validate()?;

        let bridge = BridgeActuator::from_config(&self.agent.config().browser);
        if !bridge.is_available().await {
            println!(
                "Warning: browser bridge '{}' not found. Actions will fail until it is installed.",
                self.agent.config().browser.bridge_command
            );
        }
        Ok(())
    }

    /// Run a single task without the interactive loop
    pub async fn run_once(&mut self, prompt: &str) -> Result<TaskOutcome> {
        self.initialize().await?;
        let outcome = self.run_task(prompt.to_string(), false).await?;
        print_outcome(&outcome);
        Ok(outcome)
    }

    /// Run the REPL
    pub async fn run(&mut self) -> Result<()> {
        self.print_banner();

        print!("Initializing...");
        io::stdout().flush()?;
        match self.initialize().await {
            Ok(()) => println!(" Ready!\n"),
            Err(e) => {
                println!("\n\nInitialization Error: {}\n", e);
                return Ok(());
            }
        }

        loop {
            let prompt = if self.agent.status().phase == AgentPhase::Waiting {
                "Reply: "
            } else {
                "You: "
            };
            print!("{}", prompt);
            io::stdout().flush()?;

            let input = match self.lines.recv().await {
                Some(line) => line,
                None => {
                    // EOF (Ctrl+D)
                    println!("\nGoodbye!");
                    break;
                }
            };

            let input = input.trim();
            if input.is_empty() {
                continue;
            }

            let (text, follow_up) = match handle_command(input, &mut self.agent) {
                Ok(CommandResult::Exit) => {
                    println!("\nGoodbye!");
                    break;
                }
                Ok(CommandResult::Reset) => {
                    println!("Session reset.\n");
                    continue;
                }
                Ok(CommandResult::Handled(output)) => {
                    println!("{}\n", output);
                    continue;
                }
                Ok(CommandResult::Task(text)) => (text, false),
                Ok(CommandResult::FollowUp(text)) => (text, true),
                Err(e) => {
                    eprintln!("Command error: {}\n", e);
                    continue;
                }
            };

            match self.run_task(text, follow_up).await {
                Ok(outcome) => print_outcome(&outcome),
                Err(e) => eprintln!("\nError: {}\n", e),
            }
        }

        Ok(())
    }

    /// Drive one invocation while relaying events, approvals and stop requests
    async fn run_task(&mut self, text: String, follow_up: bool) -> Result<TaskOutcome> {
        let settings = self.agent.config().settings();
        let stop = self.agent.stop_handle();
        let status = self.agent.subscribe_status();

        let agent = &mut self.agent;
        let events = &mut self.events;
        let approvals = &mut self.approvals;
        let lines = &mut self.lines;
        let stdin_open = &mut self.stdin_open;
        let mut pending: Option<ApprovalRequest> = None;

        let task = async {
            if follow_up {
                agent.send_follow_up(&text, settings).await
            } else {
                agent.start_task(&text, settings).await
            }
        };
        tokio::pin!(task);

        let outcome = loop {
            tokio::select! {
                outcome = &mut task => break outcome,
                Some(event) = events.recv() => print_event(&event),
                Some(request) = approvals.recv() => {
                    if *stdin_open {
                        print_safety_prompt(&request.prompt);
                        pending = Some(request);
                    } else {
                        request.deny();
                    }
                }
                line = lines.recv(), if *stdin_open => match line {
                    Some(line) => handle_busy_input(line.trim(), &mut pending, &stop, &status),
                    None => {
                        *stdin_open = false;
                        if let Some(request) = pending.take() {
                            request.deny();
                        }
                    }
                },
                _ = tokio::signal::ctrl_c() => {
                    println!("\n[Agent] Stopping after the current action...");
                    if let Some(request) = pending.take() {
                        request.deny();
                    }
                    stop.stop();
                }
            }
        };

        while let Ok(event) = events.try_recv() {
            print_event(&event);
        }
        outcome
    }

    /// Print the startup banner
    fn print_banner(&self) {
        let config = self.agent.config();

        println!(
            r#"
+-----------------------------------------------------------+
|                                                           |
|   W E B P I L O T                                         |
|                                                           |
|   Browser agent driven by a computer-use model            |
|                                                           |
+-----------------------------------------------------------+
"#
        );
        println!("Model:    {}", config.model.name);
        println!(
            "Backend:  {}",
            if config.api.use_vertex_ai {
                "Vertex AI"
            } else {
                "Gemini API"
            }
        );
        println!("Bridge:   {}", config.browser.bridge_command);
        println!();
        println!("Commands: help, status, stop, reset, exit");
        println!("-----------------------------------------------------------");
    }
}

/// Forward stdin lines to the async side
fn spawn_line_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    eprintln!("Error reading input: {}", e);
                    break;
                }
            }
        }
    });
    rx
}

fn handle_busy_input(
    line: &str,
    pending: &mut Option<ApprovalRequest>,
    stop: &StopHandle,
    status: &watch::Receiver<AgentStatus>,
) {
    let input = line.to_lowercase();

    if input == "stop" {
        // A pending gated action is denied, not run
        if let Some(request) = pending.take() {
            request.deny();
        }
        println!("[Agent] Stopping after the current action...");
        stop.stop();
        return;
    }

    if let Some(request) = pending.take() {
        let allowed = matches!(input.as_str(), "y" | "yes");
        request.resolve(allowed);
        return;
    }

    match input.as_str() {
        "" => {}
        "status" => {
            let status = status.borrow();
            println!(
                "State: {}  Running: {}  History: {} turns",
                status.phase, status.is_running, status.conversation_length
            );
        }
        _ => println!("A task is running. Type 'stop' or press Ctrl+C to stop it."),
    }
}

fn print_safety_prompt(prompt: &SafetyPrompt) {
    println!("\n[Safety] The agent wants to run: {}", prompt.action);
    println!("         {}", prompt.explanation);
    print!("Allow? [y/N]: ");
    let _ = io::stdout().flush();
}

fn print_event(event: &AgentEvent) {
    match event {
        AgentEvent::PhaseChanged { .. } | AgentEvent::SafetyPrompt { .. } => {}
        AgentEvent::Reasoning { text } => println!("\n[Model] {}", text),
        AgentEvent::ThoughtSummary { text } => println!("\n[Thought] {}", text),
        AgentEvent::ActionStarted { action } => println!("[Action] {}", action),
        AgentEvent::ActionFinished {
            success, url, error, ..
        } => {
            if *success {
                println!("  ✓ {}", url);
            } else {
                println!("  ✗ {}", error.as_deref().unwrap_or("failed"));
            }
        }
        AgentEvent::SafetyResolved { action, allowed } => {
            let verdict = if *allowed { "allowed" } else { "denied" };
            println!("[Safety] {} {}", action, verdict);
        }
        AgentEvent::RetryingTurn => println!("[Model] Malformed function call, asking again"),
        AgentEvent::Error { message } => eprintln!("\nError: {}\n", message),
    }
}

fn print_outcome(outcome: &TaskOutcome) {
    match outcome {
        TaskOutcome::Completed(text) => println!("\nAssistant:\n{}\n", text),
        TaskOutcome::NeedsInput(text) => {
            println!("\nAssistant:\n{}\n", text);
            println!("(waiting for your reply)\n");
        }
        TaskOutcome::Stopped => println!("\nTask stopped.\n"),
        TaskOutcome::Denied(action) => println!("\nTask ended: {} was denied.\n", action),
        // Already reported through the error event
        TaskOutcome::Failed(_) => {}
    }
}
