//! Agent orchestrator
//!
//! Drives one task end-to-end: asks the model for its next decision,
//! gates and executes the requested browser actions, feeds the observed
//! results back, and repeats until the model answers without acting.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::agent::events::AgentEvent;
use crate::agent::loop_state::{is_question, AgentLoopState, AgentPhase, Observation, TaskOutcome};
use crate::agent::safety::{self, Approver, SafetyPrompt};
use crate::agent::session::{AgentStatus, Session, StopHandle};
use crate::core::config::DenialPolicy;
use crate::core::{ActionResult, Config, FunctionCall, FunctionResponse, PilotError, Result, Settings};
use crate::llm::{GatewayOutcome, GeminiClient, ModelGateway, ModelTransport};
use crate::tools::browser::{format_call, ActionExecutor, Actuator, BridgeActuator, ExecuteOptions};

/// Pause after every executed action
pub const INTER_ACTION_DELAY: Duration = Duration::from_millis(200);
/// Pause after every batch before the next model call
pub const INTER_BATCH_DELAY: Duration = Duration::from_millis(300);
/// Pause before re-issuing a model call after a malformed function call
pub const RETRY_TURN_DELAY: Duration = Duration::from_secs(1);
/// Consecutive malformed replies tolerated before the task fails
pub const MAX_CONSECUTIVE_RETRIES: usize = 5;

/// Main agent that orchestrates the model and the browser
pub struct Agent {
    /// Configuration
    config: Config,
    gateway: ModelGateway,
    executor: ActionExecutor,
    approver: Arc<dyn Approver>,
    session: Session,
    stop: StopHandle,
    status: Arc<watch::Sender<AgentStatus>>,
    events: Option<mpsc::UnboundedSender<AgentEvent>>,
}

/// Outcome of one batch of function calls
#[derive(Default)]
struct BatchResult {
    responses: Vec<FunctionResponse>,
    denied: Option<String>,
    stopped: bool,
}

impl Agent {
    /// Create an agent over explicit collaborators
    pub fn new(
        config: Config,
        transport: Arc<dyn ModelTransport>,
        actuator: Arc<dyn Actuator>,
        approver: Arc<dyn Approver>,
    ) -> Self {
        let executor =
            ActionExecutor::new(actuator).with_search_url(config.browser.search_url.clone());
        let (status_tx, _) = watch::channel(AgentStatus::default());
        let status = Arc::new(status_tx);

        Self {
            gateway: ModelGateway::new(transport),
            executor,
            approver,
            session: Session::new(config.agent.max_recent_screenshots),
            stop: StopHandle::new(status.clone()),
            status,
            events: None,
            config,
        }
    }

    /// Create an agent talking to Gemini and the bridge actuator
    pub fn from_config(config: Config, approver: Arc<dyn Approver>) -> Result<Self> {
        let transport = Arc::new(GeminiClient::from_config(&config)?);
        let actuator = Arc::new(BridgeActuator::from_config(&config.browser));
        Ok(Self::new(config, transport, actuator, approver))
    }

    /// Forward progress events to a channel
    pub fn with_events(mut self, events: mpsc::UnboundedSender<AgentEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Replace the model gateway (custom retry policy)
    pub fn with_gateway(mut self, gateway: ModelGateway) -> Self {
        self.gateway = gateway;
        self
    }

    /// Start a new task, discarding any previous conversation
    pub async fn start_task(&mut self, prompt: &str, settings: Settings) -> Result<TaskOutcome> {
        self.ensure_idle()?;
        settings.validate()?;

        self.session = Session::new(self.config.agent.max_recent_screenshots);
        info!(model = %settings.model_name, "starting task");

        let screenshot = self.executor.capture_screenshot().await;
        self.session.conversation.append_user_turn(prompt, screenshot);

        Ok(self.run(settings).await)
    }

    /// Continue the current conversation with more user input
    pub async fn send_follow_up(&mut self, text: &str, settings: Settings) -> Result<TaskOutcome> {
        self.ensure_idle()?;
        settings.validate()?;

        debug!(turns = self.session.conversation.len(), "resuming conversation");
        let screenshot = self.executor.capture_screenshot().await;
        self.session.conversation.append_user_turn(text, screenshot);

        Ok(self.run(settings).await)
    }

    /// Request a stop of the running task
    pub fn stop(&self) {
        self.stop.stop();
    }

    /// Handle that can stop the task from another task
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Destroy the session and return to idle
    pub fn reset(&mut self) -> Result<()> {
        self.ensure_idle()?;
        self.session = Session::new(self.config.agent.max_recent_screenshots);
        self.stop.clear();
        self.set_phase(AgentPhase::Idle);
        info!("session reset");
        Ok(())
    }

    /// Current session status
    pub fn status(&self) -> AgentStatus {
        let mut status = self.session.status();
        if status.is_running && self.stop.is_stopped() {
            status.phase = AgentPhase::Stopping;
        }
        status
    }

    /// Watch status changes
    pub fn subscribe_status(&self) -> watch::Receiver<AgentStatus> {
        self.status.subscribe()
    }

    /// Get current configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get mutable configuration, applied from the next invocation on
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Get conversation length
    pub fn conversation_length(&self) -> usize {
        self.session.conversation.len()
    }

    /// Conversation turns, oldest first
    pub fn conversation(&self) -> &[crate::core::Turn] {
        self.session.conversation.turns()
    }

    /// Enable debug mode
    pub fn set_debug(&mut self, debug: bool) {
        self.config.agent.debug = debug;
    }

    fn ensure_idle(&self) -> Result<()> {
        if self.session.is_running {
            return Err(PilotError::AlreadyRunning);
        }
        Ok(())
    }

    fn emit(&self, event: AgentEvent) {
        if let Some(ref tx) = self.events {
            let _ = tx.send(event);
        }
    }

    fn publish(&self) {
        self.status.send_replace(self.status());
    }

    fn set_phase(&mut self, phase: AgentPhase) {
        if self.session.phase != phase {
            debug!(from = %self.session.phase, to = %phase, "phase change");
            self.session.phase = phase;
            self.emit(AgentEvent::PhaseChanged { phase });
        }
        self.publish();
    }

    /// Run the turn loop and settle the session phase afterwards
    async fn run(&mut self, settings: Settings) -> TaskOutcome {
        self.stop.clear();
        self.session.is_running = true;
        self.session.settings = Some(settings.clone());
        self.set_phase(AgentPhase::Running);

        let outcome = self.drive(&settings).await;

        self.session.is_running = false;
        self.session.pending_confirmation = None;
        self.stop.clear();

        if let TaskOutcome::Failed(ref message) = outcome {
            self.emit(AgentEvent::Error {
                message: message.clone(),
            });
            self.set_phase(AgentPhase::Error);
        }
        self.set_phase(outcome.final_phase());

        info!(outcome = ?outcome, "task finished");
        outcome
    }

    async fn drive(&mut self, settings: &Settings) -> TaskOutcome {
        let mut state = AgentLoopState::new();
        let options = ExecuteOptions {
            highlight_mouse: settings.highlight_mouse,
        };

        loop {
            if self.stop.is_stopped() {
                return TaskOutcome::Stopped;
            }

            let outcome = self
                .gateway
                .get_model_response(self.session.conversation.turns(), settings)
                .await;

            if self.stop.is_stopped() {
                return TaskOutcome::Stopped;
            }

            let reply = match outcome {
                Ok(GatewayOutcome::Reply(reply)) => reply,
                Ok(GatewayOutcome::RetryTurn) => {
                    let consecutive = state.retry_turn();
                    if consecutive > MAX_CONSECUTIVE_RETRIES {
                        warn!(
                            retried_turns = state.retried_turns,
                            "model keeps returning malformed function calls"
                        );
                        return TaskOutcome::Failed(format!(
                            "Model returned a malformed function call {} times in a row",
                            consecutive
                        ));
                    }
                    debug!(consecutive, "malformed function call, re-issuing the turn");
                    self.emit(AgentEvent::RetryingTurn);
                    sleep(RETRY_TURN_DELAY).await;
                    continue;
                }
                Err(e) => {
                    warn!(error = %e, "model call failed");
                    return TaskOutcome::Failed(e.to_string());
                }
            };
            state.next_turn();

            if !reply.thought_summary.is_empty() {
                self.emit(AgentEvent::ThoughtSummary {
                    text: reply.thought_summary.clone(),
                });
            }
            if !reply.text.is_empty() {
                self.emit(AgentEvent::Reasoning {
                    text: reply.text.clone(),
                });
            }

            let terminal = reply.is_terminal();
            self.session.conversation.append_model_turn(reply.content);
            self.publish();

            if terminal {
                info!(
                    turns = state.turn,
                    retried_turns = state.retried_turns,
                    "model finished without further actions"
                );
                return if is_question(&reply.text) {
                    TaskOutcome::NeedsInput(reply.text)
                } else {
                    TaskOutcome::Completed(reply.text)
                };
            }

            debug!(
                turn = state.turn,
                calls = reply.function_calls.len(),
                "executing batch"
            );
            let batch = self
                .execute_batch(&reply.function_calls, &options, &mut state)
                .await;

            self.session
                .conversation
                .append_function_responses(batch.responses);
            self.session.conversation.prune_old_screenshots();
            self.publish();

            if batch.stopped || self.stop.is_stopped() {
                return TaskOutcome::Stopped;
            }
            if let Some(action) = batch.denied {
                if self.config.agent.denial_policy == DenialPolicy::Terminate {
                    info!(action = %action, "ending task after denied action");
                    return TaskOutcome::Denied(action);
                }
            }

            if self.config.agent.debug {
                debug!("observations so far:\n{}", state.format_observations());
            }

            sleep(INTER_BATCH_DELAY).await;
        }
    }

    /// Execute calls in order. Every call gets exactly one response, so
    /// calls after a stop or denial are answered as skipped.
    async fn execute_batch(
        &mut self,
        calls: &[FunctionCall],
        options: &ExecuteOptions,
        state: &mut AgentLoopState,
    ) -> BatchResult {
        let mut batch = BatchResult::default();

        for (index, call) in calls.iter().enumerate() {
            if self.stop.is_stopped() {
                batch.stopped = true;
                self.skip_remaining(&calls[index..], "Skipped: task stopped by user", &mut batch)
                    .await;
                break;
            }

            let action = format_call(call);
            let check = safety::check(call);
            let mut acknowledged = false;

            if check.required {
                let prompt = SafetyPrompt {
                    action: action.clone(),
                    explanation: check
                        .explanation
                        .unwrap_or_else(|| safety::DEFAULT_EXPLANATION.to_string()),
                };
                let allowed = match self.await_confirmation(prompt).await {
                    Ok(allowed) => allowed,
                    Err(e) => {
                        warn!(error = %e, "confirmation could not be requested");
                        false
                    }
                };

                if !allowed {
                    let url = self.executor.current_url().await;
                    let denial = PilotError::UserDenied(action.clone()).to_string();
                    let result = ActionResult::failure(url, denial).with_field("denied", true);
                    state.add_observation(Observation::from_result(&action, &result));
                    batch
                        .responses
                        .push(FunctionResponse::from_result(&call.name, &result, None));
                    self.skip_remaining(
                        &calls[index + 1..],
                        "Skipped: an earlier action in this batch was denied",
                        &mut batch,
                    )
                    .await;
                    batch.denied = Some(action);
                    break;
                }

                if self.stop.is_stopped() {
                    batch.stopped = true;
                    self.skip_remaining(&calls[index..], "Skipped: task stopped by user", &mut batch)
                        .await;
                    break;
                }
                acknowledged = true;
            }

            self.emit(AgentEvent::ActionStarted {
                action: action.clone(),
            });

            let result = self.executor.execute_call(call, options).await;
            self.executor.settle().await;
            let screenshot = self.executor.capture_screenshot().await;

            self.emit(AgentEvent::ActionFinished {
                action: action.clone(),
                success: result.success,
                url: result.url.clone(),
                error: result.error.clone(),
            });
            state.add_observation(Observation::from_result(&action, &result));

            let mut response = FunctionResponse::from_result(&call.name, &result, screenshot);
            if acknowledged {
                response.acknowledge_safety();
            }
            batch.responses.push(response);

            if self.stop.is_stopped() {
                batch.stopped = true;
                self.skip_remaining(&calls[index + 1..], "Skipped: task stopped by user", &mut batch)
                    .await;
                break;
            }
            sleep(INTER_ACTION_DELAY).await;
        }

        batch
    }

    /// Answer calls that will not run
    async fn skip_remaining(&self, calls: &[FunctionCall], reason: &str, batch: &mut BatchResult) {
        if calls.is_empty() {
            return;
        }
        let url = self.executor.current_url().await;
        for call in calls {
            debug!(action = %call.name, reason, "skipping action");
            let result = ActionResult::failure(url.clone(), reason).with_field("skipped", true);
            batch
                .responses
                .push(FunctionResponse::from_result(&call.name, &result, None));
        }
    }

    /// Block on the approver for one gated action
    async fn await_confirmation(&mut self, prompt: SafetyPrompt) -> Result<bool> {
        if self.session.pending_confirmation.is_some() {
            return Err(PilotError::ConfirmationPending);
        }

        info!(action = %prompt.action, "action requires confirmation");
        self.session.pending_confirmation = Some(prompt.clone());
        self.publish();
        self.emit(AgentEvent::SafetyPrompt {
            prompt: prompt.clone(),
        });

        let approver = self.approver.clone();
        let allowed = match self.config.agent.safety_timeout_secs {
            Some(secs) => match timeout(Duration::from_secs(secs), approver.confirm(&prompt)).await {
                Ok(allowed) => allowed,
                Err(_) => {
                    warn!(action = %prompt.action, secs, "confirmation timed out, denying");
                    false
                }
            },
            None => approver.confirm(&prompt).await,
        };

        self.session.pending_confirmation = None;
        self.publish();
        self.emit(AgentEvent::SafetyResolved {
            action: prompt.action.clone(),
            allowed,
        });
        info!(action = %prompt.action, allowed, "confirmation resolved");

        Ok(allowed)
    }
}
