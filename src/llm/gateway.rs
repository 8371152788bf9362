//! Model gateway - retry, classification and extraction
//!
//! Sends the accumulated conversation through a [`ModelTransport`], retries
//! transient failures with exponential backoff, and turns the first
//! candidate into either a [`ModelReply`] or a request to re-issue the turn.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::core::{FunctionCall, Part, PilotError, Result, Settings, Turn};
use crate::llm::traits::{FinishReason, ModelResponse, ModelTransport};

/// Attempts per model call
pub const MAX_ATTEMPTS: u32 = 5;
/// Delay after the first failed attempt, doubled on each further failure
pub const INITIAL_BACKOFF: Duration = Duration::from_millis(1000);

/// What the model decided this turn
#[derive(Debug, Clone, PartialEq)]
pub struct ModelReply {
    /// Raw content, appended to the conversation as-is
    pub content: Turn,
    /// Answer text (parts without the thought flag)
    pub text: String,
    /// Thought summary (parts with the thought flag)
    pub thought_summary: String,
    /// Requested actions, in order
    pub function_calls: Vec<FunctionCall>,
    pub finish_reason: Option<FinishReason>,
}

impl ModelReply {
    /// A reply without function calls ends the task
    pub fn is_terminal(&self) -> bool {
        self.function_calls.is_empty()
    }
}

/// Result of one gateway call
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayOutcome {
    Reply(ModelReply),
    /// Malformed function call with nothing usable; call again unchanged
    RetryTurn,
}

/// Gateway to the model endpoint
pub struct ModelGateway {
    transport: Arc<dyn ModelTransport>,
    max_attempts: u32,
    initial_backoff: Duration,
}

impl ModelGateway {
    /// Create a gateway with the default retry policy
    pub fn new(transport: Arc<dyn ModelTransport>) -> Self {
        Self {
            transport,
            max_attempts: MAX_ATTEMPTS,
            initial_backoff: INITIAL_BACKOFF,
        }
    }

    /// Override the retry policy
    pub fn with_retry(mut self, max_attempts: u32, initial_backoff: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.initial_backoff = initial_backoff;
        self
    }

    /// Delay before the attempt following failed attempt number `attempt`
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.initial_backoff * 2u32.saturating_pow(attempt.saturating_sub(1))
    }

    /// Ask the model for its next decision
    pub async fn get_model_response(
        &self,
        conversation: &[Turn],
        settings: &Settings,
    ) -> Result<GatewayOutcome> {
        let response = self.call_with_retry(conversation, settings).await?;
        classify(response)
    }

    async fn call_with_retry(
        &self,
        conversation: &[Turn],
        settings: &Settings,
    ) -> Result<ModelResponse> {
        let mut attempt = 1;
        loop {
            match self.transport.generate(conversation, settings).await {
                Ok(response) => {
                    debug!(attempt, transport = self.transport.name(), "model call succeeded");
                    return Ok(response);
                }
                Err(e) if !e.is_retryable() || attempt >= self.max_attempts => {
                    return Err(e.with_attempts(attempt));
                }
                Err(e) => {
                    let delay = self.backoff_delay(attempt);
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "model call failed, retrying"
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// Classify a response, in priority order: no candidates, safety block,
/// malformed call with nothing extracted, then extraction.
pub fn classify(response: ModelResponse) -> Result<GatewayOutcome> {
    let candidate = match response.candidates.into_iter().next() {
        Some(candidate) => candidate,
        None => {
            return Err(PilotError::NoResponse(
                response.block_reason.unwrap_or_default(),
            ))
        }
    };

    if let Some(reason) = candidate.finish_reason.as_ref() {
        if reason.is_safety_block() {
            return Err(PilotError::SafetyBlocked(reason.as_str().to_string()));
        }
    }

    let content = candidate.content.unwrap_or_else(|| Turn::model(Vec::new()));

    let mut text = Vec::new();
    let mut thoughts = Vec::new();
    let mut function_calls = Vec::new();
    for part in &content.parts {
        match part {
            Part::Text(t) => text.push(t.as_str()),
            Part::Thought(t) => thoughts.push(t.as_str()),
            Part::FunctionCall(call) => function_calls.push(call.clone()),
            _ => {}
        }
    }
    let text = text.join("").trim().to_string();
    let thought_summary = thoughts.join("").trim().to_string();

    if candidate.finish_reason == Some(FinishReason::MalformedFunctionCall)
        && text.is_empty()
        && function_calls.is_empty()
    {
        warn!("model produced a malformed function call, re-issuing turn");
        return Ok(GatewayOutcome::RetryTurn);
    }

    Ok(GatewayOutcome::Reply(ModelReply {
        content: Turn::model(content.parts),
        text,
        thought_summary,
        function_calls,
        finish_reason: candidate.finish_reason,
    }))
}
