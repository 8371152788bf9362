//! Shared fixtures for integration tests
//!
//! Scripted model transport, in-memory page actuator and scripted approver.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use webpilot::agent::{Approver, SafetyPrompt, StopHandle};
use webpilot::core::{
    ActionResult, FunctionCall, InlineImage, Part, PilotError, Result, Settings, Turn,
};
use webpilot::llm::{Candidate, FinishReason, ModelResponse, ModelTransport};
use webpilot::tools::browser::{Actuator, ActuatorRequest, PageState, Viewport};
use webpilot::{Agent, Config};

/// Model transport that replays a fixed script
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<ModelResponse>>>,
    requests: Mutex<Vec<Vec<Turn>>>,
}

impl ScriptedModel {
    pub fn new(replies: Vec<Result<ModelResponse>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Number of generate calls made
    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Conversation sent with the n-th call
    pub fn request(&self, index: usize) -> Vec<Turn> {
        self.requests.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl ModelTransport for ScriptedModel {
    async fn generate(&self, contents: &[Turn], _settings: &Settings) -> Result<ModelResponse> {
        self.requests.lock().unwrap().push(contents.to_vec());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(PilotError::api("script exhausted")))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

pub fn text_reply(text: &str) -> Result<ModelResponse> {
    Ok(ModelResponse::single(Candidate::stop(Turn::model(vec![
        Part::text(text),
    ]))))
}

pub fn calls_reply(calls: Vec<FunctionCall>) -> Result<ModelResponse> {
    Ok(ModelResponse::single(Candidate::stop(Turn::model(
        calls.into_iter().map(Part::FunctionCall).collect(),
    ))))
}

pub fn malformed_reply() -> Result<ModelResponse> {
    Ok(ModelResponse::single(Candidate {
        content: None,
        finish_reason: Some(FinishReason::MalformedFunctionCall),
    }))
}

pub fn call(name: &str, args: Value) -> FunctionCall {
    FunctionCall::new(name, args)
}

/// In-memory page that records every request
pub struct RecordingPage {
    requests: Mutex<Vec<ActuatorRequest>>,
    url: Mutex<String>,
    screenshots: AtomicUsize,
    stop_on_perform: Mutex<Option<StopHandle>>,
}

impl RecordingPage {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            url: Mutex::new("about:blank".to_string()),
            screenshots: AtomicUsize::new(0),
            stop_on_perform: Mutex::new(None),
        })
    }

    pub fn requests(&self) -> Vec<ActuatorRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn screenshots(&self) -> usize {
        self.screenshots.load(Ordering::SeqCst)
    }

    /// Raise a stop while the next action runs
    pub fn stop_during_next_action(&self, handle: StopHandle) {
        *self.stop_on_perform.lock().unwrap() = Some(handle);
    }
}

#[async_trait]
impl Actuator for RecordingPage {
    async fn perform(&self, request: &ActuatorRequest) -> Result<ActionResult> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(handle) = self.stop_on_perform.lock().unwrap().take() {
            handle.stop();
        }
        if request.action == "navigate" {
            if let Some(url) = request.args["url"].as_str() {
                *self.url.lock().unwrap() = url.to_string();
            }
        }
        Ok(ActionResult::success(self.url.lock().unwrap().clone()))
    }

    async fn inject(&self) -> Result<()> {
        Ok(())
    }

    async fn viewport(&self) -> Result<Viewport> {
        Ok(Viewport::new(1440, 900))
    }

    async fn page_state(&self) -> Result<PageState> {
        Ok(PageState {
            url: self.url.lock().unwrap().clone(),
            loading: false,
        })
    }

    async fn screenshot(&self) -> Result<InlineImage> {
        let n = self.screenshots.fetch_add(1, Ordering::SeqCst);
        Ok(InlineImage::png(format!("shot-{}", n)))
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Approver that answers from a queue; denies once the queue is empty
pub struct ScriptedApprover {
    decisions: Mutex<VecDeque<bool>>,
    prompts: Mutex<Vec<SafetyPrompt>>,
}

impl ScriptedApprover {
    pub fn new(decisions: Vec<bool>) -> Arc<Self> {
        Arc::new(Self {
            decisions: Mutex::new(decisions.into()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn prompts(&self) -> Vec<SafetyPrompt> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Approver for ScriptedApprover {
    async fn confirm(&self, prompt: &SafetyPrompt) -> bool {
        self.prompts.lock().unwrap().push(prompt.clone());
        self.decisions.lock().unwrap().pop_front().unwrap_or(false)
    }
}

/// Approver that never answers
pub struct SilentApprover;

#[async_trait]
impl Approver for SilentApprover {
    async fn confirm(&self, _prompt: &SafetyPrompt) -> bool {
        std::future::pending::<bool>().await
    }
}

/// Approver that raises a stop while the prompt is shown, then approves
pub struct StoppingApprover {
    handle: Mutex<Option<StopHandle>>,
}

impl StoppingApprover {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            handle: Mutex::new(None),
        })
    }

    pub fn stop_with(&self, handle: StopHandle) {
        *self.handle.lock().unwrap() = Some(handle);
    }
}

#[async_trait]
impl Approver for StoppingApprover {
    async fn confirm(&self, _prompt: &SafetyPrompt) -> bool {
        if let Some(handle) = self.handle.lock().unwrap().take() {
            handle.stop();
        }
        true
    }
}

pub fn config() -> Config {
    let mut config = Config::default();
    config.api.use_vertex_ai = false;
    config.api.api_key = Some("test-key".to_string());
    config
}

pub fn settings() -> Settings {
    config().settings()
}

pub fn agent(
    config: Config,
    model: Arc<ScriptedModel>,
    page: Arc<RecordingPage>,
    approver: Arc<dyn Approver>,
) -> Agent {
    Agent::new(config, model, page, approver)
}
