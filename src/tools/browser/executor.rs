//! Action executor - dispatches browser actions to the page actuator
//!
//! Converts model-space coordinates to pixels, retries once after
//! re-injecting a missing actuator, and folds every failure into an
//! [`ActionResult`] so nothing is thrown across this boundary.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};
use url::Url;

use crate::core::{ActionResult, FunctionCall, InlineImage, PilotError, Result};
use crate::tools::browser::actions::{parse_key_combination, BrowserAction};
use crate::tools::browser::actuator::{Actuator, ActuatorRequest};
use crate::tools::browser::coords::{denormalize, Viewport};

/// Duration of `wait_5_seconds`
pub const WAIT_ACTION: Duration = Duration::from_secs(5);
/// Quiesce delay before and after a navigation wait
pub const SETTLE_DELAY: Duration = Duration::from_millis(500);
/// Upper bound for waiting on an in-flight navigation
pub const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(10);
/// Polling interval while a navigation is in flight
const LOAD_POLL_INTERVAL: Duration = Duration::from_millis(100);
/// Scroll distance used when the model omits `magnitude` (model space)
pub const DEFAULT_SCROLL_MAGNITUDE: i64 = 800;

/// Per-dispatch options
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecuteOptions {
    /// Draw the synthetic cursor while acting
    pub highlight_mouse: bool,
}

/// Executor for browser actions
pub struct ActionExecutor {
    actuator: Arc<dyn Actuator>,
    /// Page opened by `search`
    search_url: String,
}

impl ActionExecutor {
    /// Create a new executor over an actuator
    pub fn new(actuator: Arc<dyn Actuator>) -> Self {
        Self {
            actuator,
            search_url: "https://www.google.com".to_string(),
        }
    }

    /// Set the page opened by `search`
    pub fn with_search_url(mut self, url: impl Into<String>) -> Self {
        self.search_url = url.into();
        self
    }

    /// The underlying actuator
    pub fn actuator(&self) -> &Arc<dyn Actuator> {
        &self.actuator
    }

    /// Parse and execute a raw function call.
    ///
    /// Unknown names and malformed arguments come back as failed results.
    pub async fn execute_call(&self, call: &FunctionCall, options: &ExecuteOptions) -> ActionResult {
        match BrowserAction::from_call(call) {
            Ok(action) => self.execute(&action, options).await,
            Err(e) => {
                warn!(action = %call.name, error = %e, "rejected function call");
                ActionResult::failure(self.current_url().await, e.to_string())
            }
        }
    }

    /// Execute one action against the active page
    pub async fn execute(&self, action: &BrowserAction, options: &ExecuteOptions) -> ActionResult {
        info!(action = %action, "executing browser action");

        if let BrowserAction::Wait5Seconds = action {
            sleep(WAIT_ACTION).await;
            return ActionResult::success(self.current_url().await)
                .with_field("waited", WAIT_ACTION.as_millis() as u64);
        }

        let request = match self.build_request(action, options).await {
            Ok(request) => request,
            Err(e) => return ActionResult::failure(self.current_url().await, e.to_string()),
        };

        match self.dispatch(&request).await {
            Ok(mut result) => {
                if result.url.is_empty() {
                    result.url = self.current_url().await;
                }
                if !result.success && result.error.is_none() {
                    result.error = Some(format!("{} failed", action.name()));
                }
                result
            }
            Err(e) => {
                warn!(action = %action.name(), error = %e, "action failed");
                ActionResult::failure(self.current_url().await, e.to_string())
            }
        }
    }

    /// Send a request, re-injecting the actuator once if it is missing
    async fn dispatch(&self, request: &ActuatorRequest) -> Result<ActionResult> {
        match self.actuator.perform(request).await {
            Err(PilotError::ActuatorNotFound) => {
                warn!(action = %request.action, "actuator missing, re-injecting");
                self.actuator.inject().await?;
                self.actuator.perform(request).await
            }
            other => other,
        }
    }

    async fn viewport(&self) -> Viewport {
        match self.actuator.viewport().await {
            Ok(vp) if vp.width > 0 && vp.height > 0 => vp,
            Ok(vp) => {
                warn!(?vp, "actuator reported an empty viewport, using default");
                Viewport::default()
            }
            Err(e) => {
                warn!(error = %e, "could not read viewport, using default");
                Viewport::default()
            }
        }
    }

    /// Translate an action into a pixel-space actuator request
    async fn build_request(
        &self,
        action: &BrowserAction,
        options: &ExecuteOptions,
    ) -> Result<ActuatorRequest> {
        let (name, args) = match action {
            BrowserAction::ClickAt { x, y } | BrowserAction::HoverAt { x, y } => {
                let (px, py) = self.viewport().await.to_pixels(*x, *y);
                (action.name(), json!({ "x": px, "y": py }))
            }
            BrowserAction::TypeTextAt {
                x,
                y,
                text,
                press_enter,
                clear_before_typing,
            } => {
                let (px, py) = self.viewport().await.to_pixels(*x, *y);
                (
                    action.name(),
                    json!({
                        "x": px,
                        "y": py,
                        "text": text,
                        "press_enter": press_enter,
                        "clear_before_typing": clear_before_typing,
                    }),
                )
            }
            BrowserAction::ScrollDocument { direction } => {
                (action.name(), json!({ "direction": direction.as_str() }))
            }
            BrowserAction::ScrollAt {
                x,
                y,
                direction,
                magnitude,
            } => {
                let vp = self.viewport().await;
                let (px, py) = vp.to_pixels(*x, *y);
                let axis = if direction.is_vertical() {
                    vp.height
                } else {
                    vp.width
                };
                let distance = denormalize(magnitude.unwrap_or(DEFAULT_SCROLL_MAGNITUDE), axis);
                (
                    action.name(),
                    json!({
                        "x": px,
                        "y": py,
                        "direction": direction.as_str(),
                        "magnitude": distance,
                    }),
                )
            }
            BrowserAction::Navigate { url } => ("navigate", json!({ "url": normalize_url(url)? })),
            BrowserAction::Search => ("navigate", json!({ "url": self.search_url })),
            BrowserAction::KeyCombination { keys } => {
                let resolved = parse_key_combination(keys);
                if resolved.is_empty() {
                    return Err(PilotError::invalid_args(action.name(), "no keys given"));
                }
                (action.name(), json!({ "keys": resolved }))
            }
            BrowserAction::DragAndDrop {
                x,
                y,
                destination_x,
                destination_y,
            } => {
                let vp = self.viewport().await;
                let (px, py) = vp.to_pixels(*x, *y);
                let (dx, dy) = vp.to_pixels(*destination_x, *destination_y);
                (
                    action.name(),
                    json!({
                        "x": px,
                        "y": py,
                        "destination_x": dx,
                        "destination_y": dy,
                    }),
                )
            }
            BrowserAction::GoBack
            | BrowserAction::GoForward
            | BrowserAction::OpenWebBrowser
            | BrowserAction::Wait5Seconds => (action.name(), Value::Object(Default::default())),
        };

        Ok(ActuatorRequest {
            action: name.to_string(),
            args,
            highlight_mouse: options.highlight_mouse,
        })
    }

    /// Current page URL, empty when the page cannot be queried
    pub async fn current_url(&self) -> String {
        match self.actuator.page_state().await {
            Ok(state) => state.url,
            Err(e) => {
                debug!(error = %e, "page state unavailable");
                String::new()
            }
        }
    }

    /// Wait for the page to settle after an action.
    ///
    /// Always waits [`SETTLE_DELAY`]. If a navigation is in flight, waits up
    /// to [`NAVIGATION_TIMEOUT`] for it to complete, then settles again.
    pub async fn settle(&self) {
        sleep(SETTLE_DELAY).await;

        let loading = matches!(self.actuator.page_state().await, Ok(state) if state.loading);
        if !loading {
            return;
        }

        let waited = timeout(NAVIGATION_TIMEOUT, async {
            loop {
                sleep(LOAD_POLL_INTERVAL).await;
                match self.actuator.page_state().await {
                    Ok(state) if state.loading => continue,
                    _ => break,
                }
            }
        })
        .await;
        if waited.is_err() {
            warn!("navigation still loading after {:?}", NAVIGATION_TIMEOUT);
        }

        sleep(SETTLE_DELAY).await;
    }

    /// Capture the current page, logging instead of failing
    pub async fn capture_screenshot(&self) -> Option<InlineImage> {
        match self.actuator.screenshot().await {
            Ok(image) => Some(image),
            Err(e) => {
                warn!(error = %e, "screenshot capture failed");
                None
            }
        }
    }
}

/// Give scheme-less URLs an `https://` prefix
pub fn normalize_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(PilotError::invalid_args("navigate", "URL cannot be empty"));
    }

    if let Ok(parsed) = Url::parse(trimmed) {
        if matches!(
            parsed.scheme(),
            "http" | "https" | "file" | "about" | "data" | "chrome"
        ) {
            return Ok(parsed.to_string());
        }
    }

    Url::parse(&format!("https://{}", trimmed))
        .map(|u| u.to_string())
        .map_err(|e| PilotError::invalid_args("navigate", format!("invalid URL '{}': {}", raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::InlineImage;
    use crate::tools::browser::actuator::PageState;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Actuator that is missing for the first `missing` calls
    struct FlakyActuator {
        missing: AtomicUsize,
        injects: AtomicUsize,
        requests: Mutex<Vec<ActuatorRequest>>,
        /// Page-state reads that still report a navigation in flight
        loading: AtomicUsize,
    }

    impl FlakyActuator {
        fn new(missing: usize) -> Self {
            Self {
                missing: AtomicUsize::new(missing),
                injects: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
                loading: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Actuator for FlakyActuator {
        async fn perform(&self, request: &ActuatorRequest) -> Result<ActionResult> {
            self.requests.lock().unwrap().push(request.clone());
            if self.missing.load(Ordering::SeqCst) > 0 {
                self.missing.fetch_sub(1, Ordering::SeqCst);
                return Err(PilotError::ActuatorNotFound);
            }
            Ok(ActionResult::success("https://example.com/"))
        }

        async fn inject(&self) -> Result<()> {
            self.injects.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn viewport(&self) -> Result<Viewport> {
            Ok(Viewport::new(1000, 500))
        }

        async fn page_state(&self) -> Result<PageState> {
            let loading = self
                .loading
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            Ok(PageState {
                url: "https://example.com/".into(),
                loading,
            })
        }

        async fn screenshot(&self) -> Result<InlineImage> {
            Ok(InlineImage::png("AAAA"))
        }

        fn name(&self) -> &str {
            "flaky"
        }
    }

    fn click() -> BrowserAction {
        BrowserAction::ClickAt { x: 500, y: 500 }
    }

    #[tokio::test]
    async fn test_retry_once_after_missing_actuator() {
        let actuator = Arc::new(FlakyActuator::new(1));
        let executor = ActionExecutor::new(actuator.clone());
        let result = executor.execute(&click(), &ExecuteOptions::default()).await;
        assert!(result.success);
        assert_eq!(actuator.injects.load(Ordering::SeqCst), 1);
        assert_eq!(actuator.requests.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_second_missing_actuator_is_folded() {
        let actuator = Arc::new(FlakyActuator::new(2));
        let executor = ActionExecutor::new(actuator.clone());
        let result = executor.execute(&click(), &ExecuteOptions::default()).await;
        assert!(!result.success);
        assert_eq!(result.url, "https://example.com/");
        assert!(result.error.unwrap().contains("Actuator not found"));
        assert_eq!(actuator.requests.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_coordinates_are_denormalized() {
        let actuator = Arc::new(FlakyActuator::new(0));
        let executor = ActionExecutor::new(actuator.clone());
        let options = ExecuteOptions {
            highlight_mouse: true,
        };
        executor.execute(&click(), &options).await;
        let requests = actuator.requests.lock().unwrap();
        assert_eq!(requests[0].args, json!({"x": 500, "y": 250}));
        assert!(requests[0].highlight_mouse);
    }

    #[tokio::test]
    async fn test_scroll_magnitude_follows_axis() {
        let actuator = Arc::new(FlakyActuator::new(0));
        let executor = ActionExecutor::new(actuator.clone());
        let action = BrowserAction::ScrollAt {
            x: 100,
            y: 100,
            direction: crate::tools::browser::actions::Direction::Down,
            magnitude: None,
        };
        executor.execute(&action, &ExecuteOptions::default()).await;
        let requests = actuator.requests.lock().unwrap();
        assert_eq!(requests[0].args["magnitude"], json!(400));
    }

    #[tokio::test]
    async fn test_drag_and_hover_are_denormalized() {
        let actuator = Arc::new(FlakyActuator::new(0));
        let executor = ActionExecutor::new(actuator.clone());
        let drag = BrowserAction::DragAndDrop {
            x: 100,
            y: 200,
            destination_x: 900,
            destination_y: 800,
        };
        executor.execute(&drag, &ExecuteOptions::default()).await;
        executor
            .execute(&BrowserAction::HoverAt { x: 250, y: 500 }, &ExecuteOptions::default())
            .await;

        let requests = actuator.requests.lock().unwrap();
        assert_eq!(requests[0].action, "drag_and_drop");
        assert_eq!(
            requests[0].args,
            json!({"x": 100, "y": 100, "destination_x": 900, "destination_y": 400})
        );
        assert_eq!(requests[1].action, "hover_at");
        assert_eq!(requests[1].args, json!({"x": 250, "y": 250}));
    }

    #[tokio::test]
    async fn test_key_combination_sends_resolved_keys() {
        let actuator = Arc::new(FlakyActuator::new(0));
        let executor = ActionExecutor::new(actuator.clone());
        let call = FunctionCall::new("key_combination", json!({"keys": "ctrl+Shift+esc"}));
        let result = executor
            .execute_call(&call, &ExecuteOptions::default())
            .await;
        assert!(result.success);

        let requests = actuator.requests.lock().unwrap();
        assert_eq!(requests[0].action, "key_combination");
        assert_eq!(
            requests[0].args,
            json!({"keys": ["Control", "Shift", "Escape"]})
        );
    }

    #[tokio::test]
    async fn test_unknown_call_is_structured_error() {
        let actuator = Arc::new(FlakyActuator::new(0));
        let executor = ActionExecutor::new(actuator.clone());
        let call = FunctionCall::new("teleport", json!({}));
        let result = executor
            .execute_call(&call, &ExecuteOptions::default())
            .await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("teleport"));
        assert!(actuator.requests.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_is_not_delegated() {
        let actuator = Arc::new(FlakyActuator::new(0));
        let executor = ActionExecutor::new(actuator.clone());
        let result = executor
            .execute(&BrowserAction::Wait5Seconds, &ExecuteOptions::default())
            .await;
        assert!(result.success);
        assert_eq!(result.extra["waited"], json!(5000));
        assert!(actuator.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_navigates_to_search_url() {
        let actuator = Arc::new(FlakyActuator::new(0));
        let executor =
            ActionExecutor::new(actuator.clone()).with_search_url("https://duckduckgo.com");
        executor
            .execute(&BrowserAction::Search, &ExecuteOptions::default())
            .await;
        let requests = actuator.requests.lock().unwrap();
        assert_eq!(requests[0].action, "navigate");
        assert_eq!(requests[0].args["url"], json!("https://duckduckgo.com"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_settle_without_navigation() {
        let executor = ActionExecutor::new(Arc::new(FlakyActuator::new(0)));
        let start = tokio::time::Instant::now();
        executor.settle().await;
        assert_eq!(start.elapsed(), SETTLE_DELAY);
    }

    #[tokio::test(start_paused = true)]
    async fn test_settle_waits_for_navigation() {
        let actuator = FlakyActuator::new(0);
        actuator.loading.store(3, Ordering::SeqCst);
        let executor = ActionExecutor::new(Arc::new(actuator));
        let start = tokio::time::Instant::now();
        executor.settle().await;
        // 500ms, three polls until loading clears, 500ms
        assert_eq!(start.elapsed(), Duration::from_millis(1300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_settle_gives_up_on_stuck_navigation() {
        let actuator = FlakyActuator::new(0);
        actuator.loading.store(usize::MAX, Ordering::SeqCst);
        let executor = ActionExecutor::new(Arc::new(actuator));
        let start = tokio::time::Instant::now();
        executor.settle().await;
        assert_eq!(start.elapsed(), SETTLE_DELAY * 2 + NAVIGATION_TIMEOUT);
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(normalize_url("weather.com").unwrap(), "https://weather.com/");
        assert_eq!(
            normalize_url("http://example.com/a?b=1").unwrap(),
            "http://example.com/a?b=1"
        );
        assert_eq!(
            normalize_url("localhost:8080/x").unwrap(),
            "https://localhost:8080/x"
        );
        assert!(normalize_url("   ").is_err());
    }
}
