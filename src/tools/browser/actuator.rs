//! The page actuator boundary
//!
//! An actuator turns one named action into native input events on the live
//! page. It lives outside this crate (an injected page script driven by a
//! bridge process, a CDP session, a test double) and must be re-injectable
//! on demand.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{ActionResult, InlineImage, Result};
use crate::tools::browser::coords::Viewport;

/// One dispatch to the actuator, coordinates already in pixels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActuatorRequest {
    pub action: String,
    pub args: Value,
    pub highlight_mouse: bool,
}

/// Location and load status of the active page
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PageState {
    pub url: String,
    /// True while a navigation is still in flight
    #[serde(default)]
    pub loading: bool,
}

/// Trait for page actuators
#[async_trait]
pub trait Actuator: Send + Sync {
    /// Perform one action.
    ///
    /// Returns `PilotError::ActuatorNotFound` when the page script is not
    /// present or not reachable; other failures may come back either as
    /// `Err` or as a result with `success == false`.
    async fn perform(&self, request: &ActuatorRequest) -> Result<ActionResult>;

    /// (Re-)inject the actuator into the active page
    async fn inject(&self) -> Result<()>;

    /// Current viewport size
    async fn viewport(&self) -> Result<Viewport>;

    /// Current page location and load status
    async fn page_state(&self) -> Result<PageState>;

    /// Capture the visible area as a PNG
    async fn screenshot(&self) -> Result<InlineImage>;

    /// Get the actuator name
    fn name(&self) -> &str;
}
