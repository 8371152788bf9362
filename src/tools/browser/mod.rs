//! Browser automation module
//!
//! The fixed action vocabulary, the coordinate mapper, the actuator boundary
//! and the executor that ties them together.

pub mod actions;
pub mod actuator;
pub mod bridge;
pub mod coords;
mod executor;

pub use actions::{format_call, is_known_action, BrowserAction, Direction, ACTION_NAMES};
pub use actuator::{Actuator, ActuatorRequest, PageState};
pub use bridge::BridgeActuator;
pub use coords::{denormalize, normalize, Viewport};
pub use executor::{normalize_url, ActionExecutor, ExecuteOptions};
