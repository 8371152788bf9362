//! Tools module - what the agent can do to the page
//!
//! Contains the browser action vocabulary, actuator boundary and executor.

pub mod browser;

pub use browser::{ActionExecutor, Actuator, BrowserAction};
