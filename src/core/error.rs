//! Custom error types for webpilot
//!
//! Provides a unified error handling system across all modules.

use thiserror::Error;

/// Main error type for webpilot operations
#[derive(Error, Debug)]
pub enum PilotError {
    /// Model endpoint errors (auth, rate limit, network, malformed response)
    #[error("{}", format_api_error(.message, .status, .status_text, .attempts))]
    Api {
        message: String,
        status: Option<u16>,
        status_text: Option<String>,
        attempts: u32,
    },

    /// The model returned no candidates
    #[error("Model returned no response{}", suffix(.0))]
    NoResponse(String),

    /// The model response itself was blocked for safety reasons
    #[error("Response blocked by safety filters ({0})")]
    SafetyBlocked(String),

    /// The page actuator is missing or unreachable
    #[error("Actuator not found on the active page")]
    ActuatorNotFound,

    /// Action-specific actuator failure
    #[error("Actuator error: {0}")]
    Actuator(String),

    /// Function call name outside the action vocabulary
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    /// Function call arguments did not match the action contract
    #[error("Invalid arguments for {action}: {message}")]
    InvalidArgs { action: String, message: String },

    /// The user rejected a safety-gated action
    #[error("User denied action: {0}")]
    UserDenied(String),

    /// A task is already running in this session
    #[error("Agent is already running")]
    AlreadyRunning,

    /// A safety confirmation is already outstanding
    #[error("A safety confirmation is already pending")]
    ConfirmationPending,

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error for other cases
    #[error("{0}")]
    Other(String),
}

/// Convenience Result type for webpilot operations
pub type Result<T> = std::result::Result<T, PilotError>;

fn suffix(detail: &str) -> String {
    if detail.is_empty() {
        String::new()
    } else {
        format!(": {}", detail)
    }
}

fn format_api_error(
    message: &str,
    status: &Option<u16>,
    status_text: &Option<String>,
    attempts: &u32,
) -> String {
    let mut out = String::from("API error");
    match (status, status_text) {
        (Some(code), Some(text)) => out.push_str(&format!(" ({} {})", code, text)),
        (Some(code), None) => out.push_str(&format!(" ({})", code)),
        (None, Some(text)) => out.push_str(&format!(" ({})", text)),
        (None, None) => {}
    }
    out.push_str(": ");
    out.push_str(message);
    if *attempts > 1 {
        out.push_str(&format!(" [after {} attempts]", attempts));
    }
    out
}

impl PilotError {
    /// Create an API error without an HTTP status (network, parse)
    pub fn api(msg: impl Into<String>) -> Self {
        Self::Api {
            message: msg.into(),
            status: None,
            status_text: None,
            attempts: 1,
        }
    }

    /// Create an API error from an HTTP status
    pub fn api_status(status: u16, status_text: Option<String>, msg: impl Into<String>) -> Self {
        Self::Api {
            message: msg.into(),
            status: Some(status),
            status_text,
            attempts: 1,
        }
    }

    /// Create an actuator error
    pub fn actuator(msg: impl Into<String>) -> Self {
        Self::Actuator(msg.into())
    }

    /// Create an invalid-arguments error
    pub fn invalid_args(action: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::InvalidArgs {
            action: action.into(),
            message: msg.into(),
        }
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether the model gateway may retry after this error.
    ///
    /// Network failures, timeouts, rate limits and server errors are
    /// transient. Every other 4xx (notably 401/403) is final.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Api { status: None, .. } => true,
            Self::Api {
                status: Some(code), ..
            } => *code == 408 || *code == 429 || *code >= 500,
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }

    /// Record how many attempts were made before this error surfaced
    pub fn with_attempts(self, count: u32) -> Self {
        match self {
            Self::Api {
                message,
                status,
                status_text,
                ..
            } => Self::Api {
                message,
                status,
                status_text,
                attempts: count,
            },
            Self::Http(e) => Self::Api {
                status: e.status().map(|s| s.as_u16()),
                status_text: e
                    .status()
                    .and_then(|s| s.canonical_reason())
                    .map(str::to_string),
                message: e.to_string(),
                attempts: count,
            },
            other => other,
        }
    }
}
