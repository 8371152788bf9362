//! Shared types used across webpilot modules
//!
//! Contains the conversation model (turns and parts), function calls and
//! responses, and the structured result of a browser action.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Model => write!(f, "model"),
        }
    }
}

/// One exchange unit in the conversation
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Turn {
    /// Create a user turn
    pub fn user(parts: Vec<Part>) -> Self {
        Self {
            role: Role::User,
            parts,
        }
    }

    /// Create a model turn
    pub fn model(parts: Vec<Part>) -> Self {
        Self {
            role: Role::Model,
            parts,
        }
    }

    /// Function calls in this turn, in order
    pub fn function_calls(&self) -> impl Iterator<Item = &FunctionCall> {
        self.parts.iter().filter_map(|p| match p {
            Part::FunctionCall(call) => Some(call),
            _ => None,
        })
    }

    /// Function responses in this turn, in order
    pub fn function_responses(&self) -> impl Iterator<Item = &FunctionResponse> {
        self.parts.iter().filter_map(|p| match p {
            Part::FunctionResponse(resp) => Some(resp),
            _ => None,
        })
    }
}

/// An atomic content fragment within a turn
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    /// User prompt text or model reasoning
    Text(String),
    /// Thought summary emitted alongside the answer
    Thought(String),
    /// Inline image (screenshots)
    Image(InlineImage),
    /// A model-issued action request
    FunctionCall(FunctionCall),
    /// The observed outcome of an action
    FunctionResponse(FunctionResponse),
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text(text.into())
    }

    pub fn is_image(&self) -> bool {
        matches!(self, Part::Image(_))
    }
}

/// Base64-encoded inline image data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    pub data: String,
}

impl InlineImage {
    /// Wrap base64 PNG data
    pub fn png(data: impl Into<String>) -> Self {
        Self {
            mime_type: "image/png".to_string(),
            data: data.into(),
        }
    }
}

/// A function call made by the model
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    /// Name of the action to invoke
    pub name: String,
    /// Arguments, empty when the model sent none
    pub args: Map<String, Value>,
    /// Opaque signature that must be echoed back to the model
    pub thought_signature: Option<String>,
}

impl FunctionCall {
    /// Create a new function call
    pub fn new(name: impl Into<String>, args: Value) -> Self {
        let args = match args {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            name: name.into(),
            args,
            thought_signature: None,
        }
    }

    /// Get a string argument by key
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.args
            .get(key)
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    }

    /// Get a boolean argument by key
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.args.get(key).and_then(|v| v.as_bool())
    }

    /// Get an integer argument by key, accepting floats and numeric strings
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        match self.args.get(key)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
            Value::String(s) => s.trim().parse::<f64>().ok().map(|f| f.round() as i64),
            _ => None,
        }
    }
}

/// The response to a function call, fed back to the model
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionResponse {
    pub name: String,
    /// Always contains a `url` entry
    pub response: Map<String, Value>,
    /// Attached content, typically the post-action screenshot
    pub parts: Vec<Part>,
}

impl FunctionResponse {
    /// Build a response from an action result, attaching an optional screenshot
    pub fn from_result(
        name: impl Into<String>,
        result: &ActionResult,
        screenshot: Option<InlineImage>,
    ) -> Self {
        Self {
            name: name.into(),
            response: result.to_response_map(),
            parts: screenshot.map(Part::Image).into_iter().collect(),
        }
    }

    /// The page location recorded in the response
    pub fn url(&self) -> Option<&str> {
        self.response.get("url").and_then(|v| v.as_str())
    }

    /// Whether any attached part carries image data
    pub fn has_image(&self) -> bool {
        self.parts.iter().any(Part::is_image)
    }

    /// Mark this response as acknowledging a safety confirmation
    pub fn acknowledge_safety(&mut self) {
        self.response
            .insert("safety_acknowledgement".to_string(), Value::from("true"));
    }
}

/// Result of executing one browser action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    /// Whether the action succeeded
    pub success: bool,
    /// Page location after the action
    #[serde(default)]
    pub url: String,
    /// Failure description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Action-specific fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ActionResult {
    /// Create a successful result
    pub fn success(url: impl Into<String>) -> Self {
        Self {
            success: true,
            url: url.into(),
            error: None,
            extra: Map::new(),
        }
    }

    /// Create a failed result
    pub fn failure(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            url: url.into(),
            error: Some(error.into()),
            extra: Map::new(),
        }
    }

    /// Attach an action-specific field
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Flatten into the mapping sent back to the model
    pub fn to_response_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("success".to_string(), Value::Bool(self.success));
        map.insert("url".to_string(), Value::String(self.url.clone()));
        for (k, v) in &self.extra {
            map.insert(k.clone(), v.clone());
        }
        if let Some(ref err) = self.error {
            map.insert("error".to_string(), Value::String(err.clone()));
        }
        map
    }
}
