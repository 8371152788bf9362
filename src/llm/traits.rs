//! Model transport trait
//!
//! The transport is the black-box RPC that carries one request to the model
//! endpoint. Retry, classification and extraction live above it in the
//! gateway, so tests can script transports directly.

use async_trait::async_trait;

use crate::core::{Result, Settings, Turn};

/// Why the model stopped generating a candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    MaxTokens,
    Safety,
    Recitation,
    Blocklist,
    ProhibitedContent,
    Spii,
    ImageSafety,
    MalformedFunctionCall,
    Other(String),
}

impl FinishReason {
    /// Parse the endpoint's SCREAMING_SNAKE_CASE value
    pub fn parse(raw: &str) -> Self {
        match raw {
            "STOP" => FinishReason::Stop,
            "MAX_TOKENS" => FinishReason::MaxTokens,
            "SAFETY" => FinishReason::Safety,
            "RECITATION" => FinishReason::Recitation,
            "BLOCKLIST" => FinishReason::Blocklist,
            "PROHIBITED_CONTENT" => FinishReason::ProhibitedContent,
            "SPII" => FinishReason::Spii,
            "IMAGE_SAFETY" => FinishReason::ImageSafety,
            "MALFORMED_FUNCTION_CALL" => FinishReason::MalformedFunctionCall,
            other => FinishReason::Other(other.to_string()),
        }
    }

    /// Whether the candidate was withheld by a safety filter
    pub fn is_safety_block(&self) -> bool {
        matches!(
            self,
            FinishReason::Safety
                | FinishReason::Blocklist
                | FinishReason::ProhibitedContent
                | FinishReason::Spii
                | FinishReason::ImageSafety
        )
    }

    pub fn as_str(&self) -> &str {
        match self {
            FinishReason::Stop => "STOP",
            FinishReason::MaxTokens => "MAX_TOKENS",
            FinishReason::Safety => "SAFETY",
            FinishReason::Recitation => "RECITATION",
            FinishReason::Blocklist => "BLOCKLIST",
            FinishReason::ProhibitedContent => "PROHIBITED_CONTENT",
            FinishReason::Spii => "SPII",
            FinishReason::ImageSafety => "IMAGE_SAFETY",
            FinishReason::MalformedFunctionCall => "MALFORMED_FUNCTION_CALL",
            FinishReason::Other(s) => s,
        }
    }
}

/// One generated candidate
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Generated content, absent when the candidate was filtered
    pub content: Option<Turn>,
    pub finish_reason: Option<FinishReason>,
}

impl Candidate {
    /// A candidate that finished normally with the given content
    pub fn stop(content: Turn) -> Self {
        Self {
            content: Some(content),
            finish_reason: Some(FinishReason::Stop),
        }
    }
}

/// Decoded model response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelResponse {
    pub candidates: Vec<Candidate>,
    /// Prompt-level block reason, reported when there are no candidates
    pub block_reason: Option<String>,
}

impl ModelResponse {
    pub fn single(candidate: Candidate) -> Self {
        Self {
            candidates: vec![candidate],
            block_reason: None,
        }
    }
}

/// Trait for model transports
#[async_trait]
pub trait ModelTransport: Send + Sync {
    /// Send the whole conversation and return the decoded response
    async fn generate(&self, contents: &[Turn], settings: &Settings) -> Result<ModelResponse>;

    /// Get the transport name
    fn name(&self) -> &str;
}
