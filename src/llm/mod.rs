//! LLM module - model endpoint integration
//!
//! The transport trait, the generateContent wire format, the Gemini HTTP
//! client, and the gateway that retries and classifies responses.

pub mod gateway;
pub mod gemini;
pub mod traits;
pub mod wire;

pub use gateway::{classify, GatewayOutcome, ModelGateway, ModelReply};
pub use gemini::GeminiClient;
pub use traits::{Candidate, FinishReason, ModelResponse, ModelTransport};
