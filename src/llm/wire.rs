//! Wire format of the generateContent endpoint

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::{
    FunctionCall, FunctionResponse, InlineImage, Part, Role, Settings, Turn,
};
use crate::llm::traits::{Candidate, FinishReason, ModelResponse};

/// Environment declared for the computer-use tool
pub const BROWSER_ENVIRONMENT: &str = "ENVIRONMENT_BROWSER";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<WireContent>,
    pub tools: Vec<WireTool>,
    pub generation_config: WireGenerationConfig,
}

impl GenerateContentRequest {
    /// Build a request for the given conversation and settings
    pub fn new(contents: &[Turn], settings: &Settings) -> Self {
        Self {
            contents: contents.iter().map(WireContent::from).collect(),
            tools: vec![WireTool::browser()],
            generation_config: WireGenerationConfig::from(settings),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<WirePart>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WirePart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought_signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<WireBlob>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<WireFunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_response: Option<WireFunctionResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireBlob {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireFunctionCall {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireFunctionResponse {
    pub name: String,
    #[serde(default)]
    pub response: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parts: Vec<WirePart>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireTool {
    pub computer_use: WireComputerUse,
}

impl WireTool {
    pub fn browser() -> Self {
        Self {
            computer_use: WireComputerUse {
                environment: BROWSER_ENVIRONMENT.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WireComputerUse {
    pub environment: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireGenerationConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking_config: Option<WireThinkingConfig>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireThinkingConfig {
    pub thinking_level: String,
    pub include_thoughts: bool,
}

impl From<&Settings> for WireGenerationConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            temperature: settings.temperature,
            top_p: settings.top_p,
            top_k: settings.top_k,
            max_output_tokens: settings.max_output_tokens,
            thinking_config: settings.thinking_level.as_wire().map(|level| WireThinkingConfig {
                thinking_level: level.to_string(),
                include_thoughts: true,
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<WireCandidate>,
    #[serde(default)]
    pub prompt_feedback: Option<WirePromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireCandidate {
    #[serde(default)]
    pub content: Option<WireContent>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WirePromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

impl From<&Part> for WirePart {
    fn from(part: &Part) -> Self {
        match part {
            Part::Text(text) => WirePart {
                text: Some(text.clone()),
                ..Default::default()
            },
            Part::Thought(text) => WirePart {
                text: Some(text.clone()),
                thought: Some(true),
                ..Default::default()
            },
            Part::Image(image) => WirePart {
                inline_data: Some(WireBlob {
                    mime_type: image.mime_type.clone(),
                    data: image.data.clone(),
                }),
                ..Default::default()
            },
            Part::FunctionCall(call) => WirePart {
                thought_signature: call.thought_signature.clone(),
                function_call: Some(WireFunctionCall {
                    name: call.name.clone(),
                    args: Some(Value::Object(call.args.clone())),
                }),
                ..Default::default()
            },
            Part::FunctionResponse(resp) => WirePart {
                function_response: Some(WireFunctionResponse {
                    name: resp.name.clone(),
                    response: resp.response.clone(),
                    parts: resp.parts.iter().map(WirePart::from).collect(),
                }),
                ..Default::default()
            },
        }
    }
}

impl From<&Turn> for WireContent {
    fn from(turn: &Turn) -> Self {
        Self {
            role: Some(turn.role.to_string()),
            parts: turn.parts.iter().map(WirePart::from).collect(),
        }
    }
}

impl WirePart {
    /// Decode into a domain part; parts with no recognised payload are dropped
    pub fn into_part(self) -> Option<Part> {
        if let Some(call) = self.function_call {
            let mut fc = FunctionCall::new(call.name, call.args.unwrap_or(Value::Null));
            fc.thought_signature = self.thought_signature;
            return Some(Part::FunctionCall(fc));
        }
        if let Some(resp) = self.function_response {
            return Some(Part::FunctionResponse(FunctionResponse {
                name: resp.name,
                response: resp.response,
                parts: resp.parts.into_iter().filter_map(WirePart::into_part).collect(),
            }));
        }
        if let Some(blob) = self.inline_data {
            return Some(Part::Image(InlineImage {
                mime_type: blob.mime_type,
                data: blob.data,
            }));
        }
        match (self.text, self.thought) {
            (Some(text), Some(true)) => Some(Part::Thought(text)),
            (Some(text), _) => Some(Part::Text(text)),
            (None, _) => None,
        }
    }
}

impl WireContent {
    /// Decode into a turn, defaulting to the model role
    pub fn into_turn(self) -> Turn {
        let role = match self.role.as_deref() {
            Some("user") => Role::User,
            _ => Role::Model,
        };
        Turn {
            role,
            parts: self.parts.into_iter().filter_map(WirePart::into_part).collect(),
        }
    }
}

impl From<GenerateContentResponse> for ModelResponse {
    fn from(response: GenerateContentResponse) -> Self {
        ModelResponse {
            candidates: response
                .candidates
                .into_iter()
                .map(|c| Candidate {
                    content: c.content.map(WireContent::into_turn),
                    finish_reason: c.finish_reason.as_deref().map(FinishReason::parse),
                })
                .collect(),
            block_reason: response.prompt_feedback.and_then(|f| f.block_reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{Config, ThinkingLevel};
    use crate::core::ActionResult;
    use serde_json::json;

    #[test]
    fn test_request_shape() {
        let mut settings = Config::default().settings();
        settings.thinking_level = ThinkingLevel::High;
        let turns = vec![Turn::user(vec![
            Part::text("check the weather"),
            Part::Image(InlineImage::png("AAAA")),
        ])];
        let request = serde_json::to_value(GenerateContentRequest::new(&turns, &settings)).unwrap();

        assert_eq!(
            request["tools"],
            json!([{"computerUse": {"environment": "ENVIRONMENT_BROWSER"}}])
        );
        assert_eq!(request["contents"][0]["role"], json!("user"));
        assert_eq!(
            request["contents"][0]["parts"][1]["inlineData"]["mimeType"],
            json!("image/png")
        );
        assert_eq!(
            request["generationConfig"]["thinkingConfig"],
            json!({"thinkingLevel": "HIGH", "includeThoughts": true})
        );
        assert_eq!(request["generationConfig"]["topK"], json!(40));
    }

    #[test]
    fn test_no_thinking_config_when_off() {
        let mut settings = Config::default().settings();
        settings.thinking_level = ThinkingLevel::Off;
        let request = serde_json::to_value(GenerateContentRequest::new(&[], &settings)).unwrap();
        assert!(request["generationConfig"].get("thinkingConfig").is_none());
    }

    #[test]
    fn test_function_response_encoding() {
        let resp = FunctionResponse::from_result(
            "navigate",
            &ActionResult::success("https://weather.com/"),
            Some(InlineImage::png("BBBB")),
        );
        let part = WirePart::from(&Part::FunctionResponse(resp));
        let value = serde_json::to_value(part).unwrap();
        assert_eq!(value["functionResponse"]["response"]["url"], json!("https://weather.com/"));
        assert_eq!(
            value["functionResponse"]["parts"][0]["inlineData"]["data"],
            json!("BBBB")
        );
    }

    #[test]
    fn test_response_decoding() {
        let raw = json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        {"text": "planning", "thought": true},
                        {"text": "I'll open the site."},
                        {"functionCall": {"name": "navigate", "args": {"url": "weather.com"}},
                         "thoughtSignature": "sig"},
                        {"functionCall": {"name": "go_back"}}
                    ]
                },
                "finishReason": "STOP"
            }]
        });
        let decoded: GenerateContentResponse = serde_json::from_value(raw).unwrap();
        let response = ModelResponse::from(decoded);
        let turn = response.candidates[0].content.clone().unwrap();

        assert_eq!(turn.role, Role::Model);
        assert_eq!(turn.parts[0], Part::Thought("planning".into()));
        assert_eq!(turn.parts[1], Part::Text("I'll open the site.".into()));
        let calls: Vec<_> = turn.function_calls().collect();
        assert_eq!(calls[0].thought_signature.as_deref(), Some("sig"));
        assert!(calls[1].args.is_empty());
        assert_eq!(response.candidates[0].finish_reason, Some(FinishReason::Stop));
    }

    #[test]
    fn test_prompt_block_decoding() {
        let raw = json!({"promptFeedback": {"blockReason": "PROHIBITED_CONTENT"}});
        let decoded: GenerateContentResponse = serde_json::from_value(raw).unwrap();
        let response = ModelResponse::from(decoded);
        assert!(response.candidates.is_empty());
        assert_eq!(response.block_reason.as_deref(), Some("PROHIBITED_CONTENT"));
    }
}
