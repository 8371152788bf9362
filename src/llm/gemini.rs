//! Gemini client implementation
//!
//! Async HTTP transport for the generateContent endpoint, either through the
//! Gemini API (API key) or Vertex AI (gcloud access token).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::core::config::{Config, Credentials};
use crate::core::{PilotError, Result, Settings, Turn};
use crate::llm::traits::{ModelResponse, ModelTransport};
use crate::llm::wire::{GenerateContentRequest, GenerateContentResponse};

const GEMINI_API_ROOT: &str = "https://generativelanguage.googleapis.com";

/// Gemini API client
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    /// Replaces the public endpoint root when set
    base_url: Option<String>,
}

impl GeminiClient {
    /// Create a new client from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.api.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.api.base_url.clone(),
        })
    }

    /// Create a client with a custom endpoint root
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: Some(base_url.into()),
        }
    }

    /// Full generateContent URL for the given credentials
    pub fn endpoint(&self, model: &str, credentials: &Credentials) -> String {
        let model = model.trim_start_matches("models/");
        match credentials {
            Credentials::ApiKey(_) => {
                let root = self.base_url.as_deref().unwrap_or(GEMINI_API_ROOT);
                format!(
                    "{}/v1beta/models/{}:generateContent",
                    root.trim_end_matches('/'),
                    model
                )
            }
            Credentials::Vertex { project, location } => {
                let root = match self.base_url.as_deref() {
                    Some(root) => root.trim_end_matches('/').to_string(),
                    None if location == "global" => "https://aiplatform.googleapis.com".to_string(),
                    None => format!("https://{}-aiplatform.googleapis.com", location),
                };
                format!(
                    "{}/v1/projects/{}/locations/{}/publishers/google/models/{}:generateContent",
                    root, project, location, model
                )
            }
        }
    }

    /// Get an access token for Vertex AI from gcloud
    async fn vertex_token() -> Result<String> {
        if let Ok(token) = std::env::var("GOOGLE_OAUTH_ACCESS_TOKEN") {
            if !token.trim().is_empty() {
                return Ok(token.trim().to_string());
            }
        }

        let output = tokio::process::Command::new("gcloud")
            .args(["auth", "print-access-token"])
            .output()
            .await
            .map_err(|e| PilotError::config(format!("Failed to execute gcloud: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PilotError::config(format!(
                "gcloud auth failed: {}",
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// Pull `error.message` out of an error body, falling back to the raw text
fn parse_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}

#[async_trait]
impl ModelTransport for GeminiClient {
    async fn generate(&self, contents: &[Turn], settings: &Settings) -> Result<ModelResponse> {
        let credentials = settings.credentials()?;
        let url = self.endpoint(&settings.model_name, &credentials);
        let request = GenerateContentRequest::new(contents, settings);

        debug!(url = %url, turns = contents.len(), "sending generateContent request");

        let mut builder = self.client.post(&url).json(&request);
        builder = match &credentials {
            Credentials::ApiKey(key) => builder.header("x-goog-api-key", key),
            Credentials::Vertex { .. } => builder.bearer_auth(Self::vertex_token().await?),
        };

        let response = builder.send().await.map_err(|e| {
            if e.is_connect() {
                PilotError::api(format!("Cannot connect to {}: {}", url, e))
            } else if e.is_timeout() {
                PilotError::api(format!("Request timed out: {}", e))
            } else {
                PilotError::api(e.to_string())
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PilotError::api(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(PilotError::api_status(
                status.as_u16(),
                status.canonical_reason().map(str::to_string),
                parse_error_message(&body),
            ));
        }

        let decoded: GenerateContentResponse = serde_json::from_str(&body)
            .map_err(|e| PilotError::api(format!("Failed to parse response: {}", e)))?;

        Ok(ModelResponse::from(decoded))
    }

    fn name(&self) -> &str {
        "gemini"
    }
}
