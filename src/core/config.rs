//! Configuration management for webpilot
//!
//! Supports environment variables, config files, and runtime overrides.
//!
//! Config file location: ~/.config/webpilot/config.toml

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

use crate::core::error::{PilotError, Result};

/// Main configuration for webpilot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Model configuration
    #[serde(default)]
    pub model: ModelConfig,
    /// Endpoint and credentials
    #[serde(default)]
    pub api: ApiConfig,
    /// Browser bridge configuration
    #[serde(default)]
    pub browser: BrowserConfig,
    /// Agent loop behavior
    #[serde(default)]
    pub agent: AgentConfig,
}

/// How much reasoning the model is asked to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThinkingLevel {
    /// No thinking config is sent
    #[default]
    Off,
    Low,
    High,
}

impl ThinkingLevel {
    /// Value used in the request's thinking config
    pub fn as_wire(&self) -> Option<&'static str> {
        match self {
            ThinkingLevel::Off => None,
            ThinkingLevel::Low => Some("LOW"),
            ThinkingLevel::High => Some("HIGH"),
        }
    }
}

impl std::str::FromStr for ThinkingLevel {
    type Err = PilotError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" | "none" | "" => Ok(ThinkingLevel::Off),
            "low" => Ok(ThinkingLevel::Low),
            "high" => Ok(ThinkingLevel::High),
            other => Err(PilotError::config(format!(
                "Unknown thinking level '{}'",
                other
            ))),
        }
    }
}

/// Model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Model identifier
    pub name: String,
    /// Thinking level
    #[serde(default)]
    pub thinking_level: ThinkingLevel,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
}

/// Endpoint and credential configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Route requests through Vertex AI instead of the Gemini API
    pub use_vertex_ai: bool,
    /// Gemini API key (API-key mode)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Vertex AI project id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vertex_project: Option<String>,
    /// Vertex AI location
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vertex_location: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Override for the endpoint root (testing, proxies)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// Browser bridge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Helper command that hosts the page actuator
    pub bridge_command: String,
    /// Session name passed to the bridge
    pub session_name: String,
    /// Whether to run in headed mode (visible browser)
    pub headed: bool,
    /// Draw the synthetic mouse cursor on the page
    pub highlight_mouse: bool,
    /// Page opened by the `search` action
    pub search_url: String,
}

/// What happens to a batch when the user denies a gated action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DenialPolicy {
    /// Record the denial, skip the rest of the batch, keep the loop going
    #[default]
    Skip,
    /// End the whole task (legacy behavior)
    Terminate,
}

/// Agent behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Number of recent action turns that keep their screenshots
    /// Default: 3
    pub max_recent_screenshots: usize,
    /// Behavior on safety denial
    #[serde(default)]
    pub denial_policy: DenialPolicy,
    /// Give up on a safety confirmation after this many seconds (counts as
    /// denial). Unset waits forever.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub safety_timeout_secs: Option<u64>,
    /// Whether to show debug output
    pub debug: bool,
}

fn env_flag(key: &str) -> Option<bool> {
    env::var(key).ok().map(|v| v == "true" || v == "1")
}

fn env_nonempty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: env::var("WEBPILOT_MODEL")
                .unwrap_or_else(|_| "gemini-2.5-computer-use-preview-10-2025".to_string()),
            thinking_level: env::var("WEBPILOT_THINKING")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_default(),
            temperature: 1.0,
            top_p: 0.95,
            top_k: 40,
            max_output_tokens: 8192,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            use_vertex_ai: env_flag("WEBPILOT_USE_VERTEX").unwrap_or(false),
            api_key: env_nonempty("GEMINI_API_KEY"),
            vertex_project: env_nonempty("GOOGLE_CLOUD_PROJECT"),
            vertex_location: env_nonempty("GOOGLE_CLOUD_LOCATION")
                .or_else(|| Some("global".to_string())),
            timeout_secs: 120,
            base_url: None,
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            bridge_command: env::var("WEBPILOT_BRIDGE")
                .unwrap_or_else(|_| "webpilot-bridge".to_string()),
            session_name: env::var("WEBPILOT_BROWSER_SESSION")
                .unwrap_or_else(|_| "webpilot".to_string()),
            headed: env_flag("WEBPILOT_BROWSER_HEADED").unwrap_or(false),
            highlight_mouse: env_flag("WEBPILOT_HIGHLIGHT_MOUSE").unwrap_or(false),
            search_url: "https://www.google.com".to_string(),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_recent_screenshots: 3,
            denial_policy: DenialPolicy::default(),
            safety_timeout_secs: None,
            debug: env_flag("WEBPILOT_DEBUG").unwrap_or(false),
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("webpilot")
    }

    /// Get the config file path
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load configuration from file, environment, and defaults
    /// Priority: CLI args > config file > env vars > defaults
    pub fn load() -> Self {
        let _ = dotenvy::dotenv();

        if let Ok(config) = Self::load_from_file() {
            return config;
        }

        Self::default()
    }

    /// Load configuration from file only
    pub fn load_from_file() -> Result<Self> {
        let config_path = Self::config_file();

        if !config_path.exists() {
            return Err(PilotError::config("Config file not found"));
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|e| PilotError::config(format!("Failed to read config: {}", e)))?;

        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| PilotError::config(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<PathBuf> {
        let config_dir = Self::config_dir();
        let config_path = Self::config_file();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .map_err(|e| PilotError::config(format!("Failed to create config dir: {}", e)))?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| PilotError::config(format!("Failed to serialize config: {}", e)))?;

        fs::write(&config_path, content)
            .map_err(|e| PilotError::config(format!("Failed to write config: {}", e)))?;

        Ok(config_path)
    }

    /// Snapshot the per-call settings
    pub fn settings(&self) -> Settings {
        Settings::from_config(self)
    }
}

/// Where requests are authenticated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    ApiKey(String),
    Vertex { project: String, location: String },
}

/// Settings captured at the start of each user-initiated call.
///
/// Immutable for the duration of one loop invocation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub model_name: String,
    pub thinking_level: ThinkingLevel,
    pub use_vertex_ai: bool,
    pub api_key: Option<String>,
    pub vertex_project: Option<String>,
    pub vertex_location: Option<String>,
    pub highlight_mouse: bool,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
}

impl Settings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            model_name: config.model.name.clone(),
            thinking_level: config.model.thinking_level,
            use_vertex_ai: config.api.use_vertex_ai,
            api_key: config.api.api_key.clone(),
            vertex_project: config.api.vertex_project.clone(),
            vertex_location: config.api.vertex_location.clone(),
            highlight_mouse: config.browser.highlight_mouse,
            temperature: config.model.temperature,
            top_p: config.model.top_p,
            top_k: config.model.top_k,
            max_output_tokens: config.model.max_output_tokens,
        }
    }

    /// Resolve credentials, failing when the selected mode is incomplete
    pub fn credentials(&self) -> Result<Credentials> {
        if self.use_vertex_ai {
            let project = self
                .vertex_project
                .clone()
                .filter(|p| !p.trim().is_empty())
                .ok_or_else(|| PilotError::config("Vertex AI requires a project id"))?;
            let location = self
                .vertex_location
                .clone()
                .filter(|l| !l.trim().is_empty())
                .ok_or_else(|| PilotError::config("Vertex AI requires a location"))?;
            Ok(Credentials::Vertex { project, location })
        } else {
            self.api_key
                .clone()
                .filter(|k| !k.trim().is_empty())
                .map(Credentials::ApiKey)
                .ok_or_else(|| PilotError::config("An API key is required (GEMINI_API_KEY)"))
        }
    }

    /// Validate the settings before a loop starts
    pub fn validate(&self) -> Result<()> {
        if self.model_name.trim().is_empty() {
            return Err(PilotError::config("Model name must not be empty"));
        }
        self.credentials().map(|_| ())
    }
}
