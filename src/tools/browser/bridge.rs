//! Bridge actuator - drives the page through an external helper command
//!
//! The helper owns the browser and the injected page script. Each call runs
//! `<bridge> --session <name> [--headed] <verb> [payload]` and reads the
//! answer from stdout.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::core::config::BrowserConfig;
use crate::core::{ActionResult, InlineImage, PilotError, Result};
use crate::tools::browser::actuator::{Actuator, ActuatorRequest, PageState};
use crate::tools::browser::coords::Viewport;

/// Exit code the bridge uses when the page script is missing
const EXIT_ACTUATOR_MISSING: i32 = 3;

/// Actuator backed by a bridge process
pub struct BridgeActuator {
    /// Helper program
    command: String,
    /// Session name for isolation
    session_name: String,
    /// Whether to run in headed mode
    headed: bool,
}

impl BridgeActuator {
    /// Create a new bridge actuator
    pub fn new(command: impl Into<String>, session_name: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            session_name: session_name.into(),
            headed: false,
        }
    }

    /// Create a bridge actuator from configuration
    pub fn from_config(config: &BrowserConfig) -> Self {
        let mut bridge = Self::new(&config.bridge_command, &config.session_name);
        bridge.set_headed(config.headed);
        bridge
    }

    /// Set headed mode
    pub fn set_headed(&mut self, headed: bool) {
        self.headed = headed;
    }

    /// Check if the bridge is installed
    pub async fn is_available(&self) -> bool {
        Command::new(&self.command)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// Run a bridge command
    async fn run_command(&self, args: &[&str]) -> Result<String> {
        let mut cmd = Command::new(&self.command);
        cmd.args(["--session", &self.session_name]);

        if self.headed {
            cmd.arg("--headed");
        }

        cmd.args(args);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        debug!(command = %self.command, verb = args.first().copied().unwrap_or(""), "bridge call");

        let output = cmd.output().await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PilotError::actuator(format!(
                    "bridge command '{}' not found on PATH",
                    self.command
                ))
            } else {
                PilotError::actuator(format!("Failed to run bridge: {}", e))
            }
        })?;

        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if output.status.code() == Some(EXIT_ACTUATOR_MISSING)
            || stderr.to_ascii_lowercase().contains("actuator not found")
        {
            return Err(PilotError::ActuatorNotFound);
        }

        Err(PilotError::actuator(format!(
            "bridge command failed: {}",
            stderr.trim()
        )))
    }
}

#[async_trait]
impl Actuator for BridgeActuator {
    async fn perform(&self, request: &ActuatorRequest) -> Result<ActionResult> {
        let payload = serde_json::to_string(request)?;
        let output = self.run_command(&["act", &payload]).await?;
        serde_json::from_str(output.trim())
            .map_err(|e| PilotError::actuator(format!("unreadable action result: {}", e)))
    }

    async fn inject(&self) -> Result<()> {
        self.run_command(&["inject"]).await.map(|_| ())
    }

    async fn viewport(&self) -> Result<Viewport> {
        let output = self.run_command(&["viewport"]).await?;
        Ok(serde_json::from_str(output.trim())?)
    }

    async fn page_state(&self) -> Result<PageState> {
        let output = self.run_command(&["state"]).await?;
        Ok(serde_json::from_str(output.trim())?)
    }

    async fn screenshot(&self) -> Result<InlineImage> {
        let output = self.run_command(&["screenshot"]).await?;
        let data = output.trim();
        if data.is_empty() {
            return Err(PilotError::actuator("bridge returned an empty screenshot"));
        }
        Ok(InlineImage::png(data))
    }

    fn name(&self) -> &str {
        "bridge"
    }
}

impl Default for BridgeActuator {
    fn default() -> Self {
        Self::from_config(&BrowserConfig::default())
    }
}
