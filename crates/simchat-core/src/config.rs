use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, SimChatError};

/// Top-level configuration for SimChat.
///
/// Loaded from `~/.simchat/config.toml` by default. Every section falls back
/// to its defaults when missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimChatConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

impl SimChatConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: SimChatConfig = toml::from_str(&content)?;
        config.validate()?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration, falling back to defaults if the file is missing
    /// or invalid.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the configuration as pretty TOML, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Reject values no gateway could work with.
    pub fn validate(&self) -> Result<()> {
        if self.gateway.mode == GatewayMode::Http && self.gateway.base_url.trim().is_empty() {
            return Err(SimChatError::Config(
                "gateway.base_url must not be empty in http mode".to_string(),
            ));
        }
        if self.gateway.request_timeout_secs == 0 {
            return Err(SimChatError::Config(
                "gateway.request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Which gateway implementation to drive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayMode {
    /// Talk to the simulation backend over HTTP.
    #[default]
    Http,
    /// Generate deterministic fallback data locally.
    Offline,
}

/// Simulation backend settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub mode: GatewayMode,
    /// Backend origin, e.g. `http://localhost:8000`.
    pub base_url: String,
    /// Path of the run endpoint.
    pub run_path: String,
    /// Path of the history listing endpoint.
    pub history_path: String,
    /// Per-request timeout. Simulations can take minutes.
    pub request_timeout_secs: u64,
    /// Maximum history entries requested per refresh.
    pub history_limit: u32,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            mode: GatewayMode::Http,
            base_url: "http://localhost:8000".to_string(),
            run_path: "/api/simulation/run".to_string(),
            history_path: "/api/simulation/history".to_string(),
            request_timeout_secs: 300,
            history_limit: 20,
        }
    }
}

/// Fixed texts the chat session writes into the transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Assistant reply appended when a send fails.
    pub failure_message: String,
    /// User entry appended when an override is uploaded.
    pub override_notice: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            failure_message: "Sorry, I encountered an error running the simulation. \
                              Please try again or check if the backend is running."
                .to_string(),
            override_notice: "Using custom IDF file for simulation".to_string(),
        }
    }
}
