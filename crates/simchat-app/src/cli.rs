//! Command-line flags for `simchat`.
//!
//! Each flag overrides the matching config file setting for a single run; the
//! file itself is never rewritten.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::Parser;

use simchat_core::config::{GatewayMode, SimChatConfig};

/// SimChat: describe a building in plain language and get an energy breakdown.
#[derive(Parser, Debug)]
#[command(name = "simchat", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Simulation backend origin, e.g. http://localhost:8000.
    #[arg(long = "base-url")]
    pub base_url: Option<String>,

    /// Generate fallback results locally instead of calling the backend.
    #[arg(long = "offline")]
    pub offline: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > SIMCHAT_CONFIG env var > ~/.simchat/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("SIMCHAT_CONFIG") {
            return PathBuf::from(p);
        }
        config_path_under(std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE")))
    }

    /// Resolve the log filter directive.
    ///
    /// Priority: --log-level flag > RUST_LOG > config file value > "info".
    pub fn resolve_log_level(&self, rust_log: Option<String>, config_level: &str) -> String {
        if let Some(ref level) = self.log_level {
            return level.clone();
        }
        if let Some(directive) = rust_log.filter(|d| !d.trim().is_empty()) {
            return directive;
        }
        if !config_level.trim().is_empty() {
            return config_level.to_string();
        }
        "info".to_string()
    }

    /// Fold gateway flags into the loaded configuration.
    pub fn apply_overrides(&self, config: &mut SimChatConfig) {
        if let Some(ref url) = self.base_url {
            config.gateway.base_url = url.clone();
            config.gateway.mode = GatewayMode::Http;
        }
        if self.offline {
            config.gateway.mode = GatewayMode::Offline;
        }
    }
}

/// `<home>/.simchat/config.toml`, or `config.toml` in the working directory
/// when no home directory is known.
fn config_path_under(home: Option<OsString>) -> PathBuf {
    match home {
        Some(home) if !home.is_empty() => PathBuf::from(home).join(".simchat").join("config.toml"),
        _ => PathBuf::from("config.toml"),
    }
}
