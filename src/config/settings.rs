//! Configuration settings for classync.
//!
//! Settings are loaded from `~/.classync/config.yaml`.

use std::time::Duration;

use serde::Deserialize;

use crate::cli::args::OutputFormat;
use crate::config::Paths;
use crate::error::ClassyncError;
use crate::features::sync::EngineConfig;

/// Environment variable overriding `api.token`.
pub const TOKEN_ENV: &str = "CLASSYNC_TOKEN";

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// General settings.
    pub general: GeneralConfig,
    /// Dashboard API settings.
    pub api: ApiConfig,
    /// Replay settings.
    pub sync: SyncConfig,
}

/// General application settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Default output format.
    #[serde(default = "default_output_format")]
    pub default_output: OutputFormat,
}

/// Dashboard API settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL relative request paths are resolved against.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Bearer token sent with every call.
    #[serde(default)]
    pub token: Option<String>,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Replay settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Seconds between connectivity checks in `watch`.
    #[serde(default = "default_probe_interval")]
    pub probe_interval_secs: u64,
    /// Drop an entry after this many failures once the server rejects it
    /// with a 4xx. Unset means retry forever.
    #[serde(default)]
    pub discard_after_rejections: Option<u32>,
}

// Default value functions for serde
const fn default_output_format() -> OutputFormat {
    OutputFormat::Pretty
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_probe_interval() -> u64 {
    5
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            default_output: default_output_format(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            probe_interval_secs: default_probe_interval(),
            discard_after_rejections: None,
        }
    }
}

impl ApiConfig {
    /// Request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Token to use: `$CLASSYNC_TOKEN` if set, else the configured one.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.token_with_override(std::env::var(TOKEN_ENV).ok())
    }

    fn token_with_override(&self, env: Option<String>) -> Option<String> {
        env.filter(|t| !t.is_empty())
            .or_else(|| self.token.clone().filter(|t| !t.is_empty()))
    }
}

impl SyncConfig {
    /// Interval between connectivity checks.
    #[must_use]
    pub const fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_secs)
    }

    /// Engine settings derived from this section.
    #[must_use]
    pub const fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            discard_after_rejections: self.discard_after_rejections,
        }
    }
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load() -> Result<Self, ClassyncError> {
        let paths = Paths::new()?;
        Self::load_from_path(&paths.config_file)
    }

    /// Load configuration from a specific path.
    ///
    /// If the config file doesn't exist, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load_from_path(path: &std::path::Path) -> Result<Self, ClassyncError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|e| {
            ClassyncError::Config(format!(
                "Failed to read config file {}: {e}",
                path.display()
            ))
        })?;

        serde_yaml::from_str(&contents).map_err(|e| {
            ClassyncError::Config(format!(
                "Failed to parse config file {}: {e}",
                path.display()
            ))
        })
    }
}
