//! Configuration loading, validation, and management for CharChat.
//!
//! Loads configuration from `~/.charchat/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use charchat_core::{Settings, TextProvider};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.charchat/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Where state snapshots and avatars are stored
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Maximum words sent to a provider (system entry + history)
    #[serde(default = "default_word_budget")]
    pub word_budget: usize,

    /// OpenAI API base URL
    #[serde(default = "default_openai_url")]
    pub openai_url: String,

    /// Gemini API base URL
    #[serde(default = "default_gemini_url")]
    pub gemini_url: String,

    /// HTTP client timeout for provider calls
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Settings used when the state is initialised for the first time
    #[serde(default)]
    pub settings: Settings,
}

fn default_data_dir() -> PathBuf {
    AppConfig::config_dir().join("state")
}
fn default_word_budget() -> usize {
    2000
}
fn default_openai_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_gemini_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".into()
}
fn default_request_timeout_secs() -> u64 {
    120
}

impl AppConfig {
    /// Load configuration from the default location with env var overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var("CHARCHAT_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }

        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            self.settings.open_ai_key = key;
        }

        if let Ok(key) = std::env::var("GEMINI_API_KEY") {
            self.settings.gemini_key = key;
        }

        if let Ok(provider) = std::env::var("CHARCHAT_CHAT_PROVIDER") {
            match provider.parse::<TextProvider>() {
                Ok(p) => self.settings.chat_response = p,
                Err(e) => tracing::warn!(error = %e, "Ignoring CHARCHAT_CHAT_PROVIDER"),
            }
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".charchat")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.word_budget == 0 {
            return Err(ConfigError::ValidationError(
                "word_budget must be greater than 0".into(),
            ));
        }

        if self.openai_url.trim().is_empty() || self.gemini_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "provider URLs must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            word_budget: default_word_budget(),
            openai_url: default_openai_url(),
            gemini_url: default_gemini_url(),
            request_timeout_secs: default_request_timeout_secs(),
            settings: Settings::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
