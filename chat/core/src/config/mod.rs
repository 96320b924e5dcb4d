//! TOML Configuration File Support
//!
//! Centralized configuration for the chat session, loaded from
//! `~/.config/market-sentiment/chat.toml`.
//!
//! # Configuration Priority
//!
//! Configuration values are loaded with the following priority (highest first):
//! 1. CLI arguments ([`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [backend]
//! base_url = "http://localhost:8001"
//! chat_path = "/api/chat"
//! connect_timeout_ms = 10000
//!
//! [session]
//! event_capacity = 256
//! failure_notice = "Sorry, something went wrong. Please try again."
//! cancelled_notice = "The request was cancelled."
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default backend base URL
pub const DEFAULT_BASE_URL: &str = "http://localhost:8001";

/// Default chat endpoint path
pub const DEFAULT_CHAT_PATH: &str = "/api/chat";

const ENV_BASE_URL: &str = "SENTIMENT_CHAT_BASE_URL";
const ENV_CHAT_PATH: &str = "SENTIMENT_CHAT_PATH";
const ENV_CONNECT_TIMEOUT: &str = "SENTIMENT_CHAT_CONNECT_TIMEOUT_MS";
const ENV_EVENT_CAPACITY: &str = "SENTIMENT_CHAT_EVENT_CAPACITY";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where the configuration came from (highest-priority layer applied)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// Backend section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendToml {
    /// Base URL of the dashboard backend
    pub base_url: Option<String>,

    /// Path of the streaming chat endpoint
    pub chat_path: Option<String>,

    /// Connection timeout in milliseconds
    pub connect_timeout_ms: Option<u64>,
}

/// Session section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionToml {
    /// Capacity of the session event broadcast channel
    pub event_capacity: Option<usize>,

    /// Text of the notice appended when a transport failure ends an exchange
    pub failure_notice: Option<String>,

    /// Text of the notice appended when the user stops an exchange
    pub cancelled_notice: Option<String>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatToml {
    /// Backend configuration section
    pub backend: BackendToml,

    /// Session configuration section
    pub session: SessionToml,
}

// =============================================================================
// Resolved Configuration
// =============================================================================

/// Where and how to reach the dashboard backend
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackendSettings {
    /// Base URL, e.g. `http://localhost:8001`
    pub base_url: String,
    /// Chat endpoint path, must start with `/`
    pub chat_path: String,
    /// Connection timeout in milliseconds
    pub connect_timeout_ms: u64,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            chat_path: DEFAULT_CHAT_PATH.to_string(),
            connect_timeout_ms: 10_000,
        }
    }
}

/// Session behaviour
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionSettings {
    /// Capacity of the session event broadcast channel
    pub event_capacity: usize,
    /// Text of the failure notice
    pub failure_notice: String,
    /// Text of the cancellation notice
    pub cancelled_notice: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            event_capacity: 256,
            failure_notice: "Sorry, something went wrong. Please try again.".to_string(),
            cancelled_notice: "The request was cancelled.".to_string(),
        }
    }
}

/// Centralized configuration for the chat client
#[derive(Clone, Debug)]
pub struct ChatConfig {
    /// Backend settings
    pub backend: BackendSettings,

    /// Session settings
    pub session: SessionSettings,

    /// Where the configuration came from
    source: ConfigSource,

    /// Path to the config file (if loaded from file)
    pub config_file_path: Option<PathBuf>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            backend: BackendSettings::default(),
            session: SessionSettings::default(),
            source: ConfigSource::Default,
            config_file_path: None,
        }
    }
}

impl ChatConfig {
    /// Create a new configuration with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the configuration source
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Check the configuration for values the session cannot work with
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] describing the first problem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backend.base_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "backend.base_url must not be empty".to_string(),
            ));
        }
        if !self.backend.chat_path.starts_with('/') {
            return Err(ConfigError::ValidationError(format!(
                "backend.chat_path must start with '/', got {:?}",
                self.backend.chat_path
            )));
        }
        if self.session.event_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "session.event_capacity must be greater than 0".to_string(),
            ));
        }
        if self.session.failure_notice == self.session.cancelled_notice {
            return Err(ConfigError::ValidationError(
                "session.failure_notice and session.cancelled_notice must differ".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/market-sentiment/chat.toml` or
/// `~/.config/market-sentiment/chat.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("market-sentiment").join("chat.toml"))
}

/// Load configuration from the default path, environment, and defaults
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be read, parsed, or
/// validated.
pub async fn load_config() -> Result<ChatConfig, ConfigError> {
    load_config_from_path(default_config_path()).await
}

/// Load configuration from a specific path
///
/// A missing file is not an error; defaults are used instead. CLI
/// overrides are not applied here; call [`ConfigOverrides::apply`] afterwards.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read, parsed, or
/// validated.
pub async fn load_config_from_path(path: Option<PathBuf>) -> Result<ChatConfig, ConfigError> {
    load_layers(path, |key| std::env::var(key).ok()).await
}

async fn load_layers<F>(path: Option<PathBuf>, env: F) -> Result<ChatConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    // Start with defaults
    let mut config = ChatConfig::default();

    // Try to load from file
    if let Some(config_path) = path {
        if tokio::fs::try_exists(&config_path).await.unwrap_or(false) {
            let toml_content = tokio::fs::read_to_string(&config_path)
                .await
                .map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: ChatToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config);
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
            config.config_file_path = Some(config_path);
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    // Apply environment variables (overrides file values)
    apply_env_config(&mut config, env);

    config.validate()?;
    Ok(config)
}

fn apply_toml_config(config: &mut ChatConfig, toml: &ChatToml) {
    if let Some(ref url) = toml.backend.base_url {
        config.backend.base_url.clone_from(url);
    }
    if let Some(ref path) = toml.backend.chat_path {
        config.backend.chat_path.clone_from(path);
    }
    if let Some(timeout) = toml.backend.connect_timeout_ms {
        config.backend.connect_timeout_ms = timeout;
    }

    if let Some(capacity) = toml.session.event_capacity {
        config.session.event_capacity = capacity;
    }
    if let Some(ref text) = toml.session.failure_notice {
        config.session.failure_notice.clone_from(text);
    }
    if let Some(ref text) = toml.session.cancelled_notice {
        config.session.cancelled_notice.clone_from(text);
    }
}

/// Apply environment variable overrides to the config
fn apply_env_config<F>(config: &mut ChatConfig, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = env(ENV_BASE_URL) {
        config.backend.base_url = url;
        config.source = ConfigSource::Env;
    }
    if let Some(path) = env(ENV_CHAT_PATH) {
        config.backend.chat_path = path;
        config.source = ConfigSource::Env;
    }
    if let Some(ms) = env(ENV_CONNECT_TIMEOUT).and_then(|v| v.parse::<u64>().ok()) {
        config.backend.connect_timeout_ms = ms;
        config.source = ConfigSource::Env;
    }
    if let Some(capacity) = env(ENV_EVENT_CAPACITY).and_then(|v| v.parse::<usize>().ok()) {
        config.session.event_capacity = capacity;
        config.source = ConfigSource::Env;
    }
}

// =============================================================================
// CLI Overrides
// =============================================================================

/// Command-line overrides, applied on top of file and environment
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Base URL override
    pub base_url: Option<String>,

    /// Chat path override
    pub chat_path: Option<String>,

    /// Connect timeout override
    pub connect_timeout_ms: Option<u64>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set base URL override
    #[must_use]
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = Some(url);
        self
    }

    /// Set chat path override
    #[must_use]
    pub fn with_chat_path(mut self, path: String) -> Self {
        self.chat_path = Some(path);
        self
    }

    /// Set connect timeout override
    #[must_use]
    pub fn with_connect_timeout_ms(mut self, ms: u64) -> Self {
        self.connect_timeout_ms = Some(ms);
        self
    }

    /// Apply overrides to a configuration
    pub fn apply(&self, config: &mut ChatConfig) {
        if self.base_url.is_some() || self.chat_path.is_some() || self.connect_timeout_ms.is_some()
        {
            config.source = ConfigSource::Cli;
        }

        if let Some(ref url) = self.base_url {
            config.backend.base_url.clone_from(url);
        }
        if let Some(ref path) = self.chat_path {
            config.backend.chat_path.clone_from(path);
        }
        if let Some(timeout) = self.connect_timeout_ms {
            config.backend.connect_timeout_ms = timeout;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
