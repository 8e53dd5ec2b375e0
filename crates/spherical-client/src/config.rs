//! Client configuration.
//!
//! Loaded from TOML:
//!
//! ```toml
//! base_url = "https://spherical.example.com"
//! token_path = "/home/me/.config/spherical/token"   # optional
//!
//! [reconnect]
//! initial_delay_ms = 250
//! max_delay_ms = 30000
//! backoff_multiplier = 2.0
//! max_attempts = 10                                   # optional
//!
//! [heartbeat]
//! timeout_multiplier = 3
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use spherical_proto::gateway_url;
use url::Url;

use crate::error::ClientError;
use crate::gateway::{GatewayOptions, HeartbeatConfig, ReconnectConfig};

/// Retry settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReconnectSettings {
    /// Delay before the second consecutive retry, in milliseconds.
    pub initial_delay_ms: u64,
    /// Upper bound on the retry delay, in milliseconds.
    pub max_delay_ms: u64,
    /// Growth factor between consecutive delays.
    pub backoff_multiplier: f64,
    /// Consecutive failures tolerated before giving up. Unlimited if unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        let defaults = ReconnectConfig::default();
        Self {
            initial_delay_ms: defaults.initial_delay.as_millis() as u64,
            max_delay_ms: defaults.max_delay.as_millis() as u64,
            backoff_multiplier: defaults.backoff_multiplier,
            max_attempts: defaults.max_attempts,
        }
    }
}

/// Inbound heartbeat settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HeartbeatSettings {
    /// Multiple of the server heartbeat interval to wait for traffic. 0 disables.
    pub timeout_multiplier: u32,
}

impl Default for HeartbeatSettings {
    fn default() -> Self {
        Self {
            timeout_multiplier: HeartbeatConfig::default().timeout_multiplier,
        }
    }
}

/// Main client configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    /// Base URL of the Spherical node, e.g. `https://spherical.example.com`.
    pub base_url: String,
    /// Token file; the per-user config directory is used if unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_path: Option<PathBuf>,
    /// Retry settings.
    #[serde(default)]
    pub reconnect: ReconnectSettings,
    /// Heartbeat settings.
    #[serde(default)]
    pub heartbeat: HeartbeatSettings,
}

impl ClientConfig {
    /// Configuration for `base_url` with default settings.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token_path: None,
            reconnect: ReconnectSettings::default(),
            heartbeat: HeartbeatSettings::default(),
        }
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ClientError::Config(format!(
                "failed to read config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn from_toml(content: &str) -> Result<Self, ClientError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ClientError::Config(format!("invalid TOML: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Render as TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ClientError> {
        toml::to_string_pretty(self)
            .map_err(|e| ClientError::Config(format!("failed to serialize config: {e}")))
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.base_url.is_empty() {
            return Err(ClientError::Config("base_url cannot be empty".to_string()));
        }

        self.gateway_url()?;

        if self.reconnect.initial_delay_ms == 0 {
            return Err(ClientError::Config(
                "reconnect.initial_delay_ms must be greater than 0".to_string(),
            ));
        }

        if self.reconnect.max_delay_ms < self.reconnect.initial_delay_ms {
            return Err(ClientError::Config(
                "reconnect.max_delay_ms cannot be less than reconnect.initial_delay_ms"
                    .to_string(),
            ));
        }

        if !self.reconnect.backoff_multiplier.is_finite() || self.reconnect.backoff_multiplier < 1.0
        {
            return Err(ClientError::Config(
                "reconnect.backoff_multiplier must be at least 1.0".to_string(),
            ));
        }

        if self.reconnect.max_attempts == Some(0) {
            return Err(ClientError::Config(
                "reconnect.max_attempts must be greater than 0 when set".to_string(),
            ));
        }

        Ok(())
    }

    /// Gateway WebSocket URL for `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not an http(s) or ws(s) URL.
    pub fn gateway_url(&self) -> Result<Url, ClientError> {
        gateway_url(&self.base_url)
            .map_err(|e| ClientError::Config(format!("invalid base_url: {e}")))
    }

    /// Connection tunables.
    #[must_use]
    pub fn gateway_options(&self) -> GatewayOptions {
        GatewayOptions {
            reconnect: ReconnectConfig {
                initial_delay: Duration::from_millis(self.reconnect.initial_delay_ms),
                max_delay: Duration::from_millis(self.reconnect.max_delay_ms),
                backoff_multiplier: self.reconnect.backoff_multiplier,
                max_attempts: self.reconnect.max_attempts,
            },
            heartbeat: HeartbeatConfig {
                timeout_multiplier: self.heartbeat.timeout_multiplier,
            },
        }
    }
}
