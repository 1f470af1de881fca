//! Configuration types for InstallDesk.
//!
//! A single YAML document with four optional sections:
//!
//! ```yaml
//! database:
//!   database_url_env: DATABASE_URL
//! server:
//!   bind: 0.0.0.0:8080
//! auth:
//!   private_key_env: INSTALLDESK_PRIVATE_KEY
//!   token_ttl_hours: 24
//! reminders:
//!   lead_days: 3
//! ```

pub mod auth;
pub mod database;
pub mod reminders;
pub mod server;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub use auth::AuthConfig;
pub use database::{DatabaseConfig, PoolConfig};
pub use reminders::RemindersConfig;
pub use server::ServerConfig;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub reminders: RemindersConfig,
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` when given, otherwise fall back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reminders.lead_days < 0 {
            return Err(ConfigError::Config(
                "reminders.lead_days must not be negative".to_string(),
            ));
        }
        if self.reminders.upcoming_horizon_days < 0 {
            return Err(ConfigError::Config(
                "reminders.upcoming_horizon_days must not be negative".to_string(),
            ));
        }
        if self.auth.token_ttl_hours == 0 {
            return Err(ConfigError::Config(
                "auth.token_ttl_hours must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
