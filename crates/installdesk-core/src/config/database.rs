//! Postgres connection settings.
//!
//! The URL comes from `database_url_env` when that variable is set, then from
//! `database_url`, and is otherwise assembled from the individual fields.

use serde::{Deserialize, Serialize};

/// Where the store connects and how its pool is sized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Name of an environment variable holding the full URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_url_env: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,

    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Read the password from this variable instead of the file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_env: Option<String>,

    pub pool: PoolConfig,
    /// Apply the embedded migrations on connect.
    pub run_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url_env: None,
            database_url: None,
            host: "localhost".to_string(),
            port: 5432,
            database: "installdesk".to_string(),
            username: "postgres".to_string(),
            password: None,
            password_env: None,
            pool: PoolConfig::default(),
            run_migrations: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub min_connections: u32,
    pub max_connections: u32,
    pub acquire_timeout_seconds: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_connections: 1,
            max_connections: 5,
            acquire_timeout_seconds: 30,
        }
    }
}

impl DatabaseConfig {
    /// Resolve the URL handed to the pool.
    pub fn connection_string(&self) -> String {
        let from_env = self
            .database_url_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok());
        if let Some(url) = from_env.or_else(|| self.database_url.clone()) {
            return url;
        }

        let credentials = match self.resolved_password() {
            Some(password) => format!("{}:{}", self.username, password),
            None => self.username.clone(),
        };
        format!(
            "postgresql://{credentials}@{}:{}/{}",
            self.host, self.port, self.database
        )
    }

    fn resolved_password(&self) -> Option<String> {
        self.password_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok())
            .or_else(|| self.password.clone())
    }
}
