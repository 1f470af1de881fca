//! HTTP listener configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to bind, e.g. `0.0.0.0:8080`.
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Origins allowed on the reminder function route. Empty means any origin.
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            cors_allowed_origins: Vec::new(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}
