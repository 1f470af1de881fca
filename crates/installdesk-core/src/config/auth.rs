//! Session token and function key configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Hex-encoded Ed25519 private key used to mint and verify session tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,

    /// Environment variable containing the private key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key_env: Option<String>,

    /// File containing the private key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key_file: Option<PathBuf>,

    /// Lifetime of newly minted session tokens.
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: u32,

    /// Static key accepted as bearer on the reminder function route.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_key_env: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            private_key: None,
            private_key_env: None,
            private_key_file: None,
            token_ttl_hours: default_token_ttl_hours(),
            function_key: None,
            function_key_env: None,
        }
    }
}

impl AuthConfig {
    /// Resolve the private key: environment variable, then file, then inline.
    pub fn resolve_private_key(&self) -> Result<Option<String>, std::io::Error> {
        if let Some(env_var) = &self.private_key_env
            && let Ok(key) = std::env::var(env_var)
        {
            return Ok(Some(key.trim().to_string()));
        }

        if let Some(path) = &self.private_key_file
            && path.exists()
        {
            let key = std::fs::read_to_string(path)?;
            return Ok(Some(key.trim().to_string()));
        }

        Ok(self.private_key.clone())
    }

    pub fn resolve_function_key(&self) -> Option<String> {
        if let Some(env_var) = &self.function_key_env
            && let Ok(key) = std::env::var(env_var)
        {
            return Some(key);
        }
        self.function_key.clone()
    }
}

fn default_token_ttl_hours() -> u32 {
    24
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_private_key_from_file_is_trimmed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "  abcdef0123  ").unwrap();

        let config = AuthConfig {
            private_key_file: Some(file.path().to_path_buf()),
            private_key: Some("inline".to_string()),
            ..Default::default()
        };
        assert_eq!(
            config.resolve_private_key().unwrap().as_deref(),
            Some("abcdef0123")
        );
    }

    #[test]
    fn test_inline_key_used_when_nothing_else_set() {
        let config = AuthConfig {
            private_key: Some("inline".to_string()),
            function_key: Some("anon".to_string()),
            ..Default::default()
        };
        assert_eq!(config.resolve_private_key().unwrap().as_deref(), Some("inline"));
        assert_eq!(config.resolve_function_key().as_deref(), Some("anon"));
    }
}
