//! Ed25519 signing keys for session tokens.

use crate::error::BiscuitError;
use biscuit_auth::{Algorithm, KeyPair as BiscuitKeyPair, PrivateKey, PublicKey};
use rand::RngCore;
use std::path::Path;

/// Signing keypair. The server holds the private half; verification only
/// needs [`KeyPair::public_key`].
pub struct KeyPair {
    inner: BiscuitKeyPair,
}

impl KeyPair {
    pub fn generate() -> Result<Self, BiscuitError> {
        let mut bytes = [0u8; 32];
        rand::rng().fill_bytes(&mut bytes);

        let private_key = PrivateKey::from_bytes(&bytes, Algorithm::Ed25519)
            .map_err(|e| BiscuitError::KeyGeneration(e.to_string()))?;
        Ok(Self {
            inner: BiscuitKeyPair::from(&private_key),
        })
    }

    /// Load from a hex-encoded private key, as produced by `keys generate`.
    pub fn from_private_key_hex(hex: &str) -> Result<Self, BiscuitError> {
        let private_key = PrivateKey::from_bytes_hex(hex.trim(), Algorithm::Ed25519)
            .map_err(|e| BiscuitError::InvalidKey {
                kind: "private",
                reason: e.to_string(),
            })?;
        Ok(Self {
            inner: BiscuitKeyPair::from(&private_key),
        })
    }

    pub fn load_from_file(path: &Path) -> Result<Self, BiscuitError> {
        let hex = std::fs::read_to_string(path)?;
        Self::from_private_key_hex(&hex)
    }

    /// Write the private key as hex. Overwrites an existing file.
    pub fn save_private_key(&self, path: &Path) -> Result<(), BiscuitError> {
        std::fs::write(path, self.private_key_hex())?;
        Ok(())
    }

    pub(crate) fn inner(&self) -> &BiscuitKeyPair {
        &self.inner
    }

    pub fn public_key(&self) -> PublicKey {
        self.inner.public()
    }

    pub fn private_key_hex(&self) -> String {
        self.inner.private().to_bytes_hex()
    }

    pub fn public_key_hex(&self) -> String {
        self.inner.public().to_bytes_hex()
    }
}

pub fn load_public_key_hex(hex: &str) -> Result<PublicKey, BiscuitError> {
    PublicKey::from_bytes_hex(hex.trim(), Algorithm::Ed25519).map_err(|e| BiscuitError::InvalidKey {
        kind: "public",
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_generated_keys_are_distinct() {
        let a = KeyPair::generate().unwrap();
        let b = KeyPair::generate().unwrap();
        assert_ne!(a.private_key_hex(), b.private_key_hex());
    }

    #[test]
    fn test_hex_roundtrip_keeps_public_key() {
        let keypair = KeyPair::generate().unwrap();
        let restored = KeyPair::from_private_key_hex(&keypair.private_key_hex()).unwrap();
        assert_eq!(keypair.public_key_hex(), restored.public_key_hex());

        let public = load_public_key_hex(&keypair.public_key_hex()).unwrap();
        assert_eq!(public.to_bytes_hex(), keypair.public_key_hex());
    }

    #[test]
    fn test_private_key_file_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.key");

        let keypair = KeyPair::generate().unwrap();
        keypair.save_private_key(&path).unwrap();

        let loaded = KeyPair::load_from_file(&path).unwrap();
        assert_eq!(keypair.public_key_hex(), loaded.public_key_hex());
    }

    #[test]
    fn test_garbage_key_is_rejected() {
        assert!(matches!(
            KeyPair::from_private_key_hex("not-hex"),
            Err(BiscuitError::InvalidKey { kind: "private", .. })
        ));
    }
}
