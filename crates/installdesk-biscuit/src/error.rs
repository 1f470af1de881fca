//! Error types for session tokens.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BiscuitError {
    #[error("could not generate signing key: {0}")]
    KeyGeneration(String),

    #[error("invalid {kind} key: {reason}")]
    InvalidKey { kind: &'static str, reason: String },

    #[error("could not mint session token: {0}")]
    Mint(String),

    #[error("malformed session token: {0}")]
    Malformed(String),

    /// Bad signature or failed check, including expiry.
    #[error("session rejected: {0}")]
    Rejected(String),

    #[error("session token has no {0} fact")]
    MissingFact(String),

    #[error("session fact {fact} has invalid value {value:?}")]
    InvalidFact { fact: &'static str, value: String },

    #[error("key file: {0}")]
    Io(#[from] std::io::Error),
}

impl BiscuitError {
    pub(crate) fn mint<E: std::fmt::Display>(e: E) -> Self {
        Self::Mint(e.to_string())
    }

    pub(crate) fn rejected<E: std::fmt::Display>(e: E) -> Self {
        Self::Rejected(e.to_string())
    }
}
