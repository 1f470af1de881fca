use installdesk_biscuit::BiscuitError;
use installdesk_core::ValidationErrors;
use installdesk_store::PersistenceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("invalid session token: {0}")]
    Token(#[from] BiscuitError),

    #[error("not signed in")]
    SignedOut,
}
