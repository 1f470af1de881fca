use installdesk_core::AccessError;
use thiserror::Error;
use uuid::Uuid;

/// Failure of a store call. Local state is never touched when one is returned.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The row does not exist or is outside the caller's scope.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("forbidden: {0}")]
    Forbidden(#[from] AccessError),

    /// A referential or check constraint rejected the write.
    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("backend error: {0}")]
    Backend(String),
}

impl PersistenceError {
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        Self::NotFound { entity, id }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type StoreResult<T> = Result<T, PersistenceError>;
