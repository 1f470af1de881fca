//! Claims carried by a session token.

use chrono::{DateTime, Duration, Utc};
use installdesk_core::Role;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub user_id: Uuid,
    pub role: Role,
    pub issued_at: DateTime<Utc>,
    /// Tokens without an expiry never lapse. The CLI always sets one.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl SessionClaims {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self {
            user_id,
            role,
            issued_at: Utc::now(),
            expires_at: None,
        }
    }

    pub fn expires_in(mut self, ttl: Duration) -> Self {
        self.expires_at = Some(self.issued_at + ttl);
        self
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}
