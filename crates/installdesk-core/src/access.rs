//! Identity and row-visibility rules.
//!
//! Every store query receives a [`RowScope`]. Admins see every row; all other
//! roles see only rows whose `owning_user_id` is their own id.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::model::{Role, UserProfile};

/// The resolved, signed-in user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: Uuid,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    pub role: Role,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn scope(&self) -> RowScope {
        RowScope {
            actor: self.user_id,
            all_rows: self.is_admin(),
        }
    }
}

impl From<UserProfile> for Identity {
    fn from(profile: UserProfile) -> Self {
        Self {
            user_id: profile.id,
            email: profile.email,
            full_name: profile.full_name,
            role: profile.role,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error("row belongs to another user")]
    NotOwner,

    #[error("admin role required")]
    AdminRequired,
}

/// Which rows a caller may read and write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowScope {
    actor: Uuid,
    all_rows: bool,
}

impl RowScope {
    /// Scope of an admin: every row.
    pub fn admin(actor: Uuid) -> Self {
        Self {
            actor,
            all_rows: true,
        }
    }

    /// Scope of a regular user: own rows only.
    pub fn owner(actor: Uuid) -> Self {
        Self {
            actor,
            all_rows: false,
        }
    }

    /// The user performing the operation. New rows are owned by this id.
    pub fn actor(&self) -> Uuid {
        self.actor
    }

    pub fn sees_all_rows(&self) -> bool {
        self.all_rows
    }

    /// Owner id to filter on, or `None` when no filter applies.
    pub fn owner_filter(&self) -> Option<Uuid> {
        (!self.all_rows).then_some(self.actor)
    }

    pub fn permits(&self, owning_user_id: Uuid) -> bool {
        self.all_rows || owning_user_id == self.actor
    }

    pub fn authorize(&self, owning_user_id: Uuid) -> Result<(), AccessError> {
        if self.permits(owning_user_id) {
            Ok(())
        } else {
            Err(AccessError::NotOwner)
        }
    }

    pub fn require_admin(&self) -> Result<(), AccessError> {
        if self.all_rows {
            Ok(())
        } else {
            Err(AccessError::AdminRequired)
        }
    }
}
