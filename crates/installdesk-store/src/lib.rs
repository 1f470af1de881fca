//! Persistence gateway.
//!
//! Every call takes the caller's [`RowScope`] and enforces it at the query
//! boundary: non-admin reads filter on `owning_user_id`, writes to rows
//! outside the scope fail as [`PersistenceError::NotFound`], and inserts stamp
//! the caller as owner after checking that referenced rows are visible.
//!
//! Writes return the row as stored. Callers apply that confirmed row to any
//! local state only after the call succeeds.

use async_trait::async_trait;
use chrono::NaiveDate;
use installdesk_core::{
    Client, ClientPatch, NewClient, NewOrder, NewPayment, OrderPatch, OrderWithClient, Payment,
    PaymentFilter, PaymentPatch, ProfileUpdate, RowScope, UserProfile,
};
use uuid::Uuid;

pub mod error;
pub mod memory;
pub mod pg;

pub use error::{PersistenceError, StoreResult};
pub use memory::MemoryStore;
pub use pg::PgStore;

#[async_trait]
pub trait Store: Send + Sync {
    /// Visible clients ordered by name.
    async fn list_clients(&self, scope: &RowScope) -> StoreResult<Vec<Client>>;
    async fn get_client(&self, scope: &RowScope, id: Uuid) -> StoreResult<Client>;
    async fn create_client(&self, scope: &RowScope, new: NewClient) -> StoreResult<Client>;
    async fn update_client(
        &self,
        scope: &RowScope,
        id: Uuid,
        patch: &ClientPatch,
    ) -> StoreResult<Client>;
    /// Fails with `Constraint` while orders or payments reference the client.
    async fn delete_client(&self, scope: &RowScope, id: Uuid) -> StoreResult<()>;

    /// Visible orders with their clients, ordered by installation date.
    async fn list_orders(&self, scope: &RowScope) -> StoreResult<Vec<OrderWithClient>>;
    async fn get_order(&self, scope: &RowScope, id: Uuid) -> StoreResult<OrderWithClient>;
    async fn create_order(&self, scope: &RowScope, new: NewOrder) -> StoreResult<OrderWithClient>;
    async fn update_order(
        &self,
        scope: &RowScope,
        id: Uuid,
        patch: &OrderPatch,
    ) -> StoreResult<OrderWithClient>;
    /// Deletes the order's payments with it.
    async fn delete_order(&self, scope: &RowScope, id: Uuid) -> StoreResult<()>;

    /// Visible payments matching `filter`, newest payment date first.
    async fn list_payments(
        &self,
        scope: &RowScope,
        filter: PaymentFilter,
    ) -> StoreResult<Vec<Payment>>;
    async fn get_payment(&self, scope: &RowScope, id: Uuid) -> StoreResult<Payment>;
    async fn create_payment(&self, scope: &RowScope, new: NewPayment) -> StoreResult<Payment>;
    async fn update_payment(
        &self,
        scope: &RowScope,
        id: Uuid,
        patch: &PaymentPatch,
    ) -> StoreResult<Payment>;
    async fn delete_payment(&self, scope: &RowScope, id: Uuid) -> StoreResult<()>;

    /// All profiles. Admin only.
    async fn list_users(&self, scope: &RowScope) -> StoreResult<Vec<UserProfile>>;
    /// Profile lookup used to resolve a session. Not scoped.
    async fn get_user(&self, id: Uuid) -> StoreResult<UserProfile>;
    /// Insert or replace a profile. Used by provisioning, not by the API.
    async fn upsert_user(&self, profile: UserProfile) -> StoreResult<UserProfile>;
    async fn update_profile(
        &self,
        scope: &RowScope,
        update: &ProfileUpdate,
    ) -> StoreResult<UserProfile>;

    /// Open orders installing on `date` that have not been reminded yet,
    /// across all owners.
    async fn due_reminders(&self, date: NaiveDate) -> StoreResult<Vec<OrderWithClient>>;
    async fn mark_reminder_sent(&self, order_id: Uuid) -> StoreResult<()>;
}
