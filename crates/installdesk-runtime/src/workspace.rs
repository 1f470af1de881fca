//! Scoped local view of the store for one signed-in user.
//!
//! The workspace caches clients (by name), orders (by installation date),
//! payments and, for admins, every user profile. Writes are
//! confirm-then-apply: the store call runs first and only the row it returns
//! is merged into the cache. A failed write leaves the cache untouched.
//!
//! The workspace serves long-lived clients such as the CLI. The HTTP server
//! keeps no cache; its handlers call the store per request and share
//! validation and [`report_overpayment`] with this module.

use chrono::NaiveDate;
use installdesk_core::balance;
use installdesk_core::dashboard::{DashboardOptions, DashboardSummary, dashboard_summary};
use installdesk_core::schedule::DEFAULT_UPCOMING_HORIZON_DAYS;
use installdesk_core::{
    Client, ClientPatch, Identity, NewClient, NewOrder, NewPayment, Order, OrderPatch,
    OrderWithClient, Payment, PaymentFilter, PaymentPatch, RowScope, UserProfile, Validate,
    display_name,
};
use installdesk_store::Store;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::RuntimeError;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkspaceState {
    pub clients: Vec<Client>,
    pub orders: Vec<OrderWithClient>,
    pub payments: Vec<Payment>,
    pub users: Vec<UserProfile>,
}

impl WorkspaceState {
    fn sort(&mut self) {
        self.clients.sort_by(|a, b| a.name.cmp(&b.name));
        self.orders
            .sort_by_key(|o| (o.order.installation_date, o.order.created_at, o.order.id));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Refreshed,
    /// Another refresh was in flight; this call did nothing.
    AlreadyRunning,
}

/// Clears the in-flight flag when dropped, including on early return.
struct RefreshGuard<'a>(&'a AtomicBool);

impl<'a> RefreshGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        if flag.swap(true, Ordering::AcqRel) {
            None
        } else {
            Some(Self(flag))
        }
    }
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct Workspace {
    store: Arc<dyn Store>,
    identity: Identity,
    scope: RowScope,
    upcoming_horizon_days: i64,
    state: RwLock<WorkspaceState>,
    refreshing: AtomicBool,
}

impl Workspace {
    pub fn new(store: Arc<dyn Store>, identity: Identity) -> Self {
        let scope = identity.scope();
        Self {
            store,
            identity,
            scope,
            upcoming_horizon_days: DEFAULT_UPCOMING_HORIZON_DAYS,
            state: RwLock::new(WorkspaceState::default()),
            refreshing: AtomicBool::new(false),
        }
    }

    pub fn with_upcoming_horizon(mut self, days: i64) -> Self {
        self.upcoming_horizon_days = days;
        self
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub async fn snapshot(&self) -> WorkspaceState {
        self.state.read().await.clone()
    }

    pub async fn clients(&self) -> Vec<Client> {
        self.state.read().await.clients.clone()
    }

    pub async fn orders(&self) -> Vec<OrderWithClient> {
        self.state.read().await.orders.clone()
    }

    pub async fn payments(&self) -> Vec<Payment> {
        self.state.read().await.payments.clone()
    }

    pub async fn users(&self) -> Vec<UserProfile> {
        self.state.read().await.users.clone()
    }

    /// Re-fetch everything visible to this identity.
    pub async fn refresh(&self) -> Result<RefreshOutcome, RuntimeError> {
        let Some(_guard) = RefreshGuard::acquire(&self.refreshing) else {
            tracing::debug!("refresh already in flight");
            return Ok(RefreshOutcome::AlreadyRunning);
        };

        let clients = self.store.list_clients(&self.scope).await?;
        let orders = self.store.list_orders(&self.scope).await?;
        let payments = self
            .store
            .list_payments(&self.scope, PaymentFilter::default())
            .await?;
        let users = if self.identity.is_admin() {
            self.store.list_users(&self.scope).await?
        } else {
            vec![self.store.get_user(self.identity.user_id).await?]
        };

        let mut next = WorkspaceState {
            clients,
            orders,
            payments,
            users,
        };
        next.sort();
        *self.state.write().await = next;

        tracing::debug!(user_id = %self.identity.user_id, "workspace refreshed");
        Ok(RefreshOutcome::Refreshed)
    }

    // -------------------------------------------------------------------------
    // Clients
    // -------------------------------------------------------------------------

    pub async fn add_client(&self, new: NewClient) -> Result<Client, RuntimeError> {
        new.validate()?;
        let client = self
            .store
            .create_client(&self.scope, new)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "create client failed"))?;

        let mut state = self.state.write().await;
        state.clients.push(client.clone());
        state.sort();
        Ok(client)
    }

    pub async fn update_client(
        &self,
        id: Uuid,
        patch: ClientPatch,
    ) -> Result<Client, RuntimeError> {
        patch.validate()?;
        let client = self
            .store
            .update_client(&self.scope, id, &patch)
            .await
            .inspect_err(|e| tracing::warn!(client_id = %id, error = %e, "update client failed"))?;

        let mut state = self.state.write().await;
        upsert(&mut state.clients, client.clone(), |c| c.id);
        for order in state.orders.iter_mut().filter(|o| o.order.client_id == id) {
            order.client = Some(client.clone());
        }
        state.sort();
        Ok(client)
    }

    pub async fn delete_client(&self, id: Uuid) -> Result<(), RuntimeError> {
        self.store
            .delete_client(&self.scope, id)
            .await
            .inspect_err(|e| tracing::warn!(client_id = %id, error = %e, "delete client failed"))?;

        self.state.write().await.clients.retain(|c| c.id != id);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Orders
    // -------------------------------------------------------------------------

    pub async fn add_order(&self, new: NewOrder) -> Result<OrderWithClient, RuntimeError> {
        new.validate()?;
        let order = self
            .store
            .create_order(&self.scope, new)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "create order failed"))?;

        let mut state = self.state.write().await;
        state.orders.push(order.clone());
        state.sort();
        Ok(order)
    }

    pub async fn update_order(
        &self,
        id: Uuid,
        patch: OrderPatch,
    ) -> Result<OrderWithClient, RuntimeError> {
        patch.validate()?;
        let order = self
            .store
            .update_order(&self.scope, id, &patch)
            .await
            .inspect_err(|e| tracing::warn!(order_id = %id, error = %e, "update order failed"))?;

        let mut state = self.state.write().await;
        upsert(&mut state.orders, order.clone(), |o| o.order.id);
        state.sort();
        Ok(order)
    }

    pub async fn delete_order(&self, id: Uuid) -> Result<(), RuntimeError> {
        self.store
            .delete_order(&self.scope, id)
            .await
            .inspect_err(|e| tracing::warn!(order_id = %id, error = %e, "delete order failed"))?;

        let mut state = self.state.write().await;
        state.orders.retain(|o| o.order.id != id);
        state.payments.retain(|p| p.order_id != id);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Payments
    // -------------------------------------------------------------------------

    pub async fn add_payment(&self, new: NewPayment) -> Result<Payment, RuntimeError> {
        new.validate()?;
        let payment = self
            .store
            .create_payment(&self.scope, new)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "create payment failed"))?;

        let mut state = self.state.write().await;
        state.payments.push(payment.clone());
        warn_if_overpaid(&state, payment.order_id);
        Ok(payment)
    }

    pub async fn update_payment(
        &self,
        id: Uuid,
        patch: PaymentPatch,
    ) -> Result<Payment, RuntimeError> {
        patch.validate()?;
        let payment = self
            .store
            .update_payment(&self.scope, id, &patch)
            .await
            .inspect_err(|e| tracing::warn!(payment_id = %id, error = %e, "update payment failed"))?;

        let mut state = self.state.write().await;
        upsert(&mut state.payments, payment.clone(), |p| p.id);
        warn_if_overpaid(&state, payment.order_id);
        Ok(payment)
    }

    pub async fn delete_payment(&self, id: Uuid) -> Result<(), RuntimeError> {
        self.store
            .delete_payment(&self.scope, id)
            .await
            .inspect_err(|e| tracing::warn!(payment_id = %id, error = %e, "delete payment failed"))?;

        self.state.write().await.payments.retain(|p| p.id != id);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Read helpers
    // -------------------------------------------------------------------------

    pub async fn total_paid(&self, order_id: Uuid) -> Decimal {
        balance::total_paid(order_id, &self.state.read().await.payments)
    }

    /// Unpaid balance of a cached order, `None` if the order is not cached.
    pub async fn outstanding(&self, order_id: Uuid) -> Option<Decimal> {
        let state = self.state.read().await;
        state
            .orders
            .iter()
            .find(|o| o.order.id == order_id)
            .map(|o| balance::outstanding(&o.order, &state.payments))
    }

    pub async fn client_orders(&self, client_id: Uuid) -> Vec<OrderWithClient> {
        self.state
            .read()
            .await
            .orders
            .iter()
            .filter(|o| o.order.client_id == client_id)
            .cloned()
            .collect()
    }

    pub async fn user_name(&self, user_id: Uuid) -> String {
        display_name(user_id, &self.state.read().await.users)
    }

    pub async fn dashboard(&self, today: NaiveDate) -> DashboardSummary {
        let state = self.state.read().await;
        let options = DashboardOptions::new(today)
            .with_horizon(self.upcoming_horizon_days)
            .with_sales_by_user(self.identity.is_admin());
        dashboard_summary(&state.orders, &state.payments, &state.users, &options)
    }
}

fn upsert<T>(rows: &mut Vec<T>, row: T, key: impl Fn(&T) -> Uuid) {
    let id = key(&row);
    match rows.iter_mut().find(|r| key(r) == id) {
        Some(slot) => *slot = row,
        None => rows.push(row),
    }
}

/// Overpayment is accepted; it is only surfaced in the log and the balance.
/// Returns the amount paid beyond the order total.
pub fn report_overpayment(order: &Order, payments: &[Payment]) -> Decimal {
    let overpaid = balance::overpayment(order, payments);
    if overpaid > Decimal::ZERO {
        tracing::warn!(order_id = %order.id, %overpaid, "payments exceed order total");
    }
    overpaid
}

fn warn_if_overpaid(state: &WorkspaceState, order_id: Uuid) {
    if let Some(order) = state.orders.iter().find(|o| o.order.id == order_id) {
        report_overpayment(&order.order, &state.payments);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use installdesk_core::{OrderStatus, PaymentMethod, Role};
    use installdesk_store::MemoryStore;
    use pretty_assertions::assert_eq;

    fn profile(name: &str, role: Role) -> UserProfile {
        UserProfile {
            id: Uuid::new_v4(),
            email: format!("{}@example.com", name.to_lowercase()),
            full_name: Some(name.to_string()),
            role,
        }
    }

    fn new_client(name: &str) -> NewClient {
        NewClient {
            name: name.to_string(),
            email: format!("{}@client.example.com", name.to_lowercase()),
            phone: "555-0199".to_string(),
            address: "7 Elm Street".to_string(),
        }
    }

    fn new_order(client_id: Uuid, lead: i32, total: i64) -> NewOrder {
        NewOrder {
            client_id,
            title: "Windows".to_string(),
            description: "Replace four windows".to_string(),
            status: OrderStatus::Pending,
            order_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            lead_time_days: lead,
            total_amount: Decimal::from(total),
            notes: String::new(),
        }
    }

    fn new_payment(order_id: Uuid, amount: i64) -> NewPayment {
        NewPayment {
            order_id,
            amount: Decimal::from(amount),
            payment_date: NaiveDate::from_ymd_opt(2024, 6, 2).unwrap(),
            payment_method: PaymentMethod::Card,
            reference_number: String::new(),
            notes: String::new(),
        }
    }

    async fn workspaces() -> (Arc<MemoryStore>, Workspace, Workspace) {
        let user = profile("Ana", Role::User);
        let admin = profile("Root", Role::Admin);
        let store = Arc::new(MemoryStore::with_users([user.clone(), admin.clone()]).await);
        let as_user = Workspace::new(store.clone(), Identity::from(user));
        let as_admin = Workspace::new(store.clone(), Identity::from(admin));
        (store, as_user, as_admin)
    }

    #[tokio::test]
    async fn test_writes_apply_confirmed_rows() {
        let (_, ws, _) = workspaces().await;
        let zed = ws.add_client(new_client("Zed")).await.unwrap();
        ws.add_client(new_client("Amy")).await.unwrap();

        let names: Vec<String> = ws.clients().await.into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Amy".to_string(), "Zed".to_string()]);

        let later = ws.add_order(new_order(zed.id, 20, 900)).await.unwrap();
        let sooner = ws.add_order(new_order(zed.id, 5, 100)).await.unwrap();
        let ids: Vec<Uuid> = ws.orders().await.iter().map(|o| o.order.id).collect();
        assert_eq!(ids, vec![sooner.order.id, later.order.id]);

        ws.add_payment(new_payment(later.order.id, 400)).await.unwrap();
        assert_eq!(ws.total_paid(later.order.id).await, Decimal::from(400));
        assert_eq!(ws.outstanding(later.order.id).await, Some(Decimal::from(500)));
        assert_eq!(ws.client_orders(zed.id).await.len(), 2);

        let renamed = ws
            .update_client(
                zed.id,
                ClientPatch {
                    name: Some("Zed Holt".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.name, "Zed Holt");
        let joined = ws.client_orders(zed.id).await;
        assert!(joined.iter().all(|o| o.client.as_ref().map(|c| c.name.as_str()) == Some("Zed Holt")));
    }

    #[tokio::test]
    async fn test_failed_write_leaves_state_unchanged() {
        let (_, ws, _) = workspaces().await;
        let client = ws.add_client(new_client("Amy")).await.unwrap();
        ws.add_order(new_order(client.id, 10, 500)).await.unwrap();
        let before = ws.snapshot().await;

        // Orders still reference the client.
        let err = ws.delete_client(client.id).await.unwrap_err();
        assert!(matches!(err, RuntimeError::Persistence(_)));

        let invalid = ws.add_client(NewClient::default()).await.unwrap_err();
        assert!(matches!(invalid, RuntimeError::Validation(_)));

        let missing = ws
            .update_order(Uuid::new_v4(), OrderPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(missing, RuntimeError::Persistence(_)));

        assert_eq!(ws.snapshot().await, before);
    }

    #[tokio::test]
    async fn test_refresh_is_scoped() {
        let (_, ws, admin) = workspaces().await;
        let client = ws.add_client(new_client("Amy")).await.unwrap();
        admin.add_client(new_client("Bea")).await.unwrap();
        ws.add_order(new_order(client.id, 3, 250)).await.unwrap();

        assert_eq!(ws.refresh().await.unwrap(), RefreshOutcome::Refreshed);
        assert_eq!(admin.refresh().await.unwrap(), RefreshOutcome::Refreshed);

        assert_eq!(ws.clients().await.len(), 1);
        assert_eq!(ws.users().await.len(), 1);
        assert_eq!(admin.clients().await.len(), 2);
        assert_eq!(admin.users().await.len(), 2);
        assert_eq!(admin.orders().await.len(), 1);

        let owner = ws.identity().user_id;
        assert_eq!(admin.user_name(owner).await, "Ana");
        let unknown = Uuid::parse_str("12345678-aaaa-bbbb-cccc-1234567890ab").unwrap();
        assert_eq!(admin.user_name(unknown).await, "12345678...");
    }

    #[tokio::test]
    async fn test_reentrant_refresh_is_a_no_op() {
        let (_, ws, _) = workspaces().await;
        ws.add_client(new_client("Amy")).await.unwrap();

        let held = RefreshGuard::acquire(&ws.refreshing).unwrap();
        assert_eq!(ws.refresh().await.unwrap(), RefreshOutcome::AlreadyRunning);
        drop(held);

        assert_eq!(ws.refresh().await.unwrap(), RefreshOutcome::Refreshed);
        assert!(!ws.refreshing.load(Ordering::Acquire));
    }

    #[tokio::test]
    async fn test_dashboard_includes_sales_for_admin_only() {
        let (_, ws, admin) = workspaces().await;
        let client = ws.add_client(new_client("Amy")).await.unwrap();
        let order = ws.add_order(new_order(client.id, 14, 1000)).await.unwrap();
        ws.add_payment(new_payment(order.order.id, 300)).await.unwrap();
        admin.refresh().await.unwrap();

        let today = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        let mine = ws.dashboard(today).await;
        assert_eq!(mine.total_outstanding, Decimal::from(700));
        assert_eq!(mine.upcoming.len(), 1);
        assert!(mine.sales_by_user.is_none());

        let all = admin.dashboard(today).await;
        let sales = all.sales_by_user.unwrap();
        assert_eq!(sales.len(), 1);
        assert_eq!(sales[0].name, "Ana");
    }

    #[tokio::test]
    async fn test_overpayment_is_accepted_and_reported() {
        let (_, ws, _) = workspaces().await;
        let client = ws.add_client(new_client("Amy")).await.unwrap();
        let order = ws.add_order(new_order(client.id, 7, 600)).await.unwrap();

        ws.add_payment(new_payment(order.order.id, 450)).await.unwrap();
        let payments = ws.payments().await;
        assert_eq!(report_overpayment(&order.order, &payments), Decimal::ZERO);

        ws.add_payment(new_payment(order.order.id, 250)).await.unwrap();
        let payments = ws.payments().await;
        assert_eq!(report_overpayment(&order.order, &payments), Decimal::from(100));
        assert_eq!(ws.outstanding(order.order.id).await, Some(Decimal::ZERO));
    }

    #[tokio::test]
    async fn test_delete_order_drops_its_payments() {
        let (_, ws, _) = workspaces().await;
        let client = ws.add_client(new_client("Amy")).await.unwrap();
        let order = ws.add_order(new_order(client.id, 7, 600)).await.unwrap();
        ws.add_payment(new_payment(order.order.id, 600)).await.unwrap();

        ws.delete_order(order.order.id).await.unwrap();
        assert!(ws.payments().await.is_empty());
        ws.delete_client(client.id).await.unwrap();
        assert!(ws.clients().await.is_empty());
    }
}
