//! In-memory store for tests and `serve --memory`.
//!
//! Mirrors the Postgres constraints: clients referenced by orders or payments
//! cannot be deleted, and deleting an order removes its payments.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use installdesk_core::schedule::is_reminder_due;
use installdesk_core::{
    Client, ClientPatch, NewClient, NewOrder, NewPayment, Order, OrderPatch, OrderWithClient,
    Payment, PaymentFilter, PaymentPatch, ProfileUpdate, RowScope, UserProfile,
};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{PersistenceError, StoreResult};
use crate::Store;

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<Uuid, UserProfile>,
    clients: HashMap<Uuid, Client>,
    orders: HashMap<Uuid, Order>,
    payments: HashMap<Uuid, Payment>,
}

impl Tables {
    fn client(&self, scope: &RowScope, id: Uuid) -> StoreResult<&Client> {
        self.clients
            .get(&id)
            .filter(|c| scope.permits(c.owning_user_id))
            .ok_or_else(|| PersistenceError::not_found("client", id))
    }

    fn order(&self, scope: &RowScope, id: Uuid) -> StoreResult<&Order> {
        self.orders
            .get(&id)
            .filter(|o| scope.permits(o.owning_user_id))
            .ok_or_else(|| PersistenceError::not_found("order", id))
    }

    fn payment(&self, scope: &RowScope, id: Uuid) -> StoreResult<&Payment> {
        self.payments
            .get(&id)
            .filter(|p| scope.permits(p.owning_user_id))
            .ok_or_else(|| PersistenceError::not_found("payment", id))
    }

    fn with_client(&self, order: &Order) -> OrderWithClient {
        OrderWithClient {
            order: order.clone(),
            client: self.clients.get(&order.client_id).cloned(),
        }
    }

    fn check_owner_exists(&self, owner: Uuid) -> StoreResult<()> {
        if self.users.contains_key(&owner) {
            Ok(())
        } else {
            Err(PersistenceError::Constraint(format!(
                "owning user {} does not exist",
                owner
            )))
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with the given profiles.
    pub async fn with_users(users: impl IntoIterator<Item = UserProfile>) -> Self {
        let store = Self::new();
        {
            let mut tables = store.tables.write().await;
            for user in users {
                tables.users.insert(user.id, user);
            }
        }
        store
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn list_clients(&self, scope: &RowScope) -> StoreResult<Vec<Client>> {
        let tables = self.tables.read().await;
        let mut clients: Vec<Client> = tables
            .clients
            .values()
            .filter(|c| scope.permits(c.owning_user_id))
            .cloned()
            .collect();
        clients.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(clients)
    }

    async fn get_client(&self, scope: &RowScope, id: Uuid) -> StoreResult<Client> {
        self.tables.read().await.client(scope, id).cloned()
    }

    async fn create_client(&self, scope: &RowScope, new: NewClient) -> StoreResult<Client> {
        let mut tables = self.tables.write().await;
        tables.check_owner_exists(scope.actor())?;

        let client = new.into_client(Uuid::new_v4(), scope.actor(), Utc::now());
        tables.clients.insert(client.id, client.clone());
        Ok(client)
    }

    async fn update_client(
        &self,
        scope: &RowScope,
        id: Uuid,
        patch: &ClientPatch,
    ) -> StoreResult<Client> {
        let mut tables = self.tables.write().await;
        let updated = patch.apply(tables.client(scope, id)?, Utc::now());
        tables.clients.insert(id, updated.clone());
        Ok(updated)
    }

    async fn delete_client(&self, scope: &RowScope, id: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.client(scope, id)?;

        let referenced = tables.orders.values().any(|o| o.client_id == id)
            || tables.payments.values().any(|p| p.client_id == id);
        if referenced {
            return Err(PersistenceError::Constraint(format!(
                "client {} is still referenced by orders or payments",
                id
            )));
        }

        tables.clients.remove(&id);
        Ok(())
    }

    async fn list_orders(&self, scope: &RowScope) -> StoreResult<Vec<OrderWithClient>> {
        let tables = self.tables.read().await;
        let mut orders: Vec<OrderWithClient> = tables
            .orders
            .values()
            .filter(|o| scope.permits(o.owning_user_id))
            .map(|o| tables.with_client(o))
            .collect();
        orders.sort_by_key(|o| (o.order.installation_date, o.order.created_at, o.order.id));
        Ok(orders)
    }

    async fn get_order(&self, scope: &RowScope, id: Uuid) -> StoreResult<OrderWithClient> {
        let tables = self.tables.read().await;
        let order = tables.order(scope, id)?;
        Ok(tables.with_client(order))
    }

    async fn create_order(&self, scope: &RowScope, new: NewOrder) -> StoreResult<OrderWithClient> {
        let mut tables = self.tables.write().await;
        tables.check_owner_exists(scope.actor())?;
        tables.client(scope, new.client_id)?;

        let order = new.into_order(Uuid::new_v4(), scope.actor(), Utc::now());
        tables.orders.insert(order.id, order.clone());
        Ok(tables.with_client(&order))
    }

    async fn update_order(
        &self,
        scope: &RowScope,
        id: Uuid,
        patch: &OrderPatch,
    ) -> StoreResult<OrderWithClient> {
        let mut tables = self.tables.write().await;
        let updated = patch.apply(tables.order(scope, id)?, Utc::now());
        if let Some(client_id) = patch.client_id {
            tables.client(scope, client_id)?;
        }
        tables.orders.insert(id, updated.clone());
        Ok(tables.with_client(&updated))
    }

    async fn delete_order(&self, scope: &RowScope, id: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.order(scope, id)?;
        tables.orders.remove(&id);
        tables.payments.retain(|_, p| p.order_id != id);
        Ok(())
    }

    async fn list_payments(
        &self,
        scope: &RowScope,
        filter: PaymentFilter,
    ) -> StoreResult<Vec<Payment>> {
        let tables = self.tables.read().await;
        let mut payments: Vec<Payment> = tables
            .payments
            .values()
            .filter(|p| scope.permits(p.owning_user_id) && filter.matches(p))
            .cloned()
            .collect();
        payments.sort_by(|a, b| {
            b.payment_date
                .cmp(&a.payment_date)
                .then(b.created_at.cmp(&a.created_at))
        });
        Ok(payments)
    }

    async fn get_payment(&self, scope: &RowScope, id: Uuid) -> StoreResult<Payment> {
        self.tables.read().await.payment(scope, id).cloned()
    }

    async fn create_payment(&self, scope: &RowScope, new: NewPayment) -> StoreResult<Payment> {
        let mut tables = self.tables.write().await;
        tables.check_owner_exists(scope.actor())?;
        let client_id = tables.order(scope, new.order_id)?.client_id;

        let payment = new.into_payment(Uuid::new_v4(), scope.actor(), client_id, Utc::now());
        tables.payments.insert(payment.id, payment.clone());
        Ok(payment)
    }

    async fn update_payment(
        &self,
        scope: &RowScope,
        id: Uuid,
        patch: &PaymentPatch,
    ) -> StoreResult<Payment> {
        let mut tables = self.tables.write().await;
        let updated = patch.apply(tables.payment(scope, id)?, Utc::now());
        tables.payments.insert(id, updated.clone());
        Ok(updated)
    }

    async fn delete_payment(&self, scope: &RowScope, id: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.payment(scope, id)?;
        tables.payments.remove(&id);
        Ok(())
    }

    async fn list_users(&self, scope: &RowScope) -> StoreResult<Vec<UserProfile>> {
        scope.require_admin()?;
        let tables = self.tables.read().await;
        let mut users: Vec<UserProfile> = tables.users.values().cloned().collect();
        users.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(users)
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<UserProfile> {
        self.tables
            .read()
            .await
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| PersistenceError::not_found("user", id))
    }

    async fn upsert_user(&self, profile: UserProfile) -> StoreResult<UserProfile> {
        let mut tables = self.tables.write().await;
        let taken = tables
            .users
            .values()
            .any(|u| u.email == profile.email && u.id != profile.id);
        if taken {
            return Err(PersistenceError::Constraint(format!(
                "email {} is already registered",
                profile.email
            )));
        }
        tables.users.insert(profile.id, profile.clone());
        Ok(profile)
    }

    async fn update_profile(
        &self,
        scope: &RowScope,
        update: &ProfileUpdate,
    ) -> StoreResult<UserProfile> {
        let mut tables = self.tables.write().await;
        let user = tables
            .users
            .get_mut(&scope.actor())
            .ok_or_else(|| PersistenceError::not_found("user", scope.actor()))?;
        user.full_name = Some(update.full_name.clone());
        Ok(user.clone())
    }

    async fn due_reminders(&self, date: NaiveDate) -> StoreResult<Vec<OrderWithClient>> {
        let tables = self.tables.read().await;
        let mut due: Vec<OrderWithClient> = tables
            .orders
            .values()
            .filter(|o| is_reminder_due(o, date))
            .map(|o| tables.with_client(o))
            .collect();
        due.sort_by_key(|o| o.order.created_at);
        Ok(due)
    }

    async fn mark_reminder_sent(&self, order_id: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let order = tables
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| PersistenceError::not_found("order", order_id))?;
        order.reminder_sent = true;
        order.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use installdesk_core::{OrderStatus, PaymentMethod, Role};
    use rust_decimal::Decimal;

    fn profile(role: Role) -> UserProfile {
        let id = Uuid::new_v4();
        UserProfile {
            id,
            email: format!("{}@example.com", id),
            full_name: None,
            role,
        }
    }

    fn new_client(name: &str) -> NewClient {
        NewClient {
            name: name.to_string(),
            email: "client@example.com".to_string(),
            phone: "555-0101".to_string(),
            address: "1 Main St".to_string(),
        }
    }

    fn new_order(client_id: Uuid, order_date: NaiveDate, lead: i32) -> NewOrder {
        NewOrder {
            client_id,
            title: "Flooring".to_string(),
            description: "Oak planks".to_string(),
            status: OrderStatus::Confirmed,
            order_date,
            lead_time_days: lead,
            total_amount: Decimal::from(1000),
            notes: String::new(),
        }
    }

    fn new_payment(order_id: Uuid, amount: i64) -> NewPayment {
        NewPayment {
            order_id,
            amount: Decimal::from(amount),
            payment_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            payment_method: PaymentMethod::BankTransfer,
            reference_number: "TX-1".to_string(),
            notes: String::new(),
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    struct Fixture {
        store: MemoryStore,
        alice: RowScope,
        bob: RowScope,
        admin: RowScope,
    }

    async fn fixture() -> Fixture {
        let alice = profile(Role::User);
        let bob = profile(Role::Manager);
        let admin = profile(Role::Admin);
        let scopes = (
            RowScope::owner(alice.id),
            RowScope::owner(bob.id),
            RowScope::admin(admin.id),
        );
        Fixture {
            store: MemoryStore::with_users([alice, bob, admin]).await,
            alice: scopes.0,
            bob: scopes.1,
            admin: scopes.2,
        }
    }

    #[tokio::test]
    async fn test_create_stamps_owner_and_lists_by_name() {
        let f = fixture().await;
        f.store.create_client(&f.alice, new_client("Zed")).await.unwrap();
        let created = f.store.create_client(&f.alice, new_client("Amy")).await.unwrap();

        assert_eq!(created.owning_user_id, f.alice.actor());
        let names: Vec<String> = f
            .store
            .list_clients(&f.alice)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Amy", "Zed"]);
    }

    #[tokio::test]
    async fn test_non_admin_cannot_touch_other_rows() {
        let f = fixture().await;
        let client = f.store.create_client(&f.alice, new_client("Amy")).await.unwrap();

        assert!(f.store.list_clients(&f.bob).await.unwrap().is_empty());
        assert!(f.store.get_client(&f.bob, client.id).await.unwrap_err().is_not_found());
        assert!(
            f.store
                .update_client(&f.bob, client.id, &ClientPatch::default())
                .await
                .unwrap_err()
                .is_not_found()
        );
        assert!(f.store.delete_client(&f.bob, client.id).await.unwrap_err().is_not_found());
        assert!(
            f.store
                .create_order(&f.bob, new_order(client.id, day(2024, 1, 1), 5))
                .await
                .unwrap_err()
                .is_not_found()
        );

        assert_eq!(f.store.list_clients(&f.admin).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_order_dates_are_derived_and_sorted() {
        let f = fixture().await;
        let client = f.store.create_client(&f.alice, new_client("Amy")).await.unwrap();
        let late = f
            .store
            .create_order(&f.alice, new_order(client.id, day(2024, 1, 1), 30))
            .await
            .unwrap();
        let early = f
            .store
            .create_order(&f.alice, new_order(client.id, day(2024, 1, 1), 14))
            .await
            .unwrap();

        assert_eq!(early.order.installation_date, day(2024, 1, 15));
        assert_eq!(early.client.as_ref().map(|c| c.id), Some(client.id));

        let ids: Vec<Uuid> = f
            .store
            .list_orders(&f.alice)
            .await
            .unwrap()
            .iter()
            .map(|o| o.order.id)
            .collect();
        assert_eq!(ids, vec![early.order.id, late.order.id]);

        let patched = f
            .store
            .update_order(
                &f.alice,
                late.order.id,
                &OrderPatch {
                    lead_time_days: Some(2),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(patched.order.installation_date, day(2024, 1, 3));
    }

    #[tokio::test]
    async fn test_same_day_orders_list_in_creation_order() {
        let f = fixture().await;
        let client = f.store.create_client(&f.alice, new_client("Amy")).await.unwrap();
        let mut created = Vec::new();
        for _ in 0..4 {
            let order = f
                .store
                .create_order(&f.alice, new_order(client.id, day(2024, 3, 1), 7))
                .await
                .unwrap();
            created.push(order.order.id);
        }

        let base = Utc::now();
        {
            let mut tables = f.store.tables.write().await;
            for (offset, id) in created.iter().enumerate() {
                if let Some(order) = tables.orders.get_mut(id) {
                    order.created_at = base + chrono::TimeDelta::seconds(offset as i64);
                }
            }
        }

        for _ in 0..3 {
            let ids: Vec<Uuid> = f
                .store
                .list_orders(&f.alice)
                .await
                .unwrap()
                .iter()
                .map(|o| o.order.id)
                .collect();
            assert_eq!(ids, created);
        }
    }

    #[tokio::test]
    async fn test_payment_takes_client_from_order_and_cascades() {
        let f = fixture().await;
        let client = f.store.create_client(&f.alice, new_client("Amy")).await.unwrap();
        let order = f
            .store
            .create_order(&f.alice, new_order(client.id, day(2024, 1, 1), 14))
            .await
            .unwrap();
        let payment = f
            .store
            .create_payment(&f.alice, new_payment(order.order.id, 300))
            .await
            .unwrap();

        assert_eq!(payment.client_id, client.id);
        assert_eq!(
            f.store
                .list_payments(&f.alice, PaymentFilter::for_client(client.id))
                .await
                .unwrap()
                .len(),
            1
        );

        let err = f.store.delete_client(&f.alice, client.id).await.unwrap_err();
        assert!(matches!(err, PersistenceError::Constraint(_)));

        f.store.delete_order(&f.alice, order.order.id).await.unwrap();
        assert!(
            f.store
                .list_payments(&f.alice, PaymentFilter::default())
                .await
                .unwrap()
                .is_empty()
        );
        f.store.delete_client(&f.alice, client.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_users_listing_requires_admin() {
        let f = fixture().await;
        assert!(matches!(
            f.store.list_users(&f.alice).await,
            Err(PersistenceError::Forbidden(_))
        ));
        assert_eq!(f.store.list_users(&f.admin).await.unwrap().len(), 3);

        let updated = f
            .store
            .update_profile(
                &f.bob,
                &ProfileUpdate {
                    full_name: "Bob Reyes".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.full_name.as_deref(), Some("Bob Reyes"));
    }

    #[tokio::test]
    async fn test_due_reminders_and_marking() {
        let f = fixture().await;
        let client = f.store.create_client(&f.alice, new_client("Amy")).await.unwrap();
        let due = f
            .store
            .create_order(&f.alice, new_order(client.id, day(2024, 6, 3), 10))
            .await
            .unwrap();
        let mut closed = new_order(client.id, day(2024, 6, 3), 10);
        closed.status = OrderStatus::Completed;
        f.store.create_order(&f.alice, closed).await.unwrap();
        f.store
            .create_order(&f.alice, new_order(client.id, day(2024, 6, 4), 10))
            .await
            .unwrap();

        let found = f.store.due_reminders(day(2024, 6, 13)).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].order.id, due.order.id);

        f.store.mark_reminder_sent(due.order.id).await.unwrap();
        assert!(f.store.due_reminders(day(2024, 6, 13)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_owner_cannot_insert() {
        let store = MemoryStore::new();
        let err = store
            .create_client(&RowScope::owner(Uuid::new_v4()), new_client("Amy"))
            .await
            .unwrap_err();
        assert!(matches!(err, PersistenceError::Constraint(_)));
    }
}
