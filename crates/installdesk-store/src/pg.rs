//! Postgres store.
//!
//! Non-admin queries bind the caller's id to `$1` and filter with
//! `($1::uuid IS NULL OR owning_user_id = $1)`; admins bind NULL.
//! Updates read the scoped row, apply the patch in Rust (which re-derives the
//! installation date for orders) and write the merged row back.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use installdesk_core::config::DatabaseConfig;
use installdesk_core::{
    Client, ClientPatch, NewClient, NewOrder, NewPayment, Order, OrderPatch, OrderWithClient,
    Payment, PaymentFilter, PaymentPatch, ProfileUpdate, RowScope, UserProfile,
};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::time::Duration;
use uuid::Uuid;

use crate::error::{PersistenceError, StoreResult};
use crate::Store;

const CLIENT_COLUMNS: &str =
    "id, owning_user_id, name, email, phone, address, created_at, updated_at";

const PAYMENT_COLUMNS: &str = "id, owning_user_id, order_id, client_id, amount, payment_date, \
     payment_method, reference_number, notes, created_at, updated_at";

const ORDER_SELECT: &str = "SELECT o.id, o.owning_user_id, o.client_id, o.title, o.description, \
     o.status, o.order_date, o.installation_date, o.lead_time_days, o.total_amount, o.notes, \
     o.reminder_sent, o.created_at, o.updated_at, \
     c.id AS c_id, c.owning_user_id AS c_owning_user_id, c.name AS c_name, c.email AS c_email, \
     c.phone AS c_phone, c.address AS c_address, c.created_at AS c_created_at, \
     c.updated_at AS c_updated_at \
     FROM orders o LEFT JOIN clients c ON c.id = o.client_id";

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(config: &DatabaseConfig) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .min_connections(config.pool.min_connections)
            .max_connections(config.pool.max_connections)
            .acquire_timeout(Duration::from_secs(config.pool.acquire_timeout_seconds))
            .connect(&config.connection_string())
            .await
            .map_err(backend)?;

        let store = Self { pool };
        if config.run_migrations {
            store.migrate().await?;
        }
        Ok(store)
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| PersistenceError::Backend(e.to_string()))?;
        tracing::info!("database migrations applied");
        Ok(())
    }

    async fn fetch_order(&self, scope: &RowScope, id: Uuid) -> StoreResult<OrderWithClient> {
        let sql = format!(
            "{} WHERE o.id = $2 AND ($1::uuid IS NULL OR o.owning_user_id = $1)",
            ORDER_SELECT
        );
        let row = sqlx::query(&sql)
            .bind(scope.owner_filter())
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .ok_or_else(|| PersistenceError::not_found("order", id))?;
        order_with_client_from_row(&row)
    }
}

fn backend(e: sqlx::Error) -> PersistenceError {
    PersistenceError::Backend(e.to_string())
}

/// Constraint violations (foreign key, check, unique) become `Constraint`.
fn classify(e: sqlx::Error) -> PersistenceError {
    if let sqlx::Error::Database(db) = &e
        && (db.is_foreign_key_violation() || db.is_check_violation() || db.is_unique_violation())
    {
        return PersistenceError::Constraint(db.message().to_string());
    }
    tracing::error!(error = %e, "store query failed");
    backend(e)
}

fn parse<T: std::str::FromStr>(row: &PgRow, column: &str) -> StoreResult<T>
where
    T::Err: std::fmt::Display,
{
    let raw: String = row.try_get(column).map_err(backend)?;
    raw.parse::<T>()
        .map_err(|e| PersistenceError::Backend(format!("column {}: {}", column, e)))
}

fn client_from_row(row: &PgRow, prefix: &str) -> StoreResult<Client> {
    let col = |name: &str| format!("{}{}", prefix, name);
    Ok(Client {
        id: row.try_get(col("id").as_str()).map_err(backend)?,
        owning_user_id: row.try_get(col("owning_user_id").as_str()).map_err(backend)?,
        name: row.try_get(col("name").as_str()).map_err(backend)?,
        email: row.try_get(col("email").as_str()).map_err(backend)?,
        phone: row.try_get(col("phone").as_str()).map_err(backend)?,
        address: row.try_get(col("address").as_str()).map_err(backend)?,
        created_at: row.try_get(col("created_at").as_str()).map_err(backend)?,
        updated_at: row.try_get(col("updated_at").as_str()).map_err(backend)?,
    })
}

fn order_from_row(row: &PgRow) -> StoreResult<Order> {
    Ok(Order {
        id: row.try_get("id").map_err(backend)?,
        owning_user_id: row.try_get("owning_user_id").map_err(backend)?,
        client_id: row.try_get("client_id").map_err(backend)?,
        title: row.try_get("title").map_err(backend)?,
        description: row.try_get("description").map_err(backend)?,
        status: parse(row, "status")?,
        order_date: row.try_get("order_date").map_err(backend)?,
        installation_date: row.try_get("installation_date").map_err(backend)?,
        lead_time_days: row.try_get("lead_time_days").map_err(backend)?,
        total_amount: row.try_get("total_amount").map_err(backend)?,
        notes: row.try_get("notes").map_err(backend)?,
        reminder_sent: row.try_get("reminder_sent").map_err(backend)?,
        created_at: row.try_get("created_at").map_err(backend)?,
        updated_at: row.try_get("updated_at").map_err(backend)?,
    })
}

fn order_with_client_from_row(row: &PgRow) -> StoreResult<OrderWithClient> {
    let joined: Option<Uuid> = row.try_get("c_id").map_err(backend)?;
    let client = match joined {
        Some(_) => Some(client_from_row(row, "c_")?),
        None => None,
    };
    Ok(OrderWithClient {
        order: order_from_row(row)?,
        client,
    })
}

fn payment_from_row(row: &PgRow) -> StoreResult<Payment> {
    Ok(Payment {
        id: row.try_get("id").map_err(backend)?,
        owning_user_id: row.try_get("owning_user_id").map_err(backend)?,
        order_id: row.try_get("order_id").map_err(backend)?,
        client_id: row.try_get("client_id").map_err(backend)?,
        amount: row.try_get("amount").map_err(backend)?,
        payment_date: row.try_get("payment_date").map_err(backend)?,
        payment_method: parse(row, "payment_method")?,
        reference_number: row.try_get("reference_number").map_err(backend)?,
        notes: row.try_get("notes").map_err(backend)?,
        created_at: row.try_get("created_at").map_err(backend)?,
        updated_at: row.try_get("updated_at").map_err(backend)?,
    })
}

fn user_from_row(row: &PgRow) -> StoreResult<UserProfile> {
    Ok(UserProfile {
        id: row.try_get("id").map_err(backend)?,
        email: row.try_get("email").map_err(backend)?,
        full_name: row.try_get("full_name").map_err(backend)?,
        role: parse(row, "role")?,
    })
}

#[async_trait]
impl Store for PgStore {
    async fn list_clients(&self, scope: &RowScope) -> StoreResult<Vec<Client>> {
        let sql = format!(
            "SELECT {} FROM clients WHERE ($1::uuid IS NULL OR owning_user_id = $1) ORDER BY name",
            CLIENT_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(scope.owner_filter())
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        rows.iter().map(|r| client_from_row(r, "")).collect()
    }

    async fn get_client(&self, scope: &RowScope, id: Uuid) -> StoreResult<Client> {
        let sql = format!(
            "SELECT {} FROM clients WHERE id = $2 AND ($1::uuid IS NULL OR owning_user_id = $1)",
            CLIENT_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(scope.owner_filter())
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .ok_or_else(|| PersistenceError::not_found("client", id))?;
        client_from_row(&row, "")
    }

    async fn create_client(&self, scope: &RowScope, new: NewClient) -> StoreResult<Client> {
        let client = new.into_client(Uuid::new_v4(), scope.actor(), Utc::now());
        let sql = format!(
            "INSERT INTO clients ({cols}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {cols}",
            cols = CLIENT_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(client.id)
            .bind(client.owning_user_id)
            .bind(&client.name)
            .bind(&client.email)
            .bind(&client.phone)
            .bind(&client.address)
            .bind(client.created_at)
            .bind(client.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(classify)?;
        client_from_row(&row, "")
    }

    async fn update_client(
        &self,
        scope: &RowScope,
        id: Uuid,
        patch: &ClientPatch,
    ) -> StoreResult<Client> {
        let merged = patch.apply(&self.get_client(scope, id).await?, Utc::now());
        let sql = format!(
            "UPDATE clients SET name = $3, email = $4, phone = $5, address = $6, updated_at = $7 \
             WHERE id = $2 AND ($1::uuid IS NULL OR owning_user_id = $1) RETURNING {}",
            CLIENT_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(scope.owner_filter())
            .bind(id)
            .bind(&merged.name)
            .bind(&merged.email)
            .bind(&merged.phone)
            .bind(&merged.address)
            .bind(merged.updated_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(classify)?
            .ok_or_else(|| PersistenceError::not_found("client", id))?;
        client_from_row(&row, "")
    }

    async fn delete_client(&self, scope: &RowScope, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query(
            "DELETE FROM clients WHERE id = $2 AND ($1::uuid IS NULL OR owning_user_id = $1)",
        )
        .bind(scope.owner_filter())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(classify)?;
        if result.rows_affected() == 0 {
            return Err(PersistenceError::not_found("client", id));
        }
        Ok(())
    }

    async fn list_orders(&self, scope: &RowScope) -> StoreResult<Vec<OrderWithClient>> {
        let sql = format!(
            "{} WHERE ($1::uuid IS NULL OR o.owning_user_id = $1) ORDER BY o.installation_date, o.created_at, o.id",
            ORDER_SELECT
        );
        let rows = sqlx::query(&sql)
            .bind(scope.owner_filter())
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        rows.iter().map(order_with_client_from_row).collect()
    }

    async fn get_order(&self, scope: &RowScope, id: Uuid) -> StoreResult<OrderWithClient> {
        self.fetch_order(scope, id).await
    }

    async fn create_order(&self, scope: &RowScope, new: NewOrder) -> StoreResult<OrderWithClient> {
        self.get_client(scope, new.client_id).await?;
        let order = new.into_order(Uuid::new_v4(), scope.actor(), Utc::now());

        sqlx::query(
            "INSERT INTO orders (id, owning_user_id, client_id, title, description, status, \
             order_date, installation_date, lead_time_days, total_amount, notes, reminder_sent, \
             created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
        )
        .bind(order.id)
        .bind(order.owning_user_id)
        .bind(order.client_id)
        .bind(&order.title)
        .bind(&order.description)
        .bind(order.status.as_str())
        .bind(order.order_date)
        .bind(order.installation_date)
        .bind(order.lead_time_days)
        .bind(order.total_amount)
        .bind(&order.notes)
        .bind(order.reminder_sent)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await
        .map_err(classify)?;

        self.fetch_order(scope, order.id).await
    }

    async fn update_order(
        &self,
        scope: &RowScope,
        id: Uuid,
        patch: &OrderPatch,
    ) -> StoreResult<OrderWithClient> {
        let current = self.fetch_order(scope, id).await?;
        if let Some(client_id) = patch.client_id {
            self.get_client(scope, client_id).await?;
        }
        let merged = patch.apply(&current.order, Utc::now());

        let result = sqlx::query(
            "UPDATE orders SET client_id = $3, title = $4, description = $5, status = $6, \
             order_date = $7, installation_date = $8, lead_time_days = $9, total_amount = $10, \
             notes = $11, updated_at = $12, reminder_sent = $13 \
             WHERE id = $2 AND ($1::uuid IS NULL OR owning_user_id = $1)",
        )
        .bind(scope.owner_filter())
        .bind(id)
        .bind(merged.client_id)
        .bind(&merged.title)
        .bind(&merged.description)
        .bind(merged.status.as_str())
        .bind(merged.order_date)
        .bind(merged.installation_date)
        .bind(merged.lead_time_days)
        .bind(merged.total_amount)
        .bind(&merged.notes)
        .bind(merged.updated_at)
        .bind(merged.reminder_sent)
        .execute(&self.pool)
        .await
        .map_err(classify)?;
        if result.rows_affected() == 0 {
            return Err(PersistenceError::not_found("order", id));
        }

        self.fetch_order(scope, id).await
    }

    async fn delete_order(&self, scope: &RowScope, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query(
            "DELETE FROM orders WHERE id = $2 AND ($1::uuid IS NULL OR owning_user_id = $1)",
        )
        .bind(scope.owner_filter())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(classify)?;
        if result.rows_affected() == 0 {
            return Err(PersistenceError::not_found("order", id));
        }
        Ok(())
    }

    async fn list_payments(
        &self,
        scope: &RowScope,
        filter: PaymentFilter,
    ) -> StoreResult<Vec<Payment>> {
        let sql = format!(
            "SELECT {} FROM payments \
             WHERE ($1::uuid IS NULL OR owning_user_id = $1) \
             AND ($2::uuid IS NULL OR order_id = $2) \
             AND ($3::uuid IS NULL OR client_id = $3) \
             ORDER BY payment_date DESC, created_at DESC",
            PAYMENT_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(scope.owner_filter())
            .bind(filter.order_id)
            .bind(filter.client_id)
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        rows.iter().map(payment_from_row).collect()
    }

    async fn get_payment(&self, scope: &RowScope, id: Uuid) -> StoreResult<Payment> {
        let sql = format!(
            "SELECT {} FROM payments WHERE id = $2 AND ($1::uuid IS NULL OR owning_user_id = $1)",
            PAYMENT_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(scope.owner_filter())
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .ok_or_else(|| PersistenceError::not_found("payment", id))?;
        payment_from_row(&row)
    }

    async fn create_payment(&self, scope: &RowScope, new: NewPayment) -> StoreResult<Payment> {
        let client_id = self.fetch_order(scope, new.order_id).await?.order.client_id;
        let payment = new.into_payment(Uuid::new_v4(), scope.actor(), client_id, Utc::now());

        let sql = format!(
            "INSERT INTO payments ({cols}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {cols}",
            cols = PAYMENT_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(payment.id)
            .bind(payment.owning_user_id)
            .bind(payment.order_id)
            .bind(payment.client_id)
            .bind(payment.amount)
            .bind(payment.payment_date)
            .bind(payment.payment_method.as_str())
            .bind(&payment.reference_number)
            .bind(&payment.notes)
            .bind(payment.created_at)
            .bind(payment.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(classify)?;
        payment_from_row(&row)
    }

    async fn update_payment(
        &self,
        scope: &RowScope,
        id: Uuid,
        patch: &PaymentPatch,
    ) -> StoreResult<Payment> {
        let merged = patch.apply(&self.get_payment(scope, id).await?, Utc::now());
        let sql = format!(
            "UPDATE payments SET amount = $3, payment_date = $4, payment_method = $5, \
             reference_number = $6, notes = $7, updated_at = $8 \
             WHERE id = $2 AND ($1::uuid IS NULL OR owning_user_id = $1) RETURNING {}",
            PAYMENT_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(scope.owner_filter())
            .bind(id)
            .bind(merged.amount)
            .bind(merged.payment_date)
            .bind(merged.payment_method.as_str())
            .bind(&merged.reference_number)
            .bind(&merged.notes)
            .bind(merged.updated_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(classify)?
            .ok_or_else(|| PersistenceError::not_found("payment", id))?;
        payment_from_row(&row)
    }

    async fn delete_payment(&self, scope: &RowScope, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query(
            "DELETE FROM payments WHERE id = $2 AND ($1::uuid IS NULL OR owning_user_id = $1)",
        )
        .bind(scope.owner_filter())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(classify)?;
        if result.rows_affected() == 0 {
            return Err(PersistenceError::not_found("payment", id));
        }
        Ok(())
    }

    async fn list_users(&self, scope: &RowScope) -> StoreResult<Vec<UserProfile>> {
        scope.require_admin()?;
        let rows = sqlx::query("SELECT id, email, full_name, role FROM users ORDER BY email")
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        rows.iter().map(user_from_row).collect()
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<UserProfile> {
        let row = sqlx::query("SELECT id, email, full_name, role FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .ok_or_else(|| PersistenceError::not_found("user", id))?;
        user_from_row(&row)
    }

    async fn upsert_user(&self, profile: UserProfile) -> StoreResult<UserProfile> {
        let row = sqlx::query(
            "INSERT INTO users (id, email, full_name, role) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (id) DO UPDATE SET email = EXCLUDED.email, \
             full_name = EXCLUDED.full_name, role = EXCLUDED.role \
             RETURNING id, email, full_name, role",
        )
        .bind(profile.id)
        .bind(&profile.email)
        .bind(&profile.full_name)
        .bind(profile.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(classify)?;
        user_from_row(&row)
    }

    async fn update_profile(
        &self,
        scope: &RowScope,
        update: &ProfileUpdate,
    ) -> StoreResult<UserProfile> {
        let row = sqlx::query(
            "UPDATE users SET full_name = $2 WHERE id = $1 RETURNING id, email, full_name, role",
        )
        .bind(scope.actor())
        .bind(&update.full_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)?
        .ok_or_else(|| PersistenceError::not_found("user", scope.actor()))?;
        user_from_row(&row)
    }

    async fn due_reminders(&self, date: NaiveDate) -> StoreResult<Vec<OrderWithClient>> {
        let sql = format!(
            "{} WHERE o.installation_date = $1 AND o.reminder_sent = false \
             AND o.status NOT IN ('completed', 'cancelled') ORDER BY o.created_at",
            ORDER_SELECT
        );
        let rows = sqlx::query(&sql)
            .bind(date)
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        rows.iter().map(order_with_client_from_row).collect()
    }

    async fn mark_reminder_sent(&self, order_id: Uuid) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE orders SET reminder_sent = true, updated_at = now() WHERE id = $1",
        )
        .bind(order_id)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        if result.rows_affected() == 0 {
            return Err(PersistenceError::not_found("order", order_id));
        }
        Ok(())
    }
}
