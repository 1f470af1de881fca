//! Persisted entities: clients, orders, payments and user profiles.
//!
//! Each entity has three shapes:
//! - the stored row (`Client`, `Order`, `Payment`)
//! - the insert payload (`NewClient`, ...), which never carries ids, owners or timestamps
//! - the patch payload (`ClientPatch`, ...), where `None` leaves a column untouched

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::schedule::compute_installation_date;

/// Error returned when a stored tag does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

// =============================================================================
// ENUMS
// =============================================================================

/// Lifecycle tag of an order. Any transition is permitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::InProgress,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::InProgress => "in_progress",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Completed and cancelled orders no longer need scheduling attention.
    pub fn is_closed(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownVariant {
                kind: "order status",
                value: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Card,
    BankTransfer,
    Check,
    Other,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Check => "check",
            PaymentMethod::Other => "other",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash" => Ok(PaymentMethod::Cash),
            "card" => Ok(PaymentMethod::Card),
            "bank_transfer" => Ok(PaymentMethod::BankTransfer),
            "check" => Ok(PaymentMethod::Check),
            "other" => Ok(PaymentMethod::Other),
            other => Err(UnknownVariant {
                kind: "payment method",
                value: other.to_string(),
            }),
        }
    }
}

/// Role of a signed-in user. Only `Admin` widens row visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Manager,
    #[default]
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "manager" => Ok(Role::Manager),
            "user" => Ok(Role::User),
            other => Err(UnknownVariant {
                kind: "role",
                value: other.to_string(),
            }),
        }
    }
}

// =============================================================================
// CLIENTS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: Uuid,
    pub owning_user_id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewClient {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl NewClient {
    /// Materialize the row that an insert by `owner` produces.
    pub fn into_client(self, id: Uuid, owner: Uuid, now: DateTime<Utc>) -> Client {
        Client {
            id,
            owning_user_id: owner,
            name: self.name,
            email: self.email,
            phone: self.phone,
            address: self.address,
            created_at: now,
            updated_at: now,
        }
    }
}

impl ClientPatch {
    pub fn apply(&self, client: &Client, now: DateTime<Utc>) -> Client {
        let mut updated = client.clone();
        if let Some(name) = &self.name {
            updated.name = name.clone();
        }
        if let Some(email) = &self.email {
            updated.email = email.clone();
        }
        if let Some(phone) = &self.phone {
            updated.phone = phone.clone();
        }
        if let Some(address) = &self.address {
            updated.address = address.clone();
        }
        updated.updated_at = now;
        updated
    }
}

// =============================================================================
// ORDERS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub owning_user_id: Uuid,
    pub client_id: Uuid,
    pub title: String,
    pub description: String,
    pub status: OrderStatus,
    pub order_date: NaiveDate,
    pub installation_date: NaiveDate,
    pub lead_time_days: i32,
    pub total_amount: Decimal,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub reminder_sent: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AsRef<Order> for Order {
    fn as_ref(&self) -> &Order {
        self
    }
}

/// An order read together with its client, as shown in listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderWithClient {
    #[serde(flatten)]
    pub order: Order,
    #[serde(default)]
    pub client: Option<Client>,
}

impl AsRef<Order> for OrderWithClient {
    fn as_ref(&self) -> &Order {
        &self.order
    }
}

/// Insert payload for an order.
///
/// There is no installation date here: it is always derived from
/// `order_date + lead_time_days` when the row is materialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrder {
    pub client_id: Uuid,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub status: OrderStatus,
    pub order_date: NaiveDate,
    pub lead_time_days: i32,
    pub total_amount: Decimal,
    #[serde(default)]
    pub notes: String,
}

impl NewOrder {
    pub fn installation_date(&self) -> NaiveDate {
        compute_installation_date(self.order_date, self.lead_time_days)
    }

    pub fn into_order(self, id: Uuid, owner: Uuid, now: DateTime<Utc>) -> Order {
        let installation_date = self.installation_date();
        Order {
            id,
            owning_user_id: owner,
            client_id: self.client_id,
            title: self.title,
            description: self.description,
            status: self.status,
            order_date: self.order_date,
            installation_date,
            lead_time_days: self.lead_time_days,
            total_amount: self.total_amount,
            notes: self.notes,
            reminder_sent: false,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_time_days: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl OrderPatch {
    /// Apply the patch and re-derive the installation date from the merged
    /// order date and lead time. Moving the installation date clears
    /// `reminder_sent` so the new date gets its own reminder.
    pub fn apply(&self, order: &Order, now: DateTime<Utc>) -> Order {
        let mut updated = order.clone();
        if let Some(client_id) = self.client_id {
            updated.client_id = client_id;
        }
        if let Some(title) = &self.title {
            updated.title = title.clone();
        }
        if let Some(description) = &self.description {
            updated.description = description.clone();
        }
        if let Some(status) = self.status {
            updated.status = status;
        }
        if let Some(order_date) = self.order_date {
            updated.order_date = order_date;
        }
        if let Some(lead_time_days) = self.lead_time_days {
            updated.lead_time_days = lead_time_days;
        }
        if let Some(total_amount) = self.total_amount {
            updated.total_amount = total_amount;
        }
        if let Some(notes) = &self.notes {
            updated.notes = notes.clone();
        }
        updated.installation_date =
            compute_installation_date(updated.order_date, updated.lead_time_days);
        if updated.installation_date != order.installation_date {
            updated.reminder_sent = false;
        }
        updated.updated_at = now;
        updated
    }
}

// =============================================================================
// PAYMENTS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub owning_user_id: Uuid,
    pub order_id: Uuid,
    pub client_id: Uuid,
    pub amount: Decimal,
    pub payment_date: NaiveDate,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub reference_number: String,
    #[serde(default)]
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload for a payment. The client is taken from the paid order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPayment {
    pub order_id: Uuid,
    pub amount: Decimal,
    pub payment_date: NaiveDate,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub reference_number: String,
    #[serde(default)]
    pub notes: String,
}

impl NewPayment {
    pub fn into_payment(self, id: Uuid, owner: Uuid, client_id: Uuid, now: DateTime<Utc>) -> Payment {
        Payment {
            id,
            owning_user_id: owner,
            order_id: self.order_id,
            client_id,
            amount: self.amount,
            payment_date: self.payment_date,
            payment_method: self.payment_method,
            reference_number: self.reference_number,
            notes: self.notes,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl PaymentPatch {
    pub fn apply(&self, payment: &Payment, now: DateTime<Utc>) -> Payment {
        let mut updated = payment.clone();
        if let Some(amount) = self.amount {
            updated.amount = amount;
        }
        if let Some(payment_date) = self.payment_date {
            updated.payment_date = payment_date;
        }
        if let Some(method) = self.payment_method {
            updated.payment_method = method;
        }
        if let Some(reference) = &self.reference_number {
            updated.reference_number = reference.clone();
        }
        if let Some(notes) = &self.notes {
            updated.notes = notes.clone();
        }
        updated.updated_at = now;
        updated
    }
}

/// Optional filters for payment listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentFilter {
    #[serde(default)]
    pub order_id: Option<Uuid>,
    #[serde(default)]
    pub client_id: Option<Uuid>,
}

impl PaymentFilter {
    pub fn for_client(client_id: Uuid) -> Self {
        Self {
            order_id: None,
            client_id: Some(client_id),
        }
    }

    pub fn for_order(order_id: Uuid) -> Self {
        Self {
            order_id: Some(order_id),
            client_id: None,
        }
    }

    pub fn matches(&self, payment: &Payment) -> bool {
        self.order_id.is_none_or(|id| payment.order_id == id)
            && self.client_id.is_none_or(|id| payment.client_id == id)
    }
}

// =============================================================================
// USERS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub role: Role,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub full_name: String,
}

/// Human-readable name for a user id: the profile's full name when known,
/// otherwise the first eight characters of the id followed by `...`.
pub fn display_name(user_id: Uuid, users: &[UserProfile]) -> String {
    users
        .iter()
        .find(|u| u.id == user_id)
        .and_then(|u| u.full_name.as_deref())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| {
            let id = user_id.to_string();
            format!("{}...", &id[..8])
        })
}
