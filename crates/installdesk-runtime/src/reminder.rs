//! Installation reminder dispatch.
//!
//! A run selects open orders installing exactly `today + lead_days` that have
//! not been reminded yet, renders one message per order, hands it to the
//! [`Mailer`] and marks the order as reminded. Each order is handled on its
//! own: a failure is recorded in the report and the run moves on.

use async_trait::async_trait;
use chrono::{NaiveDate, TimeDelta};
use installdesk_core::OrderWithClient;
use installdesk_core::schedule::DEFAULT_REMINDER_LEAD_DAYS;
use installdesk_store::Store;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::error::RuntimeError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, Error)]
#[error("mail delivery failed: {0}")]
pub struct MailError(pub String);

/// Outbound mail transport.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &ReminderMessage) -> Result<(), MailError>;
}

/// Writes each message to the log instead of delivering it.
pub struct LogMailer {
    from: String,
}

impl LogMailer {
    pub fn new(from: impl Into<String>) -> Self {
        Self { from: from.into() }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &ReminderMessage) -> Result<(), MailError> {
        tracing::info!(
            from = %self.from,
            to = %message.to,
            subject = %message.subject,
            body = %message.body,
            "reminder email"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderStatus {
    Sent,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderResult {
    pub order_id: Uuid,
    pub client_email: Option<String>,
    pub status: ReminderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderReport {
    pub success: bool,
    pub processed: usize,
    pub results: Vec<ReminderResult>,
}

impl ReminderReport {
    pub fn sent(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.status == ReminderStatus::Sent)
            .count()
    }
}

pub struct ReminderDispatcher {
    store: Arc<dyn Store>,
    mailer: Arc<dyn Mailer>,
    lead_days: i64,
}

impl ReminderDispatcher {
    pub fn new(store: Arc<dyn Store>, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            store,
            mailer,
            lead_days: DEFAULT_REMINDER_LEAD_DAYS,
        }
    }

    pub fn with_lead_days(mut self, lead_days: i64) -> Self {
        self.lead_days = lead_days;
        self
    }

    /// Installation date targeted by a run on `today`.
    pub fn target_date(&self, today: NaiveDate) -> NaiveDate {
        today
            .checked_add_signed(TimeDelta::days(self.lead_days))
            .unwrap_or(NaiveDate::MAX)
    }

    /// Only the initial query can fail the whole run.
    pub async fn run(&self, today: NaiveDate) -> Result<ReminderReport, RuntimeError> {
        let target = self.target_date(today);
        let due = self.store.due_reminders(target).await?;
        tracing::info!(%target, count = due.len(), "dispatching installation reminders");

        let mut results = Vec::with_capacity(due.len());
        for order in &due {
            let client_email = order.client.as_ref().map(|c| c.email.clone());
            let result = match self.remind(order).await {
                Ok(()) => ReminderResult {
                    order_id: order.order.id,
                    client_email,
                    status: ReminderStatus::Sent,
                    error: None,
                },
                Err(error) => {
                    tracing::error!(order_id = %order.order.id, %error, "reminder failed");
                    ReminderResult {
                        order_id: order.order.id,
                        client_email,
                        status: ReminderStatus::Failed,
                        error: Some(error),
                    }
                }
            };
            results.push(result);
        }

        Ok(ReminderReport {
            success: true,
            processed: results.len(),
            results,
        })
    }

    async fn remind(&self, order: &OrderWithClient) -> Result<(), String> {
        let message = render_reminder(order)?;
        self.mailer
            .send(&message)
            .await
            .map_err(|e| e.to_string())?;
        self.store
            .mark_reminder_sent(order.order.id)
            .await
            .map_err(|e| e.to_string())?;
        tracing::info!(order_id = %order.order.id, to = %message.to, "reminder sent");
        Ok(())
    }
}

/// Plain-text reminder for one order. Fails when the client is missing.
pub fn render_reminder(order: &OrderWithClient) -> Result<ReminderMessage, String> {
    let client = order
        .client
        .as_ref()
        .ok_or_else(|| format!("order {} has no client", order.order.id))?;
    let o = &order.order;

    let mut body = format!(
        "Dear {name},\n\n\
         This is a friendly reminder that your installation for {title} is scheduled for {date}.\n\n\
         Order details:\n\
         Description: {description}\n\
         Installation address: {address}\n\
         Total amount: {total}\n",
        name = client.name,
        title = o.title,
        date = o.installation_date.format("%A, %B %-d, %Y"),
        description = o.description,
        address = client.address,
        total = format_amount(o.total_amount),
    );
    if !o.notes.trim().is_empty() {
        body.push_str(&format!("Notes: {}\n", o.notes));
    }
    body.push_str(
        "\nPlease ensure someone is available at the scheduled time. \
         If you need to reschedule, please contact us as soon as possible.\n\n\
         Thank you for your business!\n",
    );

    Ok(ReminderMessage {
        to: client.email.clone(),
        subject: format!("Installation reminder: {}", o.title),
        body,
    })
}

/// `$1,234.50` style currency text.
pub fn format_amount(amount: Decimal) -> String {
    let fixed = format!("{:.2}", amount.round_dp(2).abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if amount.is_sign_negative() && !amount.is_zero() { "-" } else { "" };
    format!("{}${}.{}", sign, grouped, cents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use installdesk_core::{
        NewClient, NewOrder, OrderPatch, OrderStatus, Role, RowScope, UserProfile,
    };
    use installdesk_store::MemoryStore;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<ReminderMessage>>,
        reject: Option<String>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, message: &ReminderMessage) -> Result<(), MailError> {
            if self.reject.as_deref() == Some(message.to.as_str()) {
                return Err(MailError("mailbox unavailable".to_string()));
            }
            self.sent.lock().await.push(message.clone());
            Ok(())
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn seeded() -> (Arc<MemoryStore>, RowScope) {
        let owner = UserProfile {
            id: Uuid::new_v4(),
            email: "crew@example.com".to_string(),
            full_name: None,
            role: Role::User,
        };
        let scope = RowScope::owner(owner.id);
        (Arc::new(MemoryStore::with_users([owner]).await), scope)
    }

    async fn order(
        store: &MemoryStore,
        scope: &RowScope,
        email: &str,
        install: NaiveDate,
        status: OrderStatus,
    ) -> Uuid {
        let client = store
            .create_client(
                scope,
                NewClient {
                    name: "Lena Park".to_string(),
                    email: email.to_string(),
                    phone: "555-0142".to_string(),
                    address: "88 Birch Lane".to_string(),
                },
            )
            .await
            .unwrap();
        store
            .create_order(
                scope,
                NewOrder {
                    client_id: client.id,
                    title: "Kitchen cabinets".to_string(),
                    description: "Upper and lower units".to_string(),
                    status,
                    order_date: install - TimeDelta::days(10),
                    lead_time_days: 10,
                    total_amount: Decimal::new(1_234_50, 2),
                    notes: "Side gate code 4411".to_string(),
                },
            )
            .await
            .unwrap()
            .order
            .id
    }

    #[tokio::test]
    async fn test_run_sends_due_reminders_once() {
        let (store, scope) = seeded().await;
        let today = date(2024, 6, 10);
        let due = order(&store, &scope, "lena@example.com", date(2024, 6, 13), OrderStatus::Confirmed).await;
        order(&store, &scope, "late@example.com", date(2024, 6, 14), OrderStatus::Confirmed).await;
        order(&store, &scope, "done@example.com", date(2024, 6, 13), OrderStatus::Cancelled).await;

        let mailer = Arc::new(RecordingMailer::default());
        let dispatcher = ReminderDispatcher::new(store.clone(), mailer.clone());

        let report = dispatcher.run(today).await.unwrap();
        assert!(report.success);
        assert_eq!(report.processed, 1);
        assert_eq!(report.results[0].order_id, due);
        assert_eq!(report.results[0].status, ReminderStatus::Sent);
        assert_eq!(report.sent(), 1);

        let sent = mailer.sent.lock().await;
        assert_eq!(sent[0].to, "lena@example.com");
        assert!(sent[0].body.contains("Thursday, June 13, 2024"));
        assert!(sent[0].body.contains("$1,234.50"));
        assert!(sent[0].body.contains("Side gate code 4411"));
        drop(sent);

        let again = dispatcher.run(today).await.unwrap();
        assert_eq!(again.processed, 0);
    }

    #[tokio::test]
    async fn test_rescheduled_order_gets_a_new_reminder() {
        let (store, scope) = seeded().await;
        let id = order(&store, &scope, "lena@example.com", date(2024, 6, 13), OrderStatus::Confirmed).await;

        let mailer = Arc::new(RecordingMailer::default());
        let dispatcher = ReminderDispatcher::new(store.clone(), mailer.clone());
        assert_eq!(dispatcher.run(date(2024, 6, 10)).await.unwrap().sent(), 1);

        let patch = OrderPatch {
            lead_time_days: Some(17),
            ..Default::default()
        };
        let moved = store.update_order(&scope, id, &patch).await.unwrap();
        assert_eq!(moved.order.installation_date, date(2024, 6, 20));
        assert!(!moved.order.reminder_sent);

        let report = dispatcher.run(date(2024, 6, 17)).await.unwrap();
        assert_eq!(report.sent(), 1);
        assert_eq!(report.results[0].order_id, id);

        let sent = mailer.sent.lock().await;
        assert_eq!(sent.len(), 2);
        assert!(sent[1].body.contains("Thursday, June 20, 2024"));
    }

    #[tokio::test]
    async fn test_failure_is_recorded_and_loop_continues() {
        let (store, scope) = seeded().await;
        let target = date(2024, 6, 13);
        let bad = order(&store, &scope, "bounce@example.com", target, OrderStatus::Pending).await;
        let good = order(&store, &scope, "ok@example.com", target, OrderStatus::InProgress).await;

        let mailer = Arc::new(RecordingMailer {
            reject: Some("bounce@example.com".to_string()),
            ..Default::default()
        });
        let report = ReminderDispatcher::new(store.clone(), mailer)
            .run(date(2024, 6, 10))
            .await
            .unwrap();

        assert_eq!(report.processed, 2);
        let failed = report.results.iter().find(|r| r.order_id == bad).unwrap();
        assert_eq!(failed.status, ReminderStatus::Failed);
        assert!(failed.error.as_deref().unwrap().contains("mailbox unavailable"));
        let sent = report.results.iter().find(|r| r.order_id == good).unwrap();
        assert_eq!(sent.status, ReminderStatus::Sent);

        // The failed order stays due for the next run.
        let remaining = store.due_reminders(target).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].order.id, bad);
    }

    #[test]
    fn test_report_serializes_like_function_response() {
        let report = ReminderReport {
            success: true,
            processed: 1,
            results: vec![ReminderResult {
                order_id: Uuid::nil(),
                client_email: Some("a@example.com".to_string()),
                status: ReminderStatus::Sent,
                error: None,
            }],
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["results"][0]["status"], "sent");
        assert!(value["results"][0].get("error").is_none());
    }

    #[test]
    fn test_format_amount_groups_thousands() {
        assert_eq!(format_amount(Decimal::new(1_234_50, 2)), "$1,234.50");
        assert_eq!(format_amount(Decimal::from(999)), "$999.00");
        assert_eq!(format_amount(Decimal::from(1_000_000)), "$1,000,000.00");
        assert_eq!(format_amount(Decimal::ZERO), "$0.00");
    }

    #[test]
    fn test_render_requires_client() {
        let now = Utc::now();
        let order = NewOrder {
            client_id: Uuid::new_v4(),
            title: "Deck".to_string(),
            description: String::new(),
            status: OrderStatus::Pending,
            order_date: date(2024, 1, 1),
            lead_time_days: 3,
            total_amount: Decimal::ONE,
            notes: String::new(),
        }
        .into_order(Uuid::new_v4(), Uuid::new_v4(), now);
        let joined = OrderWithClient {
            order,
            client: None,
        };
        assert!(render_reminder(&joined).is_err());
    }
}
