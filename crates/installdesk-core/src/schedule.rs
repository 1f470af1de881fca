//! Installation scheduling: date derivation and overdue/upcoming detection.
//!
//! All comparisons use whole calendar days. "Today" is always passed in by the
//! caller so the same inputs give the same answer regardless of wall clock.

use chrono::{NaiveDate, TimeDelta};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{Order, OrderStatus};

/// Default look-ahead window for upcoming installations.
pub const DEFAULT_UPCOMING_HORIZON_DAYS: i64 = 7;

/// Default number of days before installation that a reminder goes out.
pub const DEFAULT_REMINDER_LEAD_DAYS: i64 = 3;

/// Longest accepted lead time, about ten years.
pub const MAX_LEAD_TIME_DAYS: i32 = 3650;

/// `order_date + lead_time_days` calendar days.
pub fn compute_installation_date(order_date: NaiveDate, lead_time_days: i32) -> NaiveDate {
    order_date
        .checked_add_signed(TimeDelta::days(i64::from(lead_time_days)))
        .unwrap_or(NaiveDate::MAX)
}

/// Recover a lead time from two stored dates, never less than one day.
pub fn derive_lead_time(order_date: NaiveDate, installation_date: NaiveDate) -> i32 {
    let days = (installation_date - order_date).num_days().max(1);
    i32::try_from(days).unwrap_or(i32::MAX)
}

/// Signed whole days from `today` until `date` (negative when in the past).
pub fn days_until(date: NaiveDate, today: NaiveDate) -> i64 {
    (date - today).num_days()
}

/// Orders whose installation date has passed while still open.
pub fn overdue_orders<O: AsRef<Order>>(orders: &[O], today: NaiveDate) -> Vec<&O> {
    orders
        .iter()
        .filter(|o| {
            let order = o.as_ref();
            order.installation_date < today && !order.status.is_closed()
        })
        .collect()
}

/// Orders installing between today and `today + horizon_days`, both inclusive.
pub fn upcoming_orders<O: AsRef<Order>>(
    orders: &[O],
    today: NaiveDate,
    horizon_days: i64,
) -> Vec<&O> {
    orders
        .iter()
        .filter(|o| {
            let delta = days_until(o.as_ref().installation_date, today);
            (0..=horizon_days).contains(&delta)
        })
        .collect()
}

/// Whether an order should receive a reminder for installations on `target`.
pub fn is_reminder_due(order: &Order, target: NaiveDate) -> bool {
    order.installation_date == target && !order.reminder_sent && !order.status.is_closed()
}

/// Compact view of a scheduled order used in dashboard lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledOrder {
    pub order_id: Uuid,
    pub owning_user_id: Uuid,
    pub client_id: Uuid,
    pub title: String,
    pub status: OrderStatus,
    pub installation_date: NaiveDate,
    pub days_until: i64,
}

impl ScheduledOrder {
    pub fn of(order: &Order, today: NaiveDate) -> Self {
        Self {
            order_id: order.id,
            owning_user_id: order.owning_user_id,
            client_id: order.client_id,
            title: order.title.clone(),
            status: order.status,
            installation_date: order.installation_date,
            days_until: days_until(order.installation_date, today),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn order(installation_date: NaiveDate, status: OrderStatus) -> Order {
        let now = Utc::now();
        Order {
            id: Uuid::new_v4(),
            owning_user_id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            title: "Window replacement".to_string(),
            description: String::new(),
            status,
            order_date: installation_date - TimeDelta::days(14),
            installation_date,
            lead_time_days: 14,
            total_amount: Decimal::from(800),
            notes: String::new(),
            reminder_sent: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_installation_date_adds_lead_time() {
        assert_eq!(compute_installation_date(date(2024, 1, 1), 14), date(2024, 1, 15));
        assert_eq!(compute_installation_date(date(2024, 2, 20), 10), date(2024, 3, 1));
        assert_eq!(compute_installation_date(date(2023, 12, 25), 7), date(2024, 1, 1));
    }

    #[test]
    fn test_derive_lead_time_floors_at_one_day() {
        assert_eq!(derive_lead_time(date(2024, 1, 1), date(2024, 1, 15)), 14);
        assert_eq!(derive_lead_time(date(2024, 1, 1), date(2024, 1, 1)), 1);
        assert_eq!(derive_lead_time(date(2024, 1, 10), date(2024, 1, 1)), 1);
    }

    #[test]
    fn test_upcoming_within_horizon_is_not_overdue() {
        let today = date(2024, 6, 10);
        let orders = vec![order(date(2024, 6, 17), OrderStatus::Pending)];

        assert_eq!(upcoming_orders(&orders, today, DEFAULT_UPCOMING_HORIZON_DAYS).len(), 1);
        assert!(overdue_orders(&orders, today).is_empty());
    }

    #[test]
    fn test_past_open_order_is_overdue() {
        let today = date(2024, 6, 10);
        let orders = vec![order(date(2024, 6, 1), OrderStatus::InProgress)];

        assert_eq!(overdue_orders(&orders, today).len(), 1);
        assert!(upcoming_orders(&orders, today, DEFAULT_UPCOMING_HORIZON_DAYS).is_empty());
    }

    #[test]
    fn test_closed_orders_are_never_overdue() {
        let today = date(2024, 6, 10);
        let orders = vec![
            order(date(2024, 6, 1), OrderStatus::Completed),
            order(date(2024, 6, 1), OrderStatus::Cancelled),
        ];
        assert!(overdue_orders(&orders, today).is_empty());
    }

    #[test]
    fn test_upcoming_horizon_is_inclusive_on_both_ends() {
        let today = date(2024, 6, 10);
        let orders = vec![
            order(date(2024, 6, 10), OrderStatus::Pending),
            order(date(2024, 6, 17), OrderStatus::Confirmed),
            order(date(2024, 6, 18), OrderStatus::Pending),
            order(date(2024, 6, 9), OrderStatus::Pending),
        ];

        let upcoming = upcoming_orders(&orders, today, 7);
        let dates: Vec<NaiveDate> = upcoming.iter().map(|o| o.installation_date).collect();
        assert_eq!(dates, vec![date(2024, 6, 10), date(2024, 6, 17)]);
    }

    #[test]
    fn test_installation_today_is_neither_overdue_nor_missed() {
        let today = date(2024, 6, 10);
        let orders = vec![order(today, OrderStatus::Pending)];
        assert!(overdue_orders(&orders, today).is_empty());
        assert_eq!(upcoming_orders(&orders, today, 0).len(), 1);
    }

    #[test]
    fn test_reminder_due_rules() {
        let target = date(2024, 6, 13);
        let mut due = order(target, OrderStatus::Confirmed);
        assert!(is_reminder_due(&due, target));

        due.reminder_sent = true;
        assert!(!is_reminder_due(&due, target));

        let closed = order(target, OrderStatus::Completed);
        assert!(!is_reminder_due(&closed, target));

        let other_day = order(date(2024, 6, 14), OrderStatus::Pending);
        assert!(!is_reminder_due(&other_day, target));
    }

    #[test]
    fn test_scheduled_order_reports_days_until() {
        let today = date(2024, 6, 10);
        let view = ScheduledOrder::of(&order(date(2024, 6, 1), OrderStatus::Pending), today);
        assert_eq!(view.days_until, -9);
    }
}
