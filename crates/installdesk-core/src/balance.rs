//! Payment reconciliation per order.
//!
//! Outstanding balances are floored at zero. When payments exceed the order
//! total the surplus is reported separately as `overpaid` rather than as a
//! negative balance.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::model::{Order, Payment};

/// Sum of all payments recorded against `order_id`.
pub fn total_paid(order_id: Uuid, payments: &[Payment]) -> Decimal {
    payments
        .iter()
        .filter(|p| p.order_id == order_id)
        .map(|p| p.amount)
        .sum()
}

/// Unpaid balance of an order, never negative.
pub fn outstanding(order: &Order, payments: &[Payment]) -> Decimal {
    remaining(order.total_amount, total_paid(order.id, payments))
}

/// Amount paid beyond the order total, zero when not overpaid.
pub fn overpayment(order: &Order, payments: &[Payment]) -> Decimal {
    surplus(order.total_amount, total_paid(order.id, payments))
}

fn remaining(total: Decimal, paid: Decimal) -> Decimal {
    (total - paid).max(Decimal::ZERO)
}

fn surplus(total: Decimal, paid: Decimal) -> Decimal {
    (paid - total).max(Decimal::ZERO)
}

/// Paid totals keyed by order id, computed in one pass.
pub fn paid_by_order(payments: &[Payment]) -> HashMap<Uuid, Decimal> {
    let mut paid: HashMap<Uuid, Decimal> = HashMap::new();
    for payment in payments {
        *paid.entry(payment.order_id).or_default() += payment.amount;
    }
    paid
}

/// Reconciled balance of a single order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBalance {
    pub order_id: Uuid,
    pub owning_user_id: Uuid,
    pub client_id: Uuid,
    pub title: String,
    pub installation_date: NaiveDate,
    pub total_amount: Decimal,
    pub total_paid: Decimal,
    pub outstanding: Decimal,
    pub overpaid: Decimal,
}

impl OrderBalance {
    pub fn of(order: &Order, payments: &[Payment]) -> Self {
        Self::with_paid(order, total_paid(order.id, payments))
    }

    fn with_paid(order: &Order, paid: Decimal) -> Self {
        Self {
            order_id: order.id,
            owning_user_id: order.owning_user_id,
            client_id: order.client_id,
            title: order.title.clone(),
            installation_date: order.installation_date,
            total_amount: order.total_amount,
            total_paid: paid,
            outstanding: remaining(order.total_amount, paid),
            overpaid: surplus(order.total_amount, paid),
        }
    }

    pub fn is_settled(&self) -> bool {
        self.outstanding.is_zero()
    }
}

/// Balances for every order.
pub fn balances<O: AsRef<Order>>(orders: &[O], payments: &[Payment]) -> Vec<OrderBalance> {
    let paid = paid_by_order(payments);
    orders
        .iter()
        .map(|o| {
            let order = o.as_ref();
            OrderBalance::with_paid(order, paid.get(&order.id).copied().unwrap_or_default())
        })
        .collect()
}

/// Orders with an unpaid balance, largest balance first.
pub fn outstanding_orders<O: AsRef<Order>>(orders: &[O], payments: &[Payment]) -> Vec<OrderBalance> {
    let mut rows: Vec<OrderBalance> = balances(orders, payments)
        .into_iter()
        .filter(|b| b.outstanding > Decimal::ZERO)
        .collect();
    rows.sort_by(|a, b| b.outstanding.cmp(&a.outstanding));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PaymentMethod;
    use chrono::Utc;

    fn order(total: i64) -> Order {
        let now = Utc::now();
        let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        Order {
            id: Uuid::new_v4(),
            owning_user_id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            title: format!("Order {total}"),
            description: String::new(),
            status: Default::default(),
            order_date: day,
            installation_date: day,
            lead_time_days: 1,
            total_amount: Decimal::from(total),
            notes: String::new(),
            reminder_sent: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn payment(order: &Order, amount: Decimal) -> Payment {
        let now = Utc::now();
        Payment {
            id: Uuid::new_v4(),
            owning_user_id: order.owning_user_id,
            order_id: order.id,
            client_id: order.client_id,
            amount,
            payment_date: NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(),
            payment_method: PaymentMethod::Card,
            reference_number: String::new(),
            notes: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_partial_payments_leave_balance() {
        let o = order(1000);
        let payments = vec![
            payment(&o, Decimal::from(300)),
            payment(&o, Decimal::from(300)),
        ];

        assert_eq!(total_paid(o.id, &payments), Decimal::from(600));
        assert_eq!(outstanding(&o, &payments), Decimal::from(400));
        assert_eq!(overpayment(&o, &payments), Decimal::ZERO);
    }

    #[test]
    fn test_overpayment_floors_outstanding_at_zero() {
        let o = order(500);
        let payments = vec![payment(&o, Decimal::from(600))];

        assert_eq!(outstanding(&o, &payments), Decimal::ZERO);
        assert_eq!(overpayment(&o, &payments), Decimal::from(100));
        assert!(OrderBalance::of(&o, &payments).is_settled());
    }

    #[test]
    fn test_no_payments_means_nothing_paid() {
        let o = order(250);
        assert_eq!(total_paid(o.id, &[]), Decimal::ZERO);
        assert_eq!(outstanding(&o, &[]), Decimal::from(250));
    }

    #[test]
    fn test_total_paid_ignores_other_orders_and_ordering() {
        let a = order(1000);
        let b = order(1000);
        let mut payments = vec![
            payment(&a, Decimal::new(12_550, 2)),
            payment(&b, Decimal::from(999)),
            payment(&a, Decimal::new(7_450, 2)),
            payment(&a, Decimal::from(50)),
        ];

        let forward = total_paid(a.id, &payments);
        payments.reverse();
        let backward = total_paid(a.id, &payments);
        payments.swap(0, 2);
        let shuffled = total_paid(a.id, &payments);

        assert_eq!(forward, Decimal::from(250));
        assert_eq!(forward, backward);
        assert_eq!(forward, shuffled);
    }

    #[test]
    fn test_outstanding_orders_sorted_by_balance_desc() {
        let small = order(100);
        let large = order(900);
        let settled = order(300);
        let payments = vec![
            payment(&large, Decimal::from(100)),
            payment(&settled, Decimal::from(300)),
        ];

        let rows = outstanding_orders(&[small.clone(), large.clone(), settled], &payments);
        let ids: Vec<Uuid> = rows.iter().map(|r| r.order_id).collect();
        assert_eq!(ids, vec![large.id, small.id]);
        assert_eq!(rows[0].outstanding, Decimal::from(800));
        assert_eq!(rows[0].total_paid, Decimal::from(100));
    }

    #[test]
    fn test_paid_by_order_matches_total_paid() {
        let a = order(10);
        let b = order(20);
        let payments = vec![
            payment(&a, Decimal::from(4)),
            payment(&b, Decimal::from(5)),
            payment(&a, Decimal::from(6)),
        ];
        let index = paid_by_order(&payments);
        assert_eq!(index[&a.id], total_paid(a.id, &payments));
        assert_eq!(index[&b.id], total_paid(b.id, &payments));
    }
}
