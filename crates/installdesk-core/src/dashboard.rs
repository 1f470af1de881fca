//! Dashboard summary assembled from visible orders and payments.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::balance::{OrderBalance, balances};
use crate::model::{Order, Payment, UserProfile};
use crate::sales::{MONTHS_PER_USER, UserSales, monthly_sales_per_user, user_sales_breakdown};
use crate::schedule::{
    DEFAULT_UPCOMING_HORIZON_DAYS, ScheduledOrder, overdue_orders, upcoming_orders,
};

/// Number of outstanding orders listed before the rest are summarized as a count.
pub const TOP_OUTSTANDING: usize = 10;

#[derive(Debug, Clone)]
pub struct DashboardOptions {
    pub today: NaiveDate,
    pub upcoming_horizon_days: i64,
    /// Admin-only per-user monthly sales.
    pub include_sales_by_user: bool,
    pub top_outstanding: usize,
}

impl DashboardOptions {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today,
            upcoming_horizon_days: DEFAULT_UPCOMING_HORIZON_DAYS,
            include_sales_by_user: false,
            top_outstanding: TOP_OUTSTANDING,
        }
    }

    pub fn with_sales_by_user(mut self, include: bool) -> Self {
        self.include_sales_by_user = include;
        self
    }

    pub fn with_horizon(mut self, days: i64) -> Self {
        self.upcoming_horizon_days = days;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub today: NaiveDate,
    pub active_orders: usize,
    pub total_revenue: Decimal,
    pub total_outstanding: Decimal,
    pub total_overpaid: Decimal,
    pub outstanding_orders: Vec<OrderBalance>,
    /// Outstanding orders beyond the listed ones.
    pub more_outstanding: usize,
    pub overdue: Vec<ScheduledOrder>,
    pub upcoming: Vec<ScheduledOrder>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sales_by_user: Option<Vec<UserSales>>,
}

pub fn dashboard_summary<O: AsRef<Order>>(
    orders: &[O],
    payments: &[Payment],
    users: &[UserProfile],
    options: &DashboardOptions,
) -> DashboardSummary {
    let today = options.today;

    let active_orders = orders
        .iter()
        .filter(|o| !o.as_ref().status.is_closed())
        .count();
    let total_revenue: Decimal = orders.iter().map(|o| o.as_ref().total_amount).sum();

    let all_balances = balances(orders, payments);
    let total_outstanding: Decimal = all_balances.iter().map(|b| b.outstanding).sum();
    let total_overpaid: Decimal = all_balances.iter().map(|b| b.overpaid).sum();

    let mut outstanding: Vec<OrderBalance> = all_balances
        .into_iter()
        .filter(|b| b.outstanding > Decimal::ZERO)
        .collect();
    outstanding.sort_by(|a, b| b.outstanding.cmp(&a.outstanding));
    let more_outstanding = outstanding.len().saturating_sub(options.top_outstanding);
    outstanding.truncate(options.top_outstanding);

    let overdue = overdue_orders(orders, today)
        .into_iter()
        .map(|o| ScheduledOrder::of(o.as_ref(), today))
        .collect();
    let upcoming = upcoming_orders(orders, today, options.upcoming_horizon_days)
        .into_iter()
        .map(|o| ScheduledOrder::of(o.as_ref(), today))
        .collect();

    let sales_by_user = options.include_sales_by_user.then(|| {
        user_sales_breakdown(&monthly_sales_per_user(orders), users, MONTHS_PER_USER)
    });

    DashboardSummary {
        today,
        active_orders,
        total_revenue,
        total_outstanding,
        total_overpaid,
        outstanding_orders: outstanding,
        more_outstanding,
        overdue,
        upcoming,
        sales_by_user,
    }
}
