//! Revenue rollups by user and calendar month.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::model::{Order, UserProfile, display_name};

/// Number of most recent months shown per user on the dashboard.
pub const MONTHS_PER_USER: usize = 6;

/// A calendar month, rendered as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .split_once('-')
            .ok_or_else(|| format!("expected YYYY-MM, got '{}'", s))?;
        let year: i32 = year.parse().map_err(|_| format!("invalid year in '{}'", s))?;
        let month: u32 = month.parse().map_err(|_| format!("invalid month in '{}'", s))?;
        if !(1..=12).contains(&month) {
            return Err(format!("month out of range in '{}'", s));
        }
        Ok(Self { year, month })
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for YearMonth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Sales totals: user id → month → summed order totals.
pub type MonthlySales = BTreeMap<Uuid, BTreeMap<YearMonth, Decimal>>;

/// Group orders by owner, then by the month of their order date.
pub fn monthly_sales_per_user<O: AsRef<Order>>(orders: &[O]) -> MonthlySales {
    let mut sales = MonthlySales::new();
    for o in orders {
        let order = o.as_ref();
        *sales
            .entry(order.owning_user_id)
            .or_default()
            .entry(YearMonth::of(order.order_date))
            .or_default() += order.total_amount;
    }
    sales
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthSales {
    pub month: YearMonth,
    pub total: Decimal,
}

/// One user's row in the admin sales breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSales {
    pub user_id: Uuid,
    pub name: String,
    /// Sum over every month, not only the ones listed.
    pub total: Decimal,
    /// Most recent months first.
    pub months: Vec<MonthSales>,
}

/// Per-user breakdown with the latest `months_shown` months each, users
/// ordered by overall total descending.
pub fn user_sales_breakdown(
    sales: &MonthlySales,
    users: &[UserProfile],
    months_shown: usize,
) -> Vec<UserSales> {
    let mut rows: Vec<UserSales> = sales
        .iter()
        .map(|(user_id, months)| UserSales {
            user_id: *user_id,
            name: display_name(*user_id, users),
            total: months.values().copied().sum(),
            months: months
                .iter()
                .rev()
                .take(months_shown)
                .map(|(month, total)| MonthSales {
                    month: *month,
                    total: *total,
                })
                .collect(),
        })
        .collect();
    rows.sort_by(|a, b| b.total.cmp(&a.total));
    rows
}
