//! Month grid of installations, Sunday-first, padded to whole weeks.

use chrono::{Datelike, NaiveDate, TimeDelta};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{Order, OrderStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEntry {
    pub order_id: Uuid,
    pub title: String,
    pub status: OrderStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    /// False for padding days taken from the previous or next month.
    pub in_month: bool,
    pub installations: Vec<CalendarEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarMonth {
    pub year: i32,
    pub month: u32,
    pub days: Vec<CalendarDay>,
}

impl CalendarMonth {
    pub fn weeks(&self) -> impl Iterator<Item = &[CalendarDay]> {
        self.days.chunks(7)
    }
}

/// Build the grid for `year`/`month`. Returns `None` for an invalid month.
pub fn calendar_month<O: AsRef<Order>>(orders: &[O], year: i32, month: u32) -> Option<CalendarMonth> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next_first = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };

    let days_in_month = (next_first - first).num_days();
    let leading = i64::from(first.weekday().num_days_from_sunday());
    let total_cells = (days_in_month + leading + 6) / 7 * 7;
    let grid_start = first - TimeDelta::days(leading);

    let days = (0..total_cells)
        .map(|offset| {
            let date = grid_start + TimeDelta::days(offset);
            CalendarDay {
                date,
                in_month: date.month() == month && date.year() == year,
                installations: orders
                    .iter()
                    .map(AsRef::<Order>::as_ref)
                    .filter(|o| o.installation_date == date)
                    .map(|o| CalendarEntry {
                        order_id: o.id,
                        title: o.title.clone(),
                        status: o.status,
                    })
                    .collect(),
            }
        })
        .collect();

    Some(CalendarMonth { year, month, days })
}
