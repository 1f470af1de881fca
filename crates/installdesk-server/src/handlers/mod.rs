//! Request handlers, one module per resource.

pub mod clients;
pub mod orders;
pub mod payments;
pub mod reminders;
pub mod reports;
pub mod session;

use chrono::{NaiveDate, Utc};

pub(crate) fn today() -> NaiveDate {
    Utc::now().date_naive()
}
