use serde::{Deserialize, Serialize};

use crate::schedule::{DEFAULT_REMINDER_LEAD_DAYS, DEFAULT_UPCOMING_HORIZON_DAYS};

/// Scheduling windows for reminders and the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemindersConfig {
    /// Days before installation that the reminder goes out.
    #[serde(default = "default_lead_days")]
    pub lead_days: i64,

    /// Days ahead listed as upcoming on the dashboard.
    #[serde(default = "default_upcoming_horizon_days")]
    pub upcoming_horizon_days: i64,

    /// Sender address placed on reminder messages.
    #[serde(default = "default_from_address")]
    pub from_address: String,
}

impl Default for RemindersConfig {
    fn default() -> Self {
        Self {
            lead_days: default_lead_days(),
            upcoming_horizon_days: default_upcoming_horizon_days(),
            from_address: default_from_address(),
        }
    }
}

fn default_lead_days() -> i64 {
    DEFAULT_REMINDER_LEAD_DAYS
}

fn default_upcoming_horizon_days() -> i64 {
    DEFAULT_UPCOMING_HORIZON_DAYS
}

fn default_from_address() -> String {
    "reminders@installdesk.local".to_string()
}
