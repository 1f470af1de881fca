//! `installdesk send-reminders` - one reminder run, for cron.

use chrono::Utc;
use installdesk_core::AppConfig;

use super::{connect_store, reminder_dispatcher};

pub async fn run(config: &AppConfig) -> anyhow::Result<()> {
    let store = connect_store(config).await?;
    let report = reminder_dispatcher(config, store)
        .run(Utc::now().date_naive())
        .await?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    if report.sent() < report.processed {
        tracing::warn!(
            processed = report.processed,
            sent = report.sent(),
            "some reminders failed"
        );
    }
    Ok(())
}
