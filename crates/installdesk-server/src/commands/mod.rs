//! Subcommand implementations for the `installdesk` binary.

pub mod keys;
pub mod reminders;
pub mod serve;
pub mod token;
pub mod users;

use anyhow::Context;
use installdesk_biscuit::{KeyPair, SessionIssuer};
use installdesk_core::AppConfig;
use installdesk_runtime::{LogMailer, ReminderDispatcher};
use installdesk_store::{PgStore, Store};
use std::sync::Arc;

/// Signing key from configuration, or `None` when none is configured.
fn configured_keypair(config: &AppConfig) -> anyhow::Result<Option<KeyPair>> {
    let hex = config
        .auth
        .resolve_private_key()
        .context("failed to read private key")?;
    hex.map(|h| KeyPair::from_private_key_hex(&h))
        .transpose()
        .context("invalid private key")
}

pub(crate) fn session_issuer(config: &AppConfig) -> anyhow::Result<SessionIssuer> {
    let keypair = configured_keypair(config)?.context(
        "no private key configured; set INSTALLDESK_PRIVATE_KEY or run `installdesk keys generate`",
    )?;
    Ok(SessionIssuer::new(keypair))
}

pub(crate) async fn connect_store(config: &AppConfig) -> anyhow::Result<Arc<dyn Store>> {
    let store = PgStore::connect(&config.database)
        .await
        .context("failed to connect to Postgres")?;
    Ok(Arc::new(store))
}

pub(crate) fn reminder_dispatcher(config: &AppConfig, store: Arc<dyn Store>) -> ReminderDispatcher {
    let mailer = Arc::new(LogMailer::new(config.reminders.from_address.clone()));
    ReminderDispatcher::new(store, mailer).with_lead_days(config.reminders.lead_days)
}
