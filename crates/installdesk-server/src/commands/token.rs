//! `installdesk token mint` - issue a session token.

use chrono::Duration;
use installdesk_biscuit::SessionClaims;
use installdesk_core::{AppConfig, Role};
use uuid::Uuid;

use super::session_issuer;

pub fn mint(config: &AppConfig, user: Uuid, role: Role, ttl_hours: Option<u32>) -> anyhow::Result<()> {
    let issuer = session_issuer(config)?;
    let ttl = ttl_hours.unwrap_or(config.auth.token_ttl_hours);
    let claims = SessionClaims::new(user, role).expires_in(Duration::hours(i64::from(ttl)));
    let token = issuer.mint(&claims)?;

    tracing::info!(user_id = %user, %role, ttl_hours = ttl, "minted session token");
    println!("{token}");
    Ok(())
}
