//! `installdesk users add` - provision a profile.

use installdesk_core::{AppConfig, Role, UserProfile};
use uuid::Uuid;

use super::connect_store;

pub async fn add(
    config: &AppConfig,
    id: Option<Uuid>,
    email: String,
    full_name: Option<String>,
    role: Role,
) -> anyhow::Result<()> {
    let store = connect_store(config).await?;
    let profile = store
        .upsert_user(UserProfile {
            id: id.unwrap_or_else(Uuid::new_v4),
            email,
            full_name,
            role,
        })
        .await?;

    tracing::info!(user_id = %profile.id, %role, "user provisioned");
    println!("{}", profile.id);
    Ok(())
}
