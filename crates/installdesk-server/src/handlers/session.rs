use axum::extract::{Extension, State};
use axum::Json;
use installdesk_core::{Identity, ProfileUpdate, UserProfile, Validate};
use serde_json::{Value, json};

use crate::error::ApiError;
use crate::state::AppState;

pub async fn healthz() -> Json<Value> {
    Json(json!({ "ok": true, "service": "installdesk" }))
}

pub async fn current_session(Extension(identity): Extension<Identity>) -> Json<Identity> {
    Json(identity)
}

/// Every profile; admin only.
pub async fn list_users(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Vec<UserProfile>>, ApiError> {
    let users = state.store().list_users(&identity.scope()).await?;
    Ok(Json(users))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<UserProfile>, ApiError> {
    update.validate()?;
    let profile = state
        .store()
        .update_profile(&identity.scope(), &update)
        .await?;
    tracing::info!(user_id = %profile.id, "profile updated");
    Ok(Json(profile))
}
