use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use installdesk_core::{Client, ClientPatch, Identity, NewClient, Payment, PaymentFilter, Validate};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Vec<Client>>, ApiError> {
    Ok(Json(state.store().list_clients(&identity.scope()).await?))
}

pub async fn get(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
) -> Result<Json<Client>, ApiError> {
    Ok(Json(state.store().get_client(&identity.scope(), id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(new): Json<NewClient>,
) -> Result<(StatusCode, Json<Client>), ApiError> {
    new.validate()?;
    let client = state
        .store()
        .create_client(&identity.scope(), new)
        .await
        .inspect_err(|e| tracing::warn!(error = %e, "create client failed"))?;
    tracing::info!(client_id = %client.id, user_id = %identity.user_id, "client created");
    Ok((StatusCode::CREATED, Json(client)))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
    Json(patch): Json<ClientPatch>,
) -> Result<Json<Client>, ApiError> {
    patch.validate()?;
    let client = state
        .store()
        .update_client(&identity.scope(), id, &patch)
        .await
        .inspect_err(|e| tracing::warn!(client_id = %id, error = %e, "update client failed"))?;
    Ok(Json(client))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state
        .store()
        .delete_client(&identity.scope(), id)
        .await
        .inspect_err(|e| tracing::warn!(client_id = %id, error = %e, "delete client failed"))?;
    tracing::info!(client_id = %id, "client deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Payments made for any of the client's orders, newest first.
pub async fn payments(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Payment>>, ApiError> {
    let scope = identity.scope();
    // 404 for a client outside the scope instead of an empty list.
    state.store().get_client(&scope, id).await?;
    let payments = state
        .store()
        .list_payments(&scope, PaymentFilter::for_client(id))
        .await?;
    Ok(Json(payments))
}
