use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use installdesk_core::{
    Identity, NewOrder, OrderBalance, OrderPatch, OrderWithClient, PaymentFilter, RowScope,
    Validate,
};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Vec<OrderWithClient>>, ApiError> {
    Ok(Json(state.store().list_orders(&identity.scope()).await?))
}

pub async fn get(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderWithClient>, ApiError> {
    Ok(Json(state.store().get_order(&identity.scope(), id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(new): Json<NewOrder>,
) -> Result<(StatusCode, Json<OrderWithClient>), ApiError> {
    new.validate()?;
    let order = state
        .store()
        .create_order(&identity.scope(), new)
        .await
        .inspect_err(|e| tracing::warn!(error = %e, "create order failed"))?;
    tracing::info!(
        order_id = %order.order.id,
        installation_date = %order.order.installation_date,
        "order created"
    );
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
    Json(patch): Json<OrderPatch>,
) -> Result<Json<OrderWithClient>, ApiError> {
    patch.validate()?;
    let order = state
        .store()
        .update_order(&identity.scope(), id, &patch)
        .await
        .inspect_err(|e| tracing::warn!(order_id = %id, error = %e, "update order failed"))?;
    Ok(Json(order))
}

/// Deleting an order also removes its payments.
pub async fn delete(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state
        .store()
        .delete_order(&identity.scope(), id)
        .await
        .inspect_err(|e| tracing::warn!(order_id = %id, error = %e, "delete order failed"))?;
    tracing::info!(order_id = %id, "order deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn balance(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderBalance>, ApiError> {
    Ok(Json(order_balance(&state, &identity.scope(), id).await?))
}

async fn order_balance(
    state: &AppState,
    scope: &RowScope,
    order_id: Uuid,
) -> Result<OrderBalance, ApiError> {
    let order = state.store().get_order(scope, order_id).await?;
    let payments = state
        .store()
        .list_payments(scope, PaymentFilter::for_order(order_id))
        .await?;
    Ok(OrderBalance::of(&order.order, &payments))
}
