use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use installdesk_core::{
    Identity, NewPayment, Payment, PaymentFilter, PaymentPatch, RowScope, Validate,
};
use installdesk_runtime::report_overpayment;
use installdesk_store::PersistenceError;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Payments visible to the caller, optionally narrowed by `order_id` or `client_id`.
pub async fn list(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(filter): Query<PaymentFilter>,
) -> Result<Json<Vec<Payment>>, ApiError> {
    let payments = state
        .store()
        .list_payments(&identity.scope(), filter)
        .await?;
    Ok(Json(payments))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(new): Json<NewPayment>,
) -> Result<(StatusCode, Json<Payment>), ApiError> {
    new.validate()?;
    let scope = identity.scope();
    let payment = state
        .store()
        .create_payment(&scope, new)
        .await
        .inspect_err(|e| tracing::warn!(error = %e, "create payment failed"))?;
    tracing::info!(payment_id = %payment.id, order_id = %payment.order_id, amount = %payment.amount, "payment recorded");
    warn_if_overpaid(&state, &scope, payment.order_id).await;
    Ok((StatusCode::CREATED, Json(payment)))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
    Json(patch): Json<PaymentPatch>,
) -> Result<Json<Payment>, ApiError> {
    patch.validate()?;
    let scope = identity.scope();
    let payment = state
        .store()
        .update_payment(&scope, id, &patch)
        .await
        .inspect_err(|e| tracing::warn!(payment_id = %id, error = %e, "update payment failed"))?;
    warn_if_overpaid(&state, &scope, payment.order_id).await;
    Ok(Json(payment))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state
        .store()
        .delete_payment(&identity.scope(), id)
        .await
        .inspect_err(|e| tracing::warn!(payment_id = %id, error = %e, "delete payment failed"))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn warn_if_overpaid(state: &AppState, scope: &RowScope, order_id: Uuid) {
    let store = state.store();
    let checked = async {
        let order = store.get_order(scope, order_id).await?;
        let payments = store
            .list_payments(scope, PaymentFilter::for_order(order_id))
            .await?;
        Ok::<_, PersistenceError>(report_overpayment(&order.order, &payments))
    };
    if let Err(e) = checked.await {
        tracing::debug!(order_id = %order_id, error = %e, "balance check skipped");
    }
}
