use axum::Json;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use crate::error::ApiError;
use crate::handlers::today;
use crate::middleware::bearer_token;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ReminderQuery {
    pub today: Option<NaiveDate>,
}

/// Preflight; headers come from the CORS layer.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

/// Dispatch reminders for orders due `lead_days` from today.
///
/// Accepts the function key or any valid session token.
pub async fn send_reminder_emails(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ReminderQuery>,
) -> Response {
    let Some(token) = bearer_token(&headers) else {
        return ApiError::Unauthenticated.into_response();
    };
    if !state.is_function_key(&token)
        && let Err(e) = state.authenticator().authenticate(&token).await
    {
        tracing::debug!(error = %e, "reminder caller rejected");
        return ApiError::Unauthenticated.into_response();
    }

    match state.reminders().run(query.today.unwrap_or_else(today)).await {
        Ok(report) => {
            tracing::info!(processed = report.processed, sent = report.sent(), "reminder run finished");
            (StatusCode::OK, Json(report)).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "reminder run failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "error": e.to_string() })),
            )
                .into_response()
        }
    }
}
