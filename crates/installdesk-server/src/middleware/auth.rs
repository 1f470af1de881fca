use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

/// Resolve the session token into an [`installdesk_core::Identity`] and store
/// it in the request extensions for handlers to pick up.
pub async fn require_identity(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(req.headers()).ok_or(ApiError::Unauthenticated)?;

    let identity = state
        .authenticator()
        .authenticate(&token)
        .await
        .map_err(|e| {
            tracing::debug!(error = %e, "session rejected");
            ApiError::Unauthenticated
        })?;

    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

/// Token from `x-session-token`, or `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    if let Some(v) = headers.get("x-session-token")
        && let Ok(s) = v.to_str()
        && !s.trim().is_empty()
    {
        return Some(s.trim().to_string());
    }

    let v = headers.get(axum::http::header::AUTHORIZATION)?;
    let s = v.to_str().ok()?;
    let token = s.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then(|| token.to_string())
}
