//! HTTP routes.

use axum::http::{HeaderName, HeaderValue, Method, header};
use axum::middleware::from_fn_with_state;
use axum::routing::{get, patch, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::{clients, orders, payments, reminders, reports, session};
use crate::middleware::require_identity;
use crate::state::AppState;

/// Path of the scheduled reminder function.
pub const REMINDER_FUNCTION_PATH: &str = "/functions/v1/send-reminder-emails";

/// Create the router with all routes.
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/session", get(session::current_session))
        .route("/clients", get(clients::list).post(clients::create))
        .route(
            "/clients/{id}",
            get(clients::get).patch(clients::update).delete(clients::delete),
        )
        .route("/clients/{id}/payments", get(clients::payments))
        .route("/orders", get(orders::list).post(orders::create))
        .route(
            "/orders/{id}",
            get(orders::get).patch(orders::update).delete(orders::delete),
        )
        .route("/orders/{id}/balance", get(orders::balance))
        .route("/payments", get(payments::list).post(payments::create))
        .route(
            "/payments/{id}",
            patch(payments::update).delete(payments::delete),
        )
        .route("/users", get(session::list_users))
        .route("/profile", patch(session::update_profile))
        .route("/dashboard", get(reports::dashboard))
        .route("/calendar", get(reports::calendar))
        .route_layer(from_fn_with_state(state.clone(), require_identity));

    let api = match api_cors(state.cors_allowed_origins()) {
        Some(cors) => api.layer(cors),
        None => api,
    };

    let function = Router::new()
        .route(
            REMINDER_FUNCTION_PATH,
            post(reminders::send_reminder_emails).options(reminders::preflight),
        )
        .layer(function_cors());

    Router::new()
        .route("/healthz", get(session::healthz))
        .nest("/api", api)
        .merge(function)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// The reminder function is called from anywhere, like the hosted function it replaces.
fn function_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
            header::CONTENT_TYPE,
        ])
}

fn api_cors(origins: &[String]) -> Option<CorsLayer> {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    if allowed.is_empty() {
        return None;
    }
    Some(
        CorsLayer::new()
            .allow_origin(allowed)
            .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]),
    )
}
