//! `installdesk serve` - run the HTTP API.

use anyhow::Context;
use chrono::Duration;
use installdesk_biscuit::{KeyPair, SessionClaims, SessionIssuer};
use installdesk_core::{AppConfig, Role, UserProfile};
use installdesk_runtime::Authenticator;
use installdesk_server::{AppState, create_router};
use installdesk_store::{MemoryStore, Store};
use std::sync::Arc;
use tokio::net::TcpListener;
use uuid::Uuid;

use super::{configured_keypair, connect_store, reminder_dispatcher};

pub async fn run(config: &AppConfig, memory: bool) -> anyhow::Result<()> {
    let issuer = match configured_keypair(config)? {
        Some(keypair) => SessionIssuer::new(keypair),
        None => {
            tracing::warn!("no private key configured; using an ephemeral key, tokens will not survive a restart");
            SessionIssuer::new(KeyPair::generate()?)
        }
    };

    let store: Arc<dyn Store> = if memory {
        let admin = UserProfile {
            id: Uuid::new_v4(),
            email: "admin@installdesk.local".to_string(),
            full_name: Some("Administrator".to_string()),
            role: Role::Admin,
        };
        let claims = SessionClaims::new(admin.id, admin.role)
            .expires_in(Duration::hours(i64::from(config.auth.token_ttl_hours)));
        let token = issuer.mint(&claims)?;
        tracing::info!(user_id = %admin.id, "using in-memory store");
        println!("Admin session token:\n{token}");
        Arc::new(MemoryStore::with_users([admin]).await)
    } else {
        connect_store(config).await?
    };

    let state = AppState::new(
        store.clone(),
        Authenticator::new(issuer.verifier(), store.clone()),
        reminder_dispatcher(config, store),
    )
    .with_function_key(config.auth.resolve_function_key())
    .with_upcoming_horizon(config.reminders.upcoming_horizon_days)
    .with_cors_origins(config.server.cors_allowed_origins.clone());

    let app = create_router(state);

    let addr = &config.server.bind;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(address = %addr, "installdesk listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("installdesk stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
