//! Session resolution.
//!
//! [`Authenticator`] turns a bearer token into an [`Identity`] without keeping
//! any state; the server calls it once per request. [`SessionProvider`] wraps
//! it for long-lived callers and publishes the current [`SessionState`] on a
//! watch channel.

use installdesk_biscuit::SessionVerifier;
use installdesk_core::Identity;
use installdesk_store::Store;
use std::sync::Arc;
use tokio::sync::watch;

use crate::error::RuntimeError;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// Initial state until the first sign-in attempt or sign-out.
    Resolving,
    SignedOut,
    SignedIn(Identity),
}

impl SessionState {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            SessionState::SignedIn(identity) => Some(identity),
            _ => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, SessionState::Resolving)
    }
}

#[derive(Clone)]
pub struct Authenticator {
    verifier: SessionVerifier,
    store: Arc<dyn Store>,
}

impl Authenticator {
    pub fn new(verifier: SessionVerifier, store: Arc<dyn Store>) -> Self {
        Self { verifier, store }
    }

    /// Verify the token, then load the profile it names. The stored profile's
    /// role is authoritative, so a role change applies to existing tokens.
    pub async fn authenticate(&self, token: &str) -> Result<Identity, RuntimeError> {
        let session = self.verifier.verify(token)?;
        let profile = self.store.get_user(session.user_id).await?;
        if profile.role != session.role {
            tracing::debug!(
                user_id = %profile.id,
                token_role = %session.role,
                stored_role = %profile.role,
                "token role differs from stored profile"
            );
        }
        Ok(Identity::from(profile))
    }
}

pub struct SessionProvider {
    authenticator: Authenticator,
    state: watch::Sender<SessionState>,
}

impl SessionProvider {
    pub fn new(authenticator: Authenticator) -> Self {
        let (state, _) = watch::channel(SessionState::Resolving);
        Self {
            authenticator,
            state,
        }
    }

    pub fn current(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Wait until the state leaves `Resolving`.
    pub async fn wait_resolved(&self) -> SessionState {
        let mut rx = self.state.subscribe();
        match rx.wait_for(SessionState::is_resolved).await {
            Ok(state) => state.clone(),
            // The sender lives in `self`, so the channel cannot close here.
            Err(_) => self.current(),
        }
    }

    /// Resolve `token`. A rejected token leaves the provider signed out.
    pub async fn sign_in(&self, token: &str) -> Result<Identity, RuntimeError> {
        match self.authenticator.authenticate(token).await {
            Ok(identity) => {
                tracing::info!(user_id = %identity.user_id, role = %identity.role, "signed in");
                self.state.send_replace(SessionState::SignedIn(identity.clone()));
                Ok(identity)
            }
            Err(e) => {
                tracing::warn!(error = %e, "sign-in rejected");
                self.state.send_replace(SessionState::SignedOut);
                Err(e)
            }
        }
    }

    pub fn sign_out(&self) {
        self.state.send_replace(SessionState::SignedOut);
    }

    /// The signed-in identity, or `SignedOut` otherwise.
    pub fn require_identity(&self) -> Result<Identity, RuntimeError> {
        self.state
            .borrow()
            .identity()
            .cloned()
            .ok_or(RuntimeError::SignedOut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use installdesk_biscuit::{KeyPair, SessionClaims, SessionIssuer};
    use installdesk_core::{Role, UserProfile};
    use installdesk_store::MemoryStore;
    use uuid::Uuid;

    async fn setup() -> (SessionIssuer, SessionProvider, UserProfile) {
        let user = UserProfile {
            id: Uuid::new_v4(),
            email: "office@example.com".to_string(),
            full_name: Some("Office Manager".to_string()),
            role: Role::Manager,
        };
        let store = Arc::new(MemoryStore::with_users([user.clone()]).await);
        let issuer = SessionIssuer::new(KeyPair::generate().unwrap());
        let provider = SessionProvider::new(Authenticator::new(issuer.verifier(), store));
        (issuer, provider, user)
    }

    #[tokio::test]
    async fn test_starts_resolving_then_signs_in() {
        let (issuer, provider, user) = setup().await;
        assert_eq!(provider.current(), SessionState::Resolving);

        let token = issuer
            .mint(&SessionClaims::new(user.id, user.role).expires_in(Duration::hours(1)))
            .unwrap();
        let identity = provider.sign_in(&token).await.unwrap();

        assert_eq!(identity.user_id, user.id);
        assert_eq!(provider.wait_resolved().await, SessionState::SignedIn(identity.clone()));
        assert_eq!(provider.require_identity().unwrap(), identity);
    }

    #[tokio::test]
    async fn test_wait_resolved_wakes_on_sign_out() {
        let (_, provider, _) = setup().await;
        let provider = Arc::new(provider);

        let waiter = {
            let provider = provider.clone();
            tokio::spawn(async move { provider.wait_resolved().await })
        };
        provider.sign_out();

        assert_eq!(waiter.await.unwrap(), SessionState::SignedOut);
        assert!(matches!(provider.require_identity(), Err(RuntimeError::SignedOut)));
    }

    #[tokio::test]
    async fn test_bad_token_signs_out() {
        let (_, provider, _) = setup().await;
        assert!(provider.sign_in("garbage").await.is_err());
        assert_eq!(provider.current(), SessionState::SignedOut);
    }

    #[tokio::test]
    async fn test_unknown_user_is_rejected() {
        let (issuer, provider, _) = setup().await;
        let token = issuer
            .mint(&SessionClaims::new(Uuid::new_v4(), Role::Admin))
            .unwrap();
        assert!(matches!(
            provider.sign_in(&token).await,
            Err(RuntimeError::Persistence(_))
        ));
    }
}
