//! Shared state for request handlers.

use installdesk_core::schedule::DEFAULT_UPCOMING_HORIZON_DAYS;
use installdesk_runtime::{Authenticator, ReminderDispatcher};
use installdesk_store::Store;
use std::sync::Arc;

/// Cheap to clone; everything lives behind one `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    store: Arc<dyn Store>,
    authenticator: Authenticator,
    reminders: ReminderDispatcher,
    /// Static key accepted by the reminder function in place of a session.
    function_key: Option<String>,
    upcoming_horizon_days: i64,
    cors_allowed_origins: Vec<String>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        authenticator: Authenticator,
        reminders: ReminderDispatcher,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                store,
                authenticator,
                reminders,
                function_key: None,
                upcoming_horizon_days: DEFAULT_UPCOMING_HORIZON_DAYS,
                cors_allowed_origins: Vec::new(),
            }),
        }
    }

    /// Must be called before the state is cloned.
    pub fn with_function_key(self, key: Option<String>) -> Self {
        self.map_inner(|inner| inner.function_key = key.filter(|k| !k.is_empty()))
    }

    pub fn with_upcoming_horizon(self, days: i64) -> Self {
        self.map_inner(|inner| inner.upcoming_horizon_days = days)
    }

    pub fn with_cors_origins(self, origins: Vec<String>) -> Self {
        self.map_inner(|inner| inner.cors_allowed_origins = origins)
    }

    fn map_inner(mut self, f: impl FnOnce(&mut AppStateInner)) -> Self {
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            f(inner);
        } else {
            tracing::warn!("app state already shared; builder call ignored");
        }
        self
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.inner.store
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.inner.authenticator
    }

    pub fn reminders(&self) -> &ReminderDispatcher {
        &self.inner.reminders
    }

    pub fn is_function_key(&self, token: &str) -> bool {
        self.inner
            .function_key
            .as_deref()
            .is_some_and(|key| key == token)
    }

    pub fn upcoming_horizon_days(&self) -> i64 {
        self.inner.upcoming_horizon_days
    }

    pub fn cors_allowed_origins(&self) -> &[String] {
        &self.inner.cors_allowed_origins
    }
}
