// ============================
// crates/backend-lib/src/lib.rs
// ============================
//! Core of the keygate credential-verification and token-issuance service.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod router;
pub mod storage;
pub mod validation;

use std::sync::Arc;

use crate::auth::{AuthRateLimiter, AuthService, CredentialStore, DefaultAuth};
use crate::config::Settings;

pub use crate::error::{AppError, AuthError};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Authentication service
    pub auth: Arc<dyn AuthService>,
    /// Settings, immutable after startup
    pub settings: Arc<Settings>,
    /// Failed-login limiter, absent when disabled
    pub rate_limiter: Option<Arc<AuthRateLimiter>>,
}

impl AppState {
    /// Create application state around an existing auth service
    pub fn new(auth: Arc<dyn AuthService>, settings: Settings) -> Self {
        let rate_limiter = settings
            .rate_limit
            .enabled
            .then(|| Arc::new(AuthRateLimiter::from_settings(&settings.rate_limit)));

        Self {
            auth,
            settings: Arc::new(settings),
            rate_limiter,
        }
    }

    /// Build the default auth service over `store` and wrap it
    pub fn from_settings(
        store: Arc<dyn CredentialStore>,
        settings: Settings,
    ) -> anyhow::Result<Self> {
        let auth = DefaultAuth::from_settings(store, &settings)?;
        Ok(Self::new(Arc::new(auth), settings))
    }
}
