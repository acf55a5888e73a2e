use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use async_trait::async_trait;
use metrics::{counter, histogram};
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};
use zeroize::Zeroizing;

use crate::auth::{
    AuthService, CredentialStore, Credentials, Identity, PasswordVerifier, Token, TokenIssuer,
    TokenValidator,
};
use crate::config::Settings;
use crate::error::AuthError;
use crate::metrics::{
    LOGIN_DURATION, LOGIN_REJECTED, LOGIN_SIGNING_FAILED, LOGIN_STORE_UNAVAILABLE,
    LOGIN_SUCCEEDED,
};
use crate::validation;

/// Login over a credential store, a password verifier and a token issuer.
///
/// Every rejection that depends on the credentials costs one full KDF
/// evaluation, whether or not the account exists. At most `max_concurrent`
/// evaluations run at once; further logins wait for a slot.
pub struct DefaultAuth {
    store: Arc<dyn CredentialStore>,
    verifier: Arc<PasswordVerifier>,
    kdf_slots: Arc<Semaphore>,
    issuer: TokenIssuer,
    validator: TokenValidator,
    lookup_timeout: Duration,
}

impl DefaultAuth {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        verifier: Arc<PasswordVerifier>,
        max_concurrent: usize,
        issuer: TokenIssuer,
        validator: TokenValidator,
        lookup_timeout: Duration,
    ) -> Self {
        Self {
            store,
            verifier,
            kdf_slots: Arc::new(Semaphore::new(max_concurrent.max(1))),
            issuer,
            validator,
            lookup_timeout,
        }
    }

    /// Build every component from settings. Fails on a bad KDF cost or an
    /// unusable signing key.
    pub fn from_settings(
        store: Arc<dyn CredentialStore>,
        settings: &Settings,
    ) -> anyhow::Result<Self> {
        let verifier =
            PasswordVerifier::new(&settings.kdf).context("failed to set up password verifier")?;
        let issuer = TokenIssuer::new(&settings.token).context("failed to load signing key")?;
        let validator =
            TokenValidator::new(&settings.token).context("failed to load verification key")?;
        Ok(Self::new(
            store,
            Arc::new(verifier),
            settings.kdf.max_concurrent,
            issuer,
            validator,
            settings.store.lookup_timeout(),
        ))
    }

    async fn lookup(&self, username: &str) -> Result<Option<Identity>, AuthError> {
        match timeout(self.lookup_timeout, self.store.lookup(username)).await {
            Ok(Ok(found)) => Ok(found),
            Ok(Err(err)) => {
                warn!(error = %err, "credential store lookup failed");
                Err(AuthError::StoreUnavailable)
            },
            Err(_) => {
                warn!(
                    timeout_ms = self.lookup_timeout.as_millis() as u64,
                    "credential store lookup timed out"
                );
                Err(AuthError::StoreUnavailable)
            },
        }
    }

    /// Run the KDF off the async workers. Without a stored hash the dummy hash
    /// is used and the result is always a mismatch.
    async fn check_password(&self, stored_hash: Option<String>, password: Zeroizing<String>) -> bool {
        let permit = match Arc::clone(&self.kdf_slots).acquire_owned().await {
            Ok(permit) => permit,
            Err(err) => {
                error!(error = %err, "password verification slots closed");
                return false;
            },
        };

        let verifier = Arc::clone(&self.verifier);
        let task = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            match stored_hash {
                Some(hash) => verifier.verify(&password, &hash),
                None => verifier.verify_dummy(&password),
            }
        });

        match task.await {
            Ok(matched) => matched,
            Err(err) => {
                error!(error = %err, "password verification task failed");
                false
            },
        }
    }

    async fn authenticate(&self, credentials: Credentials) -> Result<Token, AuthError> {
        if let Err(reason) = validation::validate_credentials(&credentials) {
            debug!(%reason, "rejecting malformed credentials");
            let (_, password) = credentials.into_parts();
            self.check_password(None, password).await;
            return Err(AuthError::InvalidCredentials);
        }

        let (username, password) = credentials.into_parts();
        let identity = self.lookup(&username).await?;

        let stored_hash = identity.as_ref().map(|i| i.password_hash().to_string());
        let matched = self.check_password(stored_hash, password).await;
        let identity = match identity {
            Some(identity) if matched => identity,
            _ => {
                debug!("rejecting login");
                return Err(AuthError::InvalidCredentials);
            },
        };

        let token = self.issuer.issue(identity.username())?;
        info!(token_id = %token.id, expires_at = %token.expires_at, "issued token");
        Ok(token)
    }
}

#[async_trait]
impl AuthService for DefaultAuth {
    #[tracing::instrument(name = "login", skip_all, fields(username = %credentials.username()))]
    async fn login(&self, credentials: Credentials) -> Result<Token, AuthError> {
        let started = Instant::now();
        let outcome = self.authenticate(credentials).await;
        histogram!(LOGIN_DURATION).record(started.elapsed().as_secs_f64());

        match &outcome {
            Ok(_) => counter!(LOGIN_SUCCEEDED).increment(1),
            Err(AuthError::InvalidCredentials) => counter!(LOGIN_REJECTED).increment(1),
            Err(AuthError::StoreUnavailable) => counter!(LOGIN_STORE_UNAVAILABLE).increment(1),
            Err(AuthError::SigningFailure(reason)) => {
                error!(%reason, "token signing failed");
                counter!(LOGIN_SIGNING_FAILED).increment(1);
            },
        }
        outcome
    }

    fn health(&self) -> Result<(), AuthError> {
        self.issuer.self_check(&self.validator)
    }
}
