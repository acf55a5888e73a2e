// ============================
// crates/backend-lib/src/auth/store.rs
// ============================
//! Credential store abstraction with an in-memory implementation.
use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;

use super::Identity;

/// Failures of the backing store. Neither says anything about the credentials.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("credential store unavailable: {0}")]
    Unavailable(String),

    #[error("credential store data is corrupt: {0}")]
    Corrupt(String),
}

/// Read-only lookup of provisioned accounts
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Find the identity for `username`, `Ok(None)` when there is none
    async fn lookup(&self, username: &str) -> Result<Option<Identity>, StoreError>;
}

/// Concurrent in-memory store, used for tests and embedding
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    users: DashMap<String, Identity>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an account
    pub fn insert(&self, username: impl Into<String>, password_hash: impl Into<String>) {
        let username = username.into();
        let identity = Identity::new(username.clone(), password_hash);
        self.users.insert(username, identity);
    }

    pub fn remove(&self, username: &str) -> bool {
        self.users.remove(username).is_some()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn lookup(&self, username: &str) -> Result<Option<Identity>, StoreError> {
        Ok(self.users.get(username).map(|entry| entry.value().clone()))
    }
}
