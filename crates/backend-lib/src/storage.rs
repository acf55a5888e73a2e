// ============================
// crates/backend-lib/src/storage.rs
// ============================
//! Flat-file credential store.
//!
//! Accounts live in one JSON document:
//! `{"users":[{"username":"alice","password_hash":"$scrypt$..."}]}`.
//! The file is read on every lookup so external provisioning takes effect
//! without a restart.
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::{fs as tokio_fs, io::AsyncWriteExt};

use crate::auth::{CredentialStore, Identity, StoreError};

/// One provisioned account on disk
#[derive(Serialize, Deserialize, Clone)]
pub struct UserRecord {
    pub username: String,
    pub password_hash: String,
}

/// Layout of the users file
#[derive(Serialize, Deserialize, Default, Clone)]
pub struct UsersFile {
    #[serde(default)]
    pub users: Vec<UserRecord>,
}

/// Credential store backed by a JSON users file
#[derive(Clone, Debug)]
pub struct FlatFileCredentialStore {
    path: PathBuf,
}

impl FlatFileCredentialStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<UsersFile, StoreError> {
        let content = tokio_fs::read_to_string(&self.path).await.map_err(|e| {
            StoreError::Unavailable(format!("cannot read {}: {e}", self.path.display()))
        })?;
        serde_json::from_str(&content)
            .map_err(|e| StoreError::Corrupt(format!("{}: {e}", self.path.display())))
    }

    /// Add or replace an account. The file is created if it does not exist
    /// and is replaced atomically.
    pub async fn upsert(&self, username: &str, password_hash: &str) -> Result<(), StoreError> {
        let exists = tokio_fs::try_exists(&self.path).await.map_err(|e| {
            StoreError::Unavailable(format!("cannot stat {}: {e}", self.path.display()))
        })?;
        let mut doc = if exists {
            self.read().await?
        } else {
            UsersFile::default()
        };

        let record = UserRecord {
            username: username.to_string(),
            password_hash: password_hash.to_string(),
        };
        match doc.users.iter_mut().find(|u| u.username == username) {
            Some(existing) => *existing = record,
            None => doc.users.push(record),
        }

        let json = serde_json::to_string_pretty(&doc)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        self.write_atomically(json.as_bytes()).await
    }

    async fn write_atomically(&self, bytes: &[u8]) -> Result<(), StoreError> {
        let unavailable = |e: std::io::Error| {
            StoreError::Unavailable(format!("cannot write {}: {e}", self.path.display()))
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio_fs::create_dir_all(parent).await.map_err(unavailable)?;
        }

        let tmp = self.path.with_extension("json.tmp");
        let mut file = tokio_fs::File::create(&tmp).await.map_err(unavailable)?;
        file.write_all(bytes).await.map_err(unavailable)?;
        file.write_all(b"\n").await.map_err(unavailable)?;
        file.sync_all().await.map_err(unavailable)?;
        drop(file);

        tokio_fs::rename(&tmp, &self.path).await.map_err(unavailable)
    }
}

#[async_trait]
impl CredentialStore for FlatFileCredentialStore {
    async fn lookup(&self, username: &str) -> Result<Option<Identity>, StoreError> {
        let doc = self.read().await?;
        Ok(doc
            .users
            .into_iter()
            .find(|u| u.username == username)
            .map(|u| Identity::new(u.username, u.password_hash)))
    }
}
