// ================
// crates/common/src/lib.rs
// ================
//! Wire types shared between the keygate server and its clients.
//! This module defines the JSON bodies of the login and health endpoints.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Body of `POST /auth/login`
///
/// Field names are accepted in either `username` or `Username` form.
#[derive(Serialize, Deserialize, Clone)]
pub struct LoginRequest {
    /// Account name to authenticate
    #[serde(alias = "Username")]
    pub username: String,
    /// Plaintext password, only ever held for the duration of one request
    #[serde(alias = "Password")]
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Successful login response
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LoginResponse {
    /// Compact-encoded signed bearer token
    pub token: String,
}

/// Readiness of the service
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Unavailable,
}

/// Body of `GET /health`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: HealthStatus,
}
