// ============================
// crates/backend-lib/src/auth/credentials.rs
// ============================
//! Login input and stored identity values.
use std::fmt;

use keygate_common::LoginRequest;
use zeroize::Zeroizing;

/// Username/password pair for a single login attempt.
/// The password buffer is wiped when the value is dropped.
pub struct Credentials {
    username: String,
    password: Zeroizing<String>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: Zeroizing::new(password.into()),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn into_parts(self) -> (String, Zeroizing<String>) {
        (self.username, self.password)
    }
}

impl From<LoginRequest> for Credentials {
    fn from(req: LoginRequest) -> Self {
        Self::new(req.username, req.password)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A provisioned account as held by a credential store
#[derive(Clone, PartialEq, Eq)]
pub struct Identity {
    username: String,
    password_hash: String,
}

impl Identity {
    pub fn new(username: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password_hash: password_hash.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// PHC-encoded hash, including algorithm and parameters
    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("username", &self.username)
            .field("password_hash", &"<redacted>")
            .finish()
    }
}
