// ============================
// crates/backend-lib/src/auth/mod.rs
// ============================
//! Authentication module.

pub mod credentials;
pub mod password;
pub mod rate_limit;
pub mod store;
pub mod token;
mod service;
mod service_impl;

pub use credentials::{Credentials, Identity};
pub use password::{verify_password, KdfStats, PasswordError, PasswordVerifier};
pub use rate_limit::AuthRateLimiter;
pub use store::{CredentialStore, InMemoryCredentialStore, StoreError};
pub use token::{Claims, Token, TokenError, TokenIssuer, TokenValidator};
pub use service::AuthService;
pub use service_impl::DefaultAuth;
