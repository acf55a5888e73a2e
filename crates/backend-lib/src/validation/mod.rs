// ============================
// crates/backend-lib/src/validation/mod.rs
// ============================
//! Shape checks for login input.
//!
//! These run before any store access. The caller never learns which check
//! failed; the reason is only for logs.

use crate::auth::Credentials;
use thiserror::Error;

pub const MAX_USERNAME_LENGTH: usize = 256;
/// Bounds the work a single request can force on the KDF
pub const MAX_PASSWORD_LENGTH: usize = 1024;

/// Possible validation errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid username: {0}")]
    InvalidUsername(&'static str),

    #[error("Invalid password: {0}")]
    InvalidPassword(&'static str),
}

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validate a username
pub fn validate_username(username: &str) -> ValidationResult<&str> {
    if username.is_empty() {
        return Err(ValidationError::InvalidUsername("must not be empty"));
    }

    if username.len() > MAX_USERNAME_LENGTH {
        return Err(ValidationError::InvalidUsername("too long"));
    }

    if username.chars().any(char::is_control) {
        return Err(ValidationError::InvalidUsername(
            "must not contain control characters",
        ));
    }

    Ok(username)
}

/// Validate a password
pub fn validate_password(password: &str) -> ValidationResult<&str> {
    if password.is_empty() {
        return Err(ValidationError::InvalidPassword("must not be empty"));
    }

    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::InvalidPassword("too long"));
    }

    Ok(password)
}

/// Validate both halves of a login attempt
pub fn validate_credentials(credentials: &Credentials) -> ValidationResult<()> {
    validate_username(credentials.username())?;
    validate_password(credentials.password())?;
    Ok(())
}
