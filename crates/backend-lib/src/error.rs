// crates/backend-lib/src/error.rs

//! Authentication outcome type + central HTTP error type with Axum integration.
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Seconds a client should wait before retrying after a store outage
const STORE_RETRY_AFTER_SECS: u64 = 5;

/// Outcome of a rejected login.
///
/// `InvalidCredentials` deliberately covers both an unknown account and a
/// wrong password.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("credential store unavailable")]
    StoreUnavailable,

    #[error("token signing failed: {0}")]
    SigningFailure(String),
}

/// Application error types with error codes and context
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Authentication rate limit exceeded")]
    AuthRateLimited,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Auth(AuthError::InvalidCredentials) => StatusCode::UNAUTHORIZED,
            AppError::Auth(AuthError::StoreUnavailable) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Auth(AuthError::SigningFailure(_)) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            },
            AppError::AuthRateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Auth(AuthError::InvalidCredentials) => "AUTH_001",
            AppError::Auth(AuthError::StoreUnavailable) => "AUTH_002",
            AppError::Auth(AuthError::SigningFailure(_)) => "AUTH_003",
            AppError::AuthRateLimited => "AUTH_004",
            AppError::InvalidInput(_) => "VAL_001",
            AppError::Internal(_) => "INT_001",
        }
    }

    /// Get a message that is safe to show to any client.
    /// Internal detail stays in the logs.
    pub fn sanitized_message(&self) -> &'static str {
        match self {
            AppError::Auth(AuthError::InvalidCredentials) => "Authentication failed",
            AppError::Auth(AuthError::StoreUnavailable) => {
                "Authentication is temporarily unavailable, please retry"
            },
            AppError::AuthRateLimited => {
                "Too many authentication attempts, please try again later"
            },
            AppError::InvalidInput(_) => "Invalid request format",
            AppError::Auth(AuthError::SigningFailure(_)) | AppError::Internal(_) => {
                "An internal server error occurred"
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = serde_json::json!({
            "error": {
                "code": self.error_code(),
                "message": self.sanitized_message(),
            }
        });

        let mut response = (status, axum::Json(body)).into_response();
        if status == StatusCode::SERVICE_UNAVAILABLE {
            response.headers_mut().insert(
                header::RETRY_AFTER,
                HeaderValue::from(STORE_RETRY_AFTER_SECS),
            );
        }
        response
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Internal(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Internal(msg.to_string())
    }
}
