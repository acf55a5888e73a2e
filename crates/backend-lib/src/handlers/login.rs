// ============================
// crates/backend-lib/src/handlers/login.rs
// ============================
//! `POST /auth/login`
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use keygate_common::{LoginRequest, LoginResponse};
use metrics::counter;

use crate::auth::Credentials;
use crate::error::{AppError, AuthError};
use crate::metrics::LOGIN_RATE_LIMITED;
use crate::middleware::ClientIp;
use crate::AppState;

/// Exchange a username/password pair for a signed bearer token.
///
/// Unknown accounts and wrong passwords both answer `401` with the same body.
/// A client address with too many recent failures answers `429` without
/// touching the credential store.
pub async fn login(
    State(state): State<Arc<AppState>>,
    ClientIp(ip): ClientIp,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AppError> {
    let Json(request) = payload.map_err(|e| AppError::InvalidInput(e.body_text()))?;

    let limiter = state.rate_limiter.as_deref().zip(ip);
    if let Some((limiter, ip)) = limiter {
        if !limiter.is_allowed(ip) {
            counter!(LOGIN_RATE_LIMITED).increment(1);
            return Err(AppError::AuthRateLimited);
        }
    }

    let outcome = state.auth.login(Credentials::from(request)).await;

    if let Some((limiter, ip)) = limiter {
        match &outcome {
            Ok(_) => limiter.record_success(ip),
            Err(AuthError::InvalidCredentials) => limiter.record_failure(ip),
            Err(_) => {},
        }
    }

    let token = outcome?;
    Ok(Json(LoginResponse {
        token: token.into_string(),
    }))
}
