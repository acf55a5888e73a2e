// ============================
// crates/backend-lib/src/auth/token.rs
// ============================
//! Signed bearer token issuance and offline validation.
//!
//! Tokens are compact JWS strings. The issuer holds the signing key loaded
//! once from [`TokenSettings`]; the validator holds the matching verification
//! key and can check a token without talking to this service.
use std::fmt;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::TokenSettings;
use crate::error::AuthError;

/// Shortest accepted HMAC secret (256 bits)
pub const MIN_HMAC_SECRET_BYTES: usize = 32;

const PROBE_SUBJECT: &str = "keygate-self-check";

/// JWT payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
    pub jti: String,
}

/// A freshly issued token
#[derive(Clone)]
pub struct Token {
    pub subject: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Unique token id (`jti`)
    pub id: String,
    encoded: String,
}

impl Token {
    /// The compact encoded form handed to the client
    pub fn as_str(&self) -> &str {
        &self.encoded
    }

    pub fn into_string(self) -> String {
        self.encoded
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("subject", &self.subject)
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// Reasons a token fails validation
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TokenError {
    #[error("token expired")]
    Expired,

    #[error("invalid token: {0}")]
    Invalid(String),
}

fn is_hmac(alg: Algorithm) -> bool {
    matches!(alg, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512)
}

fn signing_failure(msg: impl Into<String>) -> AuthError {
    AuthError::SigningFailure(msg.into())
}

fn read_pem(path: Option<&Path>, what: &str) -> Result<Vec<u8>, AuthError> {
    let path = path.ok_or_else(|| signing_failure(format!("no {what} configured")))?;
    fs::read(path).map_err(|e| signing_failure(format!("cannot read {what} {}: {e}", path.display())))
}

fn hmac_secret(settings: &TokenSettings) -> Result<&[u8], AuthError> {
    let secret = settings
        .secret
        .as_deref()
        .ok_or_else(|| signing_failure("no signing secret configured"))?;
    if secret.len() < MIN_HMAC_SECRET_BYTES {
        return Err(signing_failure(format!(
            "signing secret must be at least {MIN_HMAC_SECRET_BYTES} bytes"
        )));
    }
    Ok(secret.as_bytes())
}

/// Mints signed, time-bounded tokens
pub struct TokenIssuer {
    header: Header,
    key: EncodingKey,
    issuer: String,
    audience: String,
    ttl: ChronoDuration,
}

impl TokenIssuer {
    /// Load the signing key. Any problem with it is a [`AuthError::SigningFailure`].
    pub fn new(settings: &TokenSettings) -> Result<Self, AuthError> {
        let alg = settings.algorithm;
        let key = if is_hmac(alg) {
            EncodingKey::from_secret(hmac_secret(settings)?)
        } else {
            let pem = read_pem(settings.private_key_path.as_deref(), "private key")?;
            match alg {
                Algorithm::RS256
                | Algorithm::RS384
                | Algorithm::RS512
                | Algorithm::PS256
                | Algorithm::PS384
                | Algorithm::PS512 => EncodingKey::from_rsa_pem(&pem),
                Algorithm::ES256 | Algorithm::ES384 => EncodingKey::from_ec_pem(&pem),
                _ => EncodingKey::from_ed_pem(&pem),
            }
            .map_err(|e| signing_failure(format!("invalid private key: {e}")))?
        };

        let ttl = i64::try_from(settings.ttl_secs)
            .ok()
            .and_then(ChronoDuration::try_seconds)
            .ok_or_else(|| signing_failure("token ttl out of range"))?;

        Ok(Self {
            header: Header::new(alg),
            key,
            issuer: settings.issuer.clone(),
            audience: settings.audience.clone(),
            ttl,
        })
    }

    pub fn algorithm(&self) -> Algorithm {
        self.header.alg
    }

    /// Issue a token for `subject`, valid from now for the configured TTL
    pub fn issue(&self, subject: &str) -> Result<Token, AuthError> {
        self.issue_at(subject, Utc::now())
    }

    /// Issue a token as if the current time were `now`
    pub fn issue_at(&self, subject: &str, now: DateTime<Utc>) -> Result<Token, AuthError> {
        // JWT timestamps have second resolution
        let issued_at = Utc
            .timestamp_opt(now.timestamp(), 0)
            .single()
            .ok_or_else(|| signing_failure("issue time out of range"))?;
        let expires_at = issued_at
            .checked_add_signed(self.ttl)
            .ok_or_else(|| signing_failure("expiry out of range"))?;

        let claims = Claims {
            sub: subject.to_string(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: issued_at.timestamp(),
            nbf: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let encoded = encode(&self.header, &claims, &self.key)
            .map_err(|e| signing_failure(format!("failed to sign token: {e}")))?;

        Ok(Token {
            subject: claims.sub,
            issued_at,
            expires_at,
            id: claims.jti,
            encoded,
        })
    }

    /// Sign a probe token and check it with `validator`
    pub fn self_check(&self, validator: &TokenValidator) -> Result<(), AuthError> {
        let probe = self.issue(PROBE_SUBJECT)?;
        validator
            .validate(probe.as_str())
            .map(|_| ())
            .map_err(|e| signing_failure(format!("probe token rejected: {e}")))
    }
}

/// Offline verifier for tokens minted by a [`TokenIssuer`] with the same settings
pub struct TokenValidator {
    key: DecodingKey,
    validation: Validation,
    leeway: i64,
}

impl TokenValidator {
    pub fn new(settings: &TokenSettings) -> Result<Self, AuthError> {
        let alg = settings.algorithm;
        let key = if is_hmac(alg) {
            DecodingKey::from_secret(hmac_secret(settings)?)
        } else {
            let pem = read_pem(settings.public_key_path.as_deref(), "public key")?;
            match alg {
                Algorithm::RS256
                | Algorithm::RS384
                | Algorithm::RS512
                | Algorithm::PS256
                | Algorithm::PS384
                | Algorithm::PS512 => DecodingKey::from_rsa_pem(&pem),
                Algorithm::ES256 | Algorithm::ES384 => DecodingKey::from_ec_pem(&pem),
                _ => DecodingKey::from_ed_pem(&pem),
            }
            .map_err(|e| signing_failure(format!("invalid public key: {e}")))?
        };

        let mut validation = Validation::new(alg);
        validation.set_issuer(&[settings.issuer.as_str()]);
        validation.set_audience(&[settings.audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "nbf", "sub", "iss", "aud"]);
        // time checks happen in `validate_at` against an explicit clock
        validation.validate_exp = false;
        validation.validate_nbf = false;

        Ok(Self {
            key,
            validation,
            leeway: i64::try_from(settings.leeway_secs).unwrap_or(i64::MAX),
        })
    }

    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        self.validate_at(token, Utc::now())
    }

    /// Validate signature and claims, judging expiry as of `now`.
    /// A token is valid while `now < exp`.
    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            }
        })?;
        let claims = data.claims;
        let now = now.timestamp();

        if now >= claims.exp.saturating_add(self.leeway) {
            return Err(TokenError::Expired);
        }
        if now < claims.nbf.saturating_sub(self.leeway) {
            return Err(TokenError::Invalid("token not yet valid".to_string()));
        }
        Ok(claims)
    }
}
