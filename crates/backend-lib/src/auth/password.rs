// ============================
// crates/backend-lib/src/auth/password.rs
// ============================
//! Password hashing and verification.
//!
//! Hashes are stored as PHC strings so the algorithm and its cost travel with
//! the hash. New hashes use the configured KDF; verification accepts scrypt
//! and argon2 hashes alike. Digest comparison is constant time.
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use argon2::Argon2;
use rand::RngCore;
use scrypt::{
    password_hash::{
        PasswordHash, PasswordHasher as PhcHasher, PasswordVerifier as PhcVerifier, SaltString,
    },
    Scrypt,
};
use thiserror::Error;
use zeroize::Zeroizing;

use crate::config::{KdfAlgorithm, KdfSettings};

const SALT_BYTES: usize = 16;
const SCRYPT_OUTPUT_LEN: usize = 32;

/// Errors raised while producing a password hash
#[derive(Error, Debug)]
pub enum PasswordError {
    #[error("invalid KDF parameters: {0}")]
    InvalidParams(String),

    #[error("password hashing failed: {0}")]
    Hash(String),
}

/// Counters over the KDF evaluations a verifier has run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KdfStats {
    /// Completed evaluations, real and dummy
    pub evaluations: u64,
    /// Highest number of evaluations seen running at once
    pub peak_in_flight: usize,
}

/// Slow, salted password verifier
///
/// Holds a dummy hash computed at construction with the configured cost, so a
/// login for an unknown account can burn the same amount of work as one for a
/// real account.
pub struct PasswordVerifier {
    algorithm: KdfAlgorithm,
    scrypt: scrypt::Params,
    argon2: argon2::Params,
    dummy_hash: String,
    evaluations: AtomicU64,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl PasswordVerifier {
    /// Build a verifier and precompute its dummy hash
    pub fn new(settings: &KdfSettings) -> Result<Self, PasswordError> {
        let (scrypt, argon2) = Self::check_params(settings)?;
        let mut verifier = Self {
            algorithm: settings.algorithm,
            scrypt,
            argon2,
            dummy_hash: String::new(),
            evaluations: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        };

        let mut throwaway = Zeroizing::new([0u8; 32]);
        rand::rng().fill_bytes(&mut *throwaway);
        verifier.dummy_hash = verifier.hash_bytes(&*throwaway)?;
        Ok(verifier)
    }

    /// Validate the cost parameters without hashing anything
    pub fn check_params(
        settings: &KdfSettings,
    ) -> Result<(scrypt::Params, argon2::Params), PasswordError> {
        let scrypt = scrypt::Params::new(
            settings.scrypt_log_n,
            settings.scrypt_r,
            settings.scrypt_p,
            SCRYPT_OUTPUT_LEN,
        )
        .map_err(|e| PasswordError::InvalidParams(format!("scrypt: {e}")))?;
        let argon2 = argon2::Params::new(
            settings.argon2_m_cost,
            settings.argon2_t_cost,
            settings.argon2_p_cost,
            None,
        )
        .map_err(|e| PasswordError::InvalidParams(format!("argon2: {e}")))?;
        Ok((scrypt, argon2))
    }

    pub fn algorithm(&self) -> KdfAlgorithm {
        self.algorithm
    }

    pub fn stats(&self) -> KdfStats {
        KdfStats {
            evaluations: self.evaluations.load(Ordering::SeqCst),
            peak_in_flight: self.peak_in_flight.load(Ordering::SeqCst),
        }
    }

    /// Hash a password with a fresh random salt
    pub fn hash(&self, plain: &str) -> Result<String, PasswordError> {
        self.hash_bytes(plain.as_bytes())
    }

    fn hash_bytes(&self, plain: &[u8]) -> Result<String, PasswordError> {
        let salt = generate_salt()?;
        let hash = match self.algorithm {
            KdfAlgorithm::Scrypt => {
                Scrypt.hash_password_customized(plain, None, None, self.scrypt, &salt)
            },
            KdfAlgorithm::Argon2id => self.argon2_hasher().hash_password(plain, &salt),
        }
        .map_err(|e| PasswordError::Hash(e.to_string()))?;
        Ok(hash.to_string())
    }

    /// Verify a password against a stored PHC hash.
    ///
    /// A hash that cannot be parsed, or that names an unsupported algorithm,
    /// never verifies and costs a dummy evaluation instead.
    pub fn verify(&self, plain: &str, stored_hash: &str) -> bool {
        match PasswordHash::new(stored_hash) {
            Ok(parsed) if is_supported(&parsed) => self.evaluate(&parsed, plain),
            _ => self.verify_dummy(plain),
        }
    }

    /// Run a full verification against the dummy hash. Always fails.
    pub fn verify_dummy(&self, plain: &str) -> bool {
        if let Ok(parsed) = PasswordHash::new(&self.dummy_hash) {
            let _ = self.evaluate(&parsed, plain);
        }
        false
    }

    fn evaluate(&self, hash: &PasswordHash<'_>, plain: &str) -> bool {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);
        let matched = verify_parsed(hash, plain);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.evaluations.fetch_add(1, Ordering::SeqCst);
        matched
    }

    fn argon2_hasher(&self) -> Argon2<'static> {
        Argon2::new(
            argon2::Algorithm::Argon2id,
            argon2::Version::V0x13,
            self.argon2.clone(),
        )
    }
}

/// Verify a password against a PHC hash produced by scrypt or argon2
pub fn verify_password(hash: &str, plain: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => verify_parsed(&parsed, plain),
        Err(_) => false,
    }
}

fn verify_parsed(hash: &PasswordHash<'_>, plain: &str) -> bool {
    let argon2 = Argon2::default();
    let verifiers: [&dyn PhcVerifier; 2] = [&Scrypt, &argon2];
    hash.verify_password(&verifiers, plain).is_ok()
}

fn is_supported(hash: &PasswordHash<'_>) -> bool {
    matches!(
        hash.algorithm.as_str(),
        "scrypt" | "argon2id" | "argon2i" | "argon2d"
    )
}

fn generate_salt() -> Result<SaltString, PasswordError> {
    let mut bytes = [0u8; SALT_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    SaltString::encode_b64(&bytes).map_err(|e| PasswordError::Hash(e.to_string()))
}
