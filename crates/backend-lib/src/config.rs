// ============================
// crates/backend-lib/src/config.rs
// ============================
//! Configuration management.
//!
//! Settings are layered with figment: built-in defaults, then
//! `config/default.toml`, then `config.toml`, then `KEYGATE_*` environment
//! variables (nested keys separated by `__`, e.g. `KEYGATE_TOKEN__TTL_SECS`).
//! The result is validated once and treated as immutable afterwards.
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use jsonwebtoken::Algorithm;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "KEYGATE_";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

const MAX_KDF_CONCURRENCY: usize = 1024;

/// Errors raised while loading or validating settings
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Server bind address
    pub bind_addr: SocketAddr,
    /// Log level, overridden by `RUST_LOG` when set
    pub log_level: String,
    pub log_format: LogFormat,
    pub token: TokenSettings,
    pub store: StoreSettings,
    pub kdf: KdfSettings,
    pub rate_limit: RateLimitSettings,
}

/// Token signing settings
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenSettings {
    /// `iss` claim
    pub issuer: String,
    /// `aud` claim
    pub audience: String,
    /// Token lifetime in seconds
    pub ttl_secs: u64,
    /// Signing algorithm (`HS256`, `RS256`, `ES256`, `EdDSA`, ...)
    pub algorithm: Algorithm,
    /// Shared secret for the HMAC algorithms
    pub secret: Option<String>,
    /// PEM private key for the asymmetric algorithms
    pub private_key_path: Option<PathBuf>,
    /// PEM public key, needed to validate asymmetric tokens
    pub public_key_path: Option<PathBuf>,
    /// Clock skew tolerated when validating `exp` and `nbf`
    pub leeway_secs: u64,
}

/// Credential store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// JSON users file read by the flat-file store
    pub users_file: PathBuf,
    /// Upper bound for a single lookup
    pub lookup_timeout_ms: u64,
}

/// Key-derivation algorithm used for new password hashes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KdfAlgorithm {
    #[default]
    Scrypt,
    Argon2id,
}

/// Password hashing cost settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KdfSettings {
    pub algorithm: KdfAlgorithm,
    /// scrypt CPU/memory cost as a power of two
    pub scrypt_log_n: u8,
    pub scrypt_r: u32,
    pub scrypt_p: u32,
    /// argon2 memory cost in KiB
    pub argon2_m_cost: u32,
    pub argon2_t_cost: u32,
    pub argon2_p_cost: u32,
    /// Password verifications allowed to run at once; each holds the full
    /// KDF memory cost while it runs
    pub max_concurrent: usize,
}

/// Failed-login lockout settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    pub enabled: bool,
    /// Failed attempts from one client IP before it is locked out
    pub max_attempts: u32,
    pub lockout_secs: u64,
    /// Reverse proxies whose `X-Real-IP` / `X-Forwarded-For` headers are
    /// believed. Requests from any other peer are keyed on the socket address.
    pub trusted_proxies: Vec<IpAddr>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            log_level: "info".to_string(),
            log_format: LogFormat::default(),
            token: TokenSettings::default(),
            store: StoreSettings::default(),
            kdf: KdfSettings::default(),
            rate_limit: RateLimitSettings::default(),
        }
    }
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            issuer: "keygate".to_string(),
            audience: "keygate".to_string(),
            ttl_secs: 30 * 60, // 30 minutes
            algorithm: Algorithm::HS256,
            secret: None,
            private_key_path: None,
            public_key_path: None,
            leeway_secs: 0,
        }
    }
}

impl fmt::Debug for TokenSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSettings")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("ttl_secs", &self.ttl_secs)
            .field("algorithm", &self.algorithm)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("private_key_path", &self.private_key_path)
            .field("public_key_path", &self.public_key_path)
            .field("leeway_secs", &self.leeway_secs)
            .finish()
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            users_file: PathBuf::from("data/users.json"),
            lookup_timeout_ms: 2_000,
        }
    }
}

impl Default for KdfSettings {
    fn default() -> Self {
        Self {
            algorithm: KdfAlgorithm::Scrypt,
            scrypt_log_n: 17,
            scrypt_r: 8,
            scrypt_p: 1,
            argon2_m_cost: 19_456,
            argon2_t_cost: 2,
            argon2_p_cost: 1,
            max_concurrent: 4,
        }
    }
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 5,
            lockout_secs: 5 * 60,
            trusted_proxies: Vec::new(),
        }
    }
}

impl TokenSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl StoreSettings {
    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }
}

impl RateLimitSettings {
    pub fn lockout(&self) -> Duration {
        Duration::from_secs(self.lockout_secs)
    }
}

impl Settings {
    /// Load settings from the default locations and the environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(
            Self::base_figment()
                .merge(Toml::file("config/default.toml"))
                .merge(Toml::file("config.toml")),
        )
    }

    /// Load settings from an explicit TOML file, still honouring the environment
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::from_figment(Self::base_figment().merge(Toml::file(path.as_ref())))
    }

    fn base_figment() -> Figment {
        Figment::from(Serialized::defaults(Settings::default()))
    }

    fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let settings: Settings = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(Box::new)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check the settings for values that can never work
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            return Err(invalid(format!("unknown log level `{}`", self.log_level)));
        }
        if self.token.ttl_secs == 0 {
            return Err(invalid("token.ttl_secs must be greater than zero"));
        }
        if self.token.issuer.trim().is_empty() {
            return Err(invalid("token.issuer must not be empty"));
        }
        if self.token.audience.trim().is_empty() {
            return Err(invalid("token.audience must not be empty"));
        }
        if self.store.lookup_timeout_ms == 0 {
            return Err(invalid("store.lookup_timeout_ms must be greater than zero"));
        }
        if self.rate_limit.enabled && self.rate_limit.max_attempts == 0 {
            return Err(invalid("rate_limit.max_attempts must be greater than zero"));
        }
        if !(1..=MAX_KDF_CONCURRENCY).contains(&self.kdf.max_concurrent) {
            return Err(invalid(format!(
                "kdf.max_concurrent must be between 1 and {MAX_KDF_CONCURRENCY}"
            )));
        }
        // Signing keys are checked when the token issuer is built so that a
        // bad key surfaces as a signing failure rather than a parse error.
        crate::auth::PasswordVerifier::check_params(&self.kdf)
            .map_err(|e| invalid(e.to_string()))?;
        Ok(())
    }
}

fn invalid(msg: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(msg.into())
}
