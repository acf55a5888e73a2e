// ==============
// crates/backend-lib/src/metrics.rs

//! Central place for metric keys
pub const LOGIN_SUCCEEDED: &str = "login.succeeded";
pub const LOGIN_REJECTED: &str = "login.rejected";
pub const LOGIN_STORE_UNAVAILABLE: &str = "login.store_unavailable";
pub const LOGIN_SIGNING_FAILED: &str = "login.signing_failed";
pub const LOGIN_RATE_LIMITED: &str = "login.rate_limited";
pub const LOGIN_DURATION: &str = "login.duration_seconds";
