// ============================
// crates/backend-lib/src/handlers/mod.rs
// ============================
//! HTTP handlers.

pub mod health;
pub mod login;

pub use health::health;
pub use login::login;
