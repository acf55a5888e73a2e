// crates/backend-lib/src/middleware/mod.rs

//! Request-level helpers for the keygate HTTP surface.

pub mod client_ip;

pub use client_ip::ClientIp;
