// ============================
// crates/backend-lib/src/auth/rate_limit.rs
// ============================
//! Lockout of client addresses after repeated failed logins.

use dashmap::DashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::RateLimitSettings;

/// Entries without activity for this long are dropped by `cleanup`
const IDLE_ENTRY_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone)]
struct AttemptEntry {
    failed_attempts: u32,
    last_failure: Instant,
    locked_until: Option<Instant>,
}

/// Failed-login counter keyed by client IP
#[derive(Debug)]
pub struct AuthRateLimiter {
    attempts: DashMap<IpAddr, AttemptEntry>,
    max_attempts: u32,
    lockout: Duration,
}

impl Default for AuthRateLimiter {
    fn default() -> Self {
        Self::from_settings(&RateLimitSettings::default())
    }
}

impl AuthRateLimiter {
    pub fn new(max_attempts: u32, lockout: Duration) -> Self {
        Self {
            attempts: DashMap::new(),
            max_attempts,
            lockout,
        }
    }

    pub fn from_settings(settings: &RateLimitSettings) -> Self {
        Self::new(settings.max_attempts, settings.lockout())
    }

    /// Record a rejected login from `ip`
    pub fn record_failure(&self, ip: IpAddr) {
        self.record_failure_at(ip, Instant::now());
    }

    fn record_failure_at(&self, ip: IpAddr, now: Instant) {
        let mut entry = self.attempts.entry(ip).or_insert_with(|| AttemptEntry {
            failed_attempts: 0,
            last_failure: now,
            locked_until: None,
        });

        // an expired lockout starts a fresh count
        if entry.locked_until.is_some_and(|until| now >= until) {
            entry.failed_attempts = 0;
            entry.locked_until = None;
        }

        entry.failed_attempts += 1;
        entry.last_failure = now;

        if entry.failed_attempts >= self.max_attempts && entry.locked_until.is_none() {
            entry.locked_until = Some(now + self.lockout);
            tracing::warn!(
                %ip,
                attempts = entry.failed_attempts,
                lockout_secs = self.lockout.as_secs(),
                "client locked out after failed logins"
            );
        }
    }

    /// Forget `ip` after a successful login
    pub fn record_success(&self, ip: IpAddr) {
        self.attempts.remove(&ip);
    }

    /// Whether `ip` may attempt a login right now
    pub fn is_allowed(&self, ip: IpAddr) -> bool {
        self.is_allowed_at(ip, Instant::now())
    }

    fn is_allowed_at(&self, ip: IpAddr, now: Instant) -> bool {
        self.attempts
            .get(&ip)
            .and_then(|entry| entry.locked_until)
            .map_or(true, |until| now >= until)
    }

    /// Drop expired lockouts and idle counters
    pub fn cleanup(&self) {
        let now = Instant::now();
        self.attempts.retain(|_, entry| match entry.locked_until {
            Some(until) => now < until,
            None => now.duration_since(entry.last_failure) < IDLE_ENTRY_TTL,
        });
    }

    pub fn tracked(&self) -> usize {
        self.attempts.len()
    }

    /// Run `cleanup` every `period` on the current runtime
    pub fn spawn_cleanup(self: Arc<Self>, period: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                self.cleanup();
            }
        })
    }
}
