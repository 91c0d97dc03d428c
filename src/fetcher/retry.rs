//! Retry policy for page requests
//!
//! The policy is a plain configuration record so it can be loaded from the
//! `[retry]` section of the settings file instead of being hard-coded.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Maximum total attempts (initial request included).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Status codes treated as transient.
/// 522 is Cloudflare's "connection timed out", which Pushshift's edge returns under load.
pub const DEFAULT_RETRY_STATUS_CODES: [u16; 7] = [408, 429, 500, 502, 503, 504, 522];

/// First backoff delay in seconds.
pub const DEFAULT_BACKOFF_BASE_SECS: u64 = 4;

/// Multiplier applied per additional retry.
pub const DEFAULT_BACKOFF_FACTOR: u32 = 2;

/// Retry and backoff configuration consumed by the HTTP fetcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Response status codes that trigger a retry
    pub status_codes: Vec<u16>,
    /// Delay before the first retry, in seconds
    pub backoff_base_secs: u64,
    /// Growth factor of the delay between successive retries
    pub backoff_factor: u32,
    /// Honour a numeric `Retry-After` header instead of the computed backoff
    pub respect_retry_after: bool,
    /// HTTP methods eligible for retry (idempotent methods only)
    pub methods: Vec<String>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            status_codes: DEFAULT_RETRY_STATUS_CODES.to_vec(),
            backoff_base_secs: DEFAULT_BACKOFF_BASE_SECS,
            backoff_factor: DEFAULT_BACKOFF_FACTOR,
            respect_retry_after: false,
            methods: vec!["GET".to_string()],
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Check the policy is usable
    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("retry max_attempts must be at least 1".to_string());
        }
        if self.backoff_factor == 0 {
            return Err("retry backoff_factor must be at least 1".to_string());
        }
        Ok(())
    }

    /// Whether a response status is transient under this policy
    pub fn retries_status(&self, status: u16) -> bool {
        self.status_codes.contains(&status)
    }

    /// Whether requests with this method may be retried at all
    pub fn retries_method(&self, method: &str) -> bool {
        self.methods.iter().any(|m| m.eq_ignore_ascii_case(method))
    }

    /// Backoff before retry number `retry_index` (0-based): `base * factor^retry_index`
    pub fn backoff(&self, retry_index: u32) -> Duration {
        let multiplier = u64::from(self.backoff_factor).saturating_pow(retry_index);
        Duration::from_secs(self.backoff_base_secs.saturating_mul(multiplier))
    }

    /// Delay to apply before the next attempt, taking `Retry-After` into account
    pub fn delay_for(&self, retry_index: u32, retry_after_secs: Option<u64>) -> Duration {
        match retry_after_secs {
            Some(secs) if self.respect_retry_after => Duration::from_secs(secs),
            _ => self.backoff(retry_index),
        }
    }
}
