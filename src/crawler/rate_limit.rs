//! Client-side request budget
//!
//! Implements a sliding window over the timestamps of the most recent calls:
//! at most `max_calls` may start within any `period`. When the window is full
//! the caller sleeps until the oldest call leaves it.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::clock::SharedClock;
use crate::crawler::config::{DEFAULT_RATE_LIMIT_CALLS, DEFAULT_RATE_LIMIT_PERIOD};
use crate::metrics;

/// A policy that admits or delays outgoing requests.
#[async_trait]
pub trait Throttle: Send + Sync {
    /// Block until a request may be issued
    async fn acquire(&self) -> Result<(), RateLimitError>;
}

/// Sliding-window rate limiter permitting `max_calls` per `period`
pub struct RateLimiter {
    max_calls: usize,
    period: Duration,
    clock: SharedClock,
    window: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Create a limiter
    ///
    /// # Arguments
    /// * `max_calls` - Maximum calls per window (must be non-zero)
    /// * `period` - Window length (must be non-zero)
    /// * `clock` - Time source used for window bookkeeping and sleeping
    pub fn new(max_calls: usize, period: Duration, clock: SharedClock) -> Result<Self, RateLimitError> {
        if max_calls == 0 {
            return Err(RateLimitError::InvalidPolicy(
                "max_calls must be at least 1".to_string(),
            ));
        }
        if period.is_zero() {
            return Err(RateLimitError::InvalidPolicy(
                "period must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            max_calls,
            period,
            clock,
            window: Mutex::new(VecDeque::with_capacity(max_calls)),
        })
    }

    /// Limiter with the Pushshift default budget of 100 calls per 60 seconds
    pub fn pushshift_default(clock: SharedClock) -> Self {
        Self {
            max_calls: DEFAULT_RATE_LIMIT_CALLS,
            period: DEFAULT_RATE_LIMIT_PERIOD,
            clock,
            window: Mutex::new(VecDeque::with_capacity(DEFAULT_RATE_LIMIT_CALLS)),
        }
    }

    /// Maximum calls per window
    pub fn max_calls(&self) -> usize {
        self.max_calls
    }

    /// Window length
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Number of calls currently inside the window
    pub fn calls_in_window(&self) -> usize {
        let now = self.clock.now();
        let mut window = self.lock_window();
        self.evict_expired(&mut window, now);
        window.len()
    }

    /// Reserve a slot if one is free, otherwise report how long to wait.
    fn try_reserve(&self) -> Option<Duration> {
        let now = self.clock.now();
        let mut window = self.lock_window();
        self.evict_expired(&mut window, now);

        if window.len() < self.max_calls {
            window.push_back(now);
            return None;
        }

        // Window is full, so it has at least one entry
        let oldest = *window.front()?;
        Some((oldest + self.period).saturating_duration_since(now))
    }

    fn evict_expired(&self, window: &mut VecDeque<Instant>, now: Instant) {
        while let Some(oldest) = window.front() {
            if now.saturating_duration_since(*oldest) >= self.period {
                window.pop_front();
            } else {
                break;
            }
        }
    }

    fn lock_window(&self) -> std::sync::MutexGuard<'_, VecDeque<Instant>> {
        self.window
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Throttle for RateLimiter {
    async fn acquire(&self) -> Result<(), RateLimitError> {
        let started = self.clock.now();

        while let Some(wait) = self.try_reserve() {
            debug!(
                wait_ms = wait.as_millis() as u64,
                max_calls = self.max_calls,
                period_secs = self.period.as_secs(),
                "Rate limit window full, waiting"
            );
            self.clock.sleep(wait).await;
        }

        metrics::record_rate_limit_wait(self.clock.now().saturating_duration_since(started));
        Ok(())
    }
}

/// Rate limiter errors
#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    /// Limiter constructed with an unusable policy
    #[error("invalid rate limit policy: {0}")]
    InvalidPolicy(String),
}
