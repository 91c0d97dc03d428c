//! Operator-facing retry messages
//!
//! Classifies a failed attempt and renders the retry and give-up lines the
//! HTTP fetcher logs, with the subreddit key and time bounds of the query
//! for context.

use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::fetcher::query::PageQuery;

/// Classification of a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryErrorType {
    /// Request timed out
    NetworkTimeout,
    /// Connection refused, DNS failure or similar
    NetworkOffline,
    /// HTTP 429
    RateLimit,
    /// HTTP 5xx, or Cloudflare 52x in front of Pushshift
    ServerError(u16),
    /// HTTP 408
    RequestTimeout,
    /// Any other 4xx
    ClientError(u16),
    /// Transport error without a better classification
    NetworkGeneric,
}

impl RetryErrorType {
    /// Classify a response status
    pub fn from_status(status: u16) -> Self {
        match status {
            408 => Self::RequestTimeout,
            429 => Self::RateLimit,
            500..=599 => Self::ServerError(status),
            _ => Self::ClientError(status),
        }
    }

    /// Classify a transport error from its flags
    pub fn from_transport(is_timeout: bool, is_connect: bool) -> Self {
        if is_timeout {
            Self::NetworkTimeout
        } else if is_connect {
            Self::NetworkOffline
        } else {
            Self::NetworkGeneric
        }
    }

    /// Short description used in retry lines
    pub fn description(&self) -> &'static str {
        match self {
            Self::NetworkTimeout => "network timeout",
            Self::NetworkOffline => "connection failed",
            Self::RateLimit => "rate limit exceeded",
            Self::ServerError(code) => match code {
                500 => "internal server error",
                502 => "bad gateway",
                503 => "service unavailable",
                504 => "gateway timeout",
                522 => "origin connection timed out",
                _ => "server error",
            },
            Self::RequestTimeout => "request timeout",
            Self::ClientError(code) => match code {
                400 => "bad request",
                404 => "endpoint not found",
                _ => "client error",
            },
            Self::NetworkGeneric => "network error",
        }
    }

    /// Remediation hint shown when retries are exhausted
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::NetworkTimeout | Self::RequestTimeout => {
                "Pushshift is slow to answer; lower --size or try again later"
            }
            Self::NetworkOffline => "Verify internet connectivity and DNS resolution",
            Self::RateLimit => "Lower [pushshift] rate_limit_calls in the settings file",
            Self::ServerError(_) => "Pushshift may be degraded; resume later from the metadata log",
            Self::ClientError(_) => "Check the subreddit names and time bounds",
            Self::NetworkGeneric => "Check network connectivity and try again",
        }
    }
}

/// Context of a retry decision
#[derive(Debug, Clone)]
pub struct RetryContext {
    /// Attempt that just failed (1-based)
    pub attempt: u32,
    /// Configured attempt ceiling
    pub max_attempts: u32,
    /// Why it failed
    pub error_type: RetryErrorType,
    /// Delay before the next attempt
    pub backoff_duration: Duration,
    /// Canonical subreddit key
    pub subreddit: String,
    /// `(after, before)` bounds of the query
    pub bounds: (Option<i64>, Option<i64>),
    /// Underlying error text
    pub error_message: String,
    /// Request URL
    pub endpoint: String,
}

impl RetryContext {
    /// Context for `query` at `attempt`
    pub fn new(
        query: &PageQuery,
        endpoint: impl Into<String>,
        attempt: u32,
        max_attempts: u32,
        error_type: RetryErrorType,
        backoff_duration: Duration,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            attempt,
            max_attempts,
            error_type,
            backoff_duration,
            subreddit: query.subreddit.clone(),
            bounds: (query.after, query.before),
            error_message: error_message.into(),
            endpoint: endpoint.into(),
        }
    }

    /// Line logged before sleeping
    pub fn format_retry(&self) -> String {
        let mut message = format!(
            "Retrying (attempt {}/{}) after {} - waiting {:.1} seconds...",
            self.attempt + 1,
            self.max_attempts,
            self.error_type.description(),
            self.backoff_duration.as_secs_f64()
        );
        append_query_context(&mut message, &self.subreddit, self.bounds);
        message
    }

    /// Multi-line summary logged when retries are exhausted
    pub fn format_failure(&self) -> String {
        let (after, before) = self.bounds;
        [
            format!("[FAILED] Request failed after {} attempts", self.attempt),
            format!("  Last error: {}", self.error_message),
            format!("  Subreddit: {}", self.subreddit),
            format!(
                "  Window: {} to {}",
                after.map(format_timestamp).unwrap_or_else(|| "beginning".to_string()),
                before.map(format_timestamp).unwrap_or_else(|| "now".to_string())
            ),
            format!("  Endpoint: {}", self.endpoint),
            format!("  Suggestion: {}", self.error_type.suggestion()),
        ]
        .join("\n")
    }
}

fn append_query_context(buffer: &mut String, subreddit: &str, bounds: (Option<i64>, Option<i64>)) {
    if !subreddit.is_empty() {
        buffer.push_str(&format!(" ({subreddit})"));
    }
    if let (_, Some(before)) = bounds {
        buffer.push_str(&format!(" before {}", format_timestamp(before)));
    }
}

fn format_timestamp(secs: i64) -> String {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| secs.to_string())
}
