//! Pagination engine and crawl orchestration
//!
//! # Overview
//!
//! 1. **Resume lookup**: [`executor::CrawlExecutor`] scans the journal for the
//!    last watermark of this subreddit key and decides the starting `before`
//! 2. **Pagination**: [`controller::PaginationController`] walks the result
//!    stream backwards, one page per request
//! 3. **Commit**: every page is sent to the record sink, then journaled
//! 4. **Termination**: an empty page, the `--test` request budget, a
//!    cancellation request, or any terminal error
//!
//! # Components
//!
//! - [`controller`] - Page-by-page state machine
//! - [`executor`] - Composes journal, controller and sinks for one invocation
//! - [`rate_limit`] - Sliding-window request budget
//! - [`progress`] - Read-only counters
//! - [`config`] - Crawl constants

pub mod config;
pub mod controller;
pub mod executor;
pub mod progress;
pub mod rate_limit;

pub use controller::{CrawlOutcome, CrawlState, PaginationController};
pub use executor::{resolve_start_before, CrawlExecutor, CrawlReport, ResumeDecision};
pub use progress::CrawlProgress;
pub use rate_limit::{RateLimitError, RateLimiter, Throttle};

use crate::fetcher::{FetcherError, ValidationError};
use crate::journal::JournalError;
use crate::sink::SinkError;

/// Crawl errors
///
/// Page-level variants carry the JSON-serialised query that failed.
#[derive(Debug, thiserror::Error)]
pub enum CrawlError {
    /// Request failed after retries, or with a terminal status
    #[error("request failed for query {params}: {source}")]
    Fetch {
        /// Query parameters as JSON
        params: String,
        /// Underlying error
        source: FetcherError,
    },

    /// Response did not pass validation
    #[error("invalid response for query {params}: {source}")]
    Validation {
        /// Query parameters as JSON
        params: String,
        /// Underlying error
        source: ValidationError,
    },

    /// Page records could not be delivered
    #[error("failed to send page for query {params}: {source}")]
    Sink {
        /// Query parameters as JSON
        params: String,
        /// Underlying error
        source: SinkError,
    },

    /// Delivered page could not be journaled
    #[error("failed to journal page for query {params}: {source}")]
    JournalWrite {
        /// Query parameters as JSON
        params: String,
        /// Underlying error
        source: JournalError,
    },

    /// Journal could not be read at startup
    #[error("journal error: {0}")]
    Journal(#[from] JournalError),

    /// The next watermark does not move backwards in time
    #[error(
        "pagination is not progressing: next before {next_before} is not older than {previous_before} for query {params}"
    )]
    Stuck {
        /// Watermark of the previous request
        previous_before: i64,
        /// Watermark the next request would use
        next_before: i64,
        /// Query parameters as JSON
        params: String,
    },
}

impl CrawlError {
    /// Whether this is the source's end-of-results signal
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, CrawlError::Validation { source, .. } if source.is_empty())
    }
}
