//! Read-only crawl progress view

use std::fmt;
use std::time::Duration;

/// Counters of a running or finished crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CrawlProgress {
    /// Requests issued (one per page, retries excluded)
    pub requests: u64,
    /// Pages sent and journaled
    pub pages_committed: u64,
    /// Records sent
    pub records_committed: u64,
    /// Time since the crawl started
    pub elapsed: Duration,
}

impl CrawlProgress {
    /// Elapsed time in minutes, rounded to two decimals
    pub fn elapsed_minutes(&self) -> f64 {
        (self.elapsed.as_secs() as f64 / 60.0 * 100.0).round() / 100.0
    }
}

impl fmt::Display for CrawlProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Crawled {} pages in {} mins.",
            self.requests,
            self.elapsed_minutes()
        )
    }
}
