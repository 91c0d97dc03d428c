//! Crawl configuration constants

use std::time::Duration;

/// Default number of records requested per page.
pub const DEFAULT_PAGE_SIZE: u8 = 100;

/// Largest page Pushshift will serve.
pub const MAX_PAGE_SIZE: u8 = 100;

/// Cumulative request count after which a `--test` crawl stops.
pub const TEST_REQUEST_BUDGET: u64 = 10;

/// A progress line is emitted every N requests.
pub const PROGRESS_INTERVAL: u64 = 100;

/// Calls permitted per rate-limit window.
/// Pushshift asks clients to stay at or below 100 requests per minute.
pub const DEFAULT_RATE_LIMIT_CALLS: usize = 100;

/// Length of the rate-limit window.
pub const DEFAULT_RATE_LIMIT_PERIOD: Duration = Duration::from_secs(60);

/// Journal file used when neither the settings file nor the CLI names one.
pub const DEFAULT_JOURNAL_FILENAME: &str = "metadata_log.jsonl";

/// Whether a progress line is due after `request_count` requests.
pub fn progress_due(request_count: u64, interval: u64) -> bool {
    interval > 0 && request_count > 0 && request_count % interval == 0
}
