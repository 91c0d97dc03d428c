use std::time::Duration;

use pushshift_crawler::fetcher::retry_formatter::{RetryContext, RetryErrorType};
use pushshift_crawler::fetcher::{CrawlParams, PageQuery};
use pushshift_crawler::{PostKind, SubredditFilter};

fn query() -> PageQuery {
    CrawlParams::new(
        PostKind::Submissions,
        SubredditFilter::parse(["r/DataIsBeautiful", "dataisugly"]).unwrap(),
    )
    .with_before(Some(1_701_665_600))
    .with_after(Some(1_701_000_000))
    .first_query()
}

fn sample_context(error_type: RetryErrorType) -> RetryContext {
    RetryContext::new(
        &query(),
        "https://api.pushshift.io/reddit/submission/search",
        2,
        5,
        error_type,
        Duration::from_secs(8),
        "network timeout",
    )
}

#[test]
fn format_retry_captures_attempt_and_wait() {
    let message = sample_context(RetryErrorType::RateLimit).format_retry();
    assert!(message.contains("attempt 3/5"));
    assert!(message.contains("rate limit exceeded"));
    assert!(message.contains("8.0 seconds"));
    assert!(message.contains("(dataisbeautiful,dataisugly)"));
    assert!(message.contains("before 2023-12-04"));
}

#[test]
fn format_failure_lists_window_and_suggestion() {
    let output = sample_context(RetryErrorType::ServerError(502)).format_failure();
    assert!(output.contains("Request failed after 2 attempts"));
    assert!(output.contains("Last error: network timeout"));
    assert!(output.contains("Window: 2023-11-26"));
    assert!(output.contains("Endpoint: https://api.pushshift.io/reddit/submission/search"));
    assert!(output.contains("resume later from the metadata log"));
}

#[test]
fn server_errors_are_described_by_code() {
    assert_eq!(RetryErrorType::ServerError(502).description(), "bad gateway");
    assert_eq!(RetryErrorType::ServerError(522).description(), "origin connection timed out");
    assert_eq!(RetryErrorType::ServerError(599).description(), "server error");
    assert_eq!(RetryErrorType::from_status(500), RetryErrorType::ServerError(500));
}

#[test]
fn transport_flags_classify_errors() {
    assert_eq!(
        RetryErrorType::from_transport(false, false),
        RetryErrorType::NetworkGeneric
    );
    assert_eq!(
        RetryErrorType::from_transport(true, true),
        RetryErrorType::NetworkTimeout
    );
}
