//! HTTP retry behaviour against a mock Pushshift server

use pushshift_crawler::clock::ManualClock;
use pushshift_crawler::crawler::{CrawlExecutor, CrawlOutcome, PaginationController};
use pushshift_crawler::fetcher::{
    CrawlParams, Fetch, FetcherError, HttpFetcher, ReqwestTransport, RetryPolicy,
};
use pushshift_crawler::shutdown::ShutdownCoordinator;
use pushshift_crawler::sink::SinkEmitter;
use pushshift_crawler::{PostKind, SubredditFilter};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::support::{empty_page, MemoryLog, MemorySink};

const SEARCH: &str = "/reddit/submission/search";

fn params() -> CrawlParams {
    CrawlParams::new(PostKind::Submissions, SubredditFilter::parse(["foo"]).unwrap())
        .with_before(Some(1_700_000_000))
}

fn fetcher(server: &MockServer, policy: RetryPolicy, clock: Arc<ManualClock>) -> HttpFetcher<ReqwestTransport> {
    HttpFetcher::new(ReqwestTransport::new().unwrap(), server.uri(), policy, clock)
}

fn valid_page() -> serde_json::Value {
    serde_json::json!({
        "data": [{ "created_utc": 1699999900 }, { "created_utc": 1699999000 }],
        "metadata": { "total_results": 2, "timed_out": false }
    })
}

#[tokio::test]
async fn test_retry_then_success_emits_one_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SEARCH))
        .and(query_param("before", "1700000000"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(SEARCH))
        .and(query_param("before", "1700000000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(valid_page()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(SEARCH))
        .and(query_param("before", "1699999000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(empty_page()))
        .mount(&server)
        .await;

    let clock = ManualClock::shared();
    let log = MemoryLog::new();
    let sink = MemorySink::new();
    let dir = TempDir::new().unwrap();

    let controller = PaginationController::new(
        fetcher(&server, RetryPolicy::default(), clock.clone()),
        log.clone(),
        clock.clone(),
    )
    .with_shutdown(ShutdownCoordinator::shared());
    let emitter = SinkEmitter::new(sink.clone(), log.clone());
    let mut executor =
        CrawlExecutor::new(controller, emitter, dir.path().join("log.jsonl"), log.clone());

    let report = executor.execute(&params()).await.unwrap();

    assert_eq!(report.outcome, CrawlOutcome::Exhausted);
    assert_eq!(clock.sleeps(), vec![Duration::from_secs(4), Duration::from_secs(8)]);
    assert_eq!(sink.batches().len(), 1);
    assert_eq!(server.received_requests().await.unwrap().len(), 4);
    assert!(!log.contains("ERROR"));
}

#[tokio::test]
async fn test_request_carries_search_parameters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SEARCH))
        .and(query_param("subreddit", "foo"))
        .and(query_param("size", "100"))
        .and(query_param("sort", "desc"))
        .and(query_param("sort_type", "created_utc"))
        .and(query_param("metadata", "true"))
        .and(query_param("before", "1700000000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(empty_page()))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = fetcher(&server, RetryPolicy::default(), ManualClock::shared());
    let response = fetcher.get(&params().first_query()).await.unwrap();
    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn test_non_retryable_status_fails_immediately() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SEARCH))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&server)
        .await;

    let clock = ManualClock::shared();
    let fetcher = fetcher(&server, RetryPolicy::default(), clock.clone());
    let err = fetcher.get(&params().first_query()).await.unwrap_err();

    assert!(matches!(err, FetcherError::Http { status: 404, .. }));
    assert!(clock.sleeps().is_empty());
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_retries_exhausted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SEARCH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let policy = RetryPolicy {
        max_attempts: 3,
        ..RetryPolicy::default()
    };
    let clock = ManualClock::shared();
    let fetcher = fetcher(&server, policy, clock.clone());
    let err = fetcher.get(&params().first_query()).await.unwrap_err();

    assert!(matches!(err, FetcherError::Transport { attempts: 3, .. }));
    assert_eq!(clock.sleeps(), vec![Duration::from_secs(4), Duration::from_secs(8)]);
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_retry_after_header_is_honoured() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SEARCH))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(SEARCH))
        .respond_with(ResponseTemplate::new(200).set_body_json(valid_page()))
        .mount(&server)
        .await;

    let policy = RetryPolicy {
        respect_retry_after: true,
        ..RetryPolicy::default()
    };
    let clock = ManualClock::shared();
    let fetcher = fetcher(&server, policy, clock.clone());
    fetcher.get(&params().first_query()).await.unwrap();

    assert_eq!(clock.sleeps(), vec![Duration::from_secs(7)]);
}

#[tokio::test]
async fn test_fetch_failure_ends_crawl_with_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SEARCH))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
        .mount(&server)
        .await;

    let clock = ManualClock::shared();
    let log = MemoryLog::new();
    let dir = TempDir::new().unwrap();
    let journal = dir.path().join("log.jsonl");
    let controller = PaginationController::new(
        fetcher(&server, RetryPolicy::default(), clock.clone()),
        log.clone(),
        clock,
    )
    .with_shutdown(ShutdownCoordinator::shared());
    let emitter = SinkEmitter::new(MemorySink::new(), log.clone());
    let mut executor = CrawlExecutor::new(controller, emitter, &journal, log.clone());

    assert!(executor.execute(&params()).await.is_err());
    assert!(log.contains("ERROR: request failed for query"));
    assert!(!journal.exists());
}
