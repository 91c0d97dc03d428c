//! Integration tests for client-side rate limiting

use pushshift_crawler::clock::{Clock, ManualClock};
use pushshift_crawler::crawler::{RateLimiter, Throttle};
use pushshift_crawler::fetcher::{CrawlParams, Fetch, RateLimitedFetcher};
use pushshift_crawler::{PostKind, SubredditFilter};
use std::sync::Arc;
use std::time::Duration;

use crate::support::{empty_page, ScriptedFetch};

#[test]
fn test_rate_limiter_rejects_invalid_policy() {
    assert!(RateLimiter::new(0, Duration::from_secs(60), ManualClock::shared()).is_err());
    assert!(RateLimiter::new(10, Duration::ZERO, ManualClock::shared()).is_err());
}

#[tokio::test]
async fn test_burst_within_budget_is_not_delayed() {
    let clock = ManualClock::shared();
    let limiter = RateLimiter::new(100, Duration::from_secs(60), clock.clone()).unwrap();

    for _ in 0..100 {
        limiter.acquire().await.unwrap();
    }

    assert!(clock.sleeps().is_empty());
    assert_eq!(limiter.calls_in_window(), 100);
}

#[tokio::test]
async fn test_call_over_budget_waits_for_window() {
    let clock = ManualClock::shared();
    let limiter = RateLimiter::new(100, Duration::from_secs(60), clock.clone()).unwrap();

    for _ in 0..100 {
        limiter.acquire().await.unwrap();
    }
    clock.advance(Duration::from_secs(15));
    limiter.acquire().await.unwrap();

    assert_eq!(clock.sleeps(), vec![Duration::from_secs(45)]);
}

#[tokio::test]
async fn test_no_window_exceeds_budget() {
    let clock = ManualClock::shared();
    let limiter = RateLimiter::new(3, Duration::from_secs(10), clock.clone()).unwrap();
    let mut starts = Vec::new();

    for _ in 0..10 {
        limiter.acquire().await.unwrap();
        starts.push(clock.now());
        clock.advance(Duration::from_secs(1));
    }

    for (i, start) in starts.iter().enumerate() {
        let in_window = starts[i..]
            .iter()
            .filter(|s| s.duration_since(*start) < Duration::from_secs(10))
            .count();
        assert!(in_window <= 3, "window starting at call {i} holds {in_window} calls");
    }
}

#[tokio::test]
async fn test_rate_limited_fetcher_throttles_every_request() {
    let clock = ManualClock::shared();
    let limiter = Arc::new(RateLimiter::new(2, Duration::from_secs(60), clock.clone()).unwrap());
    let fetch = ScriptedFetch::endless(|_| empty_page());
    let fetcher = RateLimitedFetcher::new(fetch.clone(), limiter.clone());
    let query = CrawlParams::new(PostKind::Submissions, SubredditFilter::parse(["foo"]).unwrap())
        .first_query();

    for _ in 0..3 {
        fetcher.get(&query).await.unwrap();
    }

    assert_eq!(fetch.queries().len(), 3);
    assert_eq!(clock.sleeps(), vec![Duration::from_secs(60)]);
}
