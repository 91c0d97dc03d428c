use pushshift_crawler::fetcher::{CrawlParams, PageQuery, PageWarning, ResponseValidator, ValidationError};
use pushshift_crawler::{PostKind, SubredditFilter};
use serde_json::json;

fn comment_query() -> PageQuery {
    CrawlParams::new(PostKind::Comments, SubredditFilter::parse(["foo"]).unwrap())
        .with_before(Some(1_700_000_000))
        .first_query()
}

#[test]
fn page_carries_endpoint_and_request() {
    let body = json!({
        "data": [{ "created_utc": 1699999990, "body": "first" }, { "created_utc": 1699999000 }],
        "metadata": { "total_results": 77, "execution_time_milliseconds": 31.5 }
    });

    let page = ResponseValidator::new()
        .validate(&body.to_string(), &comment_query())
        .unwrap();

    assert_eq!(page.endpoint, "comment");
    assert_eq!(page.request_params, comment_query());
    assert_eq!(page.max_created_utc, 1699999990);
    assert_eq!(page.min_created_utc, 1699999000);
    assert_eq!(page.data[0]["body"], "first");
    assert_eq!(page.metadata.extra["execution_time_milliseconds"], 31.5);
    assert!(page.warnings.is_empty());
}

#[test]
fn every_shard_problem_is_reported() {
    let body = json!({
        "data": [{ "created_utc": 10 }],
        "metadata": {
            "total_results": 1,
            "timed_out": true,
            "shards": { "failed": 2, "skipped": 3, "total": 8, "successful": 3 }
        }
    });

    let page = ResponseValidator::new()
        .validate(&body.to_string(), &comment_query())
        .unwrap();

    assert_eq!(
        page.warnings,
        vec![
            PageWarning::TimedOut,
            PageWarning::FailedShards(2),
            PageWarning::SkippedShards(3)
        ]
    );
    assert_eq!(page.warnings[2].to_string(), "WARNING: Skipped shards: 3");
}

#[test]
fn missing_metadata_is_checked_before_data() {
    let err = ResponseValidator::new()
        .validate("{}", &comment_query())
        .unwrap_err();
    assert!(matches!(err, ValidationError::NoMetadata));

    let err = ResponseValidator::new()
        .validate(r#"{"metadata": {"total_results": 3}}"#, &comment_query())
        .unwrap_err();
    assert!(matches!(err, ValidationError::NoData));
}

#[test]
fn zero_results_is_end_of_stream() {
    let err = ResponseValidator::new()
        .validate(
            r#"{"data": [], "metadata": {"total_results": 0}}"#,
            &comment_query(),
        )
        .unwrap_err();
    assert!(err.is_empty());
}

#[test]
fn html_error_page_is_malformed() {
    let err = ResponseValidator::new()
        .validate("<html>502 Bad Gateway</html>", &comment_query())
        .unwrap_err();
    assert!(matches!(err, ValidationError::Malformed(_)));
    assert!(!err.is_empty());
}
