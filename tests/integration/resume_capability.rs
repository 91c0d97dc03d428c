//! Resume from the metadata journal

use pushshift_crawler::crawler::CrawlError;
use pushshift_crawler::fetcher::CrawlParams;
use pushshift_crawler::journal::JournalError;
use pushshift_crawler::{PostKind, SubredditFilter};
use serde_json::json;
use std::io::Write;
use tempfile::TempDir;

use crate::support::{empty_page, page, rig, ScriptedFetch};

fn seed(path: &std::path::Path, lines: &[serde_json::Value]) {
    let mut file = std::fs::File::create(path).unwrap();
    for line in lines {
        writeln!(file, "{line}").unwrap();
    }
}

fn entry(subreddit: serde_json::Value, min: i64, max: i64) -> serde_json::Value {
    json!({
        "subreddit": subreddit,
        "total_results": 1234,
        "timed_out": false,
        "last_result_timestamps": { "min_created_utc": min, "max_created_utc": max },
        "retrieved_from_pushshift": "2023-11-14T22:13:20Z"
    })
}

fn params(subreddits: &[&str]) -> CrawlParams {
    CrawlParams::new(
        PostKind::Submissions,
        SubredditFilter::parse(subreddits).unwrap(),
    )
    .with_before(Some(1_700_000_000))
}

#[tokio::test]
async fn test_resume_uses_journal_watermark() {
    let dir = TempDir::new().unwrap();
    let journal = dir.path().join("log.jsonl");
    seed(&journal, &[entry(json!("foo"), 1_699_000_000, 1_699_500_000)]);
    let mut r = rig(ScriptedFetch::new(vec![empty_page()]), &journal);

    let report = r.executor.execute(&params(&["foo"])).await.unwrap();

    assert_eq!(report.start_before, Some(1_699_000_000));
    assert_eq!(r.fetch.befores(), vec![Some(1_699_000_000)]);
    assert!(r.log.contains(
        "Using 'before' timestamp 1699000000 from metadata log instead of CLI arg 1700000000"
    ));
    assert!(r.log.contains("Local log file found"));
    assert!(r.log.contains(
        "Found subreddits foo in local log. min_created_utc=1699000000; max_created_utc=1699500000"
    ));
}

#[tokio::test]
async fn test_no_resume_keeps_cli_before() {
    let dir = TempDir::new().unwrap();
    let journal = dir.path().join("log.jsonl");
    seed(&journal, &[entry(json!("foo"), 1_699_000_000, 1_699_500_000)]);
    let mut r = rig(ScriptedFetch::new(vec![empty_page()]), &journal);

    r.executor
        .execute(&params(&["foo"]).with_no_resume(true))
        .await
        .unwrap();

    assert_eq!(r.fetch.befores(), vec![Some(1_700_000_000)]);
    assert!(r.log.contains("but --no_resume is set"));
}

#[tokio::test]
async fn test_last_matching_entry_wins() {
    let dir = TempDir::new().unwrap();
    let journal = dir.path().join("log.jsonl");
    seed(
        &journal,
        &[
            entry(json!("foo"), 1_699_000_000, 1_699_500_000),
            entry(json!("foo"), 1_698_000_000, 1_698_900_000),
            entry(json!("bar"), 1_600_000_000, 1_600_500_000),
        ],
    );
    let mut r = rig(ScriptedFetch::new(vec![empty_page()]), &journal);

    r.executor.execute(&params(&["foo"])).await.unwrap();
    assert_eq!(r.fetch.befores(), vec![Some(1_698_000_000)]);
}

#[tokio::test]
async fn test_subreddit_order_does_not_matter() {
    let dir = TempDir::new().unwrap();
    let journal = dir.path().join("log.jsonl");
    // Pushshift echoes the filter back as a list in request order
    seed(&journal, &[entry(json!(["Rust", "golang"]), 1_699_000_000, 1_699_100_000)]);
    let mut r = rig(ScriptedFetch::new(vec![empty_page()]), &journal);

    r.executor
        .execute(&params(&["golang", "r/rust"]))
        .await
        .unwrap();

    assert_eq!(r.fetch.befores(), vec![Some(1_699_000_000)]);
    assert_eq!(r.fetch.queries()[0].subreddit, "golang,rust");
}

#[tokio::test]
async fn test_other_subreddit_is_ignored() {
    let dir = TempDir::new().unwrap();
    let journal = dir.path().join("log.jsonl");
    seed(&journal, &[entry(json!("bar"), 1_600_000_000, 1_600_500_000)]);
    let mut r = rig(ScriptedFetch::new(vec![empty_page()]), &journal);

    r.executor.execute(&params(&["foo"])).await.unwrap();
    assert_eq!(r.fetch.befores(), vec![Some(1_700_000_000)]);
}

#[tokio::test]
async fn test_interrupted_crawl_continues_from_last_page() {
    let dir = TempDir::new().unwrap();
    let journal = dir.path().join("log.jsonl");

    // First run dies on the third request
    let mut first = rig(
        ScriptedFetch::new(vec![page(&[1_699_999_000, 1_699_990_000]), page(&[1_699_990_000, 1_699_980_000])]),
        &journal,
    );
    assert!(first.executor.execute(&params(&["foo"])).await.is_err());

    let mut second = rig(ScriptedFetch::new(vec![empty_page()]), &journal);
    second.executor.execute(&params(&["foo"])).await.unwrap();

    assert_eq!(second.fetch.befores(), vec![Some(1_699_980_000)]);
    let lines = std::fs::read_to_string(&journal).unwrap();
    assert_eq!(lines.lines().count(), 2);
}

#[tokio::test]
async fn test_truncated_journal_line_is_corrupt() {
    let dir = TempDir::new().unwrap();
    let journal = dir.path().join("log.jsonl");
    let good = entry(json!("foo"), 1_699_000_000, 1_699_500_000).to_string();
    std::fs::write(&journal, format!("{good}\n{{\"subreddit\": \"foo\", \"total_res")).unwrap();
    let mut r = rig(ScriptedFetch::new(vec![empty_page()]), &journal);

    let err = r.executor.execute(&params(&["foo"])).await.unwrap_err();

    assert!(matches!(
        err,
        CrawlError::Journal(JournalError::Corrupt { line: 2, .. })
    ));
    assert!(r.fetch.queries().is_empty());
}
