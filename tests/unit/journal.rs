use pushshift_crawler::journal::{JournalAppender, JournalEntry, JournalError, JournalView};
use serde_json::json;
use tempfile::TempDir;

fn line(subreddit: &str, min: i64, max: i64) -> String {
    json!({
        "subreddit": subreddit,
        "total_results": 10,
        "timed_out": false,
        "shards": { "failed": 0, "skipped": 0, "total": 4, "successful": 4 },
        "after": null,
        "last_result_timestamps": { "min_created_utc": min, "max_created_utc": max },
        "retrieved_from_pushshift": "2023-11-14T22:13:20Z"
    })
    .to_string()
}

#[test]
fn entry_reserializes_to_same_object() {
    let original = line("foo", 100, 200);
    let entry = JournalEntry::parse(&original).unwrap();

    let reparsed: serde_json::Value = serde_json::from_str(&entry.to_line().unwrap()).unwrap();
    let expected: serde_json::Value = serde_json::from_str(&original).unwrap();
    assert_eq!(reparsed, expected);
}

#[test]
fn view_of_missing_file_is_empty() {
    let dir = TempDir::new().unwrap();
    let view = JournalView::open(dir.path().join("nope.jsonl"), "foo").unwrap();

    assert!(!view.exists());
    assert_eq!(view.resume_watermark(), None);
    assert_eq!(view.entries_scanned(), 0);
}

#[test]
fn view_skips_blank_lines() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("log.jsonl");
    std::fs::write(&path, format!("{}\n\n{}\n", line("foo", 100, 200), line("foo", 50, 90))).unwrap();

    let view = JournalView::open(&path, "foo").unwrap();
    assert_eq!(view.entries_scanned(), 2);
    assert_eq!(view.resume_watermark(), Some(50));
}

#[test]
fn corrupt_line_reports_its_number() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("log.jsonl");
    std::fs::write(&path, format!("{}\nnot json\n", line("foo", 100, 200))).unwrap();

    let err = JournalView::open(&path, "foo").unwrap_err();
    assert!(matches!(err, JournalError::Corrupt { line: 2, .. }));
}

#[test]
fn appender_creates_parent_directories() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("deeper").join("log.jsonl");
    let mut appender = JournalAppender::new(&path, "foo");

    appender
        .append_entry(&JournalEntry::parse(&line("foo", 1, 2)).unwrap())
        .unwrap();
    appender
        .append_entry(&JournalEntry::parse(&line("foo", 0, 1)).unwrap())
        .unwrap();

    assert_eq!(appender.appended(), 2);
    let view = JournalView::open(&path, "foo").unwrap();
    assert_eq!(view.entries_scanned(), 2);
    assert_eq!(view.resume_watermark(), Some(0));
}
