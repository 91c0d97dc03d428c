use pushshift_crawler::config::{CliOverrides, ConfigError, ResolvedSettings, Settings};
use pushshift_crawler::PostKind;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

const FULL: &str = r#"
[local_log]
filename = "journals/reddit.jsonl"

[cloudwatch]
log_group = "reddit"
log_stream = "scraper"

[firehose]
test_destination = "reddit-test"
comments_destination = "reddit-comments"
submissions_destination = "reddit-submissions"

[pushshift]
base_url = "http://localhost:8080"
rate_limit_calls = 60
rate_limit_period_secs = 30

[retry]
max_attempts = 3
status_codes = [429, 503]
backoff_base_secs = 2
backoff_factor = 3
respect_retry_after = true
"#;

#[test]
fn full_settings_file_is_resolved() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.toml");
    std::fs::write(&path, FULL).unwrap();

    let settings = Settings::load_or_default(&path).unwrap();
    let resolved =
        ResolvedSettings::resolve(settings, &CliOverrides::default(), PostKind::Comments, false)
            .unwrap();

    assert_eq!(resolved.journal_path, PathBuf::from("journals/reddit.jsonl"));
    assert_eq!(resolved.firehose, "reddit-comments");
    assert_eq!(resolved.base_url, "http://localhost:8080");
    assert_eq!(resolved.rate_limit_calls, 60);
    assert_eq!(resolved.rate_limit_period, Duration::from_secs(30));
    assert_eq!(resolved.retry.max_attempts, 3);
    assert_eq!(resolved.retry.status_codes, vec![429, 503]);
    assert_eq!(resolved.retry.backoff(1), Duration::from_secs(6));
    assert!(resolved.retry.respect_retry_after);
    assert_eq!(
        resolved.cloudwatch.map(|c| (c.log_group, c.log_stream)),
        Some(("reddit".to_string(), "scraper".to_string()))
    );
}

#[test]
fn test_flag_routes_to_test_destination() {
    let settings = Settings::from_toml(FULL, "inline").unwrap();
    let resolved =
        ResolvedSettings::resolve(settings, &CliOverrides::default(), PostKind::Submissions, true)
            .unwrap();
    assert_eq!(resolved.firehose, "reddit-test");
}

#[test]
fn partial_retry_section_keeps_other_defaults() {
    let settings = Settings::from_toml("[retry]\nmax_attempts = 2\n", "inline").unwrap();
    assert_eq!(settings.retry.max_attempts, 2);
    assert_eq!(settings.retry.backoff_base_secs, 4);
    assert!(settings.retry.status_codes.contains(&522));
}

#[test]
fn unreadable_settings_path_is_an_error() {
    let dir = TempDir::new().unwrap();
    // A directory exists but cannot be read as a file
    let err = Settings::load_or_default(dir.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn wrong_value_type_is_a_parse_error() {
    let err = Settings::from_toml("[pushshift]\nrate_limit_calls = \"many\"\n", "inline").unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
}
