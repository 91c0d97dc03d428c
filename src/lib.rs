//! # Pushshift Crawler Library
//!
//! A resumable, rate-limited crawler that harvests Reddit submissions or comments
//! from the Pushshift search API and streams them to a Kinesis Firehose delivery
//! stream as newline-delimited JSON.
//!
//! ## Features
//!
//! - **Backwards pagination**: Walks the `created_utc`-descending result stream,
//!   using the oldest record of each page as the `before` watermark of the next
//! - **Resume Capability**: Per-page metadata journal so an interrupted crawl
//!   continues from the last committed watermark
//! - **Rate Limiting**: Sliding-window client-side request budget
//! - **Retry Policy**: Configurable status-code retry with exponential backoff
//! - **Remote Logging**: Operator messages mirrored to CloudWatch Logs
//!
//! ## Quick Start
//!
//! ```no_run
//! use pushshift_crawler::fetcher::CrawlParams;
//! use pushshift_crawler::{PostKind, SubredditFilter};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let filter = SubredditFilter::parse(["r/rust", "learnrust"])?;
//! let params = CrawlParams::new(PostKind::Submissions, filter)
//!     .with_before(Some(1_700_000_000))
//!     .with_size(100);
//! assert_eq!(params.filter().key(), "learnrust,rust");
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`clock`] - Monotonic time source used by the limiter and backoff
//! - [`fetcher`] - Query building, HTTP retry, rate-limited fetching, page validation
//! - [`crawler`] - Pagination state machine and the orchestrator around it
//! - [`journal`] - Append-only metadata journal and resume-watermark lookup
//! - [`sink`] - Record batches to Firehose, operator messages to CloudWatch
//! - [`config`] - Settings file merged with command-line overrides
//! - [`cli`] - Command-line interface

#![warn(missing_docs)]
#![warn(clippy::all)]

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// CLI command implementation
pub mod cli;

/// Time sources
pub mod clock;

/// Settings file and CLI merge
pub mod config;

/// Pagination controller and orchestration
pub mod crawler;

/// Page fetching and validation
pub mod fetcher;

/// Append-only metadata journal
pub mod journal;

/// Observability metrics
pub mod metrics;

/// Graceful shutdown coordination shared across modules
pub mod shutdown;

/// Record and log sinks
pub mod sink;

/// A single Reddit submission or comment as returned by Pushshift.
///
/// Records are passed through untouched; only `created_utc` is interpreted.
pub type Record = serde_json::Value;

/// Read the `created_utc` epoch-seconds field of a record.
///
/// Pushshift occasionally serialises timestamps as floats; those are truncated.
pub fn created_utc(record: &Record) -> Option<i64> {
    let value = record.get("created_utc")?;
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|secs| secs as i64))
}

/// Kind of Reddit post to crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostKind {
    /// Link and self posts
    Submissions,
    /// Comments
    Comments,
}

impl PostKind {
    /// Pushshift search endpoint segment for this post kind
    pub fn endpoint(&self) -> &'static str {
        match self {
            PostKind::Submissions => "submission",
            PostKind::Comments => "comment",
        }
    }
}

impl std::fmt::Display for PostKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PostKind::Submissions => "submissions",
            PostKind::Comments => "comments",
        };
        write!(f, "{s}")
    }
}

impl FromStr for PostKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "submissions" => Ok(PostKind::Submissions),
            "comments" => Ok(PostKind::Comments),
            _ => Err(format!(
                "Invalid post type: {s}. Valid options: submissions, comments"
            )),
        }
    }
}

/// Canonical subreddit filter.
///
/// Names are trimmed, stripped of a leading `r/` or `/r/`, lowercased,
/// de-duplicated and sorted, so the same set of subreddits always produces
/// the same comma-joined [`key`](SubredditFilter::key) regardless of the
/// order the operator typed them in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubredditFilter {
    names: Vec<String>,
}

impl SubredditFilter {
    /// Canonicalise a list of subreddit names
    pub fn parse<I, S>(names: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut canonical = Vec::new();
        for raw in names {
            let raw = raw.as_ref();
            let name = canonical_name(raw);
            if name.is_empty() {
                return Err(format!("Invalid subreddit name: {raw:?}"));
            }
            canonical.push(name);
        }

        if canonical.is_empty() {
            return Err("At least one subreddit is required".to_string());
        }

        canonical.sort();
        canonical.dedup();
        Ok(Self { names: canonical })
    }

    /// Canonical names in sorted order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Comma-joined key used for the query and for journal matching
    pub fn key(&self) -> String {
        self.names.join(",")
    }
}

impl std::fmt::Display for SubredditFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

fn canonical_name(raw: &str) -> String {
    let trimmed = raw.trim();
    let lowered = trimmed.to_lowercase();
    let stripped = lowered
        .strip_prefix("/r/")
        .or_else(|| lowered.strip_prefix("r/"))
        .unwrap_or(&lowered);
    stripped.trim_matches('/').to_string()
}
