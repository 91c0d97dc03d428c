//! Journal entry format
//!
//! One entry per committed page: the page metadata as Pushshift returned it,
//! plus the canonical subreddit key, the page watermarks and the retrieval
//! time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::fetcher::validate::{Page, PageMetadata};
use crate::journal::{JournalError, JournalResult};
use crate::SubredditFilter;

/// Format of `retrieved_from_pushshift`
pub const RETRIEVED_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Oldest and newest `created_utc` of a committed page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultTimestamps {
    /// Oldest record; the resume watermark
    pub min_created_utc: i64,
    /// Newest record
    pub max_created_utc: i64,
}

/// The `subreddit` field as written in the journal
///
/// The crawler writes the canonical comma-joined key. Lines written by other
/// tools may hold the list of names Pushshift echoes back; those are kept as
/// written so a read-then-write keeps the line intact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SubredditField {
    /// Comma-joined key
    Key(String),
    /// List of names, as written
    List(Vec<String>),
}

impl SubredditField {
    /// Canonical key used for journal matching
    pub fn key(&self) -> String {
        match self {
            SubredditField::Key(key) => key.clone(),
            SubredditField::List(names) => SubredditFilter::parse(names)
                .map(|filter| filter.key())
                .unwrap_or_default(),
        }
    }
}

impl From<&str> for SubredditField {
    fn from(key: &str) -> Self {
        SubredditField::Key(key.to_string())
    }
}

impl<'de> Deserialize<'de> for SubredditField {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::String(key) => Ok(SubredditField::Key(key)),
            Value::Array(items) => {
                let names: Vec<String> = items
                    .into_iter()
                    .map(|item| match item {
                        Value::String(name) => Ok(name),
                        other => Err(serde::de::Error::custom(format!(
                            "subreddit list holds a non-string: {other}"
                        ))),
                    })
                    .collect::<Result<_, _>>()?;
                SubredditFilter::parse(&names).map_err(serde::de::Error::custom)?;
                Ok(SubredditField::List(names))
            }
            other => Err(serde::de::Error::custom(format!(
                "subreddit must be a string or list, got {other}"
            ))),
        }
    }
}

/// One line of the metadata journal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Subreddit key the entry belongs to
    pub subreddit: SubredditField,
    /// Page watermarks
    pub last_result_timestamps: ResultTimestamps,
    /// UTC time the page was retrieved
    pub retrieved_from_pushshift: String,
    /// Remaining page metadata
    #[serde(flatten)]
    pub metadata: PageMetadata,
}

impl JournalEntry {
    /// Entry for a committed page
    pub fn from_page(page: &Page, subreddit_key: &str, retrieved_at: DateTime<Utc>) -> Self {
        let mut metadata = page.metadata.clone();
        // Owned by the entry itself; dropping them avoids duplicate keys on write
        for key in ["subreddit", "last_result_timestamps", "retrieved_from_pushshift"] {
            metadata.extra.remove(key);
        }

        Self {
            subreddit: subreddit_key.into(),
            last_result_timestamps: ResultTimestamps {
                min_created_utc: page.min_created_utc,
                max_created_utc: page.max_created_utc,
            },
            retrieved_from_pushshift: retrieved_at.format(RETRIEVED_AT_FORMAT).to_string(),
            metadata,
        }
    }

    /// Parse one journal line
    pub fn parse(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }

    /// Whether the entry belongs to the crawl keyed by `subreddit_key`
    pub fn matches(&self, subreddit_key: &str) -> bool {
        self.subreddit.key() == subreddit_key
    }

    /// Single-line JSON rendering, without the trailing newline
    pub fn to_line(&self) -> JournalResult<String> {
        serde_json::to_string(self).map_err(|e| JournalError::Serialization(e.to_string()))
    }
}
