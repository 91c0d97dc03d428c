//! Pushshift response validation
//!
//! Turns a raw response body into a [`Page`]: checks the presence invariants,
//! collects shard-health warnings and derives the page watermarks.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::fetcher::query::PageQuery;
use crate::{created_utc, Record};

/// Shard health reported by Pushshift
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShardStats {
    /// Shards that failed to answer
    #[serde(default)]
    pub failed: u64,
    /// Shards skipped by the search
    #[serde(default)]
    pub skipped: u64,
    /// Total shards queried
    #[serde(default)]
    pub total: u64,
    /// Remaining fields (e.g. `successful`), passed through
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Metadata block of a Pushshift page
///
/// Only the fields the crawler acts on are typed; everything else Pushshift
/// returns is kept in `extra` so it lands in the journal unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageMetadata {
    /// Whether the search timed out on the server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timed_out: Option<bool>,
    /// Number of results matching the query
    pub total_results: u64,
    /// Shard health
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shards: Option<ShardStats>,
    /// Pass-through fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PageMetadata {
    /// Indented JSON used in operator log messages
    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| format!("{self:?}"))
    }
}

/// Non-fatal condition reported alongside a page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageWarning {
    /// `metadata.timed_out` was true
    TimedOut,
    /// Some shards failed
    FailedShards(u64),
    /// Some shards were skipped
    SkippedShards(u64),
}

impl std::fmt::Display for PageWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PageWarning::TimedOut => write!(f, "WARNING: Search timed out"),
            PageWarning::FailedShards(n) => write!(f, "WARNING: Failed shards: {n}"),
            PageWarning::SkippedShards(n) => write!(f, "WARNING: Skipped shards: {n}"),
        }
    }
}

/// One validated response from Pushshift
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// Records, newest first
    pub data: Vec<Record>,
    /// Page metadata
    pub metadata: PageMetadata,
    /// Endpoint the page was fetched from
    pub endpoint: &'static str,
    /// Query that produced the page
    pub request_params: PageQuery,
    /// `created_utc` of the last (oldest) record
    pub min_created_utc: i64,
    /// `created_utc` of the first (newest) record
    pub max_created_utc: i64,
    /// Shard-health and timeout warnings
    pub warnings: Vec<PageWarning>,
}

/// Page validation errors
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// Body is not JSON or has an unexpected shape
    #[error("malformed response: {0}")]
    Malformed(String),

    /// No `metadata` object in the response
    #[error("no metadata returned")]
    NoMetadata,

    /// No `data` array in the response
    #[error("no data returned")]
    NoData,

    /// The source has no further results
    #[error("no results returned (total_results = {})", .0.total_results)]
    Empty(Box<PageMetadata>),
}

impl ValidationError {
    /// Whether this error is the end-of-stream signal rather than a failure
    pub fn is_empty(&self) -> bool {
        matches!(self, ValidationError::Empty(_))
    }
}

/// Validates raw response bodies into pages
#[derive(Debug, Default, Clone, Copy)]
pub struct ResponseValidator;

impl ResponseValidator {
    /// Create a validator
    pub fn new() -> Self {
        Self
    }

    /// Validate a response body produced by `query`
    pub fn validate(&self, body: &str, query: &PageQuery) -> Result<Page, ValidationError> {
        let mut root: Value = serde_json::from_str(body)
            .map_err(|e| ValidationError::Malformed(format!("response is not JSON: {e}")))?;

        let object = root
            .as_object_mut()
            .ok_or_else(|| ValidationError::Malformed("response is not a JSON object".to_string()))?;

        let metadata = match object.remove("metadata") {
            None | Some(Value::Null) => return Err(ValidationError::NoMetadata),
            Some(value) => value,
        };

        let data = match object.remove("data") {
            None | Some(Value::Null) => return Err(ValidationError::NoData),
            Some(Value::Array(records)) => records,
            Some(other) => {
                return Err(ValidationError::Malformed(format!(
                    "data is not an array: {other}"
                )))
            }
        };

        let metadata: PageMetadata = serde_json::from_value(metadata)
            .map_err(|e| ValidationError::Malformed(format!("invalid metadata: {e}")))?;

        // A page without records cannot move the watermark, so it ends the stream too
        if metadata.total_results == 0 || data.is_empty() {
            return Err(ValidationError::Empty(Box::new(metadata)));
        }

        let warnings = collect_warnings(&metadata);

        let (max_created_utc, min_created_utc) = watermarks(&data)?;

        Ok(Page {
            data,
            metadata,
            endpoint: query.endpoint,
            request_params: query.clone(),
            min_created_utc,
            max_created_utc,
            warnings,
        })
    }
}

fn collect_warnings(metadata: &PageMetadata) -> Vec<PageWarning> {
    let mut warnings = Vec::new();

    if metadata.timed_out == Some(true) {
        warnings.push(PageWarning::TimedOut);
    }

    if let Some(shards) = &metadata.shards {
        if shards.failed > 0 {
            warnings.push(PageWarning::FailedShards(shards.failed));
        }
        if shards.skipped > 0 {
            warnings.push(PageWarning::SkippedShards(shards.skipped));
        }
    }

    warnings
}

/// `(max, min)` from the first and last records
fn watermarks(data: &[Record]) -> Result<(i64, i64), ValidationError> {
    let (first, last) = match (data.first(), data.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Err(ValidationError::Malformed("data is empty".to_string())),
    };

    let max = created_utc(first).ok_or_else(|| {
        ValidationError::Malformed("first record has no numeric created_utc".to_string())
    })?;
    let min = created_utc(last).ok_or_else(|| {
        ValidationError::Malformed("last record has no numeric created_utc".to_string())
    })?;

    if max < min {
        return Err(ValidationError::Malformed(format!(
            "records are not sorted by created_utc descending (first {max}, last {min})"
        )));
    }

    Ok((max, min))
}
