//! Crawl parameters and Pushshift query construction

use serde::Serialize;

use crate::crawler::config::DEFAULT_PAGE_SIZE;
use crate::{PostKind, SubredditFilter};

/// Production Pushshift API host
pub const DEFAULT_BASE_URL: &str = "https://api.pushshift.io";

/// Immutable parameters of one crawl invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlParams {
    kind: PostKind,
    filter: SubredditFilter,
    before: Option<i64>,
    after: Option<i64>,
    size: u8,
    test: bool,
    no_resume: bool,
}

impl CrawlParams {
    /// Parameters with no time bounds and the default page size
    pub fn new(kind: PostKind, filter: SubredditFilter) -> Self {
        Self {
            kind,
            filter,
            before: None,
            after: None,
            size: DEFAULT_PAGE_SIZE,
            test: false,
            no_resume: false,
        }
    }

    /// Set the upper bound (epoch seconds)
    pub fn with_before(mut self, before: Option<i64>) -> Self {
        self.before = before;
        self
    }

    /// Set the lower bound (epoch seconds)
    pub fn with_after(mut self, after: Option<i64>) -> Self {
        self.after = after;
        self
    }

    /// Set the page size
    pub fn with_size(mut self, size: u8) -> Self {
        self.size = size;
        self
    }

    /// Enable the test request budget
    pub fn with_test(mut self, test: bool) -> Self {
        self.test = test;
        self
    }

    /// Disable resuming from the journal
    pub fn with_no_resume(mut self, no_resume: bool) -> Self {
        self.no_resume = no_resume;
        self
    }

    /// Post kind
    pub fn kind(&self) -> PostKind {
        self.kind
    }

    /// Subreddit filter
    pub fn filter(&self) -> &SubredditFilter {
        &self.filter
    }

    /// Upper bound
    pub fn before(&self) -> Option<i64> {
        self.before
    }

    /// Lower bound
    pub fn after(&self) -> Option<i64> {
        self.after
    }

    /// Page size
    pub fn size(&self) -> u8 {
        self.size
    }

    /// Whether this is a test crawl
    pub fn test(&self) -> bool {
        self.test
    }

    /// Whether resume from the journal is disabled
    pub fn no_resume(&self) -> bool {
        self.no_resume
    }

    /// Query for the first page of the crawl
    pub fn first_query(&self) -> PageQuery {
        PageQuery {
            endpoint: self.kind.endpoint(),
            subreddit: self.filter.key(),
            size: self.size,
            sort: "desc",
            sort_type: "created_utc",
            metadata: true,
            before: self.before,
            after: self.after,
        }
    }
}

/// Query parameters of a single page request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageQuery {
    /// Search endpoint segment (`comment` or `submission`)
    #[serde(skip)]
    pub endpoint: &'static str,
    /// Comma-joined canonical subreddit key
    pub subreddit: String,
    /// Records per page
    pub size: u8,
    /// Sort direction
    pub sort: &'static str,
    /// Sort field
    pub sort_type: &'static str,
    /// Ask Pushshift to include result metadata
    pub metadata: bool,
    /// Upper bound; each next page reuses the previous page's oldest timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<i64>,
    /// Lower bound, preserved across all pages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<i64>,
}

impl PageQuery {
    /// Same query with a new upper bound
    pub fn with_before(&self, before: i64) -> Self {
        Self {
            before: Some(before),
            ..self.clone()
        }
    }

    /// Search URL for this query under `base_url`
    pub fn url(&self, base_url: &str) -> String {
        format!(
            "{}/reddit/{}/search",
            base_url.trim_end_matches('/'),
            self.endpoint
        )
    }

    /// Query string pairs, omitting unset bounds
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("subreddit", self.subreddit.clone()),
            ("size", self.size.to_string()),
            ("sort", self.sort.to_string()),
            ("sort_type", self.sort_type.to_string()),
            ("metadata", self.metadata.to_string()),
        ];

        if let Some(before) = self.before {
            pairs.push(("before", before.to_string()));
        }

        if let Some(after) = self.after {
            pairs.push(("after", after.to_string()));
        }

        pairs
    }

    /// JSON rendering used in log and error messages
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}"))
    }
}
