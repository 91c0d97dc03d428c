//! Page fetching: query construction, retrying HTTP, rate limiting and validation

use async_trait::async_trait;

use crate::crawler::rate_limit::RateLimitError;

pub mod http;
pub mod limited;
pub mod query;
pub mod retry;
pub mod retry_formatter;
pub mod validate;

pub use http::{HttpFetcher, RawResponse, ReqwestTransport, Transport, TransportError};
pub use limited::RateLimitedFetcher;
pub use query::{CrawlParams, PageQuery, DEFAULT_BASE_URL};
pub use retry::RetryPolicy;
pub use validate::{Page, PageMetadata, PageWarning, ResponseValidator, ValidationError};

/// Fetcher errors
#[derive(Debug, thiserror::Error)]
pub enum FetcherError {
    /// Connection, DNS, TLS or timeout failure
    #[error("network error: {0}")]
    Network(String),

    /// Retries exhausted
    #[error("request failed after {attempts} attempts: {message}")]
    Transport {
        /// Attempts made
        attempts: u32,
        /// Last failure
        message: String,
    },

    /// Non-retryable non-2xx response
    #[error("HTTP {status}: {body}")]
    Http {
        /// Status code
        status: u16,
        /// Response body
        body: String,
    },

    /// Rate limiter failure
    #[error(transparent)]
    RateLimit(#[from] RateLimitError),
}

/// Result type for fetcher operations
pub type FetcherResult<T> = Result<T, FetcherError>;

/// Issues the HTTP request for one page
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Fetch the raw response for `query`
    async fn get(&self, query: &PageQuery) -> FetcherResult<RawResponse>;
}

#[async_trait]
impl<F: Fetch + ?Sized> Fetch for std::sync::Arc<F> {
    async fn get(&self, query: &PageQuery) -> FetcherResult<RawResponse> {
        (**self).get(query).await
    }
}
