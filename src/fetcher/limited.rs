//! Rate-limited fetcher decorator

use async_trait::async_trait;
use std::sync::Arc;

use crate::crawler::rate_limit::Throttle;
use crate::fetcher::http::RawResponse;
use crate::fetcher::query::PageQuery;
use crate::fetcher::{Fetch, FetcherResult};

/// Acquires a limiter slot before every logical request
///
/// Retries happen inside the wrapped fetcher, so one slot covers a request
/// and all of its retries.
pub struct RateLimitedFetcher<F: Fetch> {
    inner: F,
    limiter: Arc<dyn Throttle>,
}

impl<F: Fetch> RateLimitedFetcher<F> {
    /// Wrap `inner` behind `limiter`
    pub fn new(inner: F, limiter: Arc<dyn Throttle>) -> Self {
        Self { inner, limiter }
    }

    /// Wrapped fetcher
    pub fn inner(&self) -> &F {
        &self.inner
    }
}

#[async_trait]
impl<F: Fetch> Fetch for RateLimitedFetcher<F> {
    async fn get(&self, query: &PageQuery) -> FetcherResult<RawResponse> {
        self.limiter.acquire().await?;
        self.inner.get(query).await
    }
}
