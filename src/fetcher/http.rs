//! HTTP transport and the retrying page fetcher
//!
//! [`Transport`] performs exactly one GET; [`HttpFetcher`] wraps it with the
//! status-code retry policy and exponential backoff. Backoff sleeps go through
//! the injected clock, so retries are testable without waiting.

use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::clock::SharedClock;
use crate::fetcher::query::PageQuery;
use crate::fetcher::retry::RetryPolicy;
use crate::fetcher::retry_formatter::{RetryContext, RetryErrorType};
use crate::fetcher::{Fetch, FetcherError, FetcherResult};
use crate::metrics::{self, HttpRequestMetrics};

/// HTTP connect timeout (seconds)
const HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;
/// Overall request timeout (seconds); Pushshift searches can be slow
const HTTP_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Method used for every page request
const REQUEST_METHOD: &str = "GET";

/// Status and body of one HTTP exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body as text
    pub body: String,
    /// Numeric `Retry-After` header, when present
    pub retry_after: Option<u64>,
}

impl RawResponse {
    /// Response with the given status and body and no `Retry-After`
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            retry_after: None,
        }
    }

    /// Whether the status is 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Failure before any response was received
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    /// Classification for retry messages
    pub kind: RetryErrorType,
    /// Error text
    pub message: String,
}

/// A single HTTP GET without retries
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue `GET url?query`
    async fn get(
        &self,
        url: &str,
        query: &[(&'static str, String)],
    ) -> Result<RawResponse, TransportError>;
}

/// [`Transport`] backed by a pooled reqwest client
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Build a client with connect and request timeouts
    pub fn new() -> FetcherResult<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS))
            .user_agent(concat!("pushshift-crawler/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetcherError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Wrap an existing client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(
        &self,
        url: &str,
        query: &[(&'static str, String)],
    ) -> Result<RawResponse, TransportError> {
        let to_transport_error = |e: reqwest::Error| TransportError {
            kind: RetryErrorType::from_transport(e.is_timeout(), e.is_connect()),
            message: e.to_string(),
        };

        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(to_transport_error)?;

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let body = response.text().await.map_err(to_transport_error)?;

        Ok(RawResponse {
            status,
            body,
            retry_after,
        })
    }
}

/// Page fetcher applying the retry policy on top of a [`Transport`]
pub struct HttpFetcher<T: Transport> {
    transport: T,
    base_url: String,
    policy: RetryPolicy,
    clock: SharedClock,
}

impl<T: Transport> HttpFetcher<T> {
    /// Create a fetcher
    ///
    /// # Arguments
    /// * `transport` - Single-shot HTTP transport
    /// * `base_url` - Pushshift host, e.g. `https://api.pushshift.io`
    /// * `policy` - Retry policy
    /// * `clock` - Clock used for backoff sleeps
    pub fn new(
        transport: T,
        base_url: impl Into<String>,
        policy: RetryPolicy,
        clock: SharedClock,
    ) -> Self {
        Self {
            transport,
            base_url: base_url.into(),
            policy,
            clock,
        }
    }

    /// Base URL requests are issued against
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Retry policy in effect
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    fn max_attempts(&self) -> u32 {
        if self.policy.retries_method(REQUEST_METHOD) {
            self.policy.max_attempts.max(1)
        } else {
            1
        }
    }
}

#[async_trait]
impl<T: Transport> Fetch for HttpFetcher<T> {
    async fn get(&self, query: &PageQuery) -> FetcherResult<RawResponse> {
        let url = query.url(&self.base_url);
        let pairs = query.to_pairs();
        let max_attempts = self.max_attempts();

        debug!(url = %url, params = %query.to_json(), "Requesting page");

        let mut attempt: u32 = 0;
        loop {
            let request_metrics = HttpRequestMetrics::start(query.endpoint, attempt);

            let (error_type, retry_after, message, failure) =
                match self.transport.get(&url, &pairs).await {
                    Ok(response) => {
                        request_metrics.record_complete(response.status);

                        if response.is_success() {
                            return Ok(response);
                        }

                        if !self.policy.retries_status(response.status) {
                            return Err(FetcherError::Http {
                                status: response.status,
                                body: response.body,
                            });
                        }

                        let error_type = RetryErrorType::from_status(response.status);
                        let message = format!("HTTP {}", response.status);
                        let failure = FetcherError::Http {
                            status: response.status,
                            body: response.body,
                        };
                        (error_type, response.retry_after, message, failure)
                    }
                    Err(err) => {
                        request_metrics.record_network_error();
                        let failure = FetcherError::Network(err.message.clone());
                        (err.kind, None, err.message, failure)
                    }
                };

            attempt += 1;

            if attempt >= max_attempts {
                let ctx = RetryContext::new(
                    query,
                    url.as_str(),
                    attempt,
                    max_attempts,
                    error_type,
                    Duration::ZERO,
                    message.as_str(),
                );
                error!(
                    correlation_id = request_metrics.correlation_id(),
                    "{}",
                    ctx.format_failure()
                );

                // A single-attempt policy surfaces the underlying error unchanged
                if max_attempts == 1 {
                    return Err(failure);
                }
                return Err(FetcherError::Transport {
                    attempts: attempt,
                    message: failure.to_string(),
                });
            }

            let delay = self.policy.delay_for(attempt - 1, retry_after);
            let ctx = RetryContext::new(
                query,
                url.as_str(),
                attempt,
                max_attempts,
                error_type,
                delay,
                message.as_str(),
            );
            warn!(
                correlation_id = request_metrics.correlation_id(),
                attempt = attempt,
                backoff_secs = delay.as_secs(),
                "{}",
                ctx.format_retry()
            );
            metrics::record_retry_backoff(delay, attempt);
            self.clock.sleep(delay).await;
        }
    }
}
