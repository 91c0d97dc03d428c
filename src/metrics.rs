//! Crawl observability metrics
//!
//! Counters and histograms for Pushshift requests, retries, limiter waits,
//! committed pages and Firehose batches. Recording is always cheap: without
//! an installed exporter the `metrics` macros are no-ops, so the crawler
//! only exposes a Prometheus endpoint when `--metrics_addr` is given.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::OnceCell;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

static METRICS_ADDR: OnceCell<SocketAddr> = OnceCell::new();

static CORRELATION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Install the Prometheus exporter and describe the crawl metrics
///
/// Idempotent: a second call is a no-op.
///
/// # Arguments
/// * `addr` - Socket address for the scrape endpoint (e.g. "0.0.0.0:9090")
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    if let Some(existing) = METRICS_ADDR.get() {
        debug!(addr = %existing, "Metrics already initialized, skipping");
        return Ok(());
    }

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        "pushshift_requests_total",
        Unit::Count,
        "Total number of HTTP requests made to Pushshift"
    );
    describe_histogram!(
        "pushshift_request_duration_seconds",
        Unit::Seconds,
        "Pushshift request duration in seconds"
    );
    describe_counter!(
        "pushshift_retries_total",
        Unit::Count,
        "Total number of retried Pushshift requests"
    );
    describe_histogram!(
        "retry_backoff_duration_seconds",
        Unit::Seconds,
        "Backoff slept before a retry"
    );
    describe_histogram!(
        "rate_limit_wait_seconds",
        Unit::Seconds,
        "Time spent waiting for the client-side rate limiter"
    );
    describe_counter!(
        "pages_committed_total",
        Unit::Count,
        "Pages delivered to the sink and journaled"
    );
    describe_counter!(
        "records_committed_total",
        Unit::Count,
        "Records delivered to the sink"
    );
    describe_counter!(
        "firehose_batches_total",
        Unit::Count,
        "Firehose batch submissions by outcome"
    );

    let _ = METRICS_ADDR.set(addr);
    info!(addr = %addr, "Metrics exporter listening");
    Ok(())
}

/// Whether the exporter has been installed
pub fn is_initialized() -> bool {
    METRICS_ADDR.get().is_some()
}

/// New correlation ID for tying request logs together
pub fn next_correlation_id() -> String {
    let id = CORRELATION_COUNTER.fetch_add(1, Ordering::Relaxed) + 1;
    format!("req-{id:08x}")
}

/// Timing for a single Pushshift request attempt
pub struct HttpRequestMetrics {
    endpoint: &'static str,
    start_time: Instant,
    correlation_id: String,
    attempt: u32,
}

impl HttpRequestMetrics {
    /// Start timing an attempt against `endpoint`
    pub fn start(endpoint: &'static str, attempt: u32) -> Self {
        let correlation_id = next_correlation_id();

        debug!(
            correlation_id = %correlation_id,
            endpoint = endpoint,
            attempt = attempt,
            "Starting Pushshift request"
        );

        Self {
            endpoint,
            start_time: Instant::now(),
            correlation_id,
            attempt,
        }
    }

    /// Record a response with `status_code`
    pub fn record_complete(&self, status_code: u16) {
        let duration = self.start_time.elapsed();

        counter!(
            "pushshift_requests_total",
            "endpoint" => self.endpoint,
            "status" => status_code.to_string(),
        )
        .increment(1);

        histogram!(
            "pushshift_request_duration_seconds",
            "endpoint" => self.endpoint,
        )
        .record(duration.as_secs_f64());

        if status_code == 429 {
            warn!(
                correlation_id = %self.correlation_id,
                endpoint = self.endpoint,
                attempt = self.attempt,
                "Pushshift returned 429 Too Many Requests"
            );
        }

        debug!(
            correlation_id = %self.correlation_id,
            endpoint = self.endpoint,
            status = status_code,
            duration_ms = duration.as_millis() as u64,
            "Pushshift request completed"
        );
    }

    /// Record a transport failure (no status code)
    pub fn record_network_error(&self) {
        counter!(
            "pushshift_requests_total",
            "endpoint" => self.endpoint,
            "status" => "network_error",
        )
        .increment(1);

        debug!(
            correlation_id = %self.correlation_id,
            endpoint = self.endpoint,
            attempt = self.attempt,
            duration_ms = self.start_time.elapsed().as_millis() as u64,
            "Pushshift request failed before a response"
        );
    }

    /// Correlation ID of this attempt
    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }
}

/// Record a backoff slept before retry number `attempt`
pub fn record_retry_backoff(duration: Duration, attempt: u32) {
    counter!("pushshift_retries_total").increment(1);
    histogram!(
        "retry_backoff_duration_seconds",
        "attempt" => attempt.to_string(),
    )
    .record(duration.as_secs_f64());
}

/// Record time spent in the rate limiter
pub fn record_rate_limit_wait(duration: Duration) {
    histogram!("rate_limit_wait_seconds").record(duration.as_secs_f64());
}

/// Record a committed page of `records` records
pub fn record_page_committed(records: usize) {
    counter!("pages_committed_total").increment(1);
    counter!("records_committed_total").increment(records as u64);
}

/// Record a successful Firehose batch
pub fn record_batch_sent(destination: &str) {
    counter!(
        "firehose_batches_total",
        "destination" => destination.to_string(),
        "outcome" => "sent",
    )
    .increment(1);
}

/// Record a failed Firehose batch
pub fn record_batch_failed(destination: &str) {
    counter!(
        "firehose_batches_total",
        "destination" => destination.to_string(),
        "outcome" => "failed",
    )
    .increment(1);
}
