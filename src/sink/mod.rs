//! Record and log sinks
//!
//! A page's records are encoded as newline-delimited JSON and handed to a
//! [`RecordSink`] as one batch. [`SinkEmitter`] owns the delivery counters
//! and reports failures to the operator log before returning them.

use async_trait::async_trait;
use std::sync::Arc;

use crate::metrics;
use crate::Record;

pub mod firehose;
pub mod log;

pub use firehose::FirehoseSink;
pub use log::{CloudWatchLogSink, LogSink, SharedLogSink, TracingLogSink};

/// Sink errors
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// Record could not be serialised
    #[error("failed to encode record: {0}")]
    Encode(String),

    /// The destination could not be reached or refused the call
    #[error("delivery to {destination} failed: {message}")]
    Delivery {
        /// Stream or log coordinates
        destination: String,
        /// Error text
        message: String,
    },

    /// The call succeeded but records were rejected
    #[error("{failed} record(s) rejected by {destination}: {reason}")]
    Rejected {
        /// Stream name
        destination: String,
        /// Rejected record count
        failed: u32,
        /// First error reported
        reason: String,
    },
}

/// Destination for encoded page batches
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Destination name used in log messages
    fn destination(&self) -> &str;

    /// Submit one batch
    async fn put(&self, batch: Vec<u8>) -> Result<(), SinkError>;
}

/// Encode records as one JSON object per line with a trailing newline
pub fn encode_batch(records: &[Record]) -> Result<Vec<u8>, SinkError> {
    let mut batch = Vec::new();
    for record in records {
        serde_json::to_writer(&mut batch, record).map_err(|e| SinkError::Encode(e.to_string()))?;
        batch.push(b'\n');
    }
    Ok(batch)
}

/// Sends page records to a [`RecordSink`] and counts deliveries
pub struct SinkEmitter {
    sink: Arc<dyn RecordSink>,
    log: SharedLogSink,
    batches_sent: u64,
    records_sent: u64,
}

impl SinkEmitter {
    /// Emitter delivering to `sink` and reporting failures to `log`
    pub fn new(sink: Arc<dyn RecordSink>, log: SharedLogSink) -> Self {
        Self {
            sink,
            log,
            batches_sent: 0,
            records_sent: 0,
        }
    }

    /// Destination name of the underlying sink
    pub fn destination(&self) -> &str {
        self.sink.destination()
    }

    /// Batches delivered so far
    pub fn batches_sent(&self) -> u64 {
        self.batches_sent
    }

    /// Records delivered so far
    pub fn records_sent(&self) -> u64 {
        self.records_sent
    }

    /// Encode and deliver one page of records
    ///
    /// `params` is the JSON-serialised query that produced the page; it is
    /// included in the failure message.
    pub async fn send(&mut self, records: &[Record], params: &str) -> Result<(), SinkError> {
        let result = match encode_batch(records) {
            Ok(batch) => self.sink.put(batch).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                self.batches_sent += 1;
                self.records_sent += records.len() as u64;
                metrics::record_batch_sent(self.sink.destination());
                Ok(())
            }
            Err(e) => {
                metrics::record_batch_failed(self.sink.destination());
                self.log
                    .emit(&format!(
                        "ERROR: Failed to send results to firehose {} for query {}. Exception {}",
                        self.sink.destination(),
                        params,
                        e
                    ))
                    .await;
                Err(e)
            }
        }
    }
}
