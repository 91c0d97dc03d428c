//! Kinesis Firehose record sink

use async_trait::async_trait;
use aws_sdk_firehose::primitives::Blob;
use aws_sdk_firehose::types::Record as FirehoseRecord;
use aws_sdk_firehose::Client;
use tracing::debug;

use crate::sink::{RecordSink, SinkError};

/// Sends each batch as a single-record `PutRecordBatch` call
pub struct FirehoseSink {
    client: Client,
    delivery_stream: String,
}

impl FirehoseSink {
    /// Sink for `delivery_stream` using `client`
    pub fn new(client: Client, delivery_stream: impl Into<String>) -> Self {
        Self {
            client,
            delivery_stream: delivery_stream.into(),
        }
    }

    /// Build a client from the ambient AWS configuration
    pub async fn from_env(delivery_stream: impl Into<String>) -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::new(Client::new(&config), delivery_stream)
    }

    fn delivery_error(&self, message: impl Into<String>) -> SinkError {
        SinkError::Delivery {
            destination: self.delivery_stream.clone(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl RecordSink for FirehoseSink {
    fn destination(&self) -> &str {
        &self.delivery_stream
    }

    async fn put(&self, batch: Vec<u8>) -> Result<(), SinkError> {
        let size = batch.len();
        let record = FirehoseRecord::builder()
            .data(Blob::new(batch))
            .build()
            .map_err(|e| self.delivery_error(e.to_string()))?;

        let output = self
            .client
            .put_record_batch()
            .delivery_stream_name(&self.delivery_stream)
            .records(record)
            .send()
            .await
            .map_err(|e| self.delivery_error(e.into_service_error().to_string()))?;

        if output.failed_put_count() > 0 {
            let reason = output
                .request_responses()
                .iter()
                .find_map(|entry| entry.error_message())
                .unwrap_or("unknown error");
            return Err(SinkError::Rejected {
                destination: self.delivery_stream.clone(),
                failed: output.failed_put_count().max(0) as u32,
                reason: reason.to_string(),
            });
        }

        debug!(
            delivery_stream = %self.delivery_stream,
            bytes = size,
            "Batch accepted by Firehose"
        );
        Ok(())
    }
}
