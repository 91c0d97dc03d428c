//! Operator log sinks
//!
//! Operator-facing messages (parameters, resume decisions, warnings,
//! progress, final summary) go through [`LogSink`]. Every implementation
//! mirrors the message to `tracing` so a local run always shows them.

use async_trait::async_trait;
use aws_sdk_cloudwatchlogs::types::InputLogEvent;
use aws_sdk_cloudwatchlogs::Client;
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::sink::SinkError;

/// Shared handle to a log sink
pub type SharedLogSink = Arc<dyn LogSink>;

/// Destination for operator messages
///
/// `emit` never fails: delivery problems are reported through `tracing`
/// and the crawl carries on.
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Record one message
    async fn emit(&self, message: &str);
}

/// Mirror a message to `tracing`, at a level picked from its prefix
pub fn trace_message(message: &str) {
    if message.starts_with("ERROR") {
        error!(target: "pushshift_crawler::operator", "{message}");
    } else if message.starts_with("WARNING") {
        warn!(target: "pushshift_crawler::operator", "{message}");
    } else {
        info!(target: "pushshift_crawler::operator", "{message}");
    }
}

/// Log sink that only writes to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogSink;

impl TracingLogSink {
    /// Shared instance
    pub fn shared() -> SharedLogSink {
        Arc::new(TracingLogSink)
    }
}

#[async_trait]
impl LogSink for TracingLogSink {
    async fn emit(&self, message: &str) {
        trace_message(message);
    }
}

/// Log sink sending each message as one CloudWatch Logs event
pub struct CloudWatchLogSink {
    client: Client,
    log_group: String,
    log_stream: String,
}

impl CloudWatchLogSink {
    /// Sink writing to an existing log group
    pub fn new(client: Client, log_group: impl Into<String>, log_stream: impl Into<String>) -> Self {
        Self {
            client,
            log_group: log_group.into(),
            log_stream: log_stream.into(),
        }
    }

    /// Build a client from the ambient AWS configuration and ensure the stream exists
    pub async fn from_env(
        log_group: impl Into<String>,
        log_stream: impl Into<String>,
    ) -> Result<Self, SinkError> {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let sink = Self::new(Client::new(&config), log_group, log_stream);
        let message = if sink.ensure_stream().await? {
            format!("Created log stream {}.", sink.log_stream)
        } else {
            format!("Log stream {} already exists.", sink.log_stream)
        };
        sink.emit(&message).await;
        Ok(sink)
    }

    /// Log group name
    pub fn log_group(&self) -> &str {
        &self.log_group
    }

    /// Log stream name
    pub fn log_stream(&self) -> &str {
        &self.log_stream
    }

    /// Create the log stream; returns `false` when it already existed
    pub async fn ensure_stream(&self) -> Result<bool, SinkError> {
        let result = self
            .client
            .create_log_stream()
            .log_group_name(&self.log_group)
            .log_stream_name(&self.log_stream)
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_resource_already_exists_exception() {
                    Ok(false)
                } else {
                    Err(SinkError::Delivery {
                        destination: format!("{}/{}", self.log_group, self.log_stream),
                        message: service_err.to_string(),
                    })
                }
            }
        }
    }

    async fn put(&self, message: &str) -> Result<(), String> {
        let event = InputLogEvent::builder()
            .timestamp(Utc::now().timestamp_millis())
            .message(message)
            .build()
            .map_err(|e| e.to_string())?;

        self.client
            .put_log_events()
            .log_group_name(&self.log_group)
            .log_stream_name(&self.log_stream)
            .log_events(event)
            .send()
            .await
            .map_err(|e| e.into_service_error().to_string())?;
        Ok(())
    }
}

#[async_trait]
impl LogSink for CloudWatchLogSink {
    async fn emit(&self, message: &str) {
        trace_message(message);

        if let Err(e) = self.put(message).await {
            warn!(
                log_group = %self.log_group,
                log_stream = %self.log_stream,
                error = %e,
                "Failed to send message to CloudWatch"
            );
        }
    }
}
