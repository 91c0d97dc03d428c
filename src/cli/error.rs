//! CLI error types and conversions

use crate::config::ConfigError;
use crate::crawler::CrawlError;
use crate::fetcher::FetcherError;
use crate::sink::SinkError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Settings could not be resolved
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Crawl stopped on a terminal error
    #[error("crawl error: {0}")]
    Crawl(#[from] CrawlError),

    /// Sink could not be set up
    #[error("sink error: {0}")]
    Sink(#[from] SinkError),

    /// HTTP client could not be built
    #[error("fetcher error: {0}")]
    Fetcher(#[from] FetcherError),

    /// Invalid argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Prometheus exporter failed to start
    #[error("metrics error: {0}")]
    Metrics(String),
}

impl CliError {
    /// Process exit status for this error
    pub fn exit_code(&self) -> i32 {
        1
    }
}
