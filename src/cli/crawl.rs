//! Crawl command implementation

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::clock::SystemClock;
use crate::config::{CliOverrides, ConfigError, ResolvedSettings, Settings, DEFAULT_SETTINGS_FILE};
use crate::crawler::config::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::crawler::{CrawlExecutor, CrawlOutcome, PaginationController, RateLimiter};
use crate::fetcher::{CrawlParams, HttpFetcher, RateLimitedFetcher, ReqwestTransport};
use crate::metrics;
use crate::shutdown::SharedShutdown;
use crate::sink::{CloudWatchLogSink, FirehoseSink, SharedLogSink, SinkEmitter, TracingLogSink};
use crate::{PostKind, SubredditFilter};

use super::CliError;

/// Pushshift crawler CLI
#[derive(Parser, Debug, Clone)]
#[command(name = "pushshift-crawler")]
#[command(about = "Crawl Reddit posts from Pushshift into a Firehose delivery stream", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Post type to crawl: submissions or comments
    pub post_type: PostKind,

    /// One or more subreddit names (with or without the r/ prefix)
    #[arg(required = true, num_args = 1..)]
    pub subreddits: Vec<String>,

    /// Only return posts created after this UNIX timestamp
    #[arg(long)]
    pub after: Option<i64>,

    /// Only return posts created before this UNIX timestamp
    #[arg(long)]
    pub before: Option<i64>,

    /// Results per request (1-100)
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE, value_parser = clap::value_parser!(u8).range(1..=MAX_PAGE_SIZE as i64))]
    pub size: u8,

    /// Metadata journal file
    #[arg(long = "local_log")]
    pub local_log: Option<PathBuf>,

    /// CloudWatch log group for operator messages
    #[arg(long = "cloudwatch_log_group")]
    pub cloudwatch_log_group: Option<String>,

    /// CloudWatch log stream for operator messages
    #[arg(long = "cloudwatch_log_stream")]
    pub cloudwatch_log_stream: Option<String>,

    /// Firehose delivery stream receiving the records
    #[arg(long)]
    pub firehose: Option<String>,

    /// Ignore the journal's watermark and start from --before
    #[arg(long = "no_resume", default_value_t = false)]
    pub no_resume: bool,

    /// Stop after 10 requests and send to the test destination
    #[arg(long, default_value_t = false)]
    pub test: bool,

    /// Settings file
    #[arg(long, default_value = DEFAULT_SETTINGS_FILE)]
    pub config: PathBuf,

    /// Serve Prometheus metrics on this address
    #[arg(long = "metrics_addr")]
    pub metrics_addr: Option<SocketAddr>,
}

impl Cli {
    /// Values that override the settings file
    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            local_log: self.local_log.clone(),
            cloudwatch_log_group: self.cloudwatch_log_group.clone(),
            cloudwatch_log_stream: self.cloudwatch_log_stream.clone(),
            firehose: self.firehose.clone(),
        }
    }

    /// Crawl parameters from the command line
    pub fn crawl_params(&self) -> Result<CrawlParams, CliError> {
        let filter = SubredditFilter::parse(&self.subreddits)
            .map_err(|e| CliError::Config(ConfigError::Invalid(e)))?;

        if let (Some(after), Some(before)) = (self.after, self.before) {
            if after >= before {
                return Err(CliError::InvalidArgument(format!(
                    "--after {after} must be less than --before {before}"
                )));
            }
        }

        Ok(CrawlParams::new(self.post_type, filter)
            .with_before(self.before)
            .with_after(self.after)
            .with_size(self.size)
            .with_test(self.test)
            .with_no_resume(self.no_resume))
    }

    /// Resolve settings, wire the crawl and run it
    pub async fn execute(&self, shutdown: SharedShutdown) -> Result<CrawlOutcome, CliError> {
        let params = self.crawl_params()?;
        let settings = Settings::load_or_default(&self.config)?;
        let resolved =
            ResolvedSettings::resolve(settings, &self.overrides(), params.kind(), params.test())?;

        if let Some(addr) = self.metrics_addr {
            metrics::init_metrics(addr).map_err(CliError::Metrics)?;
            info!(%addr, "Prometheus exporter listening");
        }

        let log: SharedLogSink = match &resolved.cloudwatch {
            Some(target) => Arc::new(
                CloudWatchLogSink::from_env(target.log_group.clone(), target.log_stream.clone())
                    .await?,
            ),
            None => TracingLogSink::shared(),
        };
        log.emit(&parameter_banner(&params, &resolved)).await;

        let clock = SystemClock::shared();
        let limiter = RateLimiter::new(
            resolved.rate_limit_calls,
            resolved.rate_limit_period,
            clock.clone(),
        )
        .map_err(|e| CliError::Config(ConfigError::Invalid(e.to_string())))?;
        let fetcher = RateLimitedFetcher::new(
            HttpFetcher::new(
                ReqwestTransport::new()?,
                resolved.base_url.clone(),
                resolved.retry.clone(),
                clock.clone(),
            ),
            Arc::new(limiter),
        );

        let controller =
            PaginationController::new(fetcher, log.clone(), clock).with_shutdown(shutdown);
        let sink = FirehoseSink::from_env(resolved.firehose.clone()).await;
        let emitter = SinkEmitter::new(Arc::new(sink), log.clone());

        let mut executor = CrawlExecutor::new(controller, emitter, &resolved.journal_path, log);
        let report = executor.execute(&params).await?;

        info!(
            outcome = ?report.outcome,
            requests = report.progress.requests,
            batches = report.batches_sent,
            records = report.records_sent,
            "Crawl finished"
        );
        Ok(report.outcome)
    }
}

/// Startup message listing every resolved parameter
pub fn parameter_banner(params: &CrawlParams, settings: &ResolvedSettings) -> String {
    fn opt<T: std::fmt::Display>(value: Option<T>) -> String {
        value.map(|v| v.to_string()).unwrap_or_else(|| "None".to_string())
    }

    let (group, stream) = match &settings.cloudwatch {
        Some(target) => (Some(target.log_group.as_str()), Some(target.log_stream.as_str())),
        None => (None, None),
    };

    format!(
        "Using parameters:\n\
         \tpost type: {}\n\
         \tsubreddits: {}\n\
         \tbefore: {}\n\
         \tafter: {}\n\
         \tsize: {}\n\
         \tno resume: {}\n\
         \ttest: {}\n\
         \tlocal log: {}\n\
         \tcloudwatch log group: {}\n\
         \tcloudwatch log stream: {}\n\
         \tfirehose: {}",
        params.kind(),
        params.filter(),
        opt(params.before()),
        opt(params.after()),
        params.size(),
        params.no_resume(),
        params.test(),
        settings.journal_path.display(),
        opt(group),
        opt(stream),
        settings.firehose,
    )
}
