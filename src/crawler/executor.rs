//! Crawl orchestration for one invocation
//!
//! Opens the journal, decides the starting watermark, runs the pagination
//! controller and reports the result to the operator log.

use std::path::{Path, PathBuf};
use tracing::info;

use crate::crawler::controller::{CrawlOutcome, PaginationController};
use crate::crawler::progress::CrawlProgress;
use crate::crawler::CrawlError;
use crate::fetcher::{CrawlParams, Fetch};
use crate::journal::{Journal, JournalEntry, JournalView};
use crate::sink::{SharedLogSink, SinkEmitter};

/// Starting watermark chosen at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumeDecision {
    /// `before` for the first request
    pub before: Option<i64>,
    /// Operator message describing the decision, if any
    pub note: Option<String>,
}

/// Choose the first request's `before` from the CLI value and the journal
///
/// The journal watermark only applies when a CLI `before` was given, the
/// watermark is older than it, and resume is enabled.
pub fn resolve_start_before(
    cli_before: Option<i64>,
    journal_watermark: Option<i64>,
    no_resume: bool,
) -> ResumeDecision {
    match (cli_before, journal_watermark) {
        (Some(before), Some(watermark)) if watermark < before => {
            if no_resume {
                ResumeDecision {
                    before: Some(before),
                    note: Some(format!(
                        "INFO: 'before' timestamp {watermark} from metadata log less than CLI arg {before}, but --no_resume is set."
                    )),
                }
            } else {
                ResumeDecision {
                    before: Some(watermark),
                    note: Some(format!(
                        "Using 'before' timestamp {watermark} from metadata log instead of CLI arg {before}"
                    )),
                }
            }
        }
        (None, Some(watermark)) => ResumeDecision {
            before: None,
            note: Some(format!(
                "INFO: metadata log has 'before' timestamp {watermark}, but no --before was given; starting from the newest results."
            )),
        },
        _ => ResumeDecision {
            before: cli_before,
            note: None,
        },
    }
}

/// Result of a finished crawl
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlReport {
    /// Why the crawl stopped
    pub outcome: CrawlOutcome,
    /// `before` of the first request
    pub start_before: Option<i64>,
    /// Final counters
    pub progress: CrawlProgress,
    /// Batches delivered to the record sink
    pub batches_sent: u64,
    /// Records delivered to the record sink
    pub records_sent: u64,
    /// Last journal entry written by this run
    pub last_entry: Option<JournalEntry>,
}

/// Runs one crawl end to end
pub struct CrawlExecutor<F: Fetch> {
    controller: PaginationController<F>,
    emitter: SinkEmitter,
    journal_path: PathBuf,
    log: SharedLogSink,
}

impl<F: Fetch> CrawlExecutor<F> {
    /// Create an executor
    ///
    /// # Arguments
    /// * `controller` - Pagination controller wrapping the fetcher
    /// * `emitter` - Record sink emitter
    /// * `journal_path` - Metadata journal file
    /// * `log` - Operator log
    pub fn new(
        controller: PaginationController<F>,
        emitter: SinkEmitter,
        journal_path: impl Into<PathBuf>,
        log: SharedLogSink,
    ) -> Self {
        Self {
            controller,
            emitter,
            journal_path: journal_path.into(),
            log,
        }
    }

    /// Journal path
    pub fn journal_path(&self) -> &Path {
        &self.journal_path
    }

    /// Pagination controller
    pub fn controller(&self) -> &PaginationController<F> {
        &self.controller
    }

    /// Run the crawl described by `params`
    ///
    /// Terminal errors are reported to the operator log before being returned.
    pub async fn execute(&mut self, params: &CrawlParams) -> Result<CrawlReport, CrawlError> {
        let result = self.crawl(params).await;

        match &result {
            Ok(report) => {
                let metadata = self
                    .controller
                    .last_metadata()
                    .map(|m| m.to_pretty_json())
                    .unwrap_or_else(|| "null".to_string());
                self.log
                    .emit(&format!(
                        "Finished crawl. Result: {} Last result metadata:\n{}",
                        report.progress, metadata
                    ))
                    .await;
            }
            Err(e) => {
                self.log.emit(&format!("ERROR: {e}")).await;
            }
        }

        result
    }

    async fn crawl(&mut self, params: &CrawlParams) -> Result<CrawlReport, CrawlError> {
        let key = params.filter().key();
        let (view, mut appender) = Journal::open(&self.journal_path, &key)?;
        self.report_journal(&view).await;

        let decision = resolve_start_before(params.before(), view.resume_watermark(), params.no_resume());
        if let Some(note) = &decision.note {
            self.log.emit(note).await;
        }

        let effective = params.clone().with_before(decision.before);
        info!(
            subreddit = %key,
            before = ?decision.before,
            after = ?effective.after(),
            "Starting crawl"
        );

        let outcome = self
            .controller
            .run(&effective, &mut self.emitter, &mut appender)
            .await?;

        Ok(CrawlReport {
            outcome,
            start_before: decision.before,
            progress: self.controller.progress(),
            batches_sent: self.emitter.batches_sent(),
            records_sent: self.emitter.records_sent(),
            last_entry: self.controller.last_entry().cloned(),
        })
    }

    async fn report_journal(&self, view: &JournalView) {
        if !view.exists() {
            info!(path = %view.path().display(), "Local log file does not exist");
            return;
        }

        self.log.emit("Local log file found").await;

        if let Some(entry) = view.last_entry() {
            let line = entry
                .to_line()
                .unwrap_or_else(|_| format!("{entry:?}"));
            self.log
                .emit(&format!(
                    "Found subreddits {} in local log. min_created_utc={}; max_created_utc={}\nLast filtered line from local log file is {}.",
                    view.filter_key(),
                    entry.last_result_timestamps.min_created_utc,
                    entry.last_result_timestamps.max_created_utc,
                    line
                ))
                .await;
        }
    }
}
