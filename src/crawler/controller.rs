//! Pagination state machine
//!
//! The first request uses the caller's watermark; every following request
//! reuses the previous query with `before` set to the previous page's oldest
//! `created_utc`. Each page is committed (sent, then journaled) before the
//! next request is issued, so the journal never runs ahead of the sink.

use std::time::Instant;
use tracing::{debug, info};

use crate::clock::SharedClock;
use crate::crawler::config::{progress_due, PROGRESS_INTERVAL, TEST_REQUEST_BUDGET};
use crate::crawler::progress::CrawlProgress;
use crate::crawler::CrawlError;
use crate::fetcher::validate::{Page, PageMetadata, ResponseValidator, ValidationError};
use crate::fetcher::{CrawlParams, Fetch, PageQuery};
use crate::journal::{JournalAppender, JournalEntry};
use crate::metrics;
use crate::shutdown::{self, SharedShutdown};
use crate::sink::{SharedLogSink, SinkEmitter};

/// Controller states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlState {
    /// Not started
    Init,
    /// Waiting on a page request
    Fetching,
    /// Sending a page to the record sink
    Emitting,
    /// Appending a page to the journal
    Journaling,
    /// Stopped normally
    Done,
    /// Stopped on a terminal error
    Failed,
}

/// Why a crawl stopped without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlOutcome {
    /// The source reported no further results
    Exhausted,
    /// `--test` request budget reached
    TestBudgetReached,
    /// Stopped between pages on request
    Cancelled,
}

impl CrawlOutcome {
    /// Process exit status for this outcome
    pub fn exit_code(&self) -> i32 {
        match self {
            CrawlOutcome::Exhausted | CrawlOutcome::TestBudgetReached => 0,
            CrawlOutcome::Cancelled => 130,
        }
    }
}

/// Walks the result stream backwards one page at a time
pub struct PaginationController<F: Fetch> {
    fetcher: F,
    validator: ResponseValidator,
    log: SharedLogSink,
    clock: SharedClock,
    shutdown: Option<SharedShutdown>,
    progress_interval: u64,
    test_budget: u64,
    state: CrawlState,
    request_count: u64,
    pages_committed: u64,
    records_committed: u64,
    started: Option<Instant>,
    last_entry: Option<JournalEntry>,
    last_metadata: Option<PageMetadata>,
}

impl<F: Fetch> PaginationController<F> {
    /// Create a controller
    ///
    /// # Arguments
    /// * `fetcher` - Page fetcher, normally rate limited
    /// * `log` - Operator log for warnings and progress
    /// * `clock` - Time source for progress reporting
    pub fn new(fetcher: F, log: SharedLogSink, clock: SharedClock) -> Self {
        Self {
            fetcher,
            validator: ResponseValidator::new(),
            log,
            clock,
            shutdown: shutdown::get_global_shutdown(),
            progress_interval: PROGRESS_INTERVAL,
            test_budget: TEST_REQUEST_BUDGET,
            state: CrawlState::Init,
            request_count: 0,
            pages_committed: 0,
            records_committed: 0,
            started: None,
            last_entry: None,
            last_metadata: None,
        }
    }

    /// Attach a shutdown handle checked between pages
    pub fn with_shutdown(mut self, shutdown: SharedShutdown) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Emit a progress line every `interval` requests (0 disables)
    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Request count at which a test crawl stops
    pub fn with_test_budget(mut self, budget: u64) -> Self {
        self.test_budget = budget;
        self
    }

    /// Current state
    pub fn state(&self) -> CrawlState {
        self.state
    }

    /// Requests issued so far
    pub fn request_count(&self) -> u64 {
        self.request_count
    }

    /// Last journal entry written
    pub fn last_entry(&self) -> Option<&JournalEntry> {
        self.last_entry.as_ref()
    }

    /// Metadata of the last page seen, including a final empty page
    pub fn last_metadata(&self) -> Option<&PageMetadata> {
        self.last_metadata.as_ref()
    }

    /// Wrapped fetcher
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Counters so far
    pub fn progress(&self) -> CrawlProgress {
        CrawlProgress {
            requests: self.request_count,
            pages_committed: self.pages_committed,
            records_committed: self.records_committed,
            elapsed: self
                .started
                .map(|started| self.clock.now().saturating_duration_since(started))
                .unwrap_or_default(),
        }
    }

    /// Fetch the first page for `params`
    pub async fn first(&mut self, params: &CrawlParams) -> Result<Page, CrawlError> {
        self.fetch(params.first_query()).await
    }

    /// Fetch the page following `prev`
    ///
    /// Fails with [`CrawlError::Stuck`] when `prev`'s oldest record is not
    /// older than the watermark `prev` was requested with.
    pub async fn next(&mut self, prev: &Page) -> Result<Page, CrawlError> {
        let next_before = prev.min_created_utc;

        if let Some(previous_before) = prev.request_params.before {
            if next_before >= previous_before {
                return Err(CrawlError::Stuck {
                    previous_before,
                    next_before,
                    params: prev.request_params.to_json(),
                });
            }
        }

        self.fetch(prev.request_params.with_before(next_before)).await
    }

    /// Drive the crawl until the source is exhausted, the test budget trips,
    /// shutdown is requested, or an error occurs
    pub async fn run(
        &mut self,
        params: &CrawlParams,
        emitter: &mut SinkEmitter,
        appender: &mut JournalAppender,
    ) -> Result<CrawlOutcome, CrawlError> {
        self.state = CrawlState::Init;
        self.started = Some(self.clock.now());

        let first = self.first(params).await;
        let mut page = match first {
            Ok(page) => page,
            Err(e) => return self.stop_with(e),
        };

        loop {
            if let Err(e) = self.commit(&page, emitter, appender).await {
                self.state = CrawlState::Failed;
                return Err(e);
            }

            if progress_due(self.request_count, self.progress_interval) {
                self.log.emit(&self.progress().to_string()).await;
            }

            if params.test() && self.request_count >= self.test_budget {
                self.log.emit("Stopping test.").await;
                self.state = CrawlState::Done;
                return Ok(CrawlOutcome::TestBudgetReached);
            }

            if self.shutdown_requested() {
                self.log
                    .emit(&format!(
                        "Shutdown requested. Stopping after {} committed pages; rerun with the same arguments to resume.",
                        self.pages_committed
                    ))
                    .await;
                self.state = CrawlState::Done;
                return Ok(CrawlOutcome::Cancelled);
            }

            let next = self.next(&page).await;
            page = match next {
                Ok(page) => page,
                Err(e) => return self.stop_with(e),
            };
        }
    }

    async fn fetch(&mut self, query: PageQuery) -> Result<Page, CrawlError> {
        self.state = CrawlState::Fetching;
        self.request_count += 1;

        debug!(
            request = self.request_count,
            before = ?query.before,
            after = ?query.after,
            "Fetching page"
        );

        let response = self
            .fetcher
            .get(&query)
            .await
            .map_err(|source| CrawlError::Fetch {
                params: query.to_json(),
                source,
            })?;

        let page = match self.validator.validate(&response.body, &query) {
            Ok(page) => page,
            Err(ValidationError::Empty(metadata)) => {
                self.log
                    .emit(&format!(
                        "No data returned for query {}. Metadata:\n{}",
                        query.to_json(),
                        metadata.to_pretty_json()
                    ))
                    .await;
                self.last_metadata = Some((*metadata).clone());
                return Err(CrawlError::Validation {
                    params: query.to_json(),
                    source: ValidationError::Empty(metadata),
                });
            }
            Err(source) => {
                return Err(CrawlError::Validation {
                    params: query.to_json(),
                    source,
                })
            }
        };

        for warning in &page.warnings {
            self.log
                .emit(&format!(
                    "{warning}. Metadata:\n{}",
                    page.metadata.to_pretty_json()
                ))
                .await;
        }

        Ok(page)
    }

    async fn commit(
        &mut self,
        page: &Page,
        emitter: &mut SinkEmitter,
        appender: &mut JournalAppender,
    ) -> Result<(), CrawlError> {
        let params = page.request_params.to_json();

        self.state = CrawlState::Emitting;
        emitter
            .send(&page.data, &params)
            .await
            .map_err(|source| CrawlError::Sink {
                params: params.clone(),
                source,
            })?;

        self.state = CrawlState::Journaling;
        let entry = appender
            .append(page)
            .map_err(|source| CrawlError::JournalWrite { params, source })?;

        self.pages_committed += 1;
        self.records_committed += page.data.len() as u64;
        metrics::record_page_committed(page.data.len());

        info!(
            request = self.request_count,
            records = page.data.len(),
            min_created_utc = page.min_created_utc,
            max_created_utc = page.max_created_utc,
            "Page committed"
        );

        self.last_entry = Some(entry);
        self.last_metadata = Some(page.metadata.clone());
        Ok(())
    }

    fn stop_with(&mut self, error: CrawlError) -> Result<CrawlOutcome, CrawlError> {
        if error.is_end_of_stream() {
            self.state = CrawlState::Done;
            Ok(CrawlOutcome::Exhausted)
        } else {
            self.state = CrawlState::Failed;
            Err(error)
        }
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown
            .as_ref()
            .map(|s| s.is_shutdown_requested())
            .unwrap_or(false)
    }
}
