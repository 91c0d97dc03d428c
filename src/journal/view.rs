//! Read role of the journal
//!
//! Built once at startup by scanning the file; never re-read mid-crawl.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::journal::entry::JournalEntry;
use crate::journal::{JournalError, JournalResult};

/// Last journal entry recorded for one subreddit key
#[derive(Debug, Clone, PartialEq)]
pub struct JournalView {
    path: PathBuf,
    filter_key: String,
    exists: bool,
    entries_scanned: usize,
    last_entry: Option<JournalEntry>,
}

impl JournalView {
    /// Scan `path` for the last entry whose `subreddit` equals `filter_key`
    ///
    /// A missing file yields an empty view. Any unparseable line, including a
    /// truncated final line, is reported as [`JournalError::Corrupt`].
    pub fn open(path: impl AsRef<Path>, filter_key: &str) -> JournalResult<Self> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            debug!(path = %path.display(), "Journal file does not exist");
            return Ok(Self {
                path,
                filter_key: filter_key.to_string(),
                exists: false,
                entries_scanned: 0,
                last_entry: None,
            });
        }

        let file = File::open(&path).map_err(|e| JournalError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let mut entries_scanned = 0;
        let mut last_entry = None;

        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| JournalError::Io {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

            if line.trim().is_empty() {
                continue;
            }

            let entry = JournalEntry::parse(&line).map_err(|e| JournalError::Corrupt {
                path: path.display().to_string(),
                line: index + 1,
                message: e.to_string(),
            })?;
            entries_scanned += 1;

            if entry.matches(filter_key) {
                last_entry = Some(entry);
            }
        }

        info!(
            path = %path.display(),
            entries = entries_scanned,
            matched = last_entry.is_some(),
            "Scanned metadata journal"
        );

        Ok(Self {
            path,
            filter_key: filter_key.to_string(),
            exists: true,
            entries_scanned,
            last_entry,
        })
    }

    /// Journal path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Subreddit key the view was filtered by
    pub fn filter_key(&self) -> &str {
        &self.filter_key
    }

    /// Whether the file existed at open time
    pub fn exists(&self) -> bool {
        self.exists
    }

    /// Number of entries read, across all keys
    pub fn entries_scanned(&self) -> usize {
        self.entries_scanned
    }

    /// Last matching entry
    pub fn last_entry(&self) -> Option<&JournalEntry> {
        self.last_entry.as_ref()
    }

    /// `min_created_utc` of the last matching entry
    pub fn resume_watermark(&self) -> Option<i64> {
        self.last_entry
            .as_ref()
            .map(|entry| entry.last_result_timestamps.min_created_utc)
    }
}
