//! Write role of the journal

use chrono::Utc;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::fetcher::validate::Page;
use crate::journal::entry::JournalEntry;
use crate::journal::{JournalError, JournalResult};

/// Appends one entry per committed page
///
/// The file is created on the first append, so a crawl that ends on its
/// first request leaves no journal behind.
#[derive(Debug)]
pub struct JournalAppender {
    path: PathBuf,
    subreddit_key: String,
    file: Option<File>,
    appended: u64,
}

impl JournalAppender {
    /// Appender for `path` writing entries keyed by `subreddit_key`
    pub fn new(path: impl Into<PathBuf>, subreddit_key: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            subreddit_key: subreddit_key.into(),
            file: None,
            appended: 0,
        }
    }

    /// Journal path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Entries appended by this process
    pub fn appended(&self) -> u64 {
        self.appended
    }

    /// Record a committed page; returns the entry written
    pub fn append(&mut self, page: &Page) -> JournalResult<JournalEntry> {
        let entry = JournalEntry::from_page(page, &self.subreddit_key, Utc::now());
        self.append_entry(&entry)?;
        Ok(entry)
    }

    /// Write `entry` as one line, then flush and sync
    pub fn append_entry(&mut self, entry: &JournalEntry) -> JournalResult<()> {
        let mut line = entry.to_line()?;
        line.push('\n');

        let path = self.path.display().to_string();
        let io_error = |e: std::io::Error| JournalError::Io {
            path: path.clone(),
            message: e.to_string(),
        };

        let file = self.open()?;
        file.write_all(line.as_bytes()).map_err(io_error)?;
        file.flush().map_err(io_error)?;
        file.sync_data().map_err(io_error)?;

        self.appended += 1;
        debug!(
            path = %self.path.display(),
            min_created_utc = entry.last_result_timestamps.min_created_utc,
            appended = self.appended,
            "Journal entry appended"
        );
        Ok(())
    }

    fn open(&mut self) -> JournalResult<&mut File> {
        if self.file.is_none() {
            let io_error = |e: std::io::Error| JournalError::Io {
                path: self.path.display().to_string(),
                message: e.to_string(),
            };

            if let Some(parent) = self.path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(io_error)?;
                }
            }

            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .map_err(io_error)?;
            self.file = Some(file);
        }

        self.file.as_mut().ok_or_else(|| JournalError::Io {
            path: self.path.display().to_string(),
            message: "journal file not open".to_string(),
        })
    }
}
