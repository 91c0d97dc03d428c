//! Append-only metadata journal
//!
//! Newline-delimited JSON, one entry per committed page. The journal is split
//! into a read role ([`JournalView`], built once at startup to find the resume
//! watermark) and a write role ([`JournalAppender`], used during the crawl).
//! No locking is performed: one crawler owns a journal file at a time.

pub mod appender;
pub mod entry;
pub mod view;

use std::path::Path;

pub use appender::JournalAppender;
pub use entry::{JournalEntry, ResultTimestamps, SubredditField};
pub use view::JournalView;

/// Journal errors
#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    /// File could not be read or written
    #[error("journal I/O error on {path}: {message}")]
    Io {
        /// Journal path
        path: String,
        /// Error text
        message: String,
    },

    /// A line is not a valid entry
    #[error("corrupt journal {path} at line {line}: {message}")]
    Corrupt {
        /// Journal path
        path: String,
        /// 1-based line number
        line: usize,
        /// Parse error
        message: String,
    },

    /// Entry could not be serialised
    #[error("failed to serialize journal entry: {0}")]
    Serialization(String),
}

/// Result type for journal operations
pub type JournalResult<T> = Result<T, JournalError>;

/// Both roles over one journal file
pub struct Journal;

impl Journal {
    /// Scan `path` for `filter_key` and prepare an appender for the same key
    pub fn open(
        path: impl AsRef<Path>,
        filter_key: &str,
    ) -> JournalResult<(JournalView, JournalAppender)> {
        let view = JournalView::open(path.as_ref(), filter_key)?;
        let appender = JournalAppender::new(path.as_ref(), filter_key);
        Ok((view, appender))
    }
}
