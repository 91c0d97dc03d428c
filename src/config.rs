//! Settings file and command-line merge
//!
//! Defaults come from a TOML settings file with `[local_log]`, `[cloudwatch]`,
//! `[firehose]`, `[pushshift]` and `[retry]` sections. Command-line values
//! override the file; the merged result is a [`ResolvedSettings`].

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::crawler::config::{
    DEFAULT_JOURNAL_FILENAME, DEFAULT_RATE_LIMIT_CALLS, DEFAULT_RATE_LIMIT_PERIOD,
};
use crate::fetcher::query::DEFAULT_BASE_URL;
use crate::fetcher::retry::RetryPolicy;
use crate::PostKind;

/// Settings file used when `--config` is not given
pub const DEFAULT_SETTINGS_FILE: &str = "settings.toml";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Settings file exists but could not be read
    #[error("failed to read settings file {path}: {message}")]
    Io {
        /// Settings path
        path: String,
        /// Error text
        message: String,
    },

    /// Settings file is not valid TOML for this schema
    #[error("failed to parse settings file {path}: {message}")]
    Parse {
        /// Settings path
        path: String,
        /// Error text
        message: String,
    },

    /// No Firehose delivery stream for this crawl
    #[error("Firehose delivery stream not specified: {0}")]
    MissingFirehose(String),

    /// Only one of log group / log stream was given
    #[error("CloudWatch logging needs both a log group and a log stream (got {0})")]
    IncompleteCloudWatch(String),

    /// Invalid value
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// `[local_log]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalLogSettings {
    /// Journal file
    pub filename: Option<String>,
}

/// `[cloudwatch]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudWatchSettings {
    /// Log group name
    pub log_group: Option<String>,
    /// Log stream name
    pub log_stream: Option<String>,
}

/// `[firehose]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FirehoseSettings {
    /// Stream used by `--test` crawls
    pub test_destination: Option<String>,
    /// Stream for comment crawls
    pub comments_destination: Option<String>,
    /// Stream for submission crawls
    pub submissions_destination: Option<String>,
}

/// `[pushshift]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PushshiftSettings {
    /// API host
    pub base_url: String,
    /// Calls permitted per window
    pub rate_limit_calls: usize,
    /// Window length in seconds
    pub rate_limit_period_secs: u64,
}

impl Default for PushshiftSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            rate_limit_calls: DEFAULT_RATE_LIMIT_CALLS,
            rate_limit_period_secs: DEFAULT_RATE_LIMIT_PERIOD.as_secs(),
        }
    }
}

/// Contents of the settings file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Journal location
    pub local_log: LocalLogSettings,
    /// Remote operator log
    pub cloudwatch: CloudWatchSettings,
    /// Record sink destinations
    pub firehose: FirehoseSettings,
    /// Source API
    pub pushshift: PushshiftSettings,
    /// Retry policy
    pub retry: RetryPolicy,
}

impl Settings {
    /// Parse settings from TOML text
    pub fn from_toml(text: &str, origin: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse {
            path: origin.to_string(),
            message: e.to_string(),
        })
    }

    /// Load `path`; a missing file yields defaults
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "Settings file not found, using defaults");
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml(&text, &path.display().to_string())
    }
}

/// Values given on the command line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOverrides {
    /// `--local_log`
    pub local_log: Option<PathBuf>,
    /// `--cloudwatch_log_group`
    pub cloudwatch_log_group: Option<String>,
    /// `--cloudwatch_log_stream`
    pub cloudwatch_log_stream: Option<String>,
    /// `--firehose`
    pub firehose: Option<String>,
}

/// CloudWatch coordinates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudWatchTarget {
    /// Log group
    pub log_group: String,
    /// Log stream
    pub log_stream: String,
}

/// Settings after merging file and command line
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSettings {
    /// Journal file
    pub journal_path: PathBuf,
    /// Remote operator log; `None` logs locally only
    pub cloudwatch: Option<CloudWatchTarget>,
    /// Firehose delivery stream
    pub firehose: String,
    /// API host
    pub base_url: String,
    /// Calls permitted per window
    pub rate_limit_calls: usize,
    /// Window length
    pub rate_limit_period: Duration,
    /// Retry policy
    pub retry: RetryPolicy,
}

impl ResolvedSettings {
    /// Merge `settings` with `overrides` for a crawl of `kind`
    pub fn resolve(
        settings: Settings,
        overrides: &CliOverrides,
        kind: PostKind,
        test: bool,
    ) -> Result<Self, ConfigError> {
        let journal_path = overrides
            .local_log
            .clone()
            .or_else(|| settings.local_log.filename.map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_JOURNAL_FILENAME));

        let log_group = overrides
            .cloudwatch_log_group
            .clone()
            .or(settings.cloudwatch.log_group);
        let log_stream = overrides
            .cloudwatch_log_stream
            .clone()
            .or(settings.cloudwatch.log_stream);
        let cloudwatch = match (log_group, log_stream) {
            (Some(log_group), Some(log_stream)) => Some(CloudWatchTarget {
                log_group,
                log_stream,
            }),
            (None, None) => None,
            (Some(group), None) => {
                return Err(ConfigError::IncompleteCloudWatch(format!(
                    "log group {group:?} without a log stream"
                )))
            }
            (None, Some(stream)) => {
                return Err(ConfigError::IncompleteCloudWatch(format!(
                    "log stream {stream:?} without a log group"
                )))
            }
        };

        let firehose = select_firehose(overrides.firehose.as_deref(), &settings.firehose, kind, test)?;

        if settings.pushshift.rate_limit_calls == 0 {
            return Err(ConfigError::Invalid(
                "pushshift.rate_limit_calls must be at least 1".to_string(),
            ));
        }
        if settings.pushshift.rate_limit_period_secs == 0 {
            return Err(ConfigError::Invalid(
                "pushshift.rate_limit_period_secs must be at least 1".to_string(),
            ));
        }
        settings.retry.validate().map_err(ConfigError::Invalid)?;

        Ok(Self {
            journal_path,
            cloudwatch,
            firehose,
            base_url: settings.pushshift.base_url,
            rate_limit_calls: settings.pushshift.rate_limit_calls,
            rate_limit_period: Duration::from_secs(settings.pushshift.rate_limit_period_secs),
            retry: settings.retry,
        })
    }
}

/// Pick the Firehose stream: explicit value, else test, else per post kind
pub fn select_firehose(
    explicit: Option<&str>,
    destinations: &FirehoseSettings,
    kind: PostKind,
    test: bool,
) -> Result<String, ConfigError> {
    if let Some(stream) = explicit {
        return Ok(stream.to_string());
    }

    let (selected, source) = if test {
        (&destinations.test_destination, "firehose.test_destination")
    } else {
        match kind {
            PostKind::Comments => (&destinations.comments_destination, "firehose.comments_destination"),
            PostKind::Submissions => (
                &destinations.submissions_destination,
                "firehose.submissions_destination",
            ),
        }
    };

    selected
        .clone()
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingFirehose(format!("pass --firehose or set {source}")))
}
