use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::TandemError;

pub type Result<T> = std::result::Result<T, TandemError>;

/// Classification tag attached to every parsed log record.
///
/// Consumers use the tag to pick which counter of the
/// [`StatisticsAggregate`](crate::StatisticsAggregate) to bump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
    Http,
    Unknown,
}

impl LogLevel {
    /// All levels, in report order.
    pub const ALL: [LogLevel; 6] = [
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warn,
        LogLevel::Error,
        LogLevel::Http,
        LogLevel::Unknown,
    ];

    /// Number of distinct levels.
    pub const COUNT: usize = Self::ALL.len();

    /// Classifies a raw level tag by substring.
    ///
    /// Severity names are checked before HTTP methods, so a tag such as
    /// `"WARNING"` lands in [`LogLevel::Warn`].
    pub fn classify(tag: &str) -> Self {
        if tag.contains("DEBUG") {
            Self::Debug
        } else if tag.contains("INFO") {
            Self::Info
        } else if tag.contains("WARN") {
            Self::Warn
        } else if tag.contains("ERROR") {
            Self::Error
        } else if ["GET", "POST", "PUT", "DELETE"]
            .iter()
            .any(|method| tag.contains(method))
        {
            Self::Http
        } else {
            Self::Unknown
        }
    }

    /// Upper-case display name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
            Self::Http => "HTTP",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Dense index used for per-level counter arrays.
    pub(crate) fn index(self) -> usize {
        match self {
            Self::Debug => 0,
            Self::Info => 1,
            Self::Warn => 2,
            Self::Error => 3,
            Self::Http => 4,
            Self::Unknown => 5,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single parsed log line.
///
/// Entries are created by a producer, moved through the bounded queue and
/// dropped by whichever consumer dequeues them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: String,
    pub level: String,
    pub message: String,
    pub source: Arc<str>,
    pub line_number: u32,
}

impl LogEntry {
    pub fn new(
        timestamp: impl Into<String>,
        level: impl Into<String>,
        message: impl Into<String>,
        source: Arc<str>,
        line_number: u32,
    ) -> Self {
        Self {
            timestamp: timestamp.into(),
            level: level.into(),
            message: message.into(),
            source,
            line_number,
        }
    }

    /// Classification tag derived from the raw level field.
    pub fn classification(&self) -> LogLevel {
        LogLevel::classify(&self.level)
    }
}
