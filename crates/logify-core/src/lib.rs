//! Core types for the log normalization engine
//! every raw line, whatever its shape, is turned into one `CanonicalLogRecord`.
pub mod config;
pub mod normalizer;

pub use config::{load_config, ConfigError, NormalizerConfig, RuleConfig};
pub use normalizer::{FormatRule, Normalizer};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Message used when the source line carried no text at all
pub const EMPTY_MESSAGE: &str = "(empty)";

/// Service name used when nothing identified the origin
pub const UNKNOWN_SERVICE: &str = "unknown";

/// Rule-specific extra fields (ip, status, bytes, ...)
pub type Metadata = HashMap<String, serde_json::Value>;

// LOG LEVEL //

/// Canonical log severity levels (ordered from lowest to highest)
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Parse a level keyword or one of its synonyms (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "debug" | "trace" => Some(Self::Debug),
            "info" | "information" => Some(Self::Info),
            "warn" | "warning" => Some(Self::Warn),
            "error" | "err" | "fatal" => Some(Self::Error),
            _ => None,
        }
    }

    /// Free-form level text mapped onto the fixed set; unknown text becomes `Info`
    pub fn canonicalize(s: &str) -> Self {
        Self::parse(s).unwrap_or_default()
    }

    /// Keyword heuristic for lines that no format rule recognised
    pub fn guess(line: &str) -> Self {
        let line = line.to_lowercase();
        if line.contains("error") || line.contains("fatal") || line.contains("fail") {
            Self::Error
        } else if line.contains("warn") {
            Self::Warn
        } else if line.contains("debug") {
            Self::Debug
        } else {
            Self::Info
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// CANONICAL RECORD //

/// The normalized output unit, one per raw log line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalLogRecord {
    pub level: LogLevel,

    pub message: String,

    pub service: String,

    /// ISO-8601 text
    pub timestamp: String,

    #[serde(default)]
    pub metadata: Metadata,
}

/// What a format rule (or the structured path) managed to extract.
/// Missing fields are filled with defaults by [`PartialRecord::into_record`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialRecord {
    pub level: Option<LogLevel>,
    pub message: Option<String>,
    pub service: Option<String>,
    pub timestamp: Option<String>,
    pub metadata: Metadata,
}

impl PartialRecord {
    /// Fill every missing field with its default
    pub fn into_record(self) -> CanonicalLogRecord {
        CanonicalLogRecord {
            level: self.level.unwrap_or_default(),
            message: self
                .message
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| EMPTY_MESSAGE.to_string()),
            service: self
                .service
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| UNKNOWN_SERVICE.to_string()),
            timestamp: self
                .timestamp
                .filter(|t| !t.is_empty())
                .unwrap_or_else(now_timestamp),
            metadata: self.metadata,
        }
    }
}

/// RFC 3339 in UTC with millisecond precision, e.g. `2024-02-08T10:30:00.000Z`
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn now_timestamp() -> String {
    format_timestamp(Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_level_synonyms() {
        assert_eq!(LogLevel::parse("ERR"), Some(LogLevel::Error));
        assert_eq!(LogLevel::parse("Fatal"), Some(LogLevel::Error));
        assert_eq!(LogLevel::parse("warning"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("Information"), Some(LogLevel::Info));
        assert_eq!(LogLevel::parse("TRACE"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::parse("notice"), None);
        assert_eq!(LogLevel::canonicalize("notice"), LogLevel::Info);
    }

    #[test]
    fn test_guess_level() {
        assert_eq!(LogLevel::guess("Disk FAILURE on sda"), LogLevel::Error);
        assert_eq!(LogLevel::guess("a fatal mistake"), LogLevel::Error);
        assert_eq!(LogLevel::guess("Warning: low memory"), LogLevel::Warn);
        assert_eq!(LogLevel::guess("debugging cache"), LogLevel::Debug);
        assert_eq!(LogLevel::guess("all good"), LogLevel::Info);
    }

    #[test]
    fn test_partial_record_defaults() {
        let record = PartialRecord::default().into_record();
        assert_eq!(record.level, LogLevel::Info);
        assert_eq!(record.message, EMPTY_MESSAGE);
        assert_eq!(record.service, UNKNOWN_SERVICE);
        assert!(!record.timestamp.is_empty());
        assert!(record.metadata.is_empty());
    }

    #[test]
    fn test_format_timestamp() {
        let ts = Utc.with_ymd_and_hms(2024, 2, 8, 10, 30, 0).unwrap();
        assert_eq!(format_timestamp(ts), "2024-02-08T10:30:00.000Z");
    }

    #[test]
    fn test_level_serializes_lowercase() {
        let json = serde_json::to_string(&LogLevel::Warn).unwrap();
        assert_eq!(json, "\"warn\"");
    }
}
