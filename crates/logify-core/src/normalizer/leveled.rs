// Rules for lines that carry their own level keyword

use super::{group, FormatRule};
use crate::{format_timestamp, LogLevel, Metadata, PartialRecord};
use chrono::NaiveDateTime;
use regex::Regex;
use serde_json::json;

/// `2024-02-08 10:30:00,123 ERROR [main] message`
pub(crate) fn log4j_rule() -> FormatRule {
    let pattern = Regex::new(
        r"^(\d{4}-\d{2}-\d{2}\s+\d{2}:\d{2}:\d{2},\d{3})\s+(\w+)\s+\[(.+?)\]\s+(.+)",
    )
    .expect("log4j pattern is valid");

    FormatRule::new("Log4j/Winston", pattern, |caps| {
        let mut metadata = Metadata::new();
        metadata.insert("context".to_string(), json!(group(caps, 3)));

        PartialRecord {
            level: Some(LogLevel::canonicalize(group(caps, 2))),
            message: Some(group(caps, 4).to_string()),
            service: None,
            timestamp: Some(parse_log4j_timestamp(group(caps, 1))),
            metadata,
        }
    })
}

/// `"level": "x"` followed somewhere by `"message": "y"` inside free text
pub(crate) fn json_like_rule() -> FormatRule {
    let pattern = Regex::new(r#""level":\s*"(\w+)".*?"message":\s*"([^"]+)""#)
        .expect("json-like pattern is valid");

    FormatRule::new("JSON-like", pattern, |caps| PartialRecord {
        level: Some(LogLevel::canonicalize(group(caps, 1))),
        message: Some(group(caps, 2).to_string()),
        ..Default::default()
    })
}

/// `[ERROR] - message`, `warn: message`
pub(crate) fn simple_level_rule() -> FormatRule {
    let pattern = Regex::new(r"(?i)^(\[?(?:ERROR|WARN|INFO|DEBUG)\]?)\s*[-:]\s*(.+)")
        .expect("level-prefix pattern is valid");

    FormatRule::new("Simple Level-Message", pattern, |caps| {
        let level = group(caps, 1).trim_matches(|c: char| c == '[' || c == ']');
        PartialRecord {
            level: Some(LogLevel::canonicalize(level)),
            message: Some(group(caps, 2).to_string()),
            ..Default::default()
        }
    })
}

// comma before the millis, local time assumed to be UTC
fn parse_log4j_timestamp(ts: &str) -> String {
    let collapsed = ts.split_whitespace().collect::<Vec<_>>().join(" ");
    NaiveDateTime::parse_from_str(&collapsed, "%Y-%m-%d %H:%M:%S,%3f")
        .map(|naive| format_timestamp(naive.and_utc()))
        .unwrap_or_else(|_| ts.to_string())
}
