// Nginx access log rule (combined format)

use super::{group, FormatRule};
use crate::{format_timestamp, LogLevel, Metadata, PartialRecord};
use chrono::{DateTime, Utc};
use regex::{Captures, Regex};
use serde_json::json;

pub(crate) fn rule() -> FormatRule {
    // IP ident user [10/Oct/2000:13:55:36 -0700] "request" status bytes "referer" "user agent"
    let pattern = Regex::new(
        r#"^(\S+) (\S+) (\S+) \[([\w:/]+\s[+\-]\d{4})\] "(.+?)" (\d{3}) (\d+|-) "([^"]*)" "([^"]*)""#,
    )
    .expect("nginx access pattern is valid");

    FormatRule::new("Nginx Access Log", pattern, |caps| {
        let mut record = access_record(caps, "nginx");
        record
            .metadata
            .insert("referer".to_string(), json!(group(caps, 8)));
        record
            .metadata
            .insert("userAgent".to_string(), json!(group(caps, 9)));
        record
    })
}

/// Shared by both access-log shapes: groups 1..=7 are identical
pub(super) fn access_record(caps: &Captures<'_>, service: &str) -> PartialRecord {
    let request = group(caps, 5);
    let status: u16 = group(caps, 6).parse().unwrap_or(0);
    // "-" means no body was sent
    let bytes: u64 = group(caps, 7).parse().unwrap_or(0);

    let mut metadata = Metadata::new();
    metadata.insert("ip".to_string(), json!(group(caps, 1)));
    metadata.insert("user".to_string(), json!(group(caps, 3)));
    metadata.insert("status".to_string(), json!(status));
    metadata.insert("bytes".to_string(), json!(bytes));

    PartialRecord {
        level: Some(status_to_level(status)),
        message: Some(format!("{} - Status {}", request, status)),
        service: Some(service.to_string()),
        timestamp: Some(parse_access_timestamp(group(caps, 4))),
        metadata,
    }
}

// Format: 10/Oct/2000:13:55:36 -0700, kept verbatim when it does not parse
pub(super) fn parse_access_timestamp(ts: &str) -> String {
    DateTime::parse_from_str(ts, "%d/%b/%Y:%H:%M:%S %z")
        .map(|dt| format_timestamp(dt.with_timezone(&Utc)))
        .unwrap_or_else(|_| ts.to_string())
}

pub(super) fn status_to_level(status: u16) -> LogLevel {
    match status {
        400..=499 => LogLevel::Warn,
        500..=599 => LogLevel::Error,
        _ => LogLevel::Info,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_access_timestamp_converts_to_utc() {
        assert_eq!(
            parse_access_timestamp("10/Oct/2000:13:55:36 -0700"),
            "2000-10-10T20:55:36.000Z"
        );
    }

    #[test]
    fn test_parse_access_timestamp_keeps_garbage() {
        assert_eq!(parse_access_timestamp("99/Foo/2000:13:55:36 -0700"), "99/Foo/2000:13:55:36 -0700");
    }

    #[test]
    fn test_status_to_level() {
        assert_eq!(status_to_level(200), LogLevel::Info);
        assert_eq!(status_to_level(304), LogLevel::Info);
        assert_eq!(status_to_level(404), LogLevel::Warn);
        assert_eq!(status_to_level(503), LogLevel::Error);
    }
}
