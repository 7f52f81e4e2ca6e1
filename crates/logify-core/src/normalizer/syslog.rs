// Syslog rule (BSD / RFC 3164 style)

use super::{group, FormatRule};
use crate::{format_timestamp, LogLevel, Metadata, PartialRecord};
use chrono::{NaiveDateTime, Utc};
use regex::Regex;
use serde_json::json;

pub(crate) fn rule() -> FormatRule {
    // optional <priority>, then: Mon DD HH:MM:SS hostname process[pid]: message
    let pattern = Regex::new(
        r"^(?:<(\d{1,3})>)?(\w{3}\s+\d{1,2}\s+\d{2}:\d{2}:\d{2})\s+(\S+)\s+(\w+)(?:\[(\d+)\])?:\s+(.+)",
    )
    .expect("syslog pattern is valid");

    FormatRule::new("Syslog", pattern, |caps| {
        let priority: Option<u8> = caps.get(1).and_then(|m| m.as_str().parse().ok());
        let pid: Option<u64> = caps.get(5).and_then(|m| m.as_str().parse().ok());

        let mut metadata = Metadata::new();
        metadata.insert("process".to_string(), json!(group(caps, 4)));
        if let Some(pid) = pid {
            metadata.insert("pid".to_string(), json!(pid));
        }
        if let Some(pri) = priority {
            metadata.insert("priority".to_string(), json!(pri));
            metadata.insert("facility".to_string(), json!(pri / 8));
        }

        PartialRecord {
            level: Some(priority.map(priority_to_level).unwrap_or(LogLevel::Info)),
            message: Some(group(caps, 6).to_string()),
            service: Some(group(caps, 3).to_string()),
            timestamp: Some(parse_timestamp(group(caps, 2))),
            metadata,
        }
    })
}

// Format: Oct 11 22:14:15 (no year, assume current year)
fn parse_timestamp(ts: &str) -> String {
    let collapsed = ts.split_whitespace().collect::<Vec<_>>().join(" ");
    let with_year = format!("{} {}", collapsed, Utc::now().format("%Y"));

    NaiveDateTime::parse_from_str(&with_year, "%b %d %H:%M:%S %Y")
        .map(|naive| format_timestamp(naive.and_utc()))
        .unwrap_or_else(|_| ts.to_string())
}

fn priority_to_level(priority: u8) -> LogLevel {
    // severity is priority % 8
    match priority % 8 {
        0..=3 => LogLevel::Error, // emergency, alert, critical, error
        4 => LogLevel::Warn,
        5 | 6 => LogLevel::Info, // notice, informational
        _ => LogLevel::Debug,
    }
}
