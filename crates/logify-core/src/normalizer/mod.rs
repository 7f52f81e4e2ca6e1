//! Log normalizer - turns raw log lines into canonical records
//!
//! Order of attempts: structured JSON -> format rules (built-ins, then custom) -> keyword heuristic.
//! Normalizing never fails; unknown shapes just lose fidelity.

mod apache;
mod leveled;
mod nginx;
mod syslog;

use crate::config::{ConfigError, NormalizerConfig};
use crate::{CanonicalLogRecord, LogLevel, Metadata, PartialRecord};
use futures::{Stream, StreamExt};
use regex::{Captures, Regex};
use serde_json::{Map, Value};
use std::fmt;
use std::io::{self, BufRead};
use tracing::{debug, trace};

/// Keys of a structured record that map onto canonical fields
const RESERVED_KEYS: [&str; 5] = ["level", "message", "service", "timestamp", "metadata"];

type ExtractFn = dyn Fn(&Captures<'_>) -> PartialRecord + Send + Sync;

/// A named pattern plus the function that turns its captures into a partial record.
/// Extraction is assumed to succeed whenever the pattern matched.
pub struct FormatRule {
    name: String,
    pattern: Regex,
    extract: Box<ExtractFn>,
}

impl FormatRule {
    pub fn new<F>(name: impl Into<String>, pattern: Regex, extract: F) -> Self
    where
        F: Fn(&Captures<'_>) -> PartialRecord + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            pattern,
            extract: Box::new(extract),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    /// Match the line and extract, or None when the pattern does not match
    pub fn apply(&self, line: &str) -> Option<PartialRecord> {
        self.pattern.captures(line).map(|caps| (self.extract)(&caps))
    }
}

impl fmt::Debug for FormatRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormatRule")
            .field("name", &self.name)
            .field("pattern", &self.pattern.as_str())
            .finish()
    }
}

// capture group text, empty when the group did not participate
pub(crate) fn group<'h>(caps: &Captures<'h>, i: usize) -> &'h str {
    caps.get(i).map(|m| m.as_str()).unwrap_or("")
}

/// Built-in rules in priority order
pub fn builtin_rules() -> Vec<FormatRule> {
    vec![
        nginx::rule(),
        apache::rule(),
        syslog::rule(),
        leveled::log4j_rule(),
        leveled::json_like_rule(),
        leveled::simple_level_rule(),
    ]
}

/// Holds the ordered rule list. Register rules during setup, then share
/// freely between threads: normalizing only reads.
#[derive(Debug)]
pub struct Normalizer {
    rules: Vec<FormatRule>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    /// Normalizer with the built-in rules only
    pub fn new() -> Self {
        Self {
            rules: builtin_rules(),
        }
    }

    /// Built-in rules followed by `custom`, in the given order
    pub fn with_rules(custom: impl IntoIterator<Item = FormatRule>) -> Self {
        let mut normalizer = Self::new();
        normalizer.rules.extend(custom);
        normalizer
    }

    /// Built-in rules followed by every enabled rule from the config
    pub fn with_config(config: &NormalizerConfig) -> Result<Self, ConfigError> {
        Ok(Self::with_rules(config.build_rules()?))
    }

    /// Register a custom rule after every existing one
    pub fn add_rule(&mut self, rule: FormatRule) {
        debug!(rule = rule.name(), "registered format rule");
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[FormatRule] {
        &self.rules
    }

    pub fn rule_names(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.name())
    }

    /// Normalize one raw log line
    pub fn normalize(&self, line: &str) -> CanonicalLogRecord {
        if let Ok(Value::Object(object)) = serde_json::from_str::<Value>(line) {
            if let Some(record) = structured_record(&object) {
                return record;
            }
        }
        self.match_rules(line)
    }

    /// Normalize raw bytes, replacing invalid UTF-8
    pub fn normalize_bytes(&self, bytes: &[u8]) -> CanonicalLogRecord {
        self.normalize(&String::from_utf8_lossy(bytes))
    }

    /// Normalize an already-parsed value. Objects without a usable
    /// level/message fall back to matching their JSON text.
    pub fn normalize_value(&self, value: &Value) -> CanonicalLogRecord {
        match value {
            Value::Object(object) => {
                structured_record(object).unwrap_or_else(|| self.match_rules(&value.to_string()))
            }
            Value::String(line) => self.normalize(line),
            other => self.match_rules(&other.to_string()),
        }
    }

    /// Lazy, order-preserving normalization of many lines
    pub fn normalize_lines<'a, I>(
        &'a self,
        lines: I,
    ) -> impl Iterator<Item = CanonicalLogRecord> + 'a
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        I::IntoIter: 'a,
    {
        lines.into_iter().map(move |line| self.normalize(line.as_ref()))
    }

    pub fn normalize_batch<S: AsRef<str>>(&self, lines: &[S]) -> Vec<CanonicalLogRecord> {
        self.normalize_lines(lines).collect()
    }

    /// One record per line read; only read errors are surfaced
    pub fn normalize_reader<'a, R>(
        &'a self,
        reader: R,
    ) -> impl Iterator<Item = io::Result<CanonicalLogRecord>> + 'a
    where
        R: BufRead + 'a,
    {
        reader
            .lines()
            .map(move |line| line.map(|line| self.normalize(&line)))
    }

    /// Async variant: one record per chunk, in arrival order
    pub fn normalize_stream<'a, S>(&'a self, chunks: S) -> impl Stream<Item = CanonicalLogRecord> + 'a
    where
        S: Stream + 'a,
        S::Item: AsRef<str>,
    {
        chunks.map(move |chunk| self.normalize(chunk.as_ref()))
    }

    fn match_rules(&self, line: &str) -> CanonicalLogRecord {
        for rule in &self.rules {
            if let Some(partial) = rule.apply(line) {
                debug!(rule = rule.name(), service = ?partial.service, "matched format rule");
                return partial.into_record();
            }
        }

        trace!("no format rule matched, guessing level from keywords");
        PartialRecord {
            level: Some(LogLevel::guess(line)),
            message: Some(line.trim().to_string()),
            ..Default::default()
        }
        .into_record()
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Structured path: needs non-empty string `level` and `message`.
/// Extra top-level keys are folded into metadata without overwriting it.
fn structured_record(object: &Map<String, Value>) -> Option<CanonicalLogRecord> {
    let level = non_empty_str(object.get("level"))?;
    let message = non_empty_str(object.get("message"))?;

    let mut metadata: Metadata = match object.get("metadata") {
        Some(Value::Object(fields)) => fields.clone().into_iter().collect(),
        _ => Metadata::new(),
    };
    for (key, value) in object {
        if !RESERVED_KEYS.contains(&key.as_str()) {
            metadata.entry(key.clone()).or_insert_with(|| value.clone());
        }
    }

    let record = PartialRecord {
        level: Some(LogLevel::canonicalize(level)),
        message: Some(message.to_string()),
        service: non_empty_str(object.get("service")).map(str::to_string),
        timestamp: non_empty_str(object.get("timestamp")).map(str::to_string),
        metadata,
    };
    Some(record.into_record())
}
