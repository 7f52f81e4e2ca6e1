//! Typed commands produced by the query compiler, one per pipe-separated stage.
//!
//! Serialized as `{"type": "<kind>", "params": {...}}`.

use crate::error::QueryError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "params", rename_all = "lowercase")]
pub enum QueryCommand {
    Fields(FieldsCommand),
    Filter(FilterCommand),
    Stats(StatsCommand),
    Sort(SortCommand),
    Limit(LimitCommand),
    Parse(ParseCommand),
}

impl QueryCommand {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Fields(_) => "fields",
            Self::Filter(_) => "filter",
            Self::Stats(_) => "stats",
            Self::Sort(_) => "sort",
            Self::Limit(_) => "limit",
            Self::Parse(_) => "parse",
        }
    }
}

/// `fields @timestamp, level, message`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldsCommand {
    pub fields: Vec<String>,
}

/// `filter level = "ERROR"`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCommand {
    pub field: String,
    pub operator: FilterOperator,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterOperator {
    #[serde(rename = "=")]
    Equal,
    #[serde(rename = "!=")]
    NotEqual,
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = ">=")]
    GreaterOrEqual,
    #[serde(rename = "<=")]
    LessOrEqual,
    #[serde(rename = "like")]
    Like,
    #[serde(rename = "not like")]
    NotLike,
}

impl FilterOperator {
    /// Order in which a filter clause is scanned for an operator.
    /// Longer tokens come before the shorter tokens they contain.
    pub const SCAN_ORDER: [Self; 8] = [
        Self::Equal,
        Self::NotEqual,
        Self::GreaterOrEqual,
        Self::LessOrEqual,
        Self::GreaterThan,
        Self::LessThan,
        Self::NotLike,
        Self::Like,
    ];

    pub fn token(&self) -> &'static str {
        match self {
            Self::Equal => "=",
            Self::NotEqual => "!=",
            Self::GreaterThan => ">",
            Self::LessThan => "<",
            Self::GreaterOrEqual => ">=",
            Self::LessOrEqual => "<=",
            Self::Like => "like",
            Self::NotLike => "not like",
        }
    }

    // operators only count when surrounded by spaces
    pub(crate) fn spaced(&self) -> &'static str {
        match self {
            Self::Equal => " = ",
            Self::NotEqual => " != ",
            Self::GreaterThan => " > ",
            Self::LessThan => " < ",
            Self::GreaterOrEqual => " >= ",
            Self::LessOrEqual => " <= ",
            Self::Like => " like ",
            Self::NotLike => " not like ",
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// `stats count(*) by level, service`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsCommand {
    pub function: String,
    pub field: String,
    #[serde(rename = "groupBy")]
    pub group_by: Vec<String>,
}

/// `sort @timestamp desc`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortCommand {
    pub field: String,
    /// Lowercased as written; `asc` when omitted
    pub direction: String,
}

impl SortCommand {
    pub fn order(&self) -> SortOrder {
        SortOrder::from_direction(&self.direction)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    /// `desc` in any case is descending, everything else ascending
    pub fn from_direction(direction: &str) -> Self {
        if direction.eq_ignore_ascii_case("desc") {
            Self::Desc
        } else {
            Self::Asc
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `limit 100`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitCommand {
    pub limit: u32,
}

/// `parse @message "user: *" as user`
///
/// The pattern is a glob, where every `*` captures, unless `regex` is set: then it
/// is a `/regex/flags` literal. Captures are named by the comma-separated alias
/// list, in order; named groups in a regex keep their own names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseCommand {
    pub field: String,
    pub pattern: String,
    pub alias: String,
    /// Set only for an unquoted `/.../` pattern
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub regex: bool,
}

impl ParseCommand {
    pub fn aliases(&self) -> Vec<&str> {
        self.alias
            .split(',')
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .collect()
    }

    pub fn to_regex(&self) -> Result<Regex, QueryError> {
        let literal = if self.regex {
            regex_literal(&self.pattern)
        } else {
            None
        };
        let source = match literal {
            Some((body, "")) => body.to_string(),
            Some((body, flags)) => format!("(?{}){}", flags, body),
            None => glob_to_regex(&self.pattern),
        };

        Regex::new(&source).map_err(|err| QueryError::InvalidPattern {
            pattern: self.pattern.clone(),
            reason: short_reason(&err),
        })
    }

    /// Apply the pattern to `text`; empty when it does not match
    pub fn extract(&self, text: &str) -> Result<BTreeMap<String, String>, QueryError> {
        let regex = self.to_regex()?;
        let aliases = self.aliases();
        let mut values = BTreeMap::new();

        let Some(caps) = regex.captures(text) else {
            return Ok(values);
        };
        for (i, name) in regex.capture_names().enumerate().skip(1) {
            let key = match name.or_else(|| aliases.get(i - 1).copied()) {
                Some(key) => key,
                None => continue,
            };
            if let Some(m) = caps.get(i) {
                values.insert(key.to_string(), m.as_str().to_string());
            }
        }
        Ok(values)
    }
}

// `/body/flags` -> (body, flags); flags are letters only
pub(crate) fn regex_literal(pattern: &str) -> Option<(&str, &str)> {
    let rest = pattern.strip_prefix('/')?;
    let end = rest.rfind('/')?;
    let flags = &rest[end + 1..];
    if !flags.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    Some((&rest[..end], flags))
}

// syntax errors render over several lines with a caret; keep the final `error: ...` line
fn short_reason(err: &regex::Error) -> String {
    let text = err.to_string();
    let last = text
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .unwrap_or_default();
    last.trim().trim_start_matches("error: ").to_string()
}

// every `*` captures lazily, except the last which takes the rest
fn glob_to_regex(glob: &str) -> String {
    let pieces: Vec<&str> = glob.split('*').collect();
    let mut source = String::new();
    for (i, piece) in pieces.iter().enumerate() {
        source.push_str(&regex::escape(piece));
        if i + 2 < pieces.len() {
            source.push_str("(.*?)");
        } else if i + 2 == pieces.len() {
            source.push_str("(.*)");
        }
    }
    source
}
