//! # Query Compiler
//!
//! Compiles a pipe-delimited query into typed [`QueryCommand`]s.
//!
//! Syntax:
//! ```text
//! fields @timestamp, message | filter level = "ERROR" | sort @timestamp desc | limit 20
//! ```
//!
//! A recognised command with sloppy arguments is read as best it can be; an
//! unknown command name stops compilation, keeping the stages before it.

use crate::command::{
    regex_literal, FieldsCommand, FilterCommand, FilterOperator, LimitCommand, ParseCommand,
    QueryCommand, SortCommand, StatsCommand,
};
use crate::error::QueryError;
use serde::{Serialize, Serializer};
use tracing::{debug, warn};

/// Page size used when a `limit` stage is missing or unreadable
pub const DEFAULT_LIMIT: u32 = 20;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedQuery {
    /// Stages compiled before `error` (if any) stopped compilation
    pub commands: Vec<QueryCommand>,

    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "error_text")]
    pub error: Option<QueryError>,
}

impl ParsedQuery {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_result(self) -> Result<Vec<QueryCommand>, QueryError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.commands),
        }
    }
}

fn error_text<S: Serializer>(error: &Option<QueryError>, serializer: S) -> Result<S::Ok, S::Error> {
    match error {
        Some(err) => serializer.collect_str(err),
        None => serializer.serialize_none(),
    }
}

/// Compile a raw query string
pub fn compile(query: &str) -> ParsedQuery {
    if query.trim().is_empty() {
        return ParsedQuery {
            commands: Vec::new(),
            error: Some(QueryError::Empty),
        };
    }

    let mut commands = Vec::new();
    for stage in query.split('|').map(str::trim).filter(|s| !s.is_empty()) {
        match compile_stage(stage) {
            Ok(command) => {
                debug!(kind = command.kind(), stage, "compiled stage");
                commands.push(command);
            }
            Err(err @ QueryError::UnknownCommand(_)) => {
                warn!(stage, "unknown command, stopping");
                return ParsedQuery {
                    commands,
                    error: Some(err),
                };
            }
            Err(err) => {
                warn!(stage, error = %err, "stage failed, discarding query");
                return ParsedQuery {
                    commands: Vec::new(),
                    error: Some(QueryError::Internal(err.to_string())),
                };
            }
        }
    }

    ParsedQuery {
        commands,
        error: None,
    }
}

fn compile_stage(stage: &str) -> Result<QueryCommand, QueryError> {
    let (keyword, rest) = match stage.split_once(char::is_whitespace) {
        Some((keyword, rest)) => (keyword, rest.trim()),
        None => (stage, ""),
    };

    match keyword.to_lowercase().as_str() {
        "fields" => Ok(QueryCommand::Fields(parse_fields(rest))),
        "filter" => Ok(QueryCommand::Filter(parse_filter(rest))),
        "stats" => Ok(QueryCommand::Stats(parse_stats(rest))),
        "sort" => Ok(QueryCommand::Sort(parse_sort(rest))),
        "limit" => Ok(QueryCommand::Limit(parse_limit(rest))),
        "parse" => Ok(QueryCommand::Parse(parse_parse(rest)?)),
        other => Err(QueryError::UnknownCommand(other.to_string())),
    }
}

fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

// one layer of matching single or double quotes
fn strip_quotes(s: &str) -> &str {
    let quoted = s.len() >= 2
        && ((s.starts_with('"') && s.ends_with('"')) || (s.starts_with('\'') && s.ends_with('\'')));
    if quoted {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

fn parse_fields(rest: &str) -> FieldsCommand {
    FieldsCommand {
        fields: split_list(rest),
    }
}

fn parse_filter(rest: &str) -> FilterCommand {
    // first operator in scan order wins, split at its first occurrence
    for operator in FilterOperator::SCAN_ORDER {
        if let Some((field, value)) = rest.split_once(operator.spaced()) {
            return FilterCommand {
                field: field.trim().to_string(),
                operator,
                value: strip_quotes(value.trim()).to_string(),
            };
        }
    }

    // no operator: `filter field value` reads as equality
    let (field, value) = rest.split_once(' ').unwrap_or((rest, ""));
    FilterCommand {
        field: field.to_string(),
        operator: FilterOperator::Equal,
        value: strip_quotes(value.trim()).to_string(),
    }
}

fn parse_stats(rest: &str) -> StatsCommand {
    let (aggregation, group_by) = match rest.split_once(" by ") {
        Some((aggregation, groups)) => (aggregation.trim(), split_list(groups)),
        None => (rest, Vec::new()),
    };

    let call = aggregation
        .find('(')
        .and_then(|open| matching_paren(aggregation, open).map(|close| (open, close)));
    let (function, field) = match call {
        Some((open, close)) => (aggregation[..open].trim(), aggregation[open + 1..close].trim()),
        None => (aggregation, ""),
    };

    StatsCommand {
        function: function.to_string(),
        field: field.to_string(),
        group_by,
    }
}

// index of the `)` balancing the `(` at `open`
fn matching_paren(s: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in s[open..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_sort(rest: &str) -> SortCommand {
    let mut tokens = rest.split_whitespace();
    let field = tokens.next().unwrap_or("").to_string();
    let direction = tokens
        .next()
        .map(str::to_lowercase)
        .unwrap_or_else(|| "asc".to_string());

    SortCommand { field, direction }
}

fn parse_limit(rest: &str) -> LimitCommand {
    // leading digits only, like `limit 50 rows`
    let unsigned = rest.strip_prefix('+').unwrap_or(rest);
    let end = unsigned
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(unsigned.len());

    let limit = unsigned[..end]
        .parse::<u32>()
        .ok()
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_LIMIT);

    LimitCommand { limit }
}

fn parse_parse(rest: &str) -> Result<ParseCommand, QueryError> {
    // last ` as ` so a quoted pattern may contain the word itself
    let (main, alias) = match rest.rsplit_once(" as ") {
        Some((main, alias)) => (main.trim(), alias.trim()),
        None => (rest, ""),
    };
    let (field, written) = match main.split_once(' ') {
        Some((field, pattern)) => (field.trim(), pattern.trim()),
        None => (main, ""),
    };
    let pattern = strip_quotes(written);
    // only a bare `/.../flags` is a regex; quoting keeps it a glob
    let regex = pattern.len() == written.len() && regex_literal(written).is_some();

    let command = ParseCommand {
        field: field.to_string(),
        pattern: pattern.to_string(),
        alias: alias.to_string(),
        regex,
    };
    command.to_regex()?;
    Ok(command)
}
