// Filter translator
// Folds compiled commands into the filter the log search backend understands

use crate::command::{FilterCommand, FilterOperator, QueryCommand, SortOrder};
use crate::compiler::{ParsedQuery, DEFAULT_LIMIT};
use crate::error::QueryError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::trace;

/// Search filter built fresh for every translated query
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilter {
    pub search_messages: Vec<String>,
    pub selected_levels: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_service: Option<String>,
    pub metadata: BTreeMap<String, String>,
    pub page: u32,
    pub limit: u32,
    pub sort_order: SortOrder,
}

impl Default for SearchFilter {
    fn default() -> Self {
        Self {
            search_messages: Vec::new(),
            selected_levels: Vec::new(),
            selected_service: None,
            metadata: BTreeMap::new(),
            page: 1,
            limit: DEFAULT_LIMIT,
            sort_order: SortOrder::Desc,
        }
    }
}

/// Request body for `POST /v1/logs/search`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub levels: Option<Vec<String>>,

    pub message_contains: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, String>>,

    pub sort: String,
    pub order: SortOrder,
    pub page: u32,
    pub limit: u32,
}

impl SearchFilter {
    /// Wire form: empty selections are left out, `"all"` means no service filter
    pub fn to_request(&self) -> SearchRequest {
        SearchRequest {
            service: self
                .selected_service
                .clone()
                .filter(|service| service != "all"),
            levels: Some(self.selected_levels.clone()).filter(|levels| !levels.is_empty()),
            message_contains: self.search_messages.clone(),
            metadata: Some(self.metadata.clone()).filter(|metadata| !metadata.is_empty()),
            sort: "timestamp".to_string(),
            order: self.sort_order,
            page: self.page,
            limit: self.limit,
        }
    }
}

/// Fold a compiled query into a [`SearchFilter`].
/// Rejects queries that carry an error or have no commands.
pub fn translate(parsed: &ParsedQuery) -> Result<SearchFilter, QueryError> {
    if let Some(err) = &parsed.error {
        return Err(err.clone());
    }
    if parsed.commands.is_empty() {
        return Err(QueryError::InvalidQuery);
    }

    let mut filter = SearchFilter::default();
    for command in &parsed.commands {
        match command {
            QueryCommand::Filter(cmd) => apply_filter(&mut filter, cmd),
            QueryCommand::Sort(cmd) => {
                if cmd.field == "timestamp" || cmd.field == "@timestamp" {
                    filter.sort_order = cmd.order();
                }
            }
            QueryCommand::Limit(cmd) => filter.limit = cmd.limit,
            // display-only commands
            QueryCommand::Fields(_) | QueryCommand::Stats(_) | QueryCommand::Parse(_) => {}
        }
    }
    Ok(filter)
}

fn apply_filter(filter: &mut SearchFilter, cmd: &FilterCommand) {
    use FilterOperator::{Equal, Like};

    match (cmd.field.as_str(), cmd.operator) {
        ("level", Equal) => {
            let level = cmd.value.to_uppercase();
            if !filter.selected_levels.contains(&level) {
                filter.selected_levels.push(level);
            }
        }
        ("service", Equal) => filter.selected_service = Some(cmd.value.clone()),
        ("message" | "@message", Equal | Like) => filter.search_messages.push(cmd.value.clone()),
        (field, _)
            if !field.is_empty()
                && !field.starts_with('@')
                && !matches!(field, "level" | "service" | "message") =>
        {
            filter.metadata.insert(field.to_string(), cmd.value.clone());
        }
        (field, operator) => trace!(field, %operator, "filter has no search equivalent"),
    }
}
