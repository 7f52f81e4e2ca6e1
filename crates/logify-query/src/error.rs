use thiserror::Error;

/// Diagnostics shown directly to the query author
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("Empty query")]
    Empty,

    #[error("Unknown command type: {0}")]
    UnknownCommand(String),

    #[error("Invalid parse pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    // unexpected failure while compiling a recognised stage
    #[error("Failed to parse query: {0}")]
    Internal(String),

    #[error("Invalid query")]
    InvalidQuery,
}
