// Logify query engine - compiles the pipe-delimited log query language
// and folds the result into a backend search filter

pub mod command;
pub mod compiler;
pub mod error;
pub mod translator;

pub use command::{
    FieldsCommand, FilterCommand, FilterOperator, LimitCommand, ParseCommand, QueryCommand,
    SortCommand, SortOrder, StatsCommand,
};
pub use compiler::{compile, ParsedQuery, DEFAULT_LIMIT};
pub use error::QueryError;
pub use translator::{translate, SearchFilter, SearchRequest};

/// Compile, translate and build the wire body in one go
pub fn compile_to_request(query: &str) -> Result<SearchRequest, QueryError> {
    let parsed = compile(query);
    let filter = translate(&parsed)?;
    Ok(filter.to_request())
}
