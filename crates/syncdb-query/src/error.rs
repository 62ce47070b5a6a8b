//! Error types surfaced by the query parser and binder (spec §4.6.3, §6.4).

use thiserror::Error;

/// Errors that can occur while parsing or binding a query string.
#[derive(Debug, Error, PartialEq, Clone)]
pub enum QueryError {
    /// Malformed surface syntax; carries the byte offset and a description.
    #[error("syntax error at byte {offset}: {message}")]
    SyntaxError { offset: usize, message: String },

    /// A path element does not resolve against the bound schema.
    #[error("invalid query name: {0}")]
    InvalidQueryName(String),

    /// A literal or placeholder could not be coerced to the column type.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// `$n` referenced an argument outside the bounds of the supplied bundle.
    #[error("argument out of range: ${0}")]
    ArgumentOutOfRange(usize),

    /// Path nesting or descriptor count exceeded the configured limit.
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    /// Propagated from `syncdb-core` (e.g. path nesting depth).
    #[error("core error: {0}")]
    Core(#[from] syncdb_core::Error),
}

/// Result type for query parsing and binding operations.
pub type Result<T> = std::result::Result<T, QueryError>;
