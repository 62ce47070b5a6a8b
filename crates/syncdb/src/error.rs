//! Facade error type: unifies the errors of every crate `Database` draws
//! on into one enum callers can match on without reaching into the
//! individual crates.

use thiserror::Error;

/// Errors that can occur while operating on a [`crate::Database`].
#[derive(Debug, Error)]
pub enum Error {
    /// A core primitive failed (path nesting, object-id precondition, …).
    #[error("core error: {0}")]
    Core(#[from] syncdb_core::Error),

    /// The paged storage backend failed.
    #[error("storage error: {0}")]
    Store(#[from] syncdb_store::StoreError),

    /// The client history engine rejected an operation.
    #[error("history error: {0}")]
    History(syncdb_sync::HistoryError),

    /// Query parsing or binding failed.
    #[error("query error: {0}")]
    Query(#[from] syncdb_query::QueryError),

    /// A query named an object type absent from the bound schema.
    #[error("unknown object type: {0}")]
    UnknownObjectType(String),

    /// The stored client-history schema version is outside what this build
    /// can open: either newer than it understands, or older with no known
    /// migration path (spec §4.7.6). Raised in place of the generic
    /// [`Error::History`] wrap because callers typically need to
    /// distinguish "this file needs a newer build" from an ordinary
    /// history-engine failure.
    #[error("incompatible schema change: {0}")]
    IncompatibleSchema(String),
}

impl From<syncdb_sync::HistoryError> for Error {
    fn from(e: syncdb_sync::HistoryError) -> Self {
        match e {
            syncdb_sync::HistoryError::IncompatibleSchemaVersion { stored, current } => {
                Error::IncompatibleSchema(format!(
                    "stored schema version {stored} is incompatible with current version {current}"
                ))
            }
            other => Error::History(other),
        }
    }
}

/// Result type for `Database` operations.
pub type Result<T> = std::result::Result<T, Error>;
