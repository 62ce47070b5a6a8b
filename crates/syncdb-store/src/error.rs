//! Error types for the paged storage abstraction.

use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Serialization/deserialization error for the persisted history root.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Invalid data read back from storage.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Concurrent writer lost the race to commit; caller should retry.
    #[error("write conflict: expected base version {expected}, storage is at {actual}")]
    WriteConflict { expected: u64, actual: u64 },

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The internal mutex guarding the connection was poisoned by a panic
    /// in another thread.
    #[error("storage lock poisoned")]
    Poisoned,
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
