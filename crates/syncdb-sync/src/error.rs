//! Error types for the client history engine and remote changeset
//! integration (C7/C8).

use thiserror::Error;

/// Errors that can occur while operating on the sync history root.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// Underlying paged storage failed.
    #[error("storage error: {0}")]
    Storage(#[from] syncdb_store::StoreError),

    /// The persisted root could not be decoded, or decoded into a shape
    /// that violates the length invariant of §3.6.
    #[error("corrupt history root: {0}")]
    CorruptRoot(String),

    /// A progress cursor update would decrease a monotonic field (spec
    /// §3.7). Fatal: the caller has a logic bug.
    #[error("bad progress: {0}")]
    BadProgress(String),

    /// A changeset failed to parse, transform, or apply during integration
    /// (spec §4.8).
    #[error("bad changeset: {0}")]
    BadChangeset(String),

    /// `set_client_file_ident_in_wt` was called with ident == 0.
    #[error("client file identity must be nonzero")]
    ZeroClientFileIdent,

    /// `get_local_key` / fix-up encountered an `ObjectID` outside the
    /// 30-bit/32-bit precondition for this peer.
    #[error("object id error: {0}")]
    ObjectId(#[from] syncdb_core::Error),

    /// A stored schema version is newer than this code understands.
    #[error("schema version {stored} is incompatible with current version {current}")]
    IncompatibleSchemaVersion { stored: i64, current: i64 },

    /// Compression/decompression of changeset bytes failed.
    #[error("compression error: {0}")]
    Compression(String),
}

/// Result type for history engine operations.
pub type Result<T> = std::result::Result<T, HistoryError>;
