//! # syncdb
//!
//! The embedded, single-file, multi-version object database with
//! bi-directional sync history. This crate is the front door: it binds
//! together `syncdb-core` (C1-C5: result/future primitives, object
//! identity, paths, values, schema), `syncdb-store` (paged storage),
//! `syncdb-sync` (C7/C8: the client history engine and remote changeset
//! integration), and `syncdb-query` (C6: the query language) behind one
//! [`Database`] type and one [`Error`].
//!
//! ## Core Invariants
//!
//! 1. **History lengths stay in lock-step** - the five sync-history
//!    parallel arrays are always the same length (spec §3.6, P1).
//! 2. **Progress is monotone** - every cursor field only moves forward;
//!    an attempted regression surfaces as an error, never a silent clamp
//!    (spec §3.7, P2).
//! 3. **Trim is conservative** - only a prefix of upload-skippable
//!    entries is ever removed (spec §4.7.3, P3).
//! 4. **Parsing is pure** - a query string parses identically regardless
//!    of what has been committed so far (spec §4.6.3, P9).
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use syncdb::Database;
//! use syncdb_store::MemoryStorage;
//! use syncdb_sync::SaltedFileIdent;
//!
//! let rt = tokio::runtime::Runtime::new().unwrap();
//! rt.block_on(async {
//!     let db = Database::open(Arc::new(MemoryStorage::new()));
//!     db.assign_client_identity(SaltedFileIdent { ident: 7, salt: 1 }).await.unwrap();
//!     let status = db.status().await.unwrap();
//!     assert_eq!(status.client_file_ident.unwrap().ident, 7);
//! });
//! ```

mod database;
mod error;

pub use database::{initial_download_cursor, Database, IdentityTransformer, RecordingApplier};
pub use error::{Error, Result};

// Re-exported so downstream crates only need to depend on `syncdb` for the
// common path (schema construction, value literals, and the argument
// trait needed to call `Database::query`).
pub use syncdb_core::{ObjectClassification, ObjectType, Property, Schema, Value};
pub use syncdb_query::Arguments;
pub use syncdb_sync::{
    BatchState, ChangesetApplier, ChangesetTransformer, ClientStatus, DownloadCursor,
    IntegrationReport, RemoteChangeset, SaltedFileIdent, SyncProgress, UploadChangeset,
    UploadCursor, UploadDownloadBytes,
};
