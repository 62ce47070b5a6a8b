//! # syncdb-sync
//!
//! Client-side history engine (C7) and remote changeset integration (C8):
//! a persistent log of local commits and transformed remote changesets,
//! upload/download progress cursors, trimming, client-file-identity
//! assignment, and client-reset fix-up. This is the replication backbone.
//!
//! ## Key Types
//!
//! - [`ClientHistory`] - the engine itself, bound to one [`syncdb_store::PagedStorage`]
//! - [`SyncHistoryRoot`] - the persisted data model (spec's fixed-width array index)
//! - [`SyncProgress`] / [`DownloadCursor`] / [`UploadCursor`] - progress bookkeeping
//! - [`integrate_server_changesets`] - the C8 integration entry point
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use syncdb_sync::{ClientHistory, SaltedFileIdent};
//! use syncdb_store::SqliteStorage;
//!
//! async fn example() {
//!     let storage = Arc::new(SqliteStorage::open_memory().unwrap());
//!     let history = ClientHistory::initialize(storage);
//!     history
//!         .set_client_file_ident_in_wt(SaltedFileIdent { ident: 1, salt: 7 })
//!         .await
//!         .unwrap();
//! }
//! ```

pub mod error;
pub mod integration;
pub mod messages;
pub mod protocol;

pub use error::{HistoryError, Result};
pub use integration::{
    integrate_server_changesets, BatchState, ChangesetApplier, ChangesetTransformer,
    IntegrationReport, RemoteChangeset,
};
pub use messages::{
    framing, DownloadCursor, HistoryEntry, SaltedFileIdent, SchemaVersions, SyncHistoryRoot,
    SyncProgress, UploadCursor, CLIENT_HISTORY_SCHEMA_VERSION, LIBRARY_VERSION,
};
pub use protocol::{
    ClientHistory, ClientStatus, UploadChangeset, UploadDownloadBytes, INITIAL_VERSION,
    UPLOAD_HARD_LIMIT, UPLOAD_SOFT_LIMIT,
};
