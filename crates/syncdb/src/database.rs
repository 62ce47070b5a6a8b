//! [`Database`]: the single front door that binds one paged storage handle
//! (`syncdb-store`) to the client history engine (`syncdb-sync`) and the
//! schema-aware query front-end (`syncdb-query`).
//!
//! Grounded on the teacher's own top-level facade (`Kernel<S: Store>`):
//! one generic wrapper type parameterized over the storage trait, owning
//! the engine and exposing its operations under names a caller would
//! actually reach for, with the facade's own error type absorbing every
//! collaborator's error.

use std::sync::{Arc, RwLock};

use syncdb_core::Schema;
use syncdb_query::{Arguments, BoundQueryPlan};
use syncdb_store::PagedStorage;
use syncdb_sync::{
    BatchState, ChangesetApplier, ChangesetTransformer, ClientHistory, ClientStatus,
    DownloadCursor, IntegrationReport, RemoteChangeset, SaltedFileIdent, SyncProgress,
    UploadChangeset, UploadCursor, UploadDownloadBytes,
};

use crate::error::{Error, Result};

/// The embedded, single-file, multi-version object database. One instance
/// binds to one open storage handle for the file's lifetime; the bound
/// [`Schema`] is consulted only by [`Database::query`] and is not itself
/// persisted by this crate — it is the caller's object-data layer that owns
/// table definitions. The client-history schema-version journal (§4.7.6)
/// this struct reads and migrates through [`ClientHistory`] is a distinct,
/// unrelated marker: a compact version tag the history engine bumps when
/// its own on-disk recompression format changes, not a schema for this
/// crate's [`Schema`] type.
pub struct Database<S: PagedStorage> {
    history: ClientHistory<S>,
    schema: RwLock<Schema>,
}

impl<S: PagedStorage> Database<S> {
    /// Opens a database over a possibly-fresh paged storage handle. If no
    /// history root has been committed yet, the engine defers allocating
    /// one until the first write (spec §4.7.1).
    pub fn open(storage: Arc<S>) -> Self {
        Database {
            history: ClientHistory::initialize(storage),
            schema: RwLock::new(Schema::new()),
        }
    }

    /// Overrides the origin-timestamp clock source used when appending
    /// local history entries. Primarily for tests.
    pub fn with_clock(mut self, clock: Arc<dyn Fn() -> u64 + Send + Sync>) -> Self {
        self.history = self.history.with_clock(clock);
        self
    }

    /// Installs the schema bound to subsequent [`Database::query`] calls.
    pub fn set_schema(&self, schema: Schema) {
        *self.schema.write().expect("schema lock poisoned") = schema;
    }

    /// The schema currently bound to this database.
    pub fn schema(&self) -> Schema {
        self.schema.read().expect("schema lock poisoned").clone()
    }

    /// `get_status()` (spec §4.7.1): current client version, assigned
    /// file identity (if any), and progress cursors.
    pub async fn status(&self) -> Result<ClientStatus> {
        Ok(self.history.get_status().await?)
    }

    /// `get_upload_download_bytes()` (spec §4.7.1).
    pub async fn upload_download_bytes(&self) -> Result<UploadDownloadBytes> {
        Ok(self.history.get_upload_download_bytes().await?)
    }

    /// Assigns this peer's sync file identity (spec §4.7.1/§4.7.4).
    /// `ident.ident` must be nonzero.
    pub async fn assign_client_identity(&self, ident: SaltedFileIdent) -> Result<u64> {
        Ok(self.history.set_client_file_ident_in_wt(ident).await?)
    }

    /// Discards all prior sync history and installs `uploadable` as the
    /// next local entry, around a client reset to `server_version` (spec
    /// §4.7.1).
    pub async fn client_reset(
        &self,
        ident: SaltedFileIdent,
        server_version: (u64, u64),
        uploadable: Vec<u8>,
    ) -> Result<u64> {
        Ok(self
            .history
            .set_client_reset_adjustments(ident, server_version, uploadable)
            .await?)
    }

    /// Records one locally-committed write transaction (spec §4.7.2).
    pub async fn commit_local_changeset(&self, changeset: Vec<u8>) -> Result<u64> {
        Ok(self.history.commit_local_changeset(changeset).await?)
    }

    /// `get_local_changes()` (spec §4.7.1): ordered `(version, changeset)`
    /// pairs for every local entry after the current upload cursor.
    pub async fn local_changes(&self) -> Result<Vec<(u64, Vec<u8>)>> {
        Ok(self.history.get_local_changes().await?)
    }

    /// Validates `progress` is non-decreasing, persists it, and trims the
    /// sync history of any now-upload-skippable prefix (spec
    /// §4.7.1/§4.7.3).
    pub async fn set_sync_progress(
        &self,
        progress: SyncProgress,
        downloadable_bytes: Option<u64>,
    ) -> Result<u64> {
        Ok(self
            .history
            .set_sync_progress(progress, downloadable_bytes)
            .await?)
    }

    /// `find_uploadable_changesets()` (spec §4.7.1): scans forward from
    /// `upload_cursor`, skipping non-local entries, until the soft byte
    /// limit is reached.
    pub async fn find_uploadable_changesets(
        &self,
        upload_cursor: UploadCursor,
        end_version: u64,
    ) -> Result<(UploadCursor, Vec<UploadChangeset>, u64)> {
        Ok(self
            .history
            .find_uploadable_changesets(upload_cursor, end_version)
            .await?)
    }

    /// Appends an entry to each of the four schema-version sequences
    /// (spec §4.7.1/§4.7.6).
    pub async fn record_current_schema_version(&self) -> Result<u64> {
        Ok(self.history.record_current_schema_version().await?)
    }

    /// Integrates one batch of server changesets (spec §4.8): rebases
    /// `incoming` against the local merge window via `transformer`,
    /// applies each rebased changeset via `applier`, and appends one
    /// combined history entry.
    #[allow(clippy::too_many_arguments)]
    pub async fn integrate_server_changesets(
        &self,
        progress: SyncProgress,
        downloadable_bytes: Option<u64>,
        incoming: Vec<RemoteChangeset>,
        batch_state: BatchState,
        transformer: &dyn ChangesetTransformer,
        applier: &dyn ChangesetApplier,
        run_in_write_tr: Option<&dyn Fn() -> syncdb_sync::Result<()>>,
    ) -> Result<IntegrationReport> {
        Ok(syncdb_sync::integrate_server_changesets(
            &self.history,
            progress,
            downloadable_bytes,
            incoming,
            batch_state,
            transformer,
            applier,
            run_in_write_tr,
        )
        .await?)
    }

    /// Parses `predicate_src` and binds it against `root` in the
    /// currently-installed schema (spec §4.6).
    pub fn query(&self, predicate_src: &str, root: &str, args: &dyn Arguments) -> Result<BoundQueryPlan> {
        let parsed = syncdb_query::parse(predicate_src)?;
        let schema = self.schema();
        if schema.object_type(root).is_none() {
            tracing::warn!("rejecting query against unknown object type {root:?}");
            return Err(Error::UnknownObjectType(root.to_string()));
        }
        Ok(syncdb_query::bind(&parsed, &schema, root, args)?)
    }
}

/// A [`ChangesetTransformer`] that leaves every changeset untouched.
/// Correct only when the local merge window for the batch is empty (no
/// concurrent local writes since `last_integrated_local_version`); useful
/// for tests and single-writer setups that never race the server.
pub struct IdentityTransformer;

impl ChangesetTransformer for IdentityTransformer {
    fn transform_remote_changesets(
        &self,
        _local_version: u64,
        _changesets: &mut [RemoteChangeset],
    ) -> syncdb_sync::Result<()> {
        Ok(())
    }
}

/// A [`ChangesetApplier`] that records every changeset it is handed
/// without writing it anywhere, for use in tests that only care about
/// history bookkeeping, not object-data mutation.
#[derive(Default)]
pub struct RecordingApplier {
    applied: std::sync::Mutex<Vec<Vec<u8>>>,
}

impl RecordingApplier {
    pub fn new() -> Self {
        RecordingApplier::default()
    }

    /// Changeset bytes passed to `apply`, in application order.
    pub fn applied(&self) -> Vec<Vec<u8>> {
        self.applied.lock().expect("recording applier lock poisoned").clone()
    }
}

impl ChangesetApplier for RecordingApplier {
    fn apply(&self, changeset: &RemoteChangeset) -> syncdb_sync::Result<()> {
        self.applied
            .lock()
            .expect("recording applier lock poisoned")
            .push(changeset.data.clone());
        Ok(())
    }
}

/// A zero-initialized download cursor, useful as the starting point for
/// the first `set_sync_progress` call on a fresh database.
pub fn initial_download_cursor() -> DownloadCursor {
    DownloadCursor::default()
}
