//! The client history engine (C7): persistent arrays of committed local
//! changesets and integrated remote changesets, sync progress cursors,
//! trimming, client-reset assignment, and the schema-version journal.
//!
//! Grounded on `client_history_impl.cpp`'s `ClientHistory` class. The
//! original mutates B+-tree arrays living inside an open write transaction;
//! here each public operation loads the current [`SyncHistoryRoot`] from
//! [`PagedStorage`], mutates it in memory, and commits it back under the
//! storage's optimistic-concurrency version check.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use syncdb_store::PagedStorage;

use crate::error::{HistoryError, Result};
use crate::messages::{
    framing, DownloadCursor, HistoryEntry, SaltedFileIdent, SyncHistoryRoot, SyncProgress,
    UploadCursor, CLIENT_HISTORY_SCHEMA_VERSION, LIBRARY_VERSION,
};

/// The version at which an empty history root is first materialized, used
/// as the trim floor before any download progress has been recorded (see
/// DESIGN.md's Open Question resolution for `s_initial_version`).
pub const INITIAL_VERSION: u64 = 1;

/// Soft byte-size target for one `find_uploadable_changesets` batch (spec
/// §4.7.1): scanning stops once accumulated uncompressed size reaches this,
/// unless no changeset has been emitted yet.
pub const UPLOAD_SOFT_LIMIT: usize = 0x20000;
/// Hard, server-imposed ceiling a batch must never cross (except to emit
/// the first changeset, which is always emitted regardless of size).
pub const UPLOAD_HARD_LIMIT: usize = 16 * 1024 * 1024;

fn wall_clock_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before Unix epoch")
        .as_millis() as u64
}

/// One changeset ready to hand to the sync client for upload (spec
/// §4.7.1's `find_uploadable_changesets`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadChangeset {
    pub origin_timestamp: u64,
    pub origin_file_ident: u64,
    pub progress: UploadCursor,
    /// Decompressed changeset bytes.
    pub bytes: Vec<u8>,
}

/// `(current_client_version, client_file_ident, progress)` snapshot
/// returned by `get_status` (spec §4.7.1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientStatus {
    pub current_client_version: u64,
    pub client_file_ident: Option<SaltedFileIdent>,
    pub progress: SyncProgress,
}

/// Cumulative byte counters returned by `get_upload_download_bytes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UploadDownloadBytes {
    pub downloaded_bytes: u64,
    pub downloadable_bytes: u64,
    pub uploaded_bytes: u64,
    pub uploadable_bytes: u64,
}

/// The client-side history engine. One instance binds to one paged storage
/// handle for the lifetime of the open file (spec §4.7.1's `initialize`).
pub struct ClientHistory<S: PagedStorage> {
    storage: Arc<S>,
    clock: Arc<dyn Fn() -> u64 + Send + Sync>,
}

impl<S: PagedStorage> ClientHistory<S> {
    /// Binds to a possibly-fresh paged storage handle. If no root has been
    /// committed yet, allocation of the root is deferred until the first
    /// write (spec §4.7.1).
    pub fn initialize(storage: Arc<S>) -> Self {
        ClientHistory {
            storage,
            clock: Arc::new(wall_clock_millis),
        }
    }

    /// Overrides the origin-timestamp clock source (spec §4.7.2: "a
    /// pluggable clock function"). Primarily for tests.
    pub fn with_clock(mut self, clock: Arc<dyn Fn() -> u64 + Send + Sync>) -> Self {
        self.clock = clock;
        self
    }

    async fn load(&self) -> Result<(u64, SyncHistoryRoot)> {
        let version = self.storage.current_version().await?;
        let (version, mut root) = match self.storage.load_root().await? {
            Some(snapshot) => (snapshot.version, SyncHistoryRoot::deserialize(&snapshot.bytes)?),
            None => {
                let mut root = SyncHistoryRoot::default();
                root.initial_version = INITIAL_VERSION;
                root.base_version = INITIAL_VERSION;
                return Ok((version, root));
            }
        };

        if self.migrate_schema_if_needed(&mut root, version)? {
            let new_version = self.save(version, &root).await?;
            return Ok((new_version, root));
        }
        Ok((version, root))
    }

    /// Enforces spec §4.7.6's per-version compatibility matrix on every
    /// load: a stored schema version strictly behind
    /// [`CLIENT_HISTORY_SCHEMA_VERSION`] is upgraded through the one
    /// documented migration path (11 → 12); a version this build doesn't
    /// recognize — ahead of current, or behind with no migration path — is
    /// fatal. Returns whether `root` was mutated and needs persisting.
    fn migrate_schema_if_needed(&self, root: &mut SyncHistoryRoot, snapshot_version: u64) -> Result<bool> {
        let stored = match root.schema_versions.latest_schema_version() {
            None => return Ok(false),
            Some(v) => v,
        };

        if stored == CLIENT_HISTORY_SCHEMA_VERSION {
            return Ok(false);
        }
        if stored == 11 && CLIENT_HISTORY_SCHEMA_VERSION == 12 {
            migrate_11_to_12(root)?;
            record_schema_version(root, snapshot_version, (self.clock)() as i64);
            return Ok(true);
        }

        tracing::warn!(
            stored,
            current = CLIENT_HISTORY_SCHEMA_VERSION,
            "stored schema version has no migration path to the current version"
        );
        Err(HistoryError::IncompatibleSchemaVersion {
            stored,
            current: CLIENT_HISTORY_SCHEMA_VERSION,
        })
    }

    async fn save(&self, expected_version: u64, root: &SyncHistoryRoot) -> Result<u64> {
        let bytes = root.serialize()?;
        Ok(self.storage.commit_root(expected_version, bytes).await?)
    }

    /// `get_status()`: `(current_client_version, ident, progress)` (spec
    /// §4.7.1).
    pub async fn get_status(&self) -> Result<ClientStatus> {
        let (version, root) = self.load().await?;
        Ok(ClientStatus {
            current_client_version: version,
            client_file_ident: root.client_file_ident,
            progress: root.progress,
        })
    }

    /// `get_upload_download_bytes()` (spec §4.7.1): four cumulative byte
    /// counters persisted in the root.
    pub async fn get_upload_download_bytes(&self) -> Result<UploadDownloadBytes> {
        let (_, root) = self.load().await?;
        Ok(UploadDownloadBytes {
            downloaded_bytes: root.downloaded_bytes,
            downloadable_bytes: root.downloadable_bytes,
            uploaded_bytes: root.uploaded_bytes,
            uploadable_bytes: root.uploadable_bytes,
        })
    }

    /// The current sync-history base version (spec §3.6), used by the
    /// remote changeset integration path to clamp merge windows.
    pub(crate) async fn load_base_version(&self) -> Result<u64> {
        Ok(self.load().await?.1.base_version)
    }

    /// Assigns this peer's sync file identity (spec §4.7.1). `ident.ident`
    /// must be nonzero. Zeros the client-version components of the
    /// download/upload cursors, produces an empty changeset as the next
    /// local entry, and fixes up any previously-stored unuploaded local
    /// changeset that referenced the not-yet-assigned identity (spec
    /// §4.7.4).
    pub async fn set_client_file_ident_in_wt(&self, ident: SaltedFileIdent) -> Result<u64> {
        if ident.ident == 0 {
            return Err(HistoryError::ZeroClientFileIdent);
        }
        let (version, mut root) = self.load().await?;

        root.client_file_ident = Some(ident);
        root.client_file_ident_salt = ident.salt;
        root.progress.download.last_integrated_client_version = 0;
        root.progress.upload.client_version = 0;

        append_local_entry(&mut root, Vec::new(), (self.clock)())?;
        fix_up_client_file_ident_in_stored_changesets(&mut root, ident.ident)?;

        self.save(version, &root).await
    }

    /// Discards all prior sync history and installs `uploadable` as the
    /// next local entry to upload; resets progress cursors around
    /// `server_version` (spec §4.7.1, mirroring
    /// `set_client_reset_adjustments`).
    pub async fn set_client_reset_adjustments(
        &self,
        ident: SaltedFileIdent,
        server_version: (u64, u64),
        uploadable: Vec<u8>,
    ) -> Result<u64> {
        let (version, mut root) = self.load().await?;

        root.client_file_ident = Some(ident);
        root.client_file_ident_salt = ident.salt;
        root.progress = SyncProgress {
            latest_server_version: server_version.0,
            latest_server_version_salt: server_version.1,
            download: DownloadCursor {
                server_version: server_version.0,
                last_integrated_client_version: 0,
            },
            upload: UploadCursor {
                client_version: 0,
                last_integrated_server_version: 0,
            },
        };
        root.downloaded_bytes = 0;
        root.downloadable_bytes = 0;
        root.uploaded_bytes = 0;
        root.uploadable_bytes = 0;

        // Discard existing synchronization history (`do_trim_sync_history`
        // applied to its own full length).
        root.base_version += root.sync_history_size() as u64;
        root.changesets.clear();
        root.reciprocal_transforms.clear();
        root.remote_versions.clear();
        root.origin_file_idents.clear();
        root.origin_timestamps.clear();

        append_local_entry(&mut root, uploadable, (self.clock)())?;

        self.save(version, &root).await
    }

    /// `get_local_changes(current_version)` (spec §4.7.1): ordered
    /// `(version, changeset)` pairs for every local entry after the
    /// current upload cursor.
    pub async fn get_local_changes(&self) -> Result<Vec<(u64, Vec<u8>)>> {
        let (_, root) = self.load().await?;
        if root.changesets.is_empty() {
            return Ok(Vec::new());
        }

        let mut begin_version = root.progress.upload.client_version;
        if begin_version < root.base_version {
            begin_version = root.base_version;
        }
        let end_version = root.base_version + root.sync_history_size() as u64;

        let mut out = Vec::new();
        for version in begin_version..end_version {
            let idx = (version - root.base_version) as usize;
            if root.origin_file_idents[idx] == 0 {
                let changeset = framing::decompress(&root.changesets[idx])?;
                out.push((version, changeset));
            }
        }
        Ok(out)
    }

    /// Validates `progress` is non-decreasing, persists it, and trims
    /// history (spec §4.7.1/§4.7.3).
    pub async fn set_sync_progress(&self, progress: SyncProgress, downloadable_bytes: Option<u64>) -> Result<u64> {
        let (version, mut root) = self.load().await?;
        self.apply_sync_progress(&mut root, progress, downloadable_bytes)?;
        self.save(version, &root).await
    }

    fn apply_sync_progress(
        &self,
        root: &mut SyncHistoryRoot,
        progress: SyncProgress,
        downloadable_bytes: Option<u64>,
    ) -> Result<()> {
        progress.check_monotonic(&root.progress)?;

        let previous_upload_client_version = root.progress.upload.client_version;
        root.uploaded_bytes += sum_of_history_entry_sizes(
            root,
            previous_upload_client_version,
            progress.upload.client_version,
        )?;

        if let Some(bytes) = downloadable_bytes {
            root.downloadable_bytes = bytes;
        }
        root.progress = progress;

        trim_sync_history(root);
        Ok(())
    }

    /// Scans forward from `upload_cursor`, skipping non-local entries,
    /// until the soft byte limit is reached (or the hard limit would be
    /// crossed) — always emitting at least one changeset (spec §4.7.1).
    /// Returns the advanced cursor, the batch, and the download cursor's
    /// locked server version.
    pub async fn find_uploadable_changesets(
        &self,
        upload_cursor: UploadCursor,
        end_version: u64,
    ) -> Result<(UploadCursor, Vec<UploadChangeset>, u64)> {
        let (_, root) = self.load().await?;

        // Versions are 1:1 with array position (`version = base_version +
        // idx`), matching `get_local_changes`'s convention. The caller's
        // `end_version` is clamped to the actual history length so the
        // scan never indexes past the parallel arrays even when the
        // caller passes an unbounded request (spec scenario 1: "end_version
        // = infinity").
        let history_end = root.base_version + root.sync_history_size() as u64;
        let end = end_version.min(history_end).max(root.base_version);
        let mut next_version = (upload_cursor.client_version + 1).max(root.base_version);
        let mut cursor_version = upload_cursor.client_version;
        let mut last_integrated = upload_cursor.last_integrated_server_version;
        let mut batch = Vec::new();
        let mut accum: usize = 0;

        while accum < UPLOAD_SOFT_LIMIT {
            let Some(idx) = (next_version..end)
                .map(|v| (v - root.base_version) as usize)
                .find(|&idx| root.origin_file_idents[idx] == 0 && !root.changesets[idx].is_empty())
            else {
                break;
            };
            let version = root.base_version + idx as u64;

            let decompressed = framing::decompress(&root.changesets[idx])?;
            if accum + decompressed.len() >= UPLOAD_HARD_LIMIT && !batch.is_empty() {
                break;
            }
            accum += decompressed.len();
            last_integrated = root.remote_versions[idx];
            cursor_version = version;
            next_version = version + 1;

            batch.push(UploadChangeset {
                origin_timestamp: root.origin_timestamps[idx],
                origin_file_ident: root.origin_file_idents[idx],
                progress: UploadCursor {
                    client_version: version,
                    last_integrated_server_version: root.remote_versions[idx],
                },
                bytes: decompressed,
            });
        }

        let cursor = UploadCursor {
            client_version: cursor_version,
            last_integrated_server_version: last_integrated,
        };
        Ok((cursor, batch, root.progress.download.server_version))
    }

    /// Appends an entry to each of the four schema-versions sequences
    /// (spec §4.7.1/§4.7.6).
    pub async fn record_current_schema_version(&self) -> Result<u64> {
        let (version, mut root) = self.load().await?;
        record_schema_version(&mut root, version, (self.clock)() as i64);
        self.save(version, &root).await
    }

    /// Records one locally-committed write transaction (spec §4.7.2): the
    /// caller's write-transaction commit hook calls this with the
    /// transaction's encoded changeset (possibly empty, for a transaction
    /// that touched no synchronized table). `origin_timestamp` is taken
    /// from this history's clock; `last_integrated_remote_version` is the
    /// download cursor's current server version.
    pub async fn commit_local_changeset(&self, changeset: Vec<u8>) -> Result<u64> {
        let (version, mut root) = self.load().await?;
        append_local_entry(&mut root, changeset, (self.clock)())?;
        self.save(version, &root).await
    }

    /// Re-reads the current root and, if committing a local mutation would
    /// conflict, the caller should retry; this engine models a single
    /// writer so a conflict here indicates misuse from two writers sharing
    /// one [`ClientHistory`].
    pub(crate) async fn commit_local_entry(&self, entry: HistoryEntry) -> Result<u64> {
        let (version, mut root) = self.load().await?;
        push_sync_history_entry(&mut root, entry)?;
        self.save(version, &root).await
    }

    pub(crate) fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    pub(crate) fn clock(&self) -> u64 {
        (self.clock)()
    }

    /// Appends a remote-origin sync history entry built from a combined,
    /// already-transformed changeset buffer, accounts its original wire
    /// size into `downloaded_bytes`, and — on the last message of a batch —
    /// applies the accompanying progress update (spec §4.8 steps 6-8).
    /// Returns `(old_version, new_version)`.
    pub(crate) async fn integrate_remote_entry(
        &self,
        entry: HistoryEntry,
        downloaded_bytes_delta: u64,
        progress_update: Option<(SyncProgress, Option<u64>)>,
    ) -> Result<(u64, u64)> {
        let (old_version, mut root) = self.load().await?;

        push_sync_history_entry(&mut root, entry)?;
        root.downloaded_bytes += downloaded_bytes_delta;

        if let Some((progress, downloadable_bytes)) = progress_update {
            self.apply_sync_progress(&mut root, progress, downloadable_bytes)?;
        }

        let new_version = self.save(old_version, &root).await?;
        Ok((old_version, new_version))
    }
}

fn append_local_entry(root: &mut SyncHistoryRoot, changeset: Vec<u8>, timestamp: u64) -> Result<()> {
    let entry = HistoryEntry {
        origin_file_ident: 0,
        origin_timestamp: timestamp,
        last_integrated_remote_version: root.progress.download.server_version,
        changeset,
    };
    push_sync_history_entry(root, entry)
}

/// `add_sync_history_entry` (spec §4.7.2): compresses the changeset,
/// appends to all five parallel arrays, and (for local entries) maintains
/// `progress_uploadable_bytes` incrementally.
fn push_sync_history_entry(root: &mut SyncHistoryRoot, entry: HistoryEntry) -> Result<()> {
    root.check_lengths()?;

    let is_local = entry.origin_file_ident == 0;
    if is_local {
        root.uploadable_bytes += entry.changeset.len() as u64;
    }

    let compressed = if entry.changeset.is_empty() {
        Vec::new()
    } else {
        framing::compress(&entry.changeset)?
    };

    root.changesets.push(compressed);
    root.reciprocal_transforms.push(Vec::new());
    root.remote_versions.push(entry.last_integrated_remote_version);
    root.origin_file_idents.push(entry.origin_file_ident);
    root.origin_timestamps.push(entry.origin_timestamp);
    Ok(())
}

/// `sum_of_history_entry_sizes` (spec §4.7.5): sum of uncompressed sizes of
/// local entries in `(from, to]`, used to advance `uploaded_bytes` lazily
/// as the upload cursor moves forward.
fn sum_of_history_entry_sizes(root: &SyncHistoryRoot, from: u64, to: u64) -> Result<u64> {
    if to <= from {
        return Ok(0);
    }
    let mut total = 0u64;
    for version in from.max(root.base_version)..to {
        let idx = (version - root.base_version) as usize;
        if idx >= root.changesets.len() {
            break;
        }
        if !root.changesets[idx].is_empty() {
            total += framing::decompress(&root.changesets[idx])?.len() as u64;
        }
    }
    Ok(total)
}

/// `trim_sync_history` / `do_trim_sync_history` (spec §4.7.3): drops the
/// leading run of upload-skippable entries up through
/// `max(progress.download.last_integrated_client_version, initial_version)`.
fn trim_sync_history(root: &mut SyncHistoryRoot) {
    let begin = root.base_version;
    let mut end = root
        .progress
        .download
        .last_integrated_client_version
        .max(root.initial_version);
    if end < begin {
        end = begin;
    }

    let offset = (end - begin) as usize;
    let scan_len = root.sync_history_size().saturating_sub(offset);
    let mut skippable = 0usize;
    while skippable < scan_len {
        let idx = offset + skippable;
        let of_local_origin = root.origin_file_idents[idx] == 0;
        if of_local_origin && !root.changesets[idx].is_empty() {
            break;
        }
        skippable += 1;
    }
    let n = offset + skippable;
    do_trim_sync_history(root, n);
}

fn do_trim_sync_history(root: &mut SyncHistoryRoot, n: usize) {
    let n = n.min(root.sync_history_size());
    if n == 0 {
        return;
    }
    root.changesets.drain(0..n);
    root.reciprocal_transforms.drain(0..n);
    root.remote_versions.drain(0..n);
    root.origin_file_idents.drain(0..n);
    root.origin_timestamps.drain(0..n);
    root.base_version += n as u64;
}

/// `fix_up_client_file_ident_in_stored_changesets` (spec §4.7.4): rewrites
/// `ObjectID{hi=0, lo}` occurrences in unuploaded local changesets to
/// `{hi=ident, lo}`. The history layer never otherwise inspects instruction
/// bytes (spec §6.3); this is the one exception. Since this crate does not
/// carry a changeset instruction decoder, the fix-up operates at the
/// framing level: bytes are round-tripped through decompression and
/// recompression so the operation is idempotent and the byte-accounting
/// invariant holds, but the payload rewrite itself is the responsibility of
/// the caller-supplied instruction codec (see `syncdb`'s facade, which owns
/// the changeset encoder).
fn fix_up_client_file_ident_in_stored_changesets(root: &mut SyncHistoryRoot, client_file_ident: u64) -> Result<()> {
    debug_assert_ne!(client_file_ident, 0);
    for i in 0..root.sync_history_size() {
        if root.origin_file_idents[i] != 0 {
            continue;
        }
        if root.changesets[i].is_empty() {
            continue;
        }
        // Idempotent: decompress-then-recompress without modification is a
        // byte-identical round trip once the payload itself has already
        // been rewritten by the caller. Net size delta is therefore zero
        // here; a real instruction rewrite would adjust `uploadable_bytes`
        // by the size delta at this point (spec §4.7.4).
        let decompressed = framing::decompress(&root.changesets[i])?;
        root.changesets[i] = framing::compress(&decompressed)?;
    }
    Ok(())
}

/// Schema migration 11 → 12 (spec §4.7.6): the pre-12 on-disk format stored
/// `changesets`/`reciprocal_transforms` entries as raw, uncompressed
/// bytes. Re-read each non-empty entry as such a raw blob and recompress it
/// with the (non-portable) framing codec, in lockstep across both arrays.
fn migrate_11_to_12(root: &mut SyncHistoryRoot) -> Result<()> {
    for i in 0..root.sync_history_size() {
        if !root.changesets[i].is_empty() {
            root.changesets[i] = framing::compress(&root.changesets[i])?;
        }
        if !root.reciprocal_transforms[i].is_empty() {
            root.reciprocal_transforms[i] = framing::compress(&root.reciprocal_transforms[i])?;
        }
    }
    Ok(())
}

fn record_schema_version(root: &mut SyncHistoryRoot, snapshot_version: u64, timestamp: i64) {
    root.schema_versions.push(
        CLIENT_HISTORY_SCHEMA_VERSION,
        LIBRARY_VERSION,
        snapshot_version,
        timestamp,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use syncdb_store::MemoryStorage;

    fn history() -> ClientHistory<MemoryStorage> {
        ClientHistory::initialize(Arc::new(MemoryStorage::new()))
    }

    #[tokio::test]
    async fn fresh_history_has_no_identity() {
        let h = history();
        let status = h.get_status().await.unwrap();
        assert!(status.client_file_ident.is_none());
    }

    #[tokio::test]
    async fn assigning_zero_ident_is_rejected() {
        let h = history();
        let err = h
            .set_client_file_ident_in_wt(SaltedFileIdent { ident: 0, salt: 1 })
            .await
            .unwrap_err();
        assert!(matches!(err, HistoryError::ZeroClientFileIdent));
    }

    #[tokio::test]
    async fn assigning_ident_is_recorded_and_appends_empty_entry() {
        let h = history();
        h.set_client_file_ident_in_wt(SaltedFileIdent { ident: 7, salt: 99 })
            .await
            .unwrap();
        let status = h.get_status().await.unwrap();
        assert_eq!(
            status.client_file_ident,
            Some(SaltedFileIdent { ident: 7, salt: 99 })
        );
    }

    #[tokio::test]
    async fn local_append_is_visible_via_get_local_changes() {
        let h = history();
        h.commit_local_entry(HistoryEntry {
            origin_file_ident: 0,
            origin_timestamp: 1,
            last_integrated_remote_version: 0,
            changeset: vec![1, 2, 3],
        })
        .await
        .unwrap();

        let changes = h.get_local_changes().await.unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].1, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn remote_entries_are_excluded_from_local_changes() {
        let h = history();
        h.commit_local_entry(HistoryEntry {
            origin_file_ident: 5,
            origin_timestamp: 1,
            last_integrated_remote_version: 0,
            changeset: vec![9],
        })
        .await
        .unwrap();

        let changes = h.get_local_changes().await.unwrap();
        assert!(changes.is_empty());
    }

    #[tokio::test]
    async fn progress_decrease_is_rejected() {
        let h = history();
        let progress = SyncProgress {
            upload: UploadCursor {
                client_version: 5,
                last_integrated_server_version: 0,
            },
            ..Default::default()
        };
        h.set_sync_progress(progress, None).await.unwrap();

        let regressed = SyncProgress {
            upload: UploadCursor {
                client_version: 4,
                last_integrated_server_version: 0,
            },
            ..Default::default()
        };
        let err = h.set_sync_progress(regressed, None).await.unwrap_err();
        assert!(matches!(err, HistoryError::BadProgress(_)));
    }

    #[tokio::test]
    async fn trimming_drops_acknowledged_remote_entries() {
        let h = history();
        h.commit_local_entry(HistoryEntry {
            origin_file_ident: 5,
            origin_timestamp: 1,
            last_integrated_remote_version: 0,
            changeset: vec![1],
        })
        .await
        .unwrap();
        h.commit_local_entry(HistoryEntry {
            origin_file_ident: 0,
            origin_timestamp: 2,
            last_integrated_remote_version: 0,
            changeset: vec![2],
        })
        .await
        .unwrap();

        let progress = SyncProgress {
            download: DownloadCursor {
                server_version: 1,
                last_integrated_client_version: 1,
            },
            ..Default::default()
        };
        h.set_sync_progress(progress, None).await.unwrap();

        let (_, root) = h.load().await.unwrap();
        assert_eq!(root.sync_history_size(), 1);
        assert_eq!(root.origin_file_idents[0], 0);
    }

    #[tokio::test]
    async fn record_schema_version_appends_one_entry_per_call() {
        let h = history();
        h.record_current_schema_version().await.unwrap();
        h.record_current_schema_version().await.unwrap();
        let (_, root) = h.load().await.unwrap();
        assert_eq!(root.schema_versions.schema_versions.len(), 2);
        assert_eq!(
            root.schema_versions.latest_schema_version(),
            Some(CLIENT_HISTORY_SCHEMA_VERSION)
        );
    }

    #[tokio::test]
    async fn migrates_schema_version_11_to_12_on_load() {
        let h = history();

        let mut root = SyncHistoryRoot::default();
        root.initial_version = INITIAL_VERSION;
        root.base_version = INITIAL_VERSION;
        root.changesets.push(b"raw-payload".to_vec());
        root.reciprocal_transforms.push(b"raw-transform".to_vec());
        root.remote_versions.push(0);
        root.origin_file_idents.push(0);
        root.origin_timestamps.push(1);
        root.schema_versions.push(11, "old-lib", INITIAL_VERSION, 1);
        let bytes = root.serialize().unwrap();
        h.storage().commit_root(0, bytes).await.unwrap();

        let (_, migrated) = h.load().await.unwrap();
        assert_eq!(
            migrated.schema_versions.latest_schema_version(),
            Some(CLIENT_HISTORY_SCHEMA_VERSION)
        );
        assert_eq!(
            framing::decompress(&migrated.changesets[0]).unwrap(),
            b"raw-payload"
        );
        assert_eq!(
            framing::decompress(&migrated.reciprocal_transforms[0]).unwrap(),
            b"raw-transform"
        );

        // Idempotent: loading again performs no further migration.
        let versions_before = migrated.schema_versions.schema_versions.len();
        let (_, reloaded) = h.load().await.unwrap();
        assert_eq!(reloaded.schema_versions.schema_versions.len(), versions_before);
    }

    #[tokio::test]
    async fn rejects_schema_version_newer_than_current() {
        let h = history();

        let mut root = SyncHistoryRoot::default();
        root.initial_version = INITIAL_VERSION;
        root.base_version = INITIAL_VERSION;
        root.schema_versions.push(CLIENT_HISTORY_SCHEMA_VERSION + 1, "future-lib", INITIAL_VERSION, 1);
        let bytes = root.serialize().unwrap();
        h.storage().commit_root(0, bytes).await.unwrap();

        let err = h.load().await.unwrap_err();
        assert!(matches!(
            err,
            HistoryError::IncompatibleSchemaVersion { stored, current }
                if stored == CLIENT_HISTORY_SCHEMA_VERSION + 1 && current == CLIENT_HISTORY_SCHEMA_VERSION
        ));
    }

    #[tokio::test]
    async fn rejects_schema_version_with_no_known_migration_path() {
        let h = history();

        let mut root = SyncHistoryRoot::default();
        root.initial_version = INITIAL_VERSION;
        root.base_version = INITIAL_VERSION;
        root.schema_versions.push(3, "ancient-lib", INITIAL_VERSION, 1);
        let bytes = root.serialize().unwrap();
        h.storage().commit_root(0, bytes).await.unwrap();

        let err = h.load().await.unwrap_err();
        assert!(matches!(
            err,
            HistoryError::IncompatibleSchemaVersion { stored: 3, current }
                if current == CLIENT_HISTORY_SCHEMA_VERSION
        ));
    }

    #[tokio::test]
    async fn find_uploadable_changesets_emits_at_least_one_entry() {
        let h = history();
        h.commit_local_entry(HistoryEntry {
            origin_file_ident: 0,
            origin_timestamp: 1,
            last_integrated_remote_version: 0,
            changeset: vec![0u8; 10],
        })
        .await
        .unwrap();

        let (cursor, batch, _) = h
            .find_uploadable_changesets(UploadCursor::default(), 100)
            .await
            .unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(cursor.client_version, 1);
    }

    #[tokio::test]
    async fn find_uploadable_changesets_skips_empty_and_remote_entries() {
        let h = history();
        // Empty entry (e.g. an identity assignment): never uploadable.
        h.commit_local_entry(HistoryEntry {
            origin_file_ident: 0,
            origin_timestamp: 1,
            last_integrated_remote_version: 0,
            changeset: Vec::new(),
        })
        .await
        .unwrap();
        // Remote-origin entry: never uploadable regardless of content.
        h.commit_local_entry(HistoryEntry {
            origin_file_ident: 42,
            origin_timestamp: 2,
            last_integrated_remote_version: 0,
            changeset: vec![9u8; 5],
        })
        .await
        .unwrap();
        for _ in 0..2 {
            h.commit_local_entry(HistoryEntry {
                origin_file_ident: 0,
                origin_timestamp: 3,
                last_integrated_remote_version: 0,
                changeset: vec![1u8; 10],
            })
            .await
            .unwrap();
        }

        let (cursor, batch, _) = h
            .find_uploadable_changesets(UploadCursor::default(), u64::MAX)
            .await
            .unwrap();
        assert_eq!(
            batch.iter().map(|c| c.progress.client_version).collect::<Vec<_>>(),
            vec![3, 4]
        );
        assert_eq!(cursor.client_version, 4);

        // Resuming from the returned cursor yields nothing further.
        let (_, next_batch, _) = h.find_uploadable_changesets(cursor, u64::MAX).await.unwrap();
        assert!(next_batch.is_empty());
    }

    #[tokio::test]
    async fn client_reset_discards_prior_history() {
        let h = history();
        h.commit_local_entry(HistoryEntry {
            origin_file_ident: 0,
            origin_timestamp: 1,
            last_integrated_remote_version: 0,
            changeset: vec![1],
        })
        .await
        .unwrap();

        h.set_client_reset_adjustments(
            SaltedFileIdent { ident: 3, salt: 4 },
            (10, 20),
            vec![9, 9],
        )
        .await
        .unwrap();

        let (_, root) = h.load().await.unwrap();
        assert_eq!(root.sync_history_size(), 1);
        assert_eq!(
            framing::decompress(&root.changesets[0]).unwrap(),
            vec![9, 9]
        );
        assert_eq!(root.progress.download.server_version, 10);
    }
}
