//! Remote changeset integration (C8): transform and apply a batch of
//! server changesets atomically, appending one combined entry to the
//! sync history (spec §4.8).
//!
//! Grounded on `ClientHistory::integrate_server_changesets` in
//! `client_history_impl.cpp`. The original's changeset parser, operational
//! transform engine, and instruction applier are external collaborators
//! supplied to the history object; the same split is kept here as the
//! [`ChangesetTransformer`] and [`ChangesetApplier`] traits, so this crate
//! never needs to understand instruction bytes (spec §6.3).

use crate::error::{HistoryError, Result};
use crate::messages::SyncProgress;
use crate::protocol::ClientHistory;

use syncdb_store::PagedStorage;

/// Whether more download messages belonging to the same server version are
/// still to come (spec §4.8 step 8: flexible-sync bootstrap emits many
/// messages sharing one server version).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    MoreToCome,
    LastInBatch,
}

/// One changeset as received from the server, prior to transformation.
#[derive(Debug, Clone)]
pub struct RemoteChangeset {
    pub last_integrated_local_version: u64,
    pub origin_file_ident: u64,
    pub origin_timestamp: u64,
    pub remote_version: u64,
    pub original_changeset_size: u64,
    pub data: Vec<u8>,
    /// Assigned during integration to match position in the batch (spec
    /// §4.8 step 2).
    pub transform_sequence: usize,
}

/// Rebases a batch of remote changesets against the local history entries
/// in their merge windows. Mutates `data` in place to hold the rebased,
/// encoded changeset for each entry.
pub trait ChangesetTransformer: Send + Sync {
    fn transform_remote_changesets(&self, local_version: u64, changesets: &mut [RemoteChangeset]) -> Result<()>;
}

/// Applies one rebased changeset to live state. The history layer is not
/// the authoritative writer of object data; this is the collaborator that
/// is (spec §4.8 step 5: "the applier is the authoritative writer for
/// remote input").
pub trait ChangesetApplier: Send + Sync {
    fn apply(&self, changeset: &RemoteChangeset) -> Result<()>;
}

/// Report of old/new snapshot versions handed to an optional transaction
/// reporter (spec §4.8 step 10).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntegrationReport {
    pub old_version: u64,
    pub new_version: u64,
}

/// Integrates one batch of server changesets (spec §4.8). Must not be
/// called with an empty batch.
pub async fn integrate_server_changesets<S: PagedStorage>(
    history: &ClientHistory<S>,
    progress: SyncProgress,
    downloadable_bytes: Option<u64>,
    mut incoming: Vec<RemoteChangeset>,
    batch_state: BatchState,
    transformer: &dyn ChangesetTransformer,
    applier: &dyn ChangesetApplier,
    run_in_write_tr: Option<&dyn Fn() -> Result<()>>,
) -> Result<IntegrationReport> {
    if incoming.is_empty() {
        return Err(HistoryError::BadChangeset("empty integration batch".into()));
    }

    let status = history.get_status().await?;
    let local_version = status.current_client_version;
    let base_version = history.load_base_version().await?;

    let mut downloaded_bytes_in_message: u64 = 0;
    for (i, changeset) in incoming.iter_mut().enumerate() {
        changeset.transform_sequence = i;
        if changeset.last_integrated_local_version > local_version {
            tracing::warn!(
                "rejecting remote changeset {i}: last_integrated_local_version {} ahead of local version {local_version}",
                changeset.last_integrated_local_version
            );
            return Err(HistoryError::BadChangeset(format!(
                "changeset {i} claims last_integrated_local_version {} ahead of local version {local_version}",
                changeset.last_integrated_local_version
            )));
        }
        if changeset.origin_file_ident == 0 {
            tracing::warn!("rejecting remote changeset {i}: no origin file identity");
            return Err(HistoryError::BadChangeset(format!(
                "changeset {i} has no origin file identity"
            )));
        }
        downloaded_bytes_in_message = downloaded_bytes_in_message
            .checked_add(changeset.original_changeset_size)
            .ok_or_else(|| HistoryError::BadChangeset("downloaded byte count overflow".into()))?;

        // Entries earlier than the clamp were guaranteed upload-skippable
        // and therefore already trimmed away (spec §4.8 step 3).
        if changeset.last_integrated_local_version < base_version {
            changeset.last_integrated_local_version = base_version;
        }
    }

    transformer
        .transform_remote_changesets(local_version, &mut incoming)
        .map_err(|e| HistoryError::BadChangeset(format!("transform failed: {e}")))?;

    let mut combined = Vec::new();
    for changeset in &incoming {
        applier
            .apply(changeset)
            .map_err(|e| HistoryError::BadChangeset(format!("apply failed: {e}")))?;

        let new_len = combined
            .len()
            .checked_add(changeset.data.len())
            .ok_or_else(|| HistoryError::BadChangeset("combined changeset size overflow".into()))?;
        combined.resize(new_len, 0);
        combined[new_len - changeset.data.len()..].copy_from_slice(&changeset.data);
    }

    // The origin fields of the combined entry are taken from the last
    // changeset in the batch; for remote entries these values are only
    // informational (spec §4.8 step 6).
    let last = incoming.last().expect("batch is non-empty");
    let entry = crate::messages::HistoryEntry {
        origin_file_ident: last.origin_file_ident,
        origin_timestamp: last.origin_timestamp,
        last_integrated_remote_version: last.remote_version,
        changeset: combined,
    };

    let progress_update = match batch_state {
        BatchState::LastInBatch => Some((progress, downloadable_bytes)),
        BatchState::MoreToCome => None,
    };

    let (old_version, new_version) = history
        .integrate_remote_entry(entry, downloaded_bytes_in_message, progress_update)
        .await?;

    if let Some(run) = run_in_write_tr {
        run()?;
    }

    Ok(IntegrationReport {
        old_version,
        new_version,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{DownloadCursor, UploadCursor};
    use std::sync::Arc;
    use syncdb_store::MemoryStorage;

    struct IdentityTransformer;
    impl ChangesetTransformer for IdentityTransformer {
        fn transform_remote_changesets(&self, _local_version: u64, _changesets: &mut [RemoteChangeset]) -> Result<()> {
            Ok(())
        }
    }

    struct NoopApplier;
    impl ChangesetApplier for NoopApplier {
        fn apply(&self, _changeset: &RemoteChangeset) -> Result<()> {
            Ok(())
        }
    }

    fn history() -> ClientHistory<MemoryStorage> {
        ClientHistory::initialize(Arc::new(MemoryStorage::new()))
    }

    fn sample_changeset(bytes: Vec<u8>) -> RemoteChangeset {
        RemoteChangeset {
            last_integrated_local_version: 0,
            origin_file_ident: 9,
            origin_timestamp: 123,
            remote_version: 1,
            original_changeset_size: bytes.len() as u64,
            data: bytes,
            transform_sequence: 0,
        }
    }

    #[tokio::test]
    async fn empty_batch_is_rejected() {
        let h = history();
        let err = integrate_server_changesets(
            &h,
            SyncProgress::default(),
            None,
            vec![],
            BatchState::LastInBatch,
            &IdentityTransformer,
            &NoopApplier,
            None,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, HistoryError::BadChangeset(_)));
    }

    #[tokio::test]
    async fn batch_with_origin_zero_is_rejected() {
        let h = history();
        let mut changeset = sample_changeset(vec![1]);
        changeset.origin_file_ident = 0;
        let err = integrate_server_changesets(
            &h,
            SyncProgress::default(),
            None,
            vec![changeset],
            BatchState::LastInBatch,
            &IdentityTransformer,
            &NoopApplier,
            None,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, HistoryError::BadChangeset(_)));
    }

    #[tokio::test]
    async fn last_in_batch_applies_progress_and_appends_entry() {
        let h = history();
        let progress = SyncProgress {
            download: DownloadCursor {
                server_version: 1,
                last_integrated_client_version: 0,
            },
            upload: UploadCursor::default(),
            latest_server_version: 1,
            latest_server_version_salt: 0,
        };

        let report = integrate_server_changesets(
            &h,
            progress,
            Some(100),
            vec![sample_changeset(vec![1, 2, 3])],
            BatchState::LastInBatch,
            &IdentityTransformer,
            &NoopApplier,
            None,
        )
        .await
        .unwrap();

        assert_eq!(report.new_version, report.old_version + 1);

        let status = h.get_status().await.unwrap();
        assert_eq!(status.progress.download.server_version, 1);

        let bytes = h.get_upload_download_bytes().await.unwrap();
        assert_eq!(bytes.downloaded_bytes, 3);
        assert_eq!(bytes.downloadable_bytes, 100);
    }

    #[tokio::test]
    async fn more_to_come_defers_progress_update() {
        let h = history();
        let progress = SyncProgress {
            download: DownloadCursor {
                server_version: 1,
                last_integrated_client_version: 0,
            },
            ..Default::default()
        };

        integrate_server_changesets(
            &h,
            progress,
            None,
            vec![sample_changeset(vec![1])],
            BatchState::MoreToCome,
            &IdentityTransformer,
            &NoopApplier,
            None,
        )
        .await
        .unwrap();

        let status = h.get_status().await.unwrap();
        assert_eq!(status.progress.download.server_version, 0);
    }
}
