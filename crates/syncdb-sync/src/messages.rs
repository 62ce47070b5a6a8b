//! Persistent data model for the client history engine (spec §3.5–§3.7).
//!
//! These types model the fixed-width index of top-level arrays described in
//! §3.6. Unlike the original, which stores each slot as a B+-tree array
//! inside the host file, here the whole root is serialized as one opaque
//! blob (`ciborium`) and handed to [`syncdb_store::PagedStorage`] — the
//! slot *indices* (0–18) still matter for the on-disk format, so field
//! order in [`SyncHistoryRoot`] must not change without a schema bump.

use serde::{Deserialize, Serialize};

use crate::error::{HistoryError, Result};

/// A peer's sync file identity plus the salt minted alongside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaltedFileIdent {
    pub ident: u64,
    pub salt: u64,
}

/// One entry in the sync history (spec §3.5). Local iff `origin_file_ident
/// == 0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub origin_file_ident: u64,
    pub origin_timestamp: u64,
    pub last_integrated_remote_version: u64,
    /// Compressed changeset bytes, framed per §6.1 (length header + stream
    /// codec body).
    pub changeset: Vec<u8>,
}

impl HistoryEntry {
    pub fn is_local(&self) -> bool {
        self.origin_file_ident == 0
    }

    /// Whether this entry may be dropped once acknowledged (§4.7.3):
    /// it is either empty or of remote origin.
    pub fn is_upload_skippable(&self) -> bool {
        !self.is_local() || self.changeset.is_empty()
    }
}

/// `DownloadCursor = { server_version, last_integrated_client_version }`
/// (spec §3.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DownloadCursor {
    pub server_version: u64,
    pub last_integrated_client_version: u64,
}

/// `UploadCursor = { client_version, last_integrated_server_version }`
/// (spec §3.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UploadCursor {
    pub client_version: u64,
    pub last_integrated_server_version: u64,
}

/// `SyncProgress = { latest_server: (version, salt), download, upload }`
/// (spec §3.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SyncProgress {
    pub latest_server_version: u64,
    pub latest_server_version_salt: u64,
    pub download: DownloadCursor,
    pub upload: UploadCursor,
}

impl SyncProgress {
    /// Enforces the monotonicity invariant: every field must be
    /// non-decreasing relative to `prior`. Violations are `bad_progress`
    /// fatals (spec §3.7, §7).
    pub fn check_monotonic(&self, prior: &SyncProgress) -> Result<()> {
        let checks: [(&str, u64, u64); 6] = [
            (
                "latest_server_version",
                prior.latest_server_version,
                self.latest_server_version,
            ),
            (
                "latest_server_version_salt",
                prior.latest_server_version_salt,
                self.latest_server_version_salt,
            ),
            (
                "download.server_version",
                prior.download.server_version,
                self.download.server_version,
            ),
            (
                "download.last_integrated_client_version",
                prior.download.last_integrated_client_version,
                self.download.last_integrated_client_version,
            ),
            (
                "upload.client_version",
                prior.upload.client_version,
                self.upload.client_version,
            ),
            (
                "upload.last_integrated_server_version",
                prior.upload.last_integrated_server_version,
                self.upload.last_integrated_server_version,
            ),
        ];
        for (field, before, after) in checks {
            if after < before {
                tracing::warn!("sync progress regressed on {field}: {before} -> {after}");
                return Err(HistoryError::BadProgress(format!(
                    "{field} decreased: {before} -> {after}"
                )));
            }
        }
        Ok(())
    }
}

/// Slot 17: the schema-version journal. Four parallel sequences, appended
/// to together by `record_current_schema_version` (spec §4.7.1/§4.7.6).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaVersions {
    pub schema_versions: Vec<i64>,
    pub library_versions: Vec<String>,
    pub snapshot_versions: Vec<u64>,
    pub timestamps: Vec<i64>,
}

impl SchemaVersions {
    pub fn push(&mut self, schema_version: i64, library_version: &str, snapshot_version: u64, timestamp: i64) {
        self.schema_versions.push(schema_version);
        self.library_versions.push(library_version.to_string());
        self.snapshot_versions.push(snapshot_version);
        self.timestamps.push(timestamp);
    }

    pub fn latest_schema_version(&self) -> Option<i64> {
        self.schema_versions.last().copied()
    }
}

/// The current on-disk schema version written by `record_current_schema_version`.
pub const CLIENT_HISTORY_SCHEMA_VERSION: i64 = 12;

/// Library version string recorded alongside each schema-version entry.
pub const LIBRARY_VERSION: &str = concat!("syncdb ", env!("CARGO_PKG_VERSION"));

/// The persistent history root (spec §3.6). Slot indices are documented in
/// field order; slot 18 (`cooked_history`) is reserved and always empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncHistoryRoot {
    /// Slot 0: continuous-transaction changesets, a non-sync audit log.
    pub ct_history: Vec<Vec<u8>>,
    /// Slot 1.
    pub client_file_ident_salt: u64,
    /// Slot 2.
    pub changesets: Vec<Vec<u8>>,
    /// Slot 3. Same length as `changesets`.
    pub reciprocal_transforms: Vec<Vec<u8>>,
    /// Slot 4. Same length as `changesets`.
    pub remote_versions: Vec<u64>,
    /// Slot 5. Same length as `changesets`.
    pub origin_file_idents: Vec<u64>,
    /// Slot 6. Same length as `changesets`.
    pub origin_timestamps: Vec<u64>,
    /// Slots 7-16: progress cursors and byte counters.
    pub progress: SyncProgress,
    pub downloaded_bytes: u64,
    pub downloadable_bytes: u64,
    pub uploaded_bytes: u64,
    pub uploadable_bytes: u64,
    /// Slot 17.
    pub schema_versions: SchemaVersions,
    /// Slot 18, reserved.
    pub cooked_history: (),
    /// Not a root slot: the assigned file identity, once set. `None` until
    /// `set_client_file_ident_in_wt` has run.
    pub client_file_ident: Option<SaltedFileIdent>,
    /// The version at which the root was first materialized; the trim
    /// floor defaults to this value (spec Open Question, see DESIGN.md).
    pub initial_version: u64,
    /// The current sync-history *base* version: `snapshot_version -
    /// sync_history_size` (spec §3.6).
    pub base_version: u64,
}

impl SyncHistoryRoot {
    /// Number of entries currently retained in the five parallel sync
    /// history arrays (spec §3.6's "sync history size").
    pub fn sync_history_size(&self) -> usize {
        self.changesets.len()
    }

    /// Checks the length invariant across the five parallel arrays.
    pub fn check_lengths(&self) -> Result<()> {
        let n = self.changesets.len();
        let ok = self.reciprocal_transforms.len() == n
            && self.remote_versions.len() == n
            && self.origin_file_idents.len() == n
            && self.origin_timestamps.len() == n;
        if ok {
            Ok(())
        } else {
            tracing::warn!(
                "sync history arrays have mismatched lengths: changesets={}, reciprocal_transforms={}, remote_versions={}, origin_file_idents={}, origin_timestamps={}",
                n,
                self.reciprocal_transforms.len(),
                self.remote_versions.len(),
                self.origin_file_idents.len(),
                self.origin_timestamps.len()
            );
            Err(HistoryError::CorruptRoot(format!(
                "sync history arrays have mismatched lengths: changesets={}, reciprocal_transforms={}, remote_versions={}, origin_file_idents={}, origin_timestamps={}",
                n,
                self.reciprocal_transforms.len(),
                self.remote_versions.len(),
                self.origin_file_idents.len(),
                self.origin_timestamps.len()
            )))
        }
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)
            .map_err(|e| HistoryError::CorruptRoot(format!("encode failed: {e}")))?;
        Ok(buf)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        let root: SyncHistoryRoot = ciborium::from_reader(bytes)
            .map_err(|e| HistoryError::CorruptRoot(format!("decode failed: {e}")))?;
        root.check_lengths()?;
        Ok(root)
    }
}

/// Compression framing for changeset bytes (spec §6.1): a little-endian
/// `u64` uncompressed-size header followed by a deflate-compressed body.
/// "Non-portable" only in the sense that the original reserves the right to
/// change codecs across versions; this implementation uses a single fixed
/// codec throughout.
pub mod framing {
    use std::io::{Read, Write};

    use flate2::read::DeflateDecoder;
    use flate2::write::DeflateEncoder;
    use flate2::Compression;

    use crate::error::{HistoryError, Result};

    pub fn compress(raw: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(raw)
            .map_err(|e| HistoryError::Compression(e.to_string()))?;
        let body = encoder
            .finish()
            .map_err(|e| HistoryError::Compression(e.to_string()))?;

        let mut framed = Vec::with_capacity(8 + body.len());
        framed.extend_from_slice(&(raw.len() as u64).to_le_bytes());
        framed.extend_from_slice(&body);
        Ok(framed)
    }

    pub fn decompress(framed: &[u8]) -> Result<Vec<u8>> {
        if framed.len() < 8 {
            return Err(HistoryError::Compression(
                "framed changeset shorter than length header".into(),
            ));
        }
        let (header, body) = framed.split_at(8);
        let uncompressed_size = u64::from_le_bytes(header.try_into().unwrap()) as usize;

        let mut decoder = DeflateDecoder::new(body);
        let mut out = Vec::with_capacity(uncompressed_size);
        decoder
            .read_to_end(&mut out)
            .map_err(|e| HistoryError::Compression(e.to_string()))?;
        if out.len() != uncompressed_size {
            return Err(HistoryError::Compression(format!(
                "decompressed size {} does not match header {}",
                out.len(),
                uncompressed_size
            )));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_entry_local_vs_remote() {
        let local = HistoryEntry {
            origin_file_ident: 0,
            origin_timestamp: 1,
            last_integrated_remote_version: 0,
            changeset: vec![1, 2, 3],
        };
        let remote = HistoryEntry {
            origin_file_ident: 7,
            ..local.clone()
        };
        assert!(local.is_local());
        assert!(!remote.is_local());
        assert!(!local.is_upload_skippable());
        assert!(remote.is_upload_skippable());
    }

    #[test]
    fn empty_local_entry_is_skippable() {
        let empty_local = HistoryEntry {
            origin_file_ident: 0,
            origin_timestamp: 1,
            last_integrated_remote_version: 0,
            changeset: vec![],
        };
        assert!(empty_local.is_upload_skippable());
    }

    #[test]
    fn progress_rejects_decreasing_field() {
        let prior = SyncProgress {
            upload: UploadCursor {
                client_version: 5,
                last_integrated_server_version: 0,
            },
            ..Default::default()
        };
        let next = SyncProgress {
            upload: UploadCursor {
                client_version: 4,
                last_integrated_server_version: 0,
            },
            ..Default::default()
        };
        let err = next.check_monotonic(&prior).unwrap_err();
        assert!(matches!(err, HistoryError::BadProgress(_)));
    }

    #[test]
    fn progress_accepts_non_decreasing_fields() {
        let prior = SyncProgress::default();
        let next = SyncProgress {
            upload: UploadCursor {
                client_version: 3,
                last_integrated_server_version: 0,
            },
            ..Default::default()
        };
        next.check_monotonic(&prior).unwrap();
    }

    #[test]
    fn root_round_trips_through_serialization() {
        let mut root = SyncHistoryRoot::default();
        root.changesets.push(vec![1, 2]);
        root.reciprocal_transforms.push(vec![]);
        root.remote_versions.push(0);
        root.origin_file_idents.push(0);
        root.origin_timestamps.push(42);

        let bytes = root.serialize().unwrap();
        let decoded = SyncHistoryRoot::deserialize(&bytes).unwrap();
        assert_eq!(decoded, root);
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let mut root = SyncHistoryRoot::default();
        root.changesets.push(vec![1]);
        assert!(root.check_lengths().is_err());
    }

    #[test]
    fn changeset_framing_round_trips() {
        let raw = b"hello changeset payload".to_vec();
        let framed = framing::compress(&raw).unwrap();
        let back = framing::decompress(&framed).unwrap();
        assert_eq!(back, raw);
    }

    #[test]
    fn schema_versions_append_in_lockstep() {
        let mut sv = SchemaVersions::default();
        sv.push(12, LIBRARY_VERSION, 100, 1_700_000_000);
        assert_eq!(sv.schema_versions.len(), 1);
        assert_eq!(sv.library_versions.len(), 1);
        assert_eq!(sv.snapshot_versions.len(), 1);
        assert_eq!(sv.timestamps.len(), 1);
        assert_eq!(sv.latest_schema_version(), Some(12));
    }
}
