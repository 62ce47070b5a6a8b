//! `PagedStorage`: the abstract interface consumed by the history engine.
//!
//! The low-level page allocator, B+-tree leaf/array encoding, and free-list
//! are explicitly out of scope (spec §1): this trait is the boundary at
//! which the history engine hands an opaque, already-serialized history
//! root to a storage backend and gets a monotonically versioned snapshot
//! back. `syncdb-sync` owns serialization of its own root structure; this
//! crate only ever sees bytes.

use async_trait::async_trait;

use crate::error::Result;

/// One persisted snapshot of the history root, opaque to the storage layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootSnapshot {
    pub version: u64,
    pub bytes: Vec<u8>,
}

/// Abstract paged storage. Implementations include an in-memory store (for
/// tests) and a SQLite-backed store (the primary implementation).
///
/// All methods are async to support both sync (SQLite, via `spawn_blocking`)
/// and async-native backends uniformly.
#[async_trait]
pub trait PagedStorage: Send + Sync {
    /// The current snapshot version, or `0` if nothing has been committed
    /// yet (no top-ref, per spec §4.7.1's `initialize` contract).
    async fn current_version(&self) -> Result<u64>;

    /// Loads the most recently committed history root, if any.
    async fn load_root(&self) -> Result<Option<RootSnapshot>>;

    /// Commits a new history root as the next snapshot version.
    ///
    /// `expected_version` must equal the storage's current version;
    /// otherwise `StoreError::WriteConflict` is returned, since this crate
    /// models a single concurrent writer (spec §1, §5).
    async fn commit_root(&self, expected_version: u64, bytes: Vec<u8>) -> Result<u64>;
}

/// Convenience helpers layered on top of [`PagedStorage`].
#[async_trait]
pub trait PagedStorageExt: PagedStorage {
    /// Loads the root and asserts it is present, for callers that know
    /// `initialize` has already run.
    async fn load_root_or_err(&self) -> Result<RootSnapshot> {
        self.load_root().await?.ok_or_else(|| {
            crate::error::StoreError::InvalidData("history root has not been initialized".into())
        })
    }
}

impl<S: PagedStorage + ?Sized> PagedStorageExt for S {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStorage;

    #[tokio::test]
    async fn fresh_storage_has_no_root() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.current_version().await.unwrap(), 0);
        assert!(storage.load_root().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn commit_advances_version() {
        let storage = MemoryStorage::new();
        let v1 = storage.commit_root(0, vec![1, 2, 3]).await.unwrap();
        assert_eq!(v1, 1);
        let v2 = storage.commit_root(1, vec![4, 5]).await.unwrap();
        assert_eq!(v2, 2);
        let root = storage.load_root().await.unwrap().unwrap();
        assert_eq!(root.bytes, vec![4, 5]);
    }

    #[tokio::test]
    async fn stale_commit_is_rejected() {
        let storage = MemoryStorage::new();
        storage.commit_root(0, vec![1]).await.unwrap();
        let err = storage.commit_root(0, vec![2]).await.unwrap_err();
        assert!(matches!(err, crate::error::StoreError::WriteConflict { .. }));
    }
}
