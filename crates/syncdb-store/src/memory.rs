//! In-memory implementation of [`PagedStorage`].
//!
//! This is primarily for testing. It has the same versioning semantics as
//! the SQLite backend but keeps everything in a `RwLock`-guarded `Vec`, with
//! no persistence across process restarts.

use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::{Result, StoreError};
use crate::traits::{PagedStorage, RootSnapshot};

#[derive(Default)]
struct Inner {
    version: u64,
    bytes: Option<Vec<u8>>,
}

pub struct MemoryStorage {
    inner: RwLock<Inner>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        MemoryStorage {
            inner: RwLock::new(Inner::default()),
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        MemoryStorage::new()
    }
}

#[async_trait]
impl PagedStorage for MemoryStorage {
    async fn current_version(&self) -> Result<u64> {
        let guard = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(guard.version)
    }

    async fn load_root(&self) -> Result<Option<RootSnapshot>> {
        let guard = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(guard.bytes.clone().map(|bytes| RootSnapshot {
            version: guard.version,
            bytes,
        }))
    }

    async fn commit_root(&self, expected_version: u64, bytes: Vec<u8>) -> Result<u64> {
        let mut guard = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        if guard.version != expected_version {
            tracing::warn!(expected_version, actual = guard.version, "commit_root conflict: expected version stale");
            return Err(StoreError::WriteConflict {
                expected: expected_version,
                actual: guard.version,
            });
        }
        guard.version += 1;
        guard.bytes = Some(bytes);
        Ok(guard.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_committed_bytes() {
        let storage = MemoryStorage::new();
        storage.commit_root(0, b"hello".to_vec()).await.unwrap();
        let root = storage.load_root().await.unwrap().unwrap();
        assert_eq!(root.bytes, b"hello");
        assert_eq!(root.version, 1);
    }
}
