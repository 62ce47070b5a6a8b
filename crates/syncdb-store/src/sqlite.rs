//! SQLite implementation of [`PagedStorage`].
//!
//! This is the primary storage backend for syncdb. It uses rusqlite with
//! bundled SQLite, wrapped in async via `tokio::spawn_blocking`. The history
//! root is persisted as a single row in a `history_root` table: `version`
//! plus the opaque, already-serialized root `bytes` blob.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{PagedStorage, RootSnapshot};

/// SQLite-based storage implementation.
///
/// Thread-safe via an internal mutex. All operations use `spawn_blocking`
/// to avoid blocking the async runtime.
pub struct SqliteStorage {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStorage {
    /// Opens a SQLite database at the given path, creating it and running
    /// migrations if it doesn't already exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(SqliteStorage {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Opens an in-memory SQLite database. Useful for tests.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(SqliteStorage {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        f(&conn)
    }

    fn with_conn_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        f(&mut conn)
    }
}

fn load_root_sync(conn: &Connection) -> Result<Option<RootSnapshot>> {
    conn.query_row(
        "SELECT version, bytes FROM history_root WHERE id = 0",
        [],
        |row| {
            Ok(RootSnapshot {
                version: row.get(0)?,
                bytes: row.get(1)?,
            })
        },
    )
    .optional()
    .map_err(StoreError::from)
}

fn current_version_sync(conn: &Connection) -> Result<u64> {
    conn.query_row(
        "SELECT version FROM history_root WHERE id = 0",
        [],
        |row| row.get(0),
    )
    .optional()
    .map_err(StoreError::from)
    .map(|v: Option<u64>| v.unwrap_or(0))
}

fn commit_root_sync(conn: &mut Connection, expected_version: u64, bytes: Vec<u8>) -> Result<u64> {
    let tx = conn.transaction()?;
    let actual = current_version_sync(&tx)?;
    if actual != expected_version {
        tracing::warn!(expected_version, actual, "commit_root conflict: expected version stale");
        return Err(StoreError::WriteConflict {
            expected: expected_version,
            actual,
        });
    }
    let new_version = actual + 1;
    tx.execute(
        "INSERT INTO history_root (id, version, bytes) VALUES (0, ?1, ?2)
         ON CONFLICT(id) DO UPDATE SET version = excluded.version, bytes = excluded.bytes",
        params![new_version, bytes],
    )?;
    tx.commit()?;
    Ok(new_version)
}

#[async_trait]
impl PagedStorage for SqliteStorage {
    async fn current_version(&self) -> Result<u64> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|_| StoreError::Poisoned)?;
            current_version_sync(&conn)
        })
        .await
        .map_err(|e| StoreError::InvalidData(format!("join error: {e}")))?
    }

    async fn load_root(&self) -> Result<Option<RootSnapshot>> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|_| StoreError::Poisoned)?;
            load_root_sync(&conn)
        })
        .await
        .map_err(|e| StoreError::InvalidData(format!("join error: {e}")))?
    }

    async fn commit_root(&self, expected_version: u64, bytes: Vec<u8>) -> Result<u64> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().map_err(|_| StoreError::Poisoned)?;
            commit_root_sync(&mut conn, expected_version, bytes)
        })
        .await
        .map_err(|e| StoreError::InvalidData(format!("join error: {e}")))?
    }
}

/// Convenience for the common case of a file-backed store whose path the
/// caller wants to remember (e.g. for reopening after a client reset).
pub struct SqliteStorageHandle {
    pub storage: SqliteStorage,
    pub path: PathBuf,
}

impl SqliteStorageHandle {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let storage = SqliteStorage::open(&path)?;
        Ok(SqliteStorageHandle { storage, path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fresh_database_has_no_root() {
        let storage = SqliteStorage::open_memory().unwrap();
        assert_eq!(storage.current_version().await.unwrap(), 0);
        assert!(storage.load_root().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn commit_and_reload_round_trips() {
        let storage = SqliteStorage::open_memory().unwrap();
        let v1 = storage.commit_root(0, b"root-v1".to_vec()).await.unwrap();
        assert_eq!(v1, 1);
        let loaded = storage.load_root().await.unwrap().unwrap();
        assert_eq!(loaded.bytes, b"root-v1");

        let v2 = storage.commit_root(1, b"root-v2".to_vec()).await.unwrap();
        assert_eq!(v2, 2);
        let loaded = storage.load_root().await.unwrap().unwrap();
        assert_eq!(loaded.bytes, b"root-v2");
    }

    #[tokio::test]
    async fn stale_write_is_rejected() {
        let storage = SqliteStorage::open_memory().unwrap();
        storage.commit_root(0, b"a".to_vec()).await.unwrap();
        let err = storage.commit_root(0, b"b".to_vec()).await.unwrap_err();
        assert!(matches!(err, StoreError::WriteConflict { .. }));
    }

    #[tokio::test]
    async fn file_backed_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("syncdb.sqlite");
        {
            let storage = SqliteStorage::open(&path).unwrap();
            storage.commit_root(0, b"persisted".to_vec()).await.unwrap();
        }
        let storage = SqliteStorage::open(&path).unwrap();
        let loaded = storage.load_root().await.unwrap().unwrap();
        assert_eq!(loaded.bytes, b"persisted");
    }
}
