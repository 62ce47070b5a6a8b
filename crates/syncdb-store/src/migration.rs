//! Database schema migrations for the SQLite storage backend.
//!
//! A simple versioned migration system: each migration is a SQL string that
//! transforms the schema from version N to N+1. Idempotent — safe to call
//! on every open.

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initializes or migrates the database schema. Idempotent.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now_millis()],
            )?;
        }

        tx.commit()?;
    }

    Ok(())
}

fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {version}"
        ))),
    }
}

/// Migration v1: a single-row table holding the opaque, serialized history
/// root and the snapshot version it was committed at (spec §3.6/§6.1). The
/// rest of the sync history (the five parallel arrays, the progress
/// cursors, the schema-version journal) lives inside the `bytes` blob,
/// serialized by `syncdb-sync`; this crate's schema only ever sees it as an
/// opaque byte string, matching the "abstract paged storage layer" boundary.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE history_root (
            id      INTEGER PRIMARY KEY CHECK (id = 0),
            version INTEGER NOT NULL,
            bytes   BLOB NOT NULL
        );
        "#,
    )?;

    Ok(())
}

fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_millis() as i64
}
