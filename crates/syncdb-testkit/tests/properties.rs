//! Facade-level property tests (spec §8) that need a real `Database`
//! rather than a bare `ClientHistory`, exercising `syncdb-testkit`'s own
//! generators against `syncdb`.

use proptest::prelude::*;
use std::sync::Arc;

use syncdb::Database;
use syncdb_store::MemoryStorage;
use syncdb_sync::UploadCursor;
use syncdb_testkit::generators::changeset_batch;

fn memory_db() -> Database<MemoryStorage> {
    Database::open(Arc::new(MemoryStorage::new()))
}

fn drain_all(
    rt: &tokio::runtime::Runtime,
    db: &Database<MemoryStorage>,
) -> Vec<Vec<u8>> {
    let mut cursor = UploadCursor::default();
    let mut out = Vec::new();
    loop {
        let (next_cursor, batch, _) = rt
            .block_on(db.find_uploadable_changesets(cursor, u64::MAX))
            .unwrap();
        if batch.is_empty() {
            break;
        }
        out.extend(batch.into_iter().map(|c| c.bytes));
        cursor = next_cursor;
    }
    out
}

proptest! {
    /// P4: draining `find_uploadable_changesets` to exhaustion returns
    /// exactly the nonempty changesets committed, in commit order, with
    /// nothing skipped and nothing duplicated.
    #[test]
    fn upload_drain_returns_every_nonempty_local_changeset_once(
        batch in changeset_batch(12, 64)
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let db = memory_db();

        for changeset in &batch {
            rt.block_on(db.commit_local_changeset(changeset.clone())).unwrap();
        }

        let drained = drain_all(&rt, &db);
        let expected: Vec<Vec<u8>> = batch.into_iter().filter(|c| !c.is_empty()).collect();
        prop_assert_eq!(drained, expected);
    }

    /// P2: `set_sync_progress` never lets the upload cursor regress once
    /// accepted — a later call reporting a smaller client_version than
    /// already acknowledged is rejected rather than silently applied.
    #[test]
    fn sync_progress_upload_cursor_is_monotone(
        first in 1u64..50,
        second in 0u64..50,
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let db = memory_db();

        for _ in 0..first {
            rt.block_on(db.commit_local_changeset(vec![1])).unwrap();
        }
        let progress_high = syncdb_sync::SyncProgress {
            upload: syncdb_sync::UploadCursor { client_version: first, last_integrated_server_version: 0 },
            ..Default::default()
        };
        rt.block_on(db.set_sync_progress(progress_high, None)).unwrap();

        if second < first {
            let progress_low = syncdb_sync::SyncProgress {
                upload: syncdb_sync::UploadCursor { client_version: second, last_integrated_server_version: 0 },
                ..Default::default()
            };
            prop_assert!(rt.block_on(db.set_sync_progress(progress_low, None)).is_err());
        }
    }
}
