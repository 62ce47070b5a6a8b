//! End-to-end seed scenarios exercised through the [`Database`] facade,
//! tying `syncdb-store`, `syncdb-sync`, and `syncdb-query` together the
//! way a real caller would. Scenarios that exercise a single crate in
//! isolation (client-reset fix-up, future chaining) are covered by that
//! crate's own unit tests instead of being duplicated here.

use std::sync::Arc;

use syncdb::{Database, RecordingApplier};
use syncdb_core::schema::ValueKind;
use syncdb_core::{ObjectClassification, ObjectType, Property, Schema};
use syncdb_query::{Arguments, QueryError};
use syncdb_store::MemoryStorage;
use syncdb_sync::{BatchState, RemoteChangeset, SaltedFileIdent, SyncProgress, UploadCursor};

fn memory_db() -> Database<MemoryStorage> {
    Database::open(Arc::new(MemoryStorage::new()))
}

/// Scenario 1: local append and upload drain.
#[tokio::test]
async fn local_append_and_upload_drain() {
    let db = memory_db();
    db.assign_client_identity(SaltedFileIdent { ident: 7, salt: 1 })
        .await
        .unwrap();

    // Three committed write transactions, each a 10-byte changeset.
    for _ in 0..3 {
        db.commit_local_changeset(vec![0u8; 10]).await.unwrap();
    }

    let (cursor, batch, _locked_server_version) = db
        .find_uploadable_changesets(UploadCursor::default(), u64::MAX)
        .await
        .unwrap();

    // `assign_client_identity` itself appends an empty history entry (spec
    // §4.7.1), so the three real commits land one version past it.
    assert_eq!(batch.len(), 3);
    assert_eq!(
        batch.iter().map(|c| c.progress.client_version).collect::<Vec<_>>(),
        vec![2, 3, 4]
    );
    assert!(batch.iter().all(|c| c.origin_file_ident == 0));
    assert_eq!(batch.iter().map(|c| c.bytes.len()).sum::<usize>(), 30);
    assert_eq!(cursor.client_version, 4);
}

/// Scenario 2: remote integration then drain, using a no-op transformer
/// (valid here because nothing local races the incoming batch) and a
/// recording applier.
#[tokio::test]
async fn remote_integration_then_drain() {
    let db = memory_db();
    db.assign_client_identity(SaltedFileIdent { ident: 7, salt: 1 })
        .await
        .unwrap();

    let applier = RecordingApplier::new();
    let transformer = syncdb::IdentityTransformer;

    let remote = RemoteChangeset {
        last_integrated_local_version: 0,
        origin_file_ident: 99,
        origin_timestamp: 1,
        remote_version: 100,
        original_changeset_size: 20,
        data: vec![0u8; 20],
        transform_sequence: 0,
    };

    let progress = SyncProgress {
        download: syncdb_sync::DownloadCursor {
            server_version: 100,
            last_integrated_client_version: 0,
        },
        ..Default::default()
    };

    let report = db
        .integrate_server_changesets(
            progress,
            Some(20),
            vec![remote],
            BatchState::LastInBatch,
            &transformer,
            &applier,
            None,
        )
        .await
        .unwrap();
    assert_eq!(report.new_version, report.old_version + 1);
    assert_eq!(applier.applied().len(), 1);

    let bytes = db.upload_download_bytes().await.unwrap();
    assert_eq!(bytes.downloadable_bytes, 20);

    let status = db.status().await.unwrap();
    assert_eq!(status.progress.download.server_version, 100);

    // A subsequent drain still returns no local entries: the one new
    // history entry is of remote origin (`origin_file_ident != 0`), so it
    // is never selected by `find_uploadable_changesets`.
    let (_, batch, _) = db
        .find_uploadable_changesets(UploadCursor::default(), u64::MAX)
        .await
        .unwrap();
    assert!(batch.is_empty());
}

/// Scenario 5: query parse and bind, driven through `Database::query` so
/// the schema-binding path is exercised with a real installed schema
/// rather than a bare `syncdb_query::bind` call.
#[test]
fn query_parse_and_bind_through_the_facade() {
    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(async {
        let db = memory_db();

        let mut schema = Schema::new();
        let mut dog = ObjectType::new("Dog", ObjectClassification::TopLevel);
        dog.properties.push(Property::new("breed", ValueKind::String));
        schema.add(dog).unwrap();

        let mut person = ObjectType::new("Person", ObjectClassification::TopLevel);
        person.properties.push(Property::new("age", ValueKind::Int));
        person.properties.push(Property::new("name", ValueKind::String));
        let mut dogs = Property::new("dogs", ValueKind::Link);
        dogs.collection = syncdb_core::schema::CollectionKind::List;
        dogs.target_type = Some("Dog".to_string());
        person.properties.push(dogs);
        schema.add(person).unwrap();

        db.set_schema(schema);

        struct OneArg;
        impl Arguments for OneArg {
            fn int_for_argument(&self, n: usize) -> syncdb_query::Result<i64> {
                if n == 0 {
                    Ok(21)
                } else {
                    Err(QueryError::ArgumentOutOfRange(n))
                }
            }
            fn float_for_argument(&self, n: usize) -> syncdb_query::Result<f64> {
                Err(QueryError::ArgumentOutOfRange(n))
            }
            fn string_for_argument(&self, n: usize) -> syncdb_query::Result<String> {
                Err(QueryError::ArgumentOutOfRange(n))
            }
            fn bool_for_argument(&self, n: usize) -> syncdb_query::Result<bool> {
                Err(QueryError::ArgumentOutOfRange(n))
            }
            fn binary_for_argument(&self, n: usize) -> syncdb_query::Result<Vec<u8>> {
                Err(QueryError::ArgumentOutOfRange(n))
            }
            fn object_for_argument(&self, n: usize) -> syncdb_query::Result<syncdb_core::Value> {
                Err(QueryError::ArgumentOutOfRange(n))
            }
            fn geo_for_argument(&self, n: usize) -> syncdb_query::Result<syncdb_query::ast::Geo> {
                Err(QueryError::ArgumentOutOfRange(n))
            }
        }

        let plan = db
            .query(
                r#"age > $0 && ANY dogs.breed == "poodle" SORT(name ASC) LIMIT(10)"#,
                "Person",
                &OneArg,
            )
            .unwrap();

        assert!(matches!(plan.predicate, syncdb_query::BoundQuery::And(ref terms) if terms.len() == 2));
        assert_eq!(plan.descriptor.limit, Some(10));
        assert_eq!(plan.descriptor.sort.len(), 1);
        assert!(plan.descriptor.sort[0].1, "sort must be ascending");
    });
}
