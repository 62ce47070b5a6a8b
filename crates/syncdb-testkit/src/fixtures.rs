//! Test fixtures and helpers.
//!
//! Common setup code for integration tests: a ready-to-use in-memory
//! [`Database`], a small sample schema, and a way to spin up several
//! independent peers for multi-client sync tests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use syncdb::{ObjectClassification, ObjectType, Property, Schema};
use syncdb_core::schema::{CollectionKind, ValueKind};
use syncdb_store::MemoryStorage;
use syncdb_sync::SaltedFileIdent;

pub type TestDatabase = syncdb::Database<MemoryStorage>;

/// A test fixture: one in-memory database with a deterministic clock and a
/// sample schema already installed.
pub struct TestFixture {
    pub db: TestDatabase,
    clock_seq: Arc<AtomicU64>,
}

impl TestFixture {
    /// Create a new fixture over a fresh in-memory store, with the clock
    /// source replaced by a monotonically-increasing counter so tests don't
    /// depend on wall-clock time.
    pub fn new() -> Self {
        let clock_seq = Arc::new(AtomicU64::new(1));
        let seq = clock_seq.clone();
        let db = syncdb::Database::open(Arc::new(MemoryStorage::new()))
            .with_clock(Arc::new(move || seq.fetch_add(1, Ordering::Relaxed)));
        db.set_schema(sample_schema());
        TestFixture { db, clock_seq }
    }

    /// The next value the fixture's clock will hand out, without advancing
    /// it. Useful for asserting `origin_timestamp` on the next commit.
    pub fn next_timestamp(&self) -> u64 {
        self.clock_seq.load(Ordering::Relaxed)
    }

    /// Assigns a deterministic file identity derived from `peer_index`.
    pub async fn assign_identity(&self, peer_index: u64) -> u64 {
        self.db
            .assign_client_identity(SaltedFileIdent {
                ident: peer_index + 1,
                salt: peer_index * 2 + 1,
            })
            .await
            .expect("identity assignment should succeed on a fresh fixture")
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Create `count` independent fixtures, one per simulated peer, each with
/// its own in-memory store and its own deterministic clock.
pub fn multi_client_fixtures(count: usize) -> Vec<TestFixture> {
    (0..count).map(|_| TestFixture::new()).collect()
}

/// A small two-type schema (`Person` with a `dogs` link list to `Dog`)
/// reused across tests that need something to bind queries against.
pub fn sample_schema() -> Schema {
    let mut schema = Schema::new();

    let mut dog = ObjectType::new("Dog", ObjectClassification::TopLevel);
    dog.properties.push(Property::new("breed", ValueKind::String));
    schema.add(dog).expect("Dog is a well-formed object type");

    let mut person = ObjectType::new("Person", ObjectClassification::TopLevel);
    person.properties.push(Property::new("name", ValueKind::String));
    person.properties.push(Property::new("age", ValueKind::Int));
    let mut dogs = Property::new("dogs", ValueKind::Link);
    dogs.collection = CollectionKind::List;
    dogs.target_type = Some("Dog".to_string());
    person.properties.push(dogs);
    schema.add(person).expect("Person is a well-formed object type");

    schema
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fixture_has_sample_schema_installed() {
        let fixture = TestFixture::new();
        let schema = fixture.db.schema();
        assert!(schema.object_type("Person").is_some());
        assert!(schema.object_type("Dog").is_some());
    }

    #[tokio::test]
    async fn fixture_clock_is_monotone_and_deterministic() {
        let fixture = TestFixture::new();
        let first = fixture.next_timestamp();
        fixture.db.commit_local_changeset(vec![1]).await.unwrap();
        let second = fixture.next_timestamp();
        assert!(second > first);
    }

    #[tokio::test]
    async fn multi_client_fixtures_are_independent() {
        let peers = multi_client_fixtures(3);
        for (i, peer) in peers.iter().enumerate() {
            peer.assign_identity(i as u64).await;
        }
        for peer in &peers {
            let status = peer.db.status().await.unwrap();
            assert_eq!(status.current_client_version, 1);
        }
    }
}
