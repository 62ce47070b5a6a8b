//! # syncdb-testkit
//!
//! Testing utilities shared across the `syncdb` workspace.
//!
//! - **[`vectors`]**: hand-derived golden vectors for the `ObjectID`
//!   squeeze/unsqueeze mapping and a structural check of the changeset
//!   framing header, for cross-checking the arithmetic without running the
//!   implementation twice.
//! - **[`generators`]**: `proptest` strategies for `Value`/schema shapes and
//!   changeset batches, plus the concurrency property tests (future
//!   fairness, trigger coalescing) that need real threads.
//! - **[`fixtures`]**: a ready-to-use in-memory [`syncdb::Database`] with a
//!   sample schema installed, and a way to spin up several independent
//!   peers for multi-client sync tests.
//!
//! ## Golden Vectors
//!
//! ```rust
//! use syncdb_testkit::vectors::verify_all_squeeze_vectors;
//!
//! for (name, ok) in verify_all_squeeze_vectors() {
//!     assert!(ok, "{name} failed");
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use syncdb_testkit::fixtures::TestFixture;
//!
//! let rt = tokio::runtime::Runtime::new().unwrap();
//! rt.block_on(async {
//!     let fixture = TestFixture::new();
//!     fixture.db.commit_local_changeset(vec![1, 2, 3]).await.unwrap();
//! });
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{multi_client_fixtures, sample_schema, TestFixture};
pub use vectors::{all_squeeze_vectors, verify_all_squeeze_vectors, SqueezeVector};
