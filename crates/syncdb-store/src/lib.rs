//! # syncdb-store
//!
//! Storage abstraction for syncdb. Provides a trait-based interface for
//! persisting the sync history root behind [`PagedStorage`], with SQLite and
//! in-memory implementations.
//!
//! ## Overview
//!
//! The low-level page allocator, B+-tree leaf/array encoding, and free-list
//! are out of scope for this crate (consumed only as an abstract paged
//! storage layer): this crate persists the history root as an opaque byte
//! blob versioned by snapshot number, with `syncdb-sync` owning the actual
//! serialization of that blob's contents.
//!
//! ## Key Types
//!
//! - [`PagedStorage`] - the async trait for all storage operations
//! - [`SqliteStorage`] - SQLite-based persistent storage
//! - [`MemoryStorage`] - in-memory storage for tests
//! - [`RootSnapshot`] - a versioned, opaque history-root blob
//!
//! ## Usage
//!
//! ```rust,no_run
//! use syncdb_store::{SqliteStorage, PagedStorage};
//!
//! async fn example() {
//!     let storage = SqliteStorage::open("syncdb.realm").unwrap();
//!     let storage = SqliteStorage::open_memory().unwrap();
//!
//!     let version = storage.current_version().await.unwrap();
//!     let _ = storage.commit_root(version, b"...".to_vec()).await;
//! }
//! ```

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStorage;
pub use sqlite::{SqliteStorage, SqliteStorageHandle};
pub use traits::{PagedStorage, PagedStorageExt, RootSnapshot};
