//! # syncdb-core
//!
//! Shared infrastructure used by the query engine and the client history
//! engine: a value-or-status result type, a single-producer/single-consumer
//! future/promise, page-locked sensitive buffers, a coalescing event-loop
//! trigger, stable object identity, the path/nesting model, and the value
//! and schema types every other crate builds on.
//!
//! This crate contains no I/O and no networking; it is pure computation.
//!
//! ## Key Types
//!
//! - [`Expected`] - value-or-`Status` result type with monadic combinators
//! - [`Future`] / [`Promise`] - single-fire async hand-off
//! - [`SensitiveBuffer`] - locked, zeroized scratch memory for secrets
//! - [`Trigger`] - coalescing event-loop notification
//! - [`ObjectID`] / [`ObjKey`] - cross-peer identity and its local mapping
//! - [`Path`] - addressing into nested collections

pub mod error;
pub mod expected;
pub mod future;
pub mod objid;
pub mod path;
pub mod schema;
pub mod sensitive;
pub mod trigger;
pub mod value;

pub use error::{Error, ErrorCode, Status};
pub use expected::{no_throw_call, no_throw_call_expected, Expected};
pub use future::{future_channel, Future, Promise};
pub use objid::{CollisionCounter, ObjKey, ObjectID};
pub use path::{Path, PathElement};
pub use schema::{ObjectClassification, ObjectType, Property, Schema};
pub use sensitive::SensitiveBuffer;
pub use trigger::{EventLoop, Trigger};
pub use value::{Link, ObjectId96, Timestamp, Value, MAX_NEST};
