//! # syncdb-query
//!
//! Query language front-end (C6): a lexer, a hand-rolled
//! precedence-climbing parser, a schema-aware binder, and the
//! geospatial predicates `GEOWITHIN` needs.
//!
//! ## Overview
//!
//! A query string (`predicate (descriptor)*`) is parsed into a
//! [`ParsedQuery`] independent of any schema, then lowered by [`bind`]
//! against a target [`syncdb_core::Schema`] into a [`BoundQueryPlan`]
//! whose paths are resolved column chains and whose literals have been
//! coerced to their comparison peer's column type.
//!
//! ## Key Types
//!
//! - [`ast::Query`] / [`ast::Value`] - the unbound predicate tree
//! - [`parser::parse`] - the entry point for the parse stage
//! - [`binder::bind`] / [`binder::Arguments`] - the bind stage and its
//!   `$n` placeholder accessor
//! - [`geo::contains`] - `GEOWITHIN` point-in-shape evaluation
//!
//! ## Usage
//!
//! ```rust,no_run
//! use syncdb_core::schema::ValueKind;
//! use syncdb_core::{ObjectClassification, ObjectType, Property, Schema};
//! use syncdb_query::binder::{bind, Arguments};
//! use syncdb_query::parser::parse;
//!
//! struct NoArguments;
//! impl Arguments for NoArguments {
//!     fn int_for_argument(&self, n: usize) -> syncdb_query::Result<i64> {
//!         Err(syncdb_query::QueryError::ArgumentOutOfRange(n))
//!     }
//!     fn float_for_argument(&self, n: usize) -> syncdb_query::Result<f64> {
//!         Err(syncdb_query::QueryError::ArgumentOutOfRange(n))
//!     }
//!     fn string_for_argument(&self, n: usize) -> syncdb_query::Result<String> {
//!         Err(syncdb_query::QueryError::ArgumentOutOfRange(n))
//!     }
//!     fn bool_for_argument(&self, n: usize) -> syncdb_query::Result<bool> {
//!         Err(syncdb_query::QueryError::ArgumentOutOfRange(n))
//!     }
//!     fn binary_for_argument(&self, n: usize) -> syncdb_query::Result<Vec<u8>> {
//!         Err(syncdb_query::QueryError::ArgumentOutOfRange(n))
//!     }
//!     fn object_for_argument(&self, n: usize) -> syncdb_query::Result<syncdb_core::Value> {
//!         Err(syncdb_query::QueryError::ArgumentOutOfRange(n))
//!     }
//!     fn geo_for_argument(&self, n: usize) -> syncdb_query::Result<syncdb_query::ast::Geo> {
//!         Err(syncdb_query::QueryError::ArgumentOutOfRange(n))
//!     }
//! }
//!
//! let mut schema = Schema::new();
//! let mut person = ObjectType::new("Person", ObjectClassification::TopLevel);
//! person.properties.push(Property::new("age", ValueKind::Int));
//! schema.add(person).unwrap();
//!
//! let parsed = parse("age > 21").unwrap();
//! let plan = bind(&parsed, &schema, "Person", &NoArguments).unwrap();
//! ```

pub mod ast;
pub mod binder;
pub mod error;
pub mod geo;
pub mod lexer;
pub mod parser;

pub use ast::{
    Aggregate, AggrOp, CompareOp, ConstantLit, Descriptor, Geo, GeoArg, GeoPoint, ListLiteral,
    ParsedQuery, PostOp, PropertyRef, Quantifier, Query, Value,
};
pub use binder::{bind, Arguments, BoundQuery, BoundQueryPlan, BoundValue};
pub use error::{QueryError, Result};
pub use parser::parse;
