//! Query AST (C6): the tagged-variant predicate tree produced by the
//! parser and consumed by the binder (spec §4.6.2).
//!
//! Grounded on realm-core's `ParserNode` hierarchy (`driver.hpp`): the
//! original flattens a class hierarchy (`OrNode`/`AndNode`/`CompareNode`/
//! `ConstantNode`/`PropertyNode`/`AggrNode`/...) into nodes owned by a
//! bump arena exclusive to the parser driver, freed all at once when the
//! driver drops. Rust's `Box`-owned recursive enums give the same
//! "single owner, dropped as a unit" property without a custom
//! allocator — no bump-allocator crate is used anywhere in the example
//! pack, so the arena itself is not ported; each node is an ordinary heap
//! allocation collected through `Drop`.

use syncdb_core::Path;

/// `CompareNode`'s op constants in the original driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Equal,
    NotEqual,
    Greater,
    Less,
    GreaterEqual,
    LessEqual,
    BeginsWith,
    EndsWith,
    Contains,
    Like,
    FullText,
    In,
}

/// Collection-valued left-operand binding mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantifier {
    Any,
    All,
    None,
}

/// `PostOpNode` in the original driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostOp {
    Size,
    Type,
    Count,
}

/// `AggrNode` in the original driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggrOp {
    Max,
    Min,
    Sum,
    Avg,
}

/// `ConstantNode::Type` in the original driver, flattened into one literal
/// value carrier.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstantLit {
    Int(i64),
    Float(f64),
    Nan,
    Infinity { negative: bool },
    Str(String),
    Binary(Vec<u8>),
    /// Raw text inside `date('...')`; the binder parses it against the
    /// target column's timestamp representation.
    Timestamp(String),
    Uuid([u8; 16]),
    ObjectId([u8; 12]),
    Null,
    True,
    False,
    /// `$n`, resolved against the caller's `Arguments` bundle at bind time.
    Argument(usize),
}

/// A path with an optional quantifier prefix (`ANY`/`ALL`/`NONE`) and
/// trailing post-operator (`.@size`, `.@type`, `.@count`).
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyRef {
    pub path: Path,
    pub quantifier: Option<Quantifier>,
    pub post_op: Option<PostOp>,
}

impl PropertyRef {
    pub fn bare(path: Path) -> Self {
        PropertyRef {
            path,
            quantifier: None,
            post_op: None,
        }
    }
}

/// `ListAggr(path, op)` or `LinkAggr(path, link_name, op, prop)`.
#[derive(Debug, Clone, PartialEq)]
pub enum Aggregate {
    ListAggr { path: Path, op: AggrOp },
    LinkAggr {
        path: Path,
        link_name: String,
        op: AggrOp,
        prop: String,
    },
}

/// `ListLiteral = { comp_type?, Constant* }`.
#[derive(Debug, Clone, PartialEq)]
pub struct ListLiteral {
    pub comp_type: Option<String>,
    pub items: Vec<ConstantLit>,
}

/// A geographic point, longitude first (matches the stored `GeoPoint`
/// field order, spec §4.6.3).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub longitude: f64,
    pub latitude: f64,
}

/// `Geo = Box(p1,p2) | Circle(center, radius_deg) | Polygon(loop+)`.
#[derive(Debug, Clone, PartialEq)]
pub enum Geo {
    Box(GeoPoint, GeoPoint),
    Circle { center: GeoPoint, radius_radians: f64 },
    /// First ring is the counter-clockwise outer loop; any further rings
    /// are clockwise inner holes (spec §4.6.3).
    Polygon(Vec<Vec<GeoPoint>>),
}

/// The right-hand side of `GEOWITHIN`: an inline literal or a `$n`
/// placeholder resolved at bind time.
#[derive(Debug, Clone, PartialEq)]
pub enum GeoArg {
    Literal(Geo),
    Argument(usize),
}

/// `Value = Constant | Property | Aggregate | ListLiteral | Subquery`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Constant(ConstantLit),
    Property(PropertyRef),
    Aggregate(Aggregate),
    ListLiteral(ListLiteral),
    /// `SUBQUERY(path, var, sub_predicate).@size`.
    Subquery {
        path: Path,
        var: String,
        predicate: Box<Query>,
    },
}

/// `Query = Or(predicate*) | And(predicate*) | Not(predicate) | Compare(...)
/// | Between(...) | GeoWithin(...) | BoolLit(...)`.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    Or(Vec<Query>),
    And(Vec<Query>),
    Not(Box<Query>),
    Compare {
        op: CompareOp,
        left: Box<Value>,
        right: Box<Value>,
        case_insensitive: bool,
    },
    /// `Between(value, list)`; `list` is expected to carry exactly two
    /// constants, the inclusive lower and upper bound.
    Between { value: Box<Value>, bounds: Box<Value> },
    GeoWithin { property: PropertyRef, area: GeoArg },
    BoolLit(bool),
}

/// `Descriptor = Sort{(path, ascending)+} | Distinct{path+} | Limit{n}`.
#[derive(Debug, Clone, PartialEq)]
pub enum Descriptor {
    Sort(Vec<(Path, bool)>),
    Distinct(Vec<Path>),
    Limit(u64),
}

/// A fully parsed query string: one predicate plus its trailing
/// descriptors, in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedQuery {
    pub predicate: Query,
    pub descriptors: Vec<Descriptor>,
}
