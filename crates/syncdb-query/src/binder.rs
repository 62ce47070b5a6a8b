//! Binding (spec §4.6.3): lowers a parsed [`ParsedQuery`] against a
//! [`Schema`] into a [`BoundQuery`] whose paths are resolved column
//! chains and whose literals are coerced to the target column's type.
//!
//! Grounded on `client_history_impl.cpp`'s general pattern of separating
//! a pure parse step from a schema-dependent resolution step, and on
//! realm-core's own two-phase query compilation (parse against no
//! schema, then `ParserDriver::run` that performs name lookup). The
//! caller's `$n` placeholders are resolved through the [`Arguments`]
//! trait, matching the external `Arguments` object described in spec
//! §6.2.

use syncdb_core::schema::{CollectionKind, ValueKind};
use syncdb_core::{ObjectType, Path, PathElement, Property, Schema, Value as CoreValue};

use crate::ast::{
    Aggregate, AggrOp, CompareOp, ConstantLit, Descriptor, Geo, GeoArg, ListLiteral, ParsedQuery,
    PostOp, PropertyRef, Quantifier, Query, Value,
};
use crate::error::QueryError;

type Result<T> = std::result::Result<T, QueryError>;

/// Caller-supplied accessor for `$n` placeholders (spec §6.2). Each
/// accessor returns `ArgumentOutOfRange` (surfaced here as
/// [`QueryError::ArgumentOutOfRange`]) when `n` is out of bounds or the
/// bound value is not of the requested kind.
pub trait Arguments {
    fn int_for_argument(&self, n: usize) -> Result<i64>;
    fn float_for_argument(&self, n: usize) -> Result<f64>;
    fn string_for_argument(&self, n: usize) -> Result<String>;
    fn bool_for_argument(&self, n: usize) -> Result<bool>;
    fn binary_for_argument(&self, n: usize) -> Result<Vec<u8>>;
    fn object_for_argument(&self, n: usize) -> Result<CoreValue>;
    fn geo_for_argument(&self, n: usize) -> Result<Geo>;
}

/// A path resolved against a schema: each element carries the column
/// index/kind it resolved to where that's statically knowable (plain
/// columns), and the original [`PathElement`] otherwise (indices,
/// dictionary keys, wildcards, which are only resolvable against a live
/// row).
#[derive(Debug, Clone, PartialEq)]
pub struct BoundPath {
    pub raw: Path,
    /// The value kind of the final property in the chain.
    pub leaf_kind: ValueKind,
    pub leaf_collection: CollectionKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoundPropertyRef {
    pub path: BoundPath,
    pub quantifier: Option<Quantifier>,
    pub post_op: Option<PostOp>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoundAggregate {
    ListAggr { path: BoundPath, op: AggrOp },
    LinkAggr {
        path: BoundPath,
        link_name: String,
        op: AggrOp,
        prop: BoundPath,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoundValue {
    Constant(CoreValue),
    Property(BoundPropertyRef),
    Aggregate(BoundAggregate),
    ListLiteral(Vec<CoreValue>),
    Subquery {
        path: BoundPath,
        var: String,
        predicate: Box<BoundQuery>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoundQuery {
    Or(Vec<BoundQuery>),
    And(Vec<BoundQuery>),
    Not(Box<BoundQuery>),
    Compare {
        op: CompareOp,
        left: Box<BoundValue>,
        right: Box<BoundValue>,
        case_insensitive: bool,
    },
    Between {
        value: Box<BoundValue>,
        low: CoreValue,
        high: CoreValue,
    },
    GeoWithin { property: BoundPropertyRef, area: Geo },
    BoolLit(bool),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoundDescriptor {
    pub sort: Vec<(BoundPath, bool)>,
    pub distinct: Vec<BoundPath>,
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoundQueryPlan {
    pub predicate: BoundQuery,
    pub descriptor: BoundDescriptor,
}

/// Binds a parsed query against `root` within `schema`, using `args` to
/// resolve `$n` placeholders.
pub fn bind(
    parsed: &ParsedQuery,
    schema: &Schema,
    root: &str,
    args: &dyn Arguments,
) -> Result<BoundQueryPlan> {
    let object_type = schema
        .object_type(root)
        .ok_or_else(|| QueryError::InvalidQueryName(format!("unknown table '{root}'")))?;
    let binder = Binder { schema, root: object_type, args };
    let predicate = binder.bind_query(&parsed.predicate)?;
    let descriptor = binder.bind_descriptors(&parsed.descriptors)?;
    Ok(BoundQueryPlan { predicate, descriptor })
}

struct Binder<'a> {
    schema: &'a Schema,
    root: &'a ObjectType,
    args: &'a dyn Arguments,
}

impl<'a> Binder<'a> {
    fn bind_query(&self, query: &Query) -> Result<BoundQuery> {
        Ok(match query {
            Query::Or(terms) => BoundQuery::Or(
                terms.iter().map(|t| self.bind_query(t)).collect::<Result<_>>()?,
            ),
            Query::And(terms) => BoundQuery::And(
                terms.iter().map(|t| self.bind_query(t)).collect::<Result<_>>()?,
            ),
            Query::Not(inner) => BoundQuery::Not(Box::new(self.bind_query(inner)?)),
            Query::Compare { op, left, right, case_insensitive } => {
                let (left, right) = self.bind_compare_pair(left, right)?;
                BoundQuery::Compare {
                    op: *op,
                    left: Box::new(left),
                    right: Box::new(right),
                    case_insensitive: *case_insensitive,
                }
            }
            Query::Between { value, bounds } => {
                let bound_value = self.bind_value(value)?;
                let kind = self.value_kind(&bound_value)?;
                let Value::ListLiteral(ListLiteral { items, .. }) = bounds.as_ref() else {
                    return Err(QueryError::TypeMismatch("BETWEEN requires a {low, high} literal".into()));
                };
                if items.len() != 2 {
                    return Err(QueryError::TypeMismatch("BETWEEN requires exactly two bounds".into()));
                }
                let low = self.coerce_constant(&items[0], kind)?;
                let high = self.coerce_constant(&items[1], kind)?;
                BoundQuery::Between { value: Box::new(bound_value), low, high }
            }
            Query::GeoWithin { property, area } => {
                let bound_property = self.bind_property(property)?;
                let geo = match area {
                    GeoArg::Literal(g) => g.clone(),
                    GeoArg::Argument(n) => self.args.geo_for_argument(*n)?,
                };
                BoundQuery::GeoWithin { property: bound_property, area: geo }
            }
            Query::BoolLit(b) => BoundQuery::BoolLit(*b),
        })
    }

    /// Binds both sides of a comparison together so a literal operand can
    /// be coerced against the other side's resolved kind (spec §4.6.3:
    /// "literals coerce to the column type or fail with InvalidArgument").
    fn bind_compare_pair(&self, left: &Value, right: &Value) -> Result<(BoundValue, BoundValue)> {
        match (left, right) {
            (Value::Constant(c), other) => {
                let bound_other = self.bind_value(other)?;
                let kind = self.value_kind(&bound_other)?;
                let bound_left = BoundValue::Constant(self.coerce_constant(c, kind)?);
                Ok((bound_left, bound_other))
            }
            (other, Value::Constant(c)) => {
                let bound_other = self.bind_value(other)?;
                let kind = self.value_kind(&bound_other)?;
                let bound_right = BoundValue::Constant(self.coerce_constant(c, kind)?);
                Ok((bound_other, bound_right))
            }
            _ => Ok((self.bind_value(left)?, self.bind_value(right)?)),
        }
    }

    fn bind_value(&self, value: &Value) -> Result<BoundValue> {
        Ok(match value {
            Value::Constant(c) => BoundValue::Constant(self.resolve_constant_untyped(c)?),
            Value::Property(p) => BoundValue::Property(self.bind_property(p)?),
            Value::Aggregate(a) => BoundValue::Aggregate(self.bind_aggregate(a)?),
            Value::ListLiteral(l) => {
                let items = l
                    .items
                    .iter()
                    .map(|c| self.resolve_constant_untyped(c))
                    .collect::<Result<_>>()?;
                BoundValue::ListLiteral(items)
            }
            Value::Subquery { path, var, predicate } => {
                let bound_path = self.bind_path(path)?;
                BoundValue::Subquery {
                    path: bound_path,
                    var: var.clone(),
                    predicate: Box::new(self.bind_query(predicate)?),
                }
            }
        })
    }

    fn bind_property(&self, p: &PropertyRef) -> Result<BoundPropertyRef> {
        Ok(BoundPropertyRef {
            path: self.bind_path(&p.path)?,
            quantifier: p.quantifier,
            post_op: p.post_op,
        })
    }

    fn bind_aggregate(&self, a: &Aggregate) -> Result<BoundAggregate> {
        Ok(match a {
            Aggregate::ListAggr { path, op } => BoundAggregate::ListAggr {
                path: self.bind_path(path)?,
                op: *op,
            },
            Aggregate::LinkAggr { path, link_name, op, prop } => {
                let bound_path = self.bind_path(path)?;
                let target = self.target_type(&bound_path)?;
                let prop_def = target
                    .property(prop)
                    .ok_or_else(|| QueryError::InvalidQueryName(format!("unknown property '{prop}'")))?;
                BoundAggregate::LinkAggr {
                    path: bound_path,
                    link_name: link_name.clone(),
                    op: *op,
                    prop: BoundPath {
                        raw: single_column_path(prop),
                        leaf_kind: prop_def.kind,
                        leaf_collection: prop_def.collection,
                    },
                }
            }
        })
    }

    /// Resolves every `Column` segment against the schema in turn,
    /// following `Link` properties into their target type. Non-column
    /// segments (indices, dict keys, wildcards) are carried through
    /// unresolved; they are only meaningful against a live row.
    fn bind_path(&self, path: &Path) -> Result<BoundPath> {
        let mut current = self.root;
        let mut leaf: Option<&Property> = None;
        for element in path.elements() {
            let PathElement::Column(name) = element else {
                continue;
            };
            if name == "@links" {
                continue;
            }
            let prop = current
                .property(name)
                .ok_or_else(|| QueryError::InvalidQueryName(format!("unknown property '{name}'")))?;
            leaf = Some(prop);
            if prop.kind == ValueKind::Link {
                let target_name = prop
                    .target_type
                    .as_ref()
                    .ok_or_else(|| QueryError::TypeMismatch(format!("link property '{name}' has no target type")))?;
                current = self
                    .schema
                    .object_type(target_name)
                    .ok_or_else(|| QueryError::InvalidQueryName(format!("unknown table '{target_name}'")))?;
            }
        }
        let leaf = leaf.ok_or_else(|| QueryError::InvalidQueryName("empty path".into()))?;
        Ok(BoundPath {
            raw: path.clone(),
            leaf_kind: leaf.kind,
            leaf_collection: leaf.collection,
        })
    }

    fn target_type(&self, path: &BoundPath) -> Result<&ObjectType> {
        let mut current = self.root;
        for element in path.raw.elements() {
            if let PathElement::Column(name) = element {
                if name == "@links" {
                    continue;
                }
                let prop = current
                    .property(name)
                    .ok_or_else(|| QueryError::InvalidQueryName(format!("unknown property '{name}'")))?;
                if let Some(target_name) = &prop.target_type {
                    current = self
                        .schema
                        .object_type(target_name)
                        .ok_or_else(|| QueryError::InvalidQueryName(format!("unknown table '{target_name}'")))?;
                }
            }
        }
        Ok(current)
    }

    fn value_kind(&self, v: &BoundValue) -> Result<ValueKind> {
        match v {
            BoundValue::Property(p) => Ok(p.path.leaf_kind),
            BoundValue::Constant(c) => Ok(core_value_kind(c)),
            _ => Err(QueryError::TypeMismatch("cannot infer a comparison type for this operand".into())),
        }
    }

    /// Resolves a literal without a target type in hand (used for list
    /// literals and other contexts where the peer operand determines the
    /// type); arguments still require the caller's typed accessor, so a
    /// best-effort numeric/string accessor is chosen by the literal kind
    /// that appeared in the placeholder's syntactic position.
    fn resolve_constant_untyped(&self, c: &ConstantLit) -> Result<CoreValue> {
        Ok(match c {
            ConstantLit::Int(i) => CoreValue::Int(*i),
            ConstantLit::Float(f) => CoreValue::Double(*f),
            ConstantLit::Nan => CoreValue::Double(f64::NAN),
            ConstantLit::Infinity { negative } => {
                CoreValue::Double(if *negative { f64::NEG_INFINITY } else { f64::INFINITY })
            }
            ConstantLit::Str(s) => CoreValue::String(s.clone()),
            ConstantLit::Binary(b) => CoreValue::Binary(b.clone()),
            ConstantLit::Timestamp(_) => {
                return Err(QueryError::TypeMismatch(
                    "a date('...') literal requires a known target column to parse against".into(),
                ))
            }
            ConstantLit::Uuid(bytes) => CoreValue::Uuid(*bytes),
            ConstantLit::ObjectId(bytes) => CoreValue::ObjectId(syncdb_core::value::ObjectId96(*bytes)),
            ConstantLit::Null => CoreValue::Null,
            ConstantLit::True => CoreValue::Bool(true),
            ConstantLit::False => CoreValue::Bool(false),
            ConstantLit::Argument(n) => self.resolve_argument_untyped(*n)?,
        })
    }

    fn resolve_argument_untyped(&self, n: usize) -> Result<CoreValue> {
        if let Ok(i) = self.args.int_for_argument(n) {
            return Ok(CoreValue::Int(i));
        }
        if let Ok(f) = self.args.float_for_argument(n) {
            return Ok(CoreValue::Double(f));
        }
        if let Ok(s) = self.args.string_for_argument(n) {
            return Ok(CoreValue::String(s));
        }
        if let Ok(b) = self.args.bool_for_argument(n) {
            return Ok(CoreValue::Bool(b));
        }
        if let Ok(obj) = self.args.object_for_argument(n) {
            return Ok(obj);
        }
        Err(QueryError::ArgumentOutOfRange(n))
    }

    /// Coerces a literal to `kind`, the type of the peer operand in a
    /// comparison (spec §4.6.3: "literals coerce to the column type or
    /// fail with InvalidArgument").
    fn coerce_constant(&self, c: &ConstantLit, kind: ValueKind) -> Result<CoreValue> {
        let resolved = match c {
            ConstantLit::Argument(n) => return self.coerce_argument(*n, kind),
            other => self.resolve_constant_untyped(other)?,
        };
        coerce_value(resolved, kind)
    }

    fn coerce_argument(&self, n: usize, kind: ValueKind) -> Result<CoreValue> {
        match kind {
            ValueKind::Int => self.args.int_for_argument(n).map(CoreValue::Int),
            ValueKind::Float => self.args.float_for_argument(n).map(|f| CoreValue::Float(f as f32)),
            ValueKind::Double => self.args.float_for_argument(n).map(CoreValue::Double),
            ValueKind::Bool => self.args.bool_for_argument(n).map(CoreValue::Bool),
            ValueKind::String => self.args.string_for_argument(n).map(CoreValue::String),
            ValueKind::Binary => self.args.binary_for_argument(n).map(CoreValue::Binary),
            ValueKind::Link | ValueKind::Mixed | ValueKind::ObjectId | ValueKind::Uuid
            | ValueKind::Timestamp | ValueKind::Decimal128 => self.args.object_for_argument(n),
        }
    }
}

fn single_column_path(name: &str) -> Path {
    let mut path = Path::new();
    path.push(PathElement::Column(name.to_string())).expect("single segment never exceeds MAX_NEST");
    path
}

fn core_value_kind(v: &CoreValue) -> ValueKind {
    match v {
        CoreValue::Null | CoreValue::Mixed(_) => ValueKind::Mixed,
        CoreValue::Int(_) => ValueKind::Int,
        CoreValue::Float(_) => ValueKind::Float,
        CoreValue::Double(_) => ValueKind::Double,
        CoreValue::Bool(_) => ValueKind::Bool,
        CoreValue::Timestamp(_) => ValueKind::Timestamp,
        CoreValue::Decimal128(_) => ValueKind::Decimal128,
        CoreValue::Uuid(_) => ValueKind::Uuid,
        CoreValue::ObjectId(_) => ValueKind::ObjectId,
        CoreValue::String(_) => ValueKind::String,
        CoreValue::Binary(_) => ValueKind::Binary,
        CoreValue::Link(_) => ValueKind::Link,
        CoreValue::List(_) | CoreValue::Set(_) | CoreValue::Dictionary(_) => ValueKind::Mixed,
    }
}

/// Coerces an already-resolved value to `kind` (spec §4.6.3 numeric
/// promotion: integers and floats promote via IEEE-754; mixed
/// integer/decimal promotes via decimal).
fn coerce_value(v: CoreValue, kind: ValueKind) -> Result<CoreValue> {
    match (v, kind) {
        (v, k) if core_value_kind(&v) == k => Ok(v),
        (CoreValue::Int(i), ValueKind::Float) => Ok(CoreValue::Float(i as f32)),
        (CoreValue::Int(i), ValueKind::Double) => Ok(CoreValue::Double(i as f64)),
        (CoreValue::Float(f), ValueKind::Double) => Ok(CoreValue::Double(f as f64)),
        (CoreValue::Float(f), ValueKind::Int) => Ok(CoreValue::Int(f as i64)),
        (CoreValue::Double(d), ValueKind::Int) => Ok(CoreValue::Int(d as i64)),
        (CoreValue::Double(d), ValueKind::Float) => Ok(CoreValue::Float(d as f32)),
        (CoreValue::Null, k) if k != ValueKind::Mixed => Ok(CoreValue::Null),
        (v, k) => Err(QueryError::TypeMismatch(format!(
            "cannot coerce {:?} to {k:?}",
            core_value_kind(&v)
        ))),
    }
}

impl<'a> Binder<'a> {
    fn bind_descriptors(&self, descriptors: &[Descriptor]) -> Result<BoundDescriptor> {
        let mut out = BoundDescriptor { sort: Vec::new(), distinct: Vec::new(), limit: None };
        for d in descriptors {
            match d {
                Descriptor::Sort(terms) => {
                    for (path, asc) in terms {
                        out.sort.push((self.bind_path(path)?, *asc));
                    }
                }
                Descriptor::Distinct(paths) => {
                    for path in paths {
                        out.distinct.push(self.bind_path(path)?);
                    }
                }
                Descriptor::Limit(n) => out.limit = Some(*n),
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syncdb_core::schema::{CollectionKind, ValueKind};
    use syncdb_core::{ObjectClassification, ObjectType, Property};

    struct NoArgs;
    impl Arguments for NoArgs {
        fn int_for_argument(&self, _: usize) -> Result<i64> {
            Err(QueryError::ArgumentOutOfRange(0))
        }
        fn float_for_argument(&self, _: usize) -> Result<f64> {
            Err(QueryError::ArgumentOutOfRange(0))
        }
        fn string_for_argument(&self, _: usize) -> Result<String> {
            Err(QueryError::ArgumentOutOfRange(0))
        }
        fn bool_for_argument(&self, _: usize) -> Result<bool> {
            Err(QueryError::ArgumentOutOfRange(0))
        }
        fn binary_for_argument(&self, _: usize) -> Result<Vec<u8>> {
            Err(QueryError::ArgumentOutOfRange(0))
        }
        fn object_for_argument(&self, _: usize) -> Result<CoreValue> {
            Err(QueryError::ArgumentOutOfRange(0))
        }
        fn geo_for_argument(&self, _: usize) -> Result<Geo> {
            Err(QueryError::ArgumentOutOfRange(0))
        }
    }

    struct IntArg(i64);
    impl Arguments for IntArg {
        fn int_for_argument(&self, _: usize) -> Result<i64> {
            Ok(self.0)
        }
        fn float_for_argument(&self, _: usize) -> Result<f64> {
            Err(QueryError::ArgumentOutOfRange(0))
        }
        fn string_for_argument(&self, _: usize) -> Result<String> {
            Err(QueryError::ArgumentOutOfRange(0))
        }
        fn bool_for_argument(&self, _: usize) -> Result<bool> {
            Err(QueryError::ArgumentOutOfRange(0))
        }
        fn binary_for_argument(&self, _: usize) -> Result<Vec<u8>> {
            Err(QueryError::ArgumentOutOfRange(0))
        }
        fn object_for_argument(&self, _: usize) -> Result<CoreValue> {
            Err(QueryError::ArgumentOutOfRange(0))
        }
        fn geo_for_argument(&self, _: usize) -> Result<Geo> {
            Err(QueryError::ArgumentOutOfRange(0))
        }
    }

    fn sample_schema() -> Schema {
        let mut dog = ObjectType::new("Dog", ObjectClassification::Embedded);
        dog.properties.push(Property::new("breed", ValueKind::String));

        let mut person = ObjectType::new("Person", ObjectClassification::TopLevel);
        person.properties.push(Property::new("age", ValueKind::Int));
        person.properties.push(Property::new("name", ValueKind::String));
        let mut dogs = Property::new("dogs", ValueKind::Link);
        dogs.collection = CollectionKind::List;
        dogs.target_type = Some("Dog".into());
        person.properties.push(dogs);

        let mut schema = Schema::new();
        schema.add(dog).unwrap();
        schema.add(person).unwrap();
        schema
    }

    fn parse_and_bind(src: &str, args: &dyn Arguments) -> Result<BoundQueryPlan> {
        let parsed = crate::parser::parse(src).unwrap();
        bind(&parsed, &sample_schema(), "Person", args)
    }

    #[test]
    fn binds_scenario_five_from_the_acceptance_suite() {
        let plan = parse_and_bind(
            r#"age > $0 && ANY dogs.breed == "poodle" SORT(name ASC) LIMIT(10)"#,
            &IntArg(3),
        )
        .unwrap();
        assert_eq!(plan.descriptor.limit, Some(10));
        assert_eq!(plan.descriptor.sort.len(), 1);
        assert!(plan.descriptor.sort[0].1);

        let BoundQuery::And(terms) = plan.predicate else {
            panic!("expected AND");
        };
        let BoundQuery::Compare { right, .. } = &terms[1] else {
            panic!("expected Compare");
        };
        let BoundValue::Constant(CoreValue::String(s)) = right.as_ref() else {
            panic!("expected bound string constant");
        };
        assert_eq!(s, "poodle");
    }

    #[test]
    fn unknown_property_is_invalid_query_name() {
        let err = parse_and_bind("height > 1", &NoArgs).unwrap_err();
        assert!(matches!(err, QueryError::InvalidQueryName(_)));
    }

    #[test]
    fn out_of_range_argument_is_surfaced() {
        let err = parse_and_bind("age > $0", &NoArgs).unwrap_err();
        assert!(matches!(err, QueryError::ArgumentOutOfRange(0)));
    }

    #[test]
    fn integer_literal_coerces_to_string_column_fails() {
        let err = parse_and_bind("name == 5", &NoArgs).unwrap_err();
        assert!(matches!(err, QueryError::TypeMismatch(_)));
    }
}
