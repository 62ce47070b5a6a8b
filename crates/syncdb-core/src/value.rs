//! Value kinds (§3.1) and the `Mixed` tagged variant.

use serde::{Deserialize, Serialize};

/// Maximum nesting depth for `Mixed`-typed collections (§3.1).
pub const MAX_NEST: u32 = 100;

/// A UTC timestamp: seconds since the Unix epoch plus nanosecond remainder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    pub seconds: i64,
    pub nanoseconds: i32,
}

/// 96-bit MongoDB-style ObjectId (distinct from the 128-bit `ObjectID` of C4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectId96(pub [u8; 12]);

/// A typed link: target table plus target row key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Link {
    pub target_table: u32,
    pub target_key: i64,
}

/// A scalar or heterogeneous value. `Mixed` is the `Value` variant used
/// where the original system allows mixing of types in a single collection
/// element, and may itself hold a nested collection up to [`MAX_NEST`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Int(i64),
    Float(f32),
    Double(f64),
    Bool(bool),
    Timestamp(Timestamp),
    Decimal128([u8; 16]),
    Uuid([u8; 16]),
    ObjectId(ObjectId96),
    String(String),
    Binary(Vec<u8>),
    Link(Link),
    Mixed(Box<Value>),
    List(Vec<Value>),
    Set(Vec<Value>),
    Dictionary(Vec<(String, Value)>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Canonical, deterministic byte encoding used as input to the
    /// hashed-primary-key derivation rule (c) and to any other place that
    /// needs a stable digest of a value. Distinct scalar kinds never share
    /// an encoding prefix, so values of different kinds never collide.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_into(&mut out);
        out
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        match self {
            Value::Null => out.push(0),
            Value::Int(i) => {
                out.push(1);
                out.extend_from_slice(&i.to_le_bytes());
            }
            Value::Float(f) => {
                out.push(2);
                out.extend_from_slice(&f.to_le_bytes());
            }
            Value::Double(d) => {
                out.push(3);
                out.extend_from_slice(&d.to_le_bytes());
            }
            Value::Bool(b) => {
                out.push(4);
                out.push(*b as u8);
            }
            Value::Timestamp(t) => {
                out.push(5);
                out.extend_from_slice(&t.seconds.to_le_bytes());
                out.extend_from_slice(&t.nanoseconds.to_le_bytes());
            }
            Value::Decimal128(bytes) => {
                out.push(6);
                out.extend_from_slice(bytes);
            }
            Value::Uuid(bytes) => {
                out.push(7);
                out.extend_from_slice(bytes);
            }
            Value::ObjectId(oid) => {
                out.push(8);
                out.extend_from_slice(&oid.0);
            }
            Value::String(s) => {
                out.push(9);
                out.extend_from_slice(&(s.len() as u64).to_le_bytes());
                out.extend_from_slice(s.as_bytes());
            }
            Value::Binary(b) => {
                out.push(10);
                out.extend_from_slice(&(b.len() as u64).to_le_bytes());
                out.extend_from_slice(b);
            }
            Value::Link(l) => {
                out.push(11);
                out.extend_from_slice(&l.target_table.to_le_bytes());
                out.extend_from_slice(&l.target_key.to_le_bytes());
            }
            Value::Mixed(inner) => {
                out.push(12);
                inner.encode_into(out);
            }
            Value::List(items) => {
                out.push(13);
                out.extend_from_slice(&(items.len() as u64).to_le_bytes());
                for item in items {
                    item.encode_into(out);
                }
            }
            Value::Set(items) => {
                out.push(14);
                out.extend_from_slice(&(items.len() as u64).to_le_bytes());
                for item in items {
                    item.encode_into(out);
                }
            }
            Value::Dictionary(entries) => {
                out.push(15);
                out.extend_from_slice(&(entries.len() as u64).to_le_bytes());
                for (k, v) in entries {
                    out.extend_from_slice(&(k.len() as u64).to_le_bytes());
                    out.extend_from_slice(k.as_bytes());
                    v.encode_into(out);
                }
            }
        }
    }
}
