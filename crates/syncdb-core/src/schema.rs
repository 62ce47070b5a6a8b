//! Schema: object types and properties (§3.2).

use serde::{Deserialize, Serialize};

/// The kind of value a scalar or collection element holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueKind {
    Int,
    Float,
    Double,
    Bool,
    Timestamp,
    Decimal128,
    Uuid,
    ObjectId,
    String,
    Binary,
    Link,
    Mixed,
}

/// How multiple elements of a property are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollectionKind {
    Single,
    List,
    Set,
    Dictionary,
}

/// A named, typed field on an [`ObjectType`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    pub kind: ValueKind,
    pub nullable: bool,
    pub collection: CollectionKind,
    /// Target type name, required when `kind == ValueKind::Link`.
    pub target_type: Option<String>,
    pub is_primary_key: bool,
}

impl Property {
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        Property {
            name: name.into(),
            kind,
            nullable: false,
            collection: CollectionKind::Single,
            target_type: None,
            is_primary_key: false,
        }
    }
}

/// Table-level classification, §3.2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectClassification {
    TopLevel,
    /// Write-only, not queryable.
    TopLevelAsymmetric,
    /// Lifetime tied to a unique owner; addressed by path, not by key.
    Embedded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectType {
    pub name: String,
    pub classification: ObjectClassification,
    pub primary_key: Option<String>,
    pub properties: Vec<Property>,
}

impl ObjectType {
    pub fn new(name: impl Into<String>, classification: ObjectClassification) -> Self {
        ObjectType {
            name: name.into(),
            classification,
            primary_key: None,
            properties: Vec::new(),
        }
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Invariants (§3.2): a primary key property must exist, be
    /// non-nullable, and be unique (there is exactly one primary key).
    pub fn validate(&self) -> Result<(), String> {
        if let Some(pk_name) = &self.primary_key {
            let prop = self
                .property(pk_name)
                .ok_or_else(|| format!("primary key `{pk_name}` is not a declared property"))?;
            if prop.nullable {
                return Err(format!("primary key `{pk_name}` must be non-nullable"));
            }
        }
        let pk_count = self.properties.iter().filter(|p| p.is_primary_key).count();
        if pk_count > 1 {
            return Err("at most one property may be marked as the primary key".into());
        }
        Ok(())
    }
}

/// A set of object types forming one database schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schema {
    pub types: Vec<ObjectType>,
}

impl Schema {
    pub fn new() -> Self {
        Schema::default()
    }

    pub fn object_type(&self, name: &str) -> Option<&ObjectType> {
        self.types.iter().find(|t| t.name == name)
    }

    pub fn add(&mut self, object_type: ObjectType) -> Result<(), String> {
        object_type.validate()?;
        if self.object_type(&object_type.name).is_some() {
            return Err(format!("duplicate object type `{}`", object_type.name));
        }
        self.types.push(object_type);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_key_must_be_non_nullable() {
        let mut person = ObjectType::new("Person", ObjectClassification::TopLevel);
        let mut age = Property::new("age", ValueKind::Int);
        age.nullable = true;
        person.properties.push(age);
        person.primary_key = Some("age".into());
        assert!(person.validate().is_err());
    }

    #[test]
    fn schema_rejects_duplicate_type_names() {
        let mut schema = Schema::new();
        schema
            .add(ObjectType::new("Dog", ObjectClassification::Embedded))
            .unwrap();
        let err = schema.add(ObjectType::new("Dog", ObjectClassification::Embedded));
        assert!(err.is_err());
    }
}
