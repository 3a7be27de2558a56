//! Entity descriptors, field annotations, and relationship descriptors.
//!
//! Rust has no runtime tag introspection, so every record type declares a
//! field-descriptor table once, at registration time. The table drives the
//! Record Introspector and the Metadata Generator alike.

use super::fields::Value;
use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Scalar kinds
// ============================================================================

/// Declared kind of a plain field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScalarKind {
    String,
    Int32,
    Decimal,
    Boolean,
    /// Anything else; rendered as `Edm.String`.
    Other(String),
}

impl ScalarKind {
    /// Parse a declared kind name. Unknown names are kept as [`ScalarKind::Other`].
    pub fn from_declared(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "string" | "str" | "text" => Self::String,
            "int" | "int32" | "int64" | "integer" | "i32" | "i64" => Self::Int32,
            "decimal" | "float" | "double" | "f64" | "number" => Self::Decimal,
            "bool" | "boolean" => Self::Boolean,
            _ => Self::Other(name.to_string()),
        }
    }

    /// EDM primitive type name without the `Edm.` prefix.
    pub fn edm_name(&self) -> &'static str {
        match self {
            Self::String | Self::Other(_) => "String",
            Self::Int32 => "Int32",
            Self::Decimal => "Decimal",
            Self::Boolean => "Boolean",
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Other(name) => write!(f, "{}", name),
            known => write!(f, "{}", known.edm_name().to_ascii_lowercase()),
        }
    }
}

/// Whether a field holds a plain value or a relationship.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Scalar(ScalarKind),
    Navigation,
}

// ============================================================================
// Field descriptors
// ============================================================================

/// One declared field of a record type, with its annotations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Declared field name
    pub name: String,

    /// Scalar kind or navigation
    pub field_type: FieldType,

    /// Part of the primary key
    pub key: bool,

    /// Explicitly non-nullable
    pub not_null: bool,

    /// Expand-only: emitted only when this relationship is expanded
    pub expand: Option<String>,

    /// Foreign-key reference to a target entity set (informational)
    pub reference: Option<String>,

    /// Wire name override
    pub display_name: Option<String>,

    pub max_length: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
}

impl FieldDescriptor {
    /// A plain field of the given kind.
    pub fn scalar(name: impl Into<String>, kind: ScalarKind) -> Self {
        Self {
            name: name.into(),
            field_type: FieldType::Scalar(kind),
            key: false,
            not_null: false,
            expand: None,
            reference: None,
            display_name: None,
            max_length: None,
            precision: None,
            scale: None,
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::scalar(name, ScalarKind::String)
    }

    pub fn int(name: impl Into<String>) -> Self {
        Self::scalar(name, ScalarKind::Int32)
    }

    pub fn decimal(name: impl Into<String>) -> Self {
        Self::scalar(name, ScalarKind::Decimal)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::scalar(name, ScalarKind::Boolean)
    }

    /// A relationship field. It is expand-only under its own name; use
    /// [`FieldDescriptor::expand`] to bind it to a differently named relationship.
    pub fn navigation(name: impl Into<String>) -> Self {
        let name = name.into();
        let mut field = Self::scalar(name.clone(), ScalarKind::String);
        field.field_type = FieldType::Navigation;
        field.expand = Some(name);
        field
    }

    pub fn key(mut self) -> Self {
        self.key = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn expand(mut self, relationship: impl Into<String>) -> Self {
        self.expand = Some(relationship.into());
        self
    }

    pub fn reference(mut self, target: impl Into<String>) -> Self {
        self.reference = Some(target.into());
        self
    }

    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn max_length(mut self, n: u32) -> Self {
        self.max_length = Some(n);
        self
    }

    pub fn precision(mut self, precision: u32, scale: u32) -> Self {
        self.precision = Some(precision);
        self.scale = Some(scale);
        self
    }

    /// Name the field carries on the wire.
    pub fn wire_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    /// Relationship this field stands for, if it is one.
    pub fn relationship_name(&self) -> Option<&str> {
        match self.field_type {
            FieldType::Navigation => Some(self.expand.as_deref().unwrap_or(&self.name)),
            FieldType::Scalar(_) => None,
        }
    }

    pub fn is_navigation(&self) -> bool {
        self.field_type == FieldType::Navigation
    }
}

// ============================================================================
// Entity descriptors
// ============================================================================

/// A record type: its entity-set name, its fields in declaration order, and
/// its declared relationships (relationship name → target entity set).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityType {
    pub name: String,
    pub fields: Vec<FieldDescriptor>,
    pub relationships: IndexMap<String, String>,
}

impl EntityType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            relationships: IndexMap::new(),
        }
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn relationship(mut self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.relationships.insert(name.into(), target.into());
        self
    }

    pub fn find_field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn key_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.key)
    }
}

// ============================================================================
// Relationships
// ============================================================================

/// Relationship cardinality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Cardinality {
    OneToOne,
    OneToMany,
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OneToOne => write!(f, "one-to-one"),
            Self::OneToMany => write!(f, "one-to-many"),
        }
    }
}

/// Registered relationship of one entity set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipInfo {
    pub target: String,
    pub cardinality: Cardinality,
}

// ============================================================================
// Records
// ============================================================================

/// A typed domain record the core can introspect.
pub trait Record: Send + Sync {
    /// Descriptor table of this record's type.
    fn entity_type(&self) -> &EntityType;

    /// Current value of a declared field, by declared name.
    fn field(&self, name: &str) -> Option<Value>;
}

impl<R: Record + ?Sized> Record for Box<R> {
    fn entity_type(&self) -> &EntityType {
        (**self).entity_type()
    }

    fn field(&self, name: &str) -> Option<Value> {
        (**self).field(name)
    }
}
