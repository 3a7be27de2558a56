//! Service definition format: YAML parsing and validation.
//!
//! A service definition declares the namespace, the entity sets with their
//! fields, capabilities and seed records, and the relationships between
//! sets. Validation checks:
//! - Version must be "1.0"
//! - Namespace must be a non-empty identifier
//! - Every entity set declares fields, a key, and no duplicates
//! - Relationships reference declared sets and resolve a foreign key
//! - Expand-only fields name a relationship of their set
//! - Records only use declared scalar fields

use crate::core::types::{Cardinality, EntityType, FieldDescriptor, ScalarKind};
use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

// ============================================================================
// Top-level service.yaml
// ============================================================================

/// Root of a service definition.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ServiceDefinition {
    /// Schema version (must be "1.0")
    pub version: String,

    /// CSDL schema namespace
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Optional description
    #[serde(default)]
    pub description: Option<String>,

    /// Entity sets in registration order
    #[serde(default)]
    pub entity_sets: IndexMap<String, EntitySetDefinition>,

    /// Relationships between entity sets
    #[serde(default)]
    pub relationships: Vec<RelationshipDefinition>,
}

fn default_namespace() -> String {
    "CatalogService".to_string()
}

// ============================================================================
// Entity sets
// ============================================================================

/// One entity set: its record type, what it can do, and its data.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EntitySetDefinition {
    /// Fields in declaration (wire) order
    pub fields: Vec<FieldDefinition>,

    /// Enabled request capabilities
    #[serde(default)]
    pub capabilities: Capabilities,

    /// Seed records keyed by declared field name
    #[serde(default)]
    pub records: Vec<IndexMap<String, serde_json::Value>>,
}

/// A declared field.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FieldDefinition {
    pub name: String,

    /// Scalar kind (`string`, `int32`, `decimal`, `boolean`) or `navigation`
    #[serde(rename = "type", default = "default_field_type")]
    pub field_type: String,

    #[serde(default)]
    pub key: bool,

    #[serde(default)]
    pub not_null: bool,

    /// Emit only when this relationship is expanded
    #[serde(default)]
    pub expand: Option<String>,

    /// Entity set a foreign-key field points at
    #[serde(default, rename = "ref")]
    pub reference: Option<String>,

    /// Wire name override
    #[serde(default)]
    pub display_name: Option<String>,

    #[serde(default)]
    pub max_length: Option<u32>,

    #[serde(default)]
    pub precision: Option<u32>,

    #[serde(default)]
    pub scale: Option<u32>,
}

fn default_field_type() -> String {
    "string".to_string()
}

impl FieldDefinition {
    pub fn is_navigation(&self) -> bool {
        self.field_type.eq_ignore_ascii_case("navigation")
    }

    /// Relationship name for navigation and expand-only fields.
    pub fn relationship_name(&self) -> Option<&str> {
        match &self.expand {
            Some(rel) => Some(rel),
            None if self.is_navigation() => Some(&self.name),
            None => None,
        }
    }

    /// Descriptor with every declared annotation applied.
    pub fn to_descriptor(&self) -> FieldDescriptor {
        let mut field = if self.is_navigation() {
            FieldDescriptor::navigation(self.name.as_str())
        } else {
            FieldDescriptor::scalar(self.name.as_str(), ScalarKind::from_declared(&self.field_type))
        };
        if let Some(rel) = &self.expand {
            field = field.expand(rel.as_str());
        }
        if self.key {
            field = field.key();
        }
        if self.not_null {
            field = field.not_null();
        }
        if let Some(target) = &self.reference {
            field = field.reference(target.as_str());
        }
        if let Some(name) = &self.display_name {
            field = field.display_name(name.as_str());
        }
        field.max_length = self.max_length;
        field.precision = self.precision;
        field.scale = self.scale;
        field
    }
}

/// Request capabilities of an entity set. Disabled fetches answer 501.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Capabilities {
    #[serde(default = "default_true")]
    pub collection: bool,

    #[serde(default = "default_true")]
    pub by_id: bool,

    #[serde(default = "default_true")]
    pub expand: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            collection: true,
            by_id: true,
            expand: true,
        }
    }
}

fn default_true() -> bool {
    true
}

// ============================================================================
// Relationships
// ============================================================================

/// `from.name` points at `target`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RelationshipDefinition {
    pub from: String,
    pub name: String,
    pub target: String,
    pub cardinality: Cardinality,

    /// Foreign-key field. One-to-one: on `from`, defaults to `<name>_ID`.
    /// One-to-many: on `target`, defaults to `<partner>_ID`.
    #[serde(default)]
    pub foreign_key: Option<String>,
}

impl ServiceDefinition {
    /// Record type of a declared entity set.
    pub fn entity_type(&self, name: &str) -> Option<EntityType> {
        let set = self.entity_sets.get(name)?;
        let mut entity_type = EntityType::new(name);
        for field in &set.fields {
            entity_type = entity_type.field(field.to_descriptor());
        }
        for rel in self.relationships.iter().filter(|r| r.from == name) {
            entity_type = entity_type.relationship(rel.name.as_str(), rel.target.as_str());
        }
        Some(entity_type)
    }

    /// Inverse of `rel`: the first relationship from its target back to its source.
    pub fn partner_of(&self, rel: &RelationshipDefinition) -> Option<&RelationshipDefinition> {
        self.relationships
            .iter()
            .find(|r| r.from == rel.target && r.target == rel.from)
    }

    /// Foreign-key field of a relationship, explicit or by convention.
    pub fn foreign_key_of(&self, rel: &RelationshipDefinition) -> Result<String, String> {
        if let Some(fk) = &rel.foreign_key {
            return Ok(fk.clone());
        }
        match rel.cardinality {
            Cardinality::OneToOne => Ok(format!("{}_ID", rel.name)),
            Cardinality::OneToMany => self
                .partner_of(rel)
                .map(|p| format!("{}_ID", p.name))
                .ok_or_else(|| {
                    format!(
                        "relationship '{}.{}' has no inverse on '{}'; set foreign_key",
                        rel.from, rel.name, rel.target
                    )
                }),
        }
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// Validation error.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Parse a service.yaml file from disk.
pub fn parse_definition_file(path: &Path) -> Result<ServiceDefinition, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
    parse_definition(&content)
}

/// Parse a service definition from a string.
pub fn parse_definition(yaml: &str) -> Result<ServiceDefinition, String> {
    serde_yaml_ng::from_str(yaml).map_err(|e| format!("YAML parse error: {}", e))
}

/// JSON Schema of the definition format.
pub fn definition_schema() -> Result<String, String> {
    let schema = schemars::schema_for!(ServiceDefinition);
    serde_json::to_string_pretty(&schema).map_err(|e| format!("schema serialization error: {}", e))
}

// ============================================================================
// Validation
// ============================================================================

/// Validate a parsed definition. Returns a list of errors (empty = valid).
pub fn validate_definition(def: &ServiceDefinition) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut error = |message: String| errors.push(ValidationError { message });

    if def.version != "1.0" {
        error(format!("version must be \"1.0\", got \"{}\"", def.version));
    }

    if def.namespace.is_empty() {
        error("namespace must not be empty".to_string());
    } else if def.namespace.chars().any(|c| c.is_whitespace() || c == '"') {
        error(format!("namespace '{}' is not a valid identifier", def.namespace));
    }

    // Relationships
    let mut seen_rels = HashSet::new();
    for rel in &def.relationships {
        let from = def.entity_sets.get(&rel.from);
        let target = def.entity_sets.get(&rel.target);
        if from.is_none() {
            error(format!(
                "relationship '{}.{}' is declared on unknown entity set '{}'",
                rel.from, rel.name, rel.from
            ));
        }
        if target.is_none() {
            error(format!(
                "relationship '{}.{}' targets unknown entity set '{}'",
                rel.from, rel.name, rel.target
            ));
        }
        if !seen_rels.insert((rel.from.as_str(), rel.name.as_str())) {
            error(format!("relationship '{}.{}' is declared twice", rel.from, rel.name));
        }

        let (Some(from), Some(target)) = (from, target) else {
            continue;
        };
        match def.foreign_key_of(rel) {
            Ok(fk) => {
                let (owner, fields) = match rel.cardinality {
                    Cardinality::OneToOne => (&rel.from, &from.fields),
                    Cardinality::OneToMany => (&rel.target, &target.fields),
                };
                if !fields.iter().any(|f| f.name == fk && !f.is_navigation()) {
                    error(format!(
                        "relationship '{}.{}': foreign key '{}' is not a field of '{}'",
                        rel.from, rel.name, fk, owner
                    ));
                }
            }
            Err(message) => error(message),
        }
    }

    // Entity sets
    for (name, set) in &def.entity_sets {
        if set.fields.is_empty() {
            error(format!("entity set '{}' has no fields", name));
            continue;
        }

        let mut seen_fields = HashSet::new();
        for field in &set.fields {
            if !seen_fields.insert(field.name.as_str()) {
                error(format!("entity set '{}' declares field '{}' twice", name, field.name));
            }
            if let Some(rel) = field.relationship_name() {
                let known = def
                    .relationships
                    .iter()
                    .any(|r| &r.from == name && r.name == rel);
                if !known {
                    error(format!(
                        "field '{}.{}' expands unknown relationship '{}'",
                        name, field.name, rel
                    ));
                }
            }
            if field.key && field.is_navigation() {
                error(format!("key field '{}.{}' cannot be a navigation", name, field.name));
            }
        }
        if !set.fields.iter().any(|f| f.key) {
            error(format!("entity set '{}' declares no key field", name));
        }

        for (i, record) in set.records.iter().enumerate() {
            for (key, value) in record {
                match set.fields.iter().find(|f| &f.name == key) {
                    None => error(format!(
                        "entity set '{}' record {} has unknown field '{}'",
                        name, i, key
                    )),
                    Some(f) if f.is_navigation() => error(format!(
                        "entity set '{}' record {} sets navigation field '{}'",
                        name, i, key
                    )),
                    Some(_) if value.is_array() || value.is_object() => error(format!(
                        "entity set '{}' record {} field '{}' is not a scalar",
                        name, i, key
                    )),
                    Some(_) => {}
                }
            }
        }
    }

    errors
}
