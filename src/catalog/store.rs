//! In-memory records for a service definition, and the registry built on them.

use super::definition::{validate_definition, ServiceDefinition};
use crate::core::fields::{FieldList, Scalar, Value};
use crate::core::registry::{EntityHandler, ExpandCapability, Registry, Related};
use crate::core::types::{Cardinality, EntityType, Record};
use indexmap::IndexMap;
use log::debug;
use rustc_hash::FxHashMap;
use std::sync::Arc;

// ============================================================================
// Records
// ============================================================================

/// A record whose shape comes from a definition rather than a Rust type.
#[derive(Debug, Clone)]
pub struct DynamicRecord {
    entity_type: Arc<EntityType>,
    values: IndexMap<String, Scalar>,
}

impl DynamicRecord {
    pub fn new(entity_type: Arc<EntityType>, values: IndexMap<String, Scalar>) -> Self {
        Self { entity_type, values }
    }

    pub fn get(&self, field: &str) -> Option<&Scalar> {
        self.values.get(field)
    }
}

impl Record for DynamicRecord {
    fn entity_type(&self) -> &EntityType {
        &self.entity_type
    }

    fn field(&self, name: &str) -> Option<Value> {
        self.values.get(name).cloned().map(Value::Scalar)
    }
}

struct EntitySetData {
    entity_type: Arc<EntityType>,
    /// Declared name of the key field
    key: String,
    records: Vec<DynamicRecord>,
}

/// Every entity set's records, read-only after construction.
pub struct Dataset {
    sets: FxHashMap<String, EntitySetData>,
}

impl Dataset {
    /// Load seed records. Non-scalar values are skipped; validation rejects them earlier.
    pub fn from_definition(def: &ServiceDefinition) -> Self {
        let mut sets = FxHashMap::default();
        for (name, set) in &def.entity_sets {
            let Some(entity_type) = def.entity_type(name) else {
                continue;
            };
            let entity_type = Arc::new(entity_type);
            let key = entity_type
                .key_fields()
                .next()
                .map_or_else(|| "ID".to_string(), |f| f.name.clone());
            let records = set
                .records
                .iter()
                .map(|raw| {
                    let values = raw
                        .iter()
                        .filter_map(|(k, v)| Scalar::from_json(v).map(|s| (k.clone(), s)))
                        .collect();
                    DynamicRecord::new(Arc::clone(&entity_type), values)
                })
                .collect();
            sets.insert(
                name.clone(),
                EntitySetData {
                    entity_type,
                    key,
                    records,
                },
            );
        }
        Self { sets }
    }

    pub fn entity_type(&self, entity_set: &str) -> Option<&EntityType> {
        self.sets.get(entity_set).map(|s| s.entity_type.as_ref())
    }

    /// Records of an entity set in declaration order.
    pub fn records(&self, entity_set: &str) -> &[DynamicRecord] {
        self.sets
            .get(entity_set)
            .map(|s| s.records.as_slice())
            .unwrap_or_default()
    }

    /// Record whose key field equals `id`.
    pub fn find(&self, entity_set: &str, id: &str) -> Option<&DynamicRecord> {
        let set = self.sets.get(entity_set)?;
        set.records
            .iter()
            .find(|r| r.get(&set.key).and_then(Scalar::as_key).as_deref() == Some(id))
    }
}

// ============================================================================
// Foreign-key expansion
// ============================================================================

#[derive(Debug, Clone)]
struct Link {
    target: String,
    cardinality: Cardinality,
    /// One-to-one: wire name of the local foreign key.
    /// One-to-many: wire name of the local key.
    local: String,
    /// One-to-many only: declared name of the foreign key on the target.
    remote: String,
}

/// Resolves relationships by matching key and foreign-key values.
pub struct ForeignKeyExpand {
    dataset: Arc<Dataset>,
    links: IndexMap<String, Link>,
}

impl ExpandCapability for ForeignKeyExpand {
    fn expand(&self, record: &FieldList, relationship: &str, _sub_query: &str) -> Option<Related> {
        let link = self.links.get(relationship)?;
        let value = record.get(&link.local).and_then(Value::as_key)?;
        match link.cardinality {
            Cardinality::OneToOne => {
                let target = self.dataset.find(&link.target, &value)?;
                Some(Related::one(target.clone()))
            }
            Cardinality::OneToMany => {
                let matches = self
                    .dataset
                    .records(&link.target)
                    .iter()
                    .filter(|r| r.get(&link.remote).and_then(Scalar::as_key).as_deref() == Some(value.as_str()))
                    .cloned();
                Some(Related::many(matches))
            }
        }
    }
}

fn wire_name(entity_type: &EntityType, field: &str) -> String {
    entity_type
        .find_field(field)
        .map_or_else(|| field.to_string(), |f| f.wire_name().to_string())
}

fn links_for(def: &ServiceDefinition, dataset: &Dataset, entity_set: &str) -> IndexMap<String, Link> {
    let mut links = IndexMap::new();
    let Some(entity_type) = dataset.entity_type(entity_set) else {
        return links;
    };
    for rel in def.relationships.iter().filter(|r| r.from == entity_set) {
        let Ok(fk) = def.foreign_key_of(rel) else {
            continue;
        };
        let link = match rel.cardinality {
            Cardinality::OneToOne => Link {
                target: rel.target.clone(),
                cardinality: rel.cardinality,
                local: wire_name(entity_type, &fk),
                remote: String::new(),
            },
            Cardinality::OneToMany => {
                let key = entity_type
                    .key_fields()
                    .next()
                    .map_or("ID", |f| f.name.as_str());
                Link {
                    target: rel.target.clone(),
                    cardinality: rel.cardinality,
                    local: wire_name(entity_type, key),
                    remote: fk,
                }
            }
        };
        debug!("{}.{} resolves through {:?}", entity_set, rel.name, link);
        links.insert(rel.name.clone(), link);
    }
    links
}

// ============================================================================
// Registry
// ============================================================================

/// Validate `def` and freeze it into a registry over its seed records.
pub fn build_registry(def: &ServiceDefinition) -> Result<Registry, String> {
    let errors = validate_definition(def);
    if !errors.is_empty() {
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        return Err(messages.join("\n"));
    }

    let dataset = Arc::new(Dataset::from_definition(def));
    let mut builder = Registry::builder(def.namespace.as_str());

    for (name, set) in &def.entity_sets {
        let entity_type = def
            .entity_type(name)
            .ok_or_else(|| format!("entity set '{}' vanished during build", name))?;
        let mut handler = EntityHandler::new();

        if set.capabilities.collection {
            let data = Arc::clone(&dataset);
            let set_name = name.clone();
            handler = handler.with_collection(move || {
                data.records(&set_name)
                    .iter()
                    .map(|r| Box::new(r.clone()) as Box<dyn Record>)
                    .collect()
            });
        }
        if set.capabilities.by_id {
            let data = Arc::clone(&dataset);
            let set_name = name.clone();
            handler = handler.with_by_id(move |id| {
                data.find(&set_name, id)
                    .map(|r| Box::new(r.clone()) as Box<dyn Record>)
            });
        }
        if set.capabilities.expand {
            handler = handler.with_expand(ForeignKeyExpand {
                dataset: Arc::clone(&dataset),
                links: links_for(def, &dataset, name),
            });
        }

        builder.register_entity(entity_type, handler);
    }

    for rel in &def.relationships {
        builder.register_relationship(
            rel.from.as_str(),
            rel.name.as_str(),
            rel.target.as_str(),
            rel.cardinality,
        );
    }

    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::definition::parse_definition;
    use crate::catalog::DEMO_DEFINITION;
    use crate::core::expand::expand_record;
    use crate::core::parser::QueryOptions;

    fn demo() -> ServiceDefinition {
        parse_definition(DEMO_DEFINITION).unwrap()
    }

    #[test]
    fn test_dataset_lookup() {
        let data = Dataset::from_definition(&demo());
        assert_eq!(data.records("Products").len(), 3);
        assert!(data.records("Nope").is_empty());
        let p = data.find("Products", "2").unwrap();
        assert_eq!(p.get("Name"), Some(&Scalar::String("Product B".into())));
        assert!(data.find("Products", "9").is_none());
    }

    #[test]
    fn test_dynamic_record_fields() {
        let data = Dataset::from_definition(&demo());
        let p = data.find("Products", "1").unwrap();
        assert_eq!(p.field("Price"), Some(Value::Scalar(Scalar::Decimal(100.0))));
        assert_eq!(p.field("Category"), None);
        assert_eq!(p.entity_type().name, "Products");
    }

    #[test]
    fn test_build_registry_registers_everything() {
        let r = build_registry(&demo()).unwrap();
        let names: Vec<_> = r.entity_types().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Products", "Categories", "Suppliers", "Customers"]);
        assert!(r.handler("Customers").unwrap().collection.is_none());
        assert!(r.handler("Products").unwrap().by_id.is_some());
        assert_eq!(r.relationships("Products").unwrap().len(), 2);
    }

    #[test]
    fn test_build_registry_rejects_invalid() {
        let mut def = demo();
        def.version = "0.9".into();
        let err = build_registry(&def).unwrap_err();
        assert!(err.contains("version must be"));
    }

    #[test]
    fn test_one_to_one_expansion() {
        let r = build_registry(&demo()).unwrap();
        let data = Dataset::from_definition(&demo());
        let p = data.find("Products", "3").unwrap();
        let f = expand_record(&r, p, &QueryOptions::parse("$expand=Category").expand);
        let category = f.get("Category").and_then(Value::as_nested).unwrap();
        assert_eq!(category.get("Name").and_then(Value::as_str), Some("Books"));
    }

    #[test]
    fn test_one_to_many_expansion() {
        let r = build_registry(&demo()).unwrap();
        let data = Dataset::from_definition(&demo());
        let s = data.find("Suppliers", "1").unwrap();
        let f = expand_record(&r, s, &QueryOptions::parse("$expand=Products").expand);
        let ids: Vec<_> = f
            .get("Products")
            .and_then(Value::as_nested_list)
            .unwrap()
            .iter()
            .filter_map(|p| p.get("ID").and_then(Value::as_str))
            .collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[test]
    fn test_disabled_expand_is_noop() {
        let mut def = demo();
        if let Some(set) = def.entity_sets.get_mut("Products") {
            set.capabilities.expand = false;
        }
        let r = build_registry(&def).unwrap();
        let data = Dataset::from_definition(&def);
        let p = data.find("Products", "1").unwrap();
        let f = expand_record(&r, p, &QueryOptions::parse("$expand=Category").expand);
        assert_eq!(f.get("Category"), Some(&Value::Absent));
    }
}
