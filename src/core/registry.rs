//! Entity registry: entity sets, their handlers, and their relationships.
//!
//! Built once through [`RegistryBuilder`], then frozen. A [`Registry`] has no
//! interior mutability and is shared across request handlers behind an `Arc`.

use super::error::{ODataError, Result};
use super::fields::FieldList;
use super::types::{Cardinality, EntityType, Record, RelationshipInfo};
use indexmap::IndexMap;
use log::{info, warn};
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

// ============================================================================
// Expansion capability
// ============================================================================

/// Records produced by an expansion capability.
pub enum Related {
    /// One-to-one target
    One(Box<dyn Record>),
    /// One-to-many targets, in order
    Many(Vec<Box<dyn Record>>),
}

impl Related {
    pub fn one(record: impl Record + 'static) -> Self {
        Self::One(Box::new(record))
    }

    pub fn many<R: Record + 'static>(records: impl IntoIterator<Item = R>) -> Self {
        Self::Many(
            records
                .into_iter()
                .map(|r| Box::new(r) as Box<dyn Record>)
                .collect(),
        )
    }
}

impl fmt::Debug for Related {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::One(r) => write!(f, "One({})", r.entity_type().name),
            Self::Many(v) => write!(f, "Many({} records)", v.len()),
        }
    }
}

/// Resolves a relationship of a record to the related records.
///
/// `record` is the record's current field list. `sub_query` is the content
/// of the `$expand` item's parentheses with a leading `$expand=`/`$select=`
/// marker stripped (`Category($expand=Products)` passes `Products`). The
/// engine applies nested options itself, so implementations only resolve
/// the relationship. `None` means "cannot expand" and leaves the record
/// untouched.
pub trait ExpandCapability: Send + Sync {
    fn expand(&self, record: &FieldList, relationship: &str, sub_query: &str) -> Option<Related>;
}

/// Capability that never expands anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoExpand;

impl ExpandCapability for NoExpand {
    fn expand(&self, _record: &FieldList, _relationship: &str, _sub_query: &str) -> Option<Related> {
        None
    }
}

static NO_EXPAND: NoExpand = NoExpand;

// ============================================================================
// Handlers
// ============================================================================

pub type CollectionFetch = Arc<dyn Fn() -> Vec<Box<dyn Record>> + Send + Sync>;
pub type ByIdFetch = Arc<dyn Fn(&str) -> Option<Box<dyn Record>> + Send + Sync>;

/// Capabilities one entity set offers. A missing fetch answers 501.
#[derive(Clone)]
pub struct EntityHandler {
    pub collection: Option<CollectionFetch>,
    pub by_id: Option<ByIdFetch>,
    pub expand: Arc<dyn ExpandCapability>,
}

impl EntityHandler {
    /// Handler with no fetches and no expansion.
    pub fn new() -> Self {
        Self {
            collection: None,
            by_id: None,
            expand: Arc::new(NoExpand),
        }
    }

    pub fn with_collection<F>(mut self, fetch: F) -> Self
    where
        F: Fn() -> Vec<Box<dyn Record>> + Send + Sync + 'static,
    {
        self.collection = Some(Arc::new(fetch));
        self
    }

    pub fn with_by_id<F>(mut self, fetch: F) -> Self
    where
        F: Fn(&str) -> Option<Box<dyn Record>> + Send + Sync + 'static,
    {
        self.by_id = Some(Arc::new(fetch));
        self
    }

    pub fn with_expand(mut self, capability: impl ExpandCapability + 'static) -> Self {
        self.expand = Arc::new(capability);
        self
    }
}

impl Default for EntityHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EntityHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityHandler")
            .field("collection", &self.collection.is_some())
            .field("by_id", &self.by_id.is_some())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Builder
// ============================================================================

struct Entry {
    entity_type: Arc<EntityType>,
    handler: EntityHandler,
}

/// Mutable registration phase. Call [`RegistryBuilder::build`] before serving.
pub struct RegistryBuilder {
    namespace: String,
    entries: Vec<Entry>,
    index: FxHashMap<String, usize>,
    relationships: FxHashMap<String, IndexMap<String, RelationshipInfo>>,
}

impl RegistryBuilder {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            entries: Vec::new(),
            index: FxHashMap::default(),
            relationships: FxHashMap::default(),
        }
    }

    /// Register an entity set under the entity type's name. Registering the
    /// same name twice replaces the earlier registration in place.
    pub fn register_entity(&mut self, entity_type: EntityType, handler: EntityHandler) -> &mut Self {
        let name = entity_type.name.clone();
        let entry = Entry {
            entity_type: Arc::new(entity_type),
            handler,
        };
        match self.index.get(&name) {
            Some(&i) => {
                warn!("Entity set {} registered twice; replacing handler", name);
                self.entries[i] = entry;
            }
            None => {
                info!("Registered entity set: {}", name);
                self.index.insert(name, self.entries.len());
                self.entries.push(entry);
            }
        }
        self
    }

    /// Register relationship `name` of `entity_set` pointing at `target`.
    pub fn register_relationship(
        &mut self,
        entity_set: impl Into<String>,
        name: impl Into<String>,
        target: impl Into<String>,
        cardinality: Cardinality,
    ) -> &mut Self {
        let entity_set = entity_set.into();
        let name = name.into();
        let target = target.into();
        info!(
            "Registered relationship: {}.{} -> {} ({})",
            entity_set, name, target, cardinality
        );
        self.relationships
            .entry(entity_set)
            .or_default()
            .insert(name, RelationshipInfo { target, cardinality });
        self
    }

    /// Freeze the registry.
    pub fn build(self) -> Registry {
        for (set, rels) in &self.relationships {
            if !self.index.contains_key(set) {
                warn!("Relationships declared for unregistered entity set {}", set);
            }
            for (name, rel) in rels {
                if !self.index.contains_key(&rel.target) {
                    warn!(
                        "Relationship {}.{} targets unregistered entity set {}",
                        set, name, rel.target
                    );
                }
            }
        }
        Registry {
            namespace: self.namespace,
            entries: self.entries,
            index: self.index,
            relationships: self.relationships,
        }
    }
}

// ============================================================================
// Frozen registry
// ============================================================================

/// Immutable, thread-safe view of every registered entity set.
pub struct Registry {
    namespace: String,
    entries: Vec<Entry>,
    index: FxHashMap<String, usize>,
    relationships: FxHashMap<String, IndexMap<String, RelationshipInfo>>,
}

impl Registry {
    pub fn builder(namespace: impl Into<String>) -> RegistryBuilder {
        RegistryBuilder::new(namespace)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn entry(&self, entity_set: &str) -> Option<&Entry> {
        self.index.get(entity_set).map(|&i| &self.entries[i])
    }

    pub fn contains(&self, entity_set: &str) -> bool {
        self.index.contains_key(entity_set)
    }

    /// Handler of an entity set.
    pub fn handler(&self, entity_set: &str) -> Result<&EntityHandler> {
        self.entry(entity_set)
            .map(|e| &e.handler)
            .ok_or_else(|| ODataError::EntitySetNotFound(entity_set.to_string()))
    }

    pub fn entity_type(&self, entity_set: &str) -> Option<&EntityType> {
        self.entry(entity_set).map(|e| e.entity_type.as_ref())
    }

    /// Entity types in registration order.
    pub fn entity_types(&self) -> impl Iterator<Item = &EntityType> {
        self.entries.iter().map(|e| e.entity_type.as_ref())
    }

    /// Expansion capability of an entity set, or a no-op when unregistered.
    pub fn capability(&self, entity_set: &str) -> &dyn ExpandCapability {
        match self.entry(entity_set) {
            Some(e) => e.handler.expand.as_ref(),
            None => &NO_EXPAND,
        }
    }

    /// Relationships of an entity set in registration order.
    pub fn relationships(&self, entity_set: &str) -> Option<&IndexMap<String, RelationshipInfo>> {
        self.relationships.get(entity_set)
    }

    pub fn relationship(&self, entity_set: &str, name: &str) -> Option<&RelationshipInfo> {
        self.relationships.get(entity_set).and_then(|r| r.get(name))
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("namespace", &self.namespace)
            .field(
                "entity_sets",
                &self.entries.iter().map(|e| e.entity_type.name.as_str()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
