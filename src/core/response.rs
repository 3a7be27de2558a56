//! OData JSON envelopes.

use super::fields::{FieldList, Value};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

pub const CONTEXT_KEY: &str = "@odata.context";

/// `{"@odata.context": "$metadata#<set>", "value": [...]}`
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionEnvelope {
    pub context: String,
    pub value: Vec<FieldList>,
}

impl CollectionEnvelope {
    pub fn new(entity_set: &str, value: Vec<FieldList>) -> Self {
        Self {
            context: format!("$metadata#{}", entity_set),
            value,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl Serialize for CollectionEnvelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry(CONTEXT_KEY, &self.context)?;
        map.serialize_entry("value", &self.value)?;
        map.end()
    }
}

/// `{"@odata.context": "$metadata#<set>/$entity", <fields>...}`
#[derive(Debug, Clone, PartialEq)]
pub struct EntityEnvelope {
    pub context: String,
    pub entity: FieldList,
}

impl EntityEnvelope {
    pub fn new(entity_set: &str, entity: FieldList) -> Self {
        Self {
            context: format!("$metadata#{}/$entity", entity_set),
            entity,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl Serialize for EntityEnvelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry(CONTEXT_KEY, &self.context)?;
        for (key, value) in self.entity.iter() {
            if key != CONTEXT_KEY && !matches!(value, Value::Absent) {
                map.serialize_entry(key, value)?;
            }
        }
        map.end()
    }
}
