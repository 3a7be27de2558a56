//! Order-preserving record representation.
//!
//! A [`FieldList`] is what every stage after introspection operates on.
//! Insertion order is the wire order: expansion appends, projection removes,
//! nothing reorders.

use indexmap::IndexMap;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::fmt;

/// A plain (non-relationship) value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Decimal(f64),
    String(String),
}

impl Scalar {
    /// Convert a JSON/YAML scalar. Arrays and objects have no scalar form.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Null => Some(Self::Null),
            serde_json::Value::Bool(b) => Some(Self::Bool(*b)),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Some(Self::Int(i)),
                None => n.as_f64().map(Self::Decimal),
            },
            serde_json::Value::String(s) => Some(Self::String(s.clone())),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => None,
        }
    }

    /// Textual form used when matching keys (`"1"` and `1` compare equal).
    pub fn as_key(&self) -> Option<String> {
        match self {
            Self::String(s) => Some(s.clone()),
            Self::Int(i) => Some(i.to_string()),
            Self::Bool(b) => Some(b.to_string()),
            Self::Decimal(d) => Some(d.to_string()),
            Self::Null => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::Decimal(d) => write!(f, "{}", d),
            Self::String(s) => write!(f, "{}", s),
        }
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::Decimal(d) if is_integral(*d) => serializer.serialize_i64(*d as i64),
            Self::Decimal(d) => serializer.serialize_f64(*d),
            Self::String(s) => serializer.serialize_str(s),
        }
    }
}

/// Largest magnitude at which every integer is exactly representable in f64.
const MAX_EXACT_F64: f64 = 9_007_199_254_740_992.0;

// Integral decimals go out without a fractional part (`100`, not `100.0`).
fn is_integral(d: f64) -> bool {
    d.is_finite() && d.trunc() == d && d.abs() <= MAX_EXACT_F64
}

/// Value slot of a [`FieldList`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(Scalar),
    /// One-to-one expansion result.
    Nested(FieldList),
    /// One-to-many expansion result.
    NestedList(Vec<FieldList>),
    /// Pruned; never serialized.
    Absent,
}

impl Value {
    /// Whether this value is the result of a relationship expansion.
    pub fn is_expanded(&self) -> bool {
        matches!(self, Self::Nested(_) | Self::NestedList(_))
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Self::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Scalar(Scalar::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_nested(&self) -> Option<&FieldList> {
        match self {
            Self::Nested(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_nested_list(&self) -> Option<&[FieldList]> {
        match self {
            Self::NestedList(v) => Some(v),
            _ => None,
        }
    }

    /// Key form of a scalar value, see [`Scalar::as_key`].
    pub fn as_key(&self) -> Option<String> {
        self.as_scalar().and_then(Scalar::as_key)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Scalar(s) => s.serialize(serializer),
            Self::Nested(f) => f.serialize(serializer),
            Self::NestedList(v) => v.serialize(serializer),
            Self::Absent => serializer.serialize_unit(),
        }
    }
}

impl From<Scalar> for Value {
    fn from(s: Scalar) -> Self {
        Self::Scalar(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Scalar(Scalar::String(s.to_string()))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Scalar(Scalar::String(s))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Scalar(Scalar::Int(i))
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Scalar(Scalar::Int(i64::from(i)))
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Self::Scalar(Scalar::Decimal(d))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Scalar(Scalar::Bool(b))
    }
}

impl From<FieldList> for Value {
    fn from(f: FieldList) -> Self {
        Self::Nested(f)
    }
}

impl From<Vec<FieldList>> for Value {
    fn from(v: Vec<FieldList>) -> Self {
        Self::NestedList(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Absent, Into::into)
    }
}

/// Ordered key/value record tagged with the entity set it came from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldList {
    entity_set: Option<String>,
    fields: IndexMap<String, Value>,
}

impl FieldList {
    /// Empty list belonging to `entity_set`.
    pub fn new(entity_set: impl Into<String>) -> Self {
        Self {
            entity_set: Some(entity_set.into()),
            fields: IndexMap::new(),
        }
    }

    /// Empty list with no originating entity set.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn entity_set(&self) -> Option<&str> {
        self.entity_set.as_deref()
    }

    /// Builder form of [`FieldList::insert`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert a field. An existing key keeps its position and gets the new value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Put a field at the end, replacing (and moving) any existing one.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        self.fields.shift_remove(&key);
        self.fields.insert(key, value.into());
    }

    /// Remove a field, keeping the order of the rest.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.fields.shift_remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.fields.get_mut(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Empty list carrying the same entity-set tag.
    pub fn empty_like(&self) -> Self {
        Self {
            entity_set: self.entity_set.clone(),
            fields: IndexMap::new(),
        }
    }
}

impl IntoIterator for FieldList {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl Serialize for FieldList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let present = self
            .fields
            .values()
            .filter(|v| !matches!(v, Value::Absent))
            .count();
        let mut map = serializer.serialize_map(Some(present))?;
        for (key, value) in self.iter() {
            if !matches!(value, Value::Absent) {
                map.serialize_entry(key, value)?;
            }
        }
        map.end()
    }
}
