//! Record introspection: typed record to [`FieldList`].

use super::fields::{FieldList, Value};
use super::parser::ExpandItem;
use super::types::Record;

/// Field list of a record in declaration order, keyed by wire name.
///
/// Expand-only fields are included only when `expand` names their
/// relationship at this level. Fields the record has no value for are
/// present but [`Value::Absent`].
pub fn to_field_list(record: &dyn Record, expand: &[ExpandItem]) -> FieldList {
    let entity_type = record.entity_type();
    let mut fields = FieldList::new(entity_type.name.as_str());
    for field in &entity_type.fields {
        if let Some(rel) = &field.expand {
            if !expand.iter().any(|e| &e.name == rel) {
                continue;
            }
        }
        let value = record.field(&field.name).unwrap_or(Value::Absent);
        fields.insert(field.wire_name(), value);
    }
    fields
}

/// Key value of a record: its first key field, or `ID` when none is declared.
pub fn key_value(record: &dyn Record) -> Option<String> {
    let entity_type = record.entity_type();
    let key = entity_type
        .key_fields()
        .next()
        .map_or("ID", |f| f.name.as_str());
    record.field(key).and_then(|v| v.as_key())
}
