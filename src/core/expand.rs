//! `$expand` evaluation.
//!
//! Each expand item goes to the owning entity set's [`ExpandCapability`].
//! Returned records are introspected, expanded recursively with the item's
//! nested `$expand`, paged with its nested `$skip`/`$top`, projected with its
//! nested `$select`, and appended under the navigation field's wire name.
//! Recursion depth is bounded by the nesting of the query string itself.

use super::fields::{FieldList, Value};
use super::introspect::to_field_list;
use super::parser::{ExpandItem, QueryOptions};
use super::pipeline::page;
use super::registry::{ExpandCapability, Registry, Related};
use super::select::select;
use super::types::Record;
use log::debug;

/// Introspect `record` and apply `items` with its own entity set's capability.
pub fn expand_record(registry: &Registry, record: &dyn Record, items: &[ExpandItem]) -> FieldList {
    let fields = to_field_list(record, items);
    if items.is_empty() {
        return fields;
    }
    let capability = registry.capability(&record.entity_type().name);
    expand_fields(registry, fields, items, capability)
}

/// Apply `items` to an already introspected field list.
///
/// A relationship the capability cannot resolve is left as it was.
pub fn expand_fields(
    registry: &Registry,
    mut fields: FieldList,
    items: &[ExpandItem],
    capability: &dyn ExpandCapability,
) -> FieldList {
    for item in items {
        let Some(related) = capability.expand(&fields, &item.name, item.nested_option()) else {
            debug!(
                "no expansion for {} on {}",
                item.name,
                fields.entity_set().unwrap_or("<anonymous>")
            );
            continue;
        };

        let nested = item.nested();
        let value = match related {
            Related::One(record) => Value::Nested(expand_nested(registry, record.as_ref(), &nested)),
            Related::Many(records) => Value::NestedList(
                page(&records, nested.skip, nested.top)
                    .iter()
                    .map(|r| expand_nested(registry, r.as_ref(), &nested))
                    .collect(),
            ),
        };
        let key = expansion_key(registry, &fields, &item.name);
        fields.remove(&key);
        fields.append(key, value);
    }
    fields
}

/// Wire name of the navigation field bound to `relationship`, or the
/// relationship name when the owning type declares none.
fn expansion_key(registry: &Registry, fields: &FieldList, relationship: &str) -> String {
    fields
        .entity_set()
        .and_then(|set| registry.entity_type(set))
        .and_then(|t| {
            t.fields
                .iter()
                .find(|f| f.relationship_name() == Some(relationship))
        })
        .map_or_else(|| relationship.to_string(), |f| f.wire_name().to_string())
}

fn expand_nested(registry: &Registry, record: &dyn Record, nested: &QueryOptions) -> FieldList {
    let fields = expand_record(registry, record, &nested.expand);
    select(fields, &nested.select)
}
