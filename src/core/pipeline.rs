//! Request pipeline: page, expand, project.

use super::expand::expand_record;
use super::fields::FieldList;
use super::parser::QueryOptions;
use super::registry::Registry;
use super::select::select;
use super::types::Record;

/// The `$skip`/`$top` window of `items`.
///
/// `skip` past the end yields nothing; `top` of `None` or beyond the
/// remaining items yields everything remaining.
pub fn page<T>(items: &[T], skip: usize, top: Option<usize>) -> &[T] {
    if skip >= items.len() {
        return &[];
    }
    let rest = &items[skip..];
    match top {
        Some(n) if n < rest.len() => &rest[..n],
        _ => rest,
    }
}

/// Field lists for a collection request.
pub fn apply_collection<R: Record>(
    registry: &Registry,
    records: &[R],
    options: &QueryOptions,
) -> Vec<FieldList> {
    page(records, options.skip, options.top)
        .iter()
        .map(|r| apply_single(registry, r, options))
        .collect()
}

/// Field list for a single-entity request. `$skip`/`$top` do not apply.
pub fn apply_single(registry: &Registry, record: &dyn Record, options: &QueryOptions) -> FieldList {
    select(expand_record(registry, record, &options.expand), &options.select)
}
