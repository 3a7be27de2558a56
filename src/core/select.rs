//! `$select` projection over a [`FieldList`].

use super::fields::{FieldList, Value};

/// Keep the fields named by `paths`, in their existing order.
///
/// - empty `paths` or a `*` entry: no change
/// - first path segment matches a field name case-insensitively
/// - expanded relationships are always kept; paths under them
///   (`Category/Name`) project the nested records, a bare entry keeps
///   them whole
/// - paths into non-expanded fields keep the field whole
pub fn select(fields: FieldList, paths: &[String]) -> FieldList {
    let parsed: Vec<Vec<&str>> = paths
        .iter()
        .map(|p| p.split('/').map(str::trim).filter(|s| !s.is_empty()).collect::<Vec<_>>())
        .filter(|p| !p.is_empty())
        .collect();
    if parsed.is_empty() || parsed.iter().any(|p| p[0] == "*") {
        return fields;
    }

    let mut projected = fields.empty_like();
    for (key, value) in fields {
        let rests: Vec<&[&str]> = parsed
            .iter()
            .filter(|p| p[0].eq_ignore_ascii_case(&key))
            .map(|p| &p[1..])
            .collect();

        if value.is_expanded() {
            if rests.is_empty() || rests.iter().any(|r| r.is_empty()) {
                projected.insert(key, value);
            } else {
                let sub_paths: Vec<String> = rests.iter().map(|r| r.join("/")).collect();
                projected.insert(key, select_nested(value, &sub_paths));
            }
        } else if !rests.is_empty() {
            projected.insert(key, value);
        }
    }
    projected
}

fn select_nested(value: Value, paths: &[String]) -> Value {
    match value {
        Value::Nested(f) => Value::Nested(select(f, paths)),
        Value::NestedList(list) => {
            Value::NestedList(list.into_iter().map(|f| select(f, paths)).collect())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn paths(p: &[&str]) -> Vec<String> {
        p.iter().map(|s| s.to_string()).collect()
    }

    fn product() -> FieldList {
        FieldList::new("Products")
            .with("ID", "1")
            .with("Name", "Product A")
            .with("Price", 100.0)
            .with("Category_ID", "1")
    }

    fn with_category() -> FieldList {
        product().with(
            "Category",
            FieldList::new("Categories")
                .with("ID", "1")
                .with("Name", "Electronics"),
        )
    }

    fn keys(f: &FieldList) -> Vec<&str> {
        f.keys().collect()
    }

    #[test]
    fn test_empty_select_is_identity() {
        assert_eq!(select(product(), &[]), product());
    }

    #[test]
    fn test_star_is_identity() {
        assert_eq!(select(product(), &paths(&["*"])), product());
        assert_eq!(select(product(), &paths(&["Name", "*"])), product());
    }

    #[test]
    fn test_keeps_declaration_order() {
        let f = select(product(), &paths(&["Price", "ID"]));
        assert_eq!(keys(&f), vec!["ID", "Price"]);
    }

    #[test]
    fn test_case_insensitive_match() {
        let f = select(product(), &paths(&["name", "id"]));
        assert_eq!(keys(&f), vec!["ID", "Name"]);
    }

    #[test]
    fn test_unknown_names_dropped() {
        let f = select(product(), &paths(&["Nope"]));
        assert!(f.is_empty());
        assert_eq!(f.entity_set(), Some("Products"));
    }

    #[test]
    fn test_expanded_always_retained() {
        let f = select(with_category(), &paths(&["ID", "Name"]));
        assert_eq!(keys(&f), vec!["ID", "Name", "Category"]);
        let nested = f.get("Category").and_then(Value::as_nested).unwrap();
        assert_eq!(keys(nested), vec!["ID", "Name"]);
    }

    #[test]
    fn test_nested_path_projection() {
        let f = select(with_category(), &paths(&["ID", "Category/Name"]));
        assert_eq!(keys(&f), vec!["ID", "Category"]);
        let nested = f.get("Category").and_then(Value::as_nested).unwrap();
        assert_eq!(keys(nested), vec!["Name"]);
    }

    #[test]
    fn test_nested_paths_merge() {
        let f = select(with_category(), &paths(&["Category/ID", "Category/Name"]));
        let nested = f.get("Category").and_then(Value::as_nested).unwrap();
        assert_eq!(keys(nested), vec!["ID", "Name"]);
    }

    #[test]
    fn test_bare_entry_keeps_expanded_whole() {
        let f = select(with_category(), &paths(&["Category/Name", "Category"]));
        let nested = f.get("Category").and_then(Value::as_nested).unwrap();
        assert_eq!(keys(nested), vec!["ID", "Name"]);
    }

    #[test]
    fn test_nested_list_projection() {
        let list = vec![
            FieldList::new("Products").with("ID", "1").with("Name", "A"),
            FieldList::new("Products").with("ID", "2").with("Name", "B"),
        ];
        let f = FieldList::new("Categories")
            .with("ID", "1")
            .with("Products", list);
        let f = select(f, &paths(&["Products/Name"]));
        assert_eq!(keys(&f), vec!["Products"]);
        let items = f.get("Products").and_then(Value::as_nested_list).unwrap();
        assert!(items.iter().all(|i| keys(i) == vec!["Name"]));
    }

    #[test]
    fn test_path_into_scalar_keeps_it() {
        let f = select(product(), &paths(&["Name/Whatever"]));
        assert_eq!(keys(&f), vec!["Name"]);
    }

    #[test]
    fn test_blank_paths_ignored() {
        assert_eq!(select(product(), &paths(&["", " / "])), product());
        let f = select(with_category(), &paths(&["Category/"]));
        let nested = f.get("Category").and_then(Value::as_nested).unwrap();
        assert_eq!(keys(nested), vec!["ID", "Name"]);
    }

    const NAMES: [&str; 6] = ["ID", "Name", "Price", "Category_ID", "Country", "Nope"];

    proptest! {
        #[test]
        fn prop_select_idempotent(picks in proptest::collection::vec(0..NAMES.len(), 0..6)) {
            let sel: Vec<String> = picks.iter().map(|&i| NAMES[i].to_string()).collect();
            let once = select(with_category(), &sel);
            let twice = select(once.clone(), &sel);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_select_is_order_preserving_subset(picks in proptest::collection::vec(0..NAMES.len(), 1..6)) {
            let sel: Vec<String> = picks.iter().map(|&i| NAMES[i].to_string()).collect();
            let source = with_category();
            let projected = select(source.clone(), &sel);
            let source_keys = keys(&source);
            let mut last = None;
            for k in projected.keys() {
                let pos = source_keys.iter().position(|o| *o == k);
                prop_assert!(pos.is_some());
                prop_assert!(pos > last);
                last = pos;
            }
        }
    }
}
