//! Deep merge over configuration trees.
//!
//! Later layers override earlier ones with these rules, applied recursively:
//!
//! 1. A key present on one side only is copied as-is.
//! 2. Two arrays are concatenated, base entries first.
//! 3. Two tables are merged key by key.
//! 4. Anything else (scalars, mismatched shapes) is replaced by the overlay.
//!
//! The merge is total: there is no input pair it rejects.

use toml::{Table, Value};

/// Merges `overlay` onto `base` and returns the combined value.
pub fn merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Table(mut base), Value::Table(overlay)) => {
            deep_merge(&mut base, overlay);
            Value::Table(base)
        }
        (Value::Array(mut base), Value::Array(overlay)) => {
            base.extend(overlay);
            Value::Array(base)
        }
        (_, overlay) => overlay,
    }
}

/// Merges two tables. `merge_tables(base, Table::new())` is `base`.
pub fn merge_tables(mut base: Table, overlay: Table) -> Table {
    deep_merge(&mut base, overlay);
    base
}

/// Folds every layer into an empty table, in order.
pub fn merge_all<I>(layers: I) -> Table
where
    I: IntoIterator<Item = Table>,
{
    layers.into_iter().fold(Table::new(), merge_tables)
}

/// Merges `value` into `table` at the given key path.
///
/// Intermediate tables are created as needed; a non-table value sitting on
/// the path is replaced by a table. Each segment reuses an existing key that
/// matches it ignoring ASCII case, so a lowercased path such as
/// `devserver.port` lands on `devServer.port`.
///
/// An empty path merges `value` into the root and is ignored unless `value`
/// is a table.
pub fn merge_at_path(table: &mut Table, path: &[String], value: Value) {
    let Some((first, rest)) = path.split_first() else {
        if let Value::Table(overlay) = value {
            deep_merge(table, overlay);
        }
        return;
    };

    let key = existing_key(table, first).unwrap_or_else(|| first.clone());

    if rest.is_empty() {
        let mut overlay = Table::new();
        overlay.insert(key, value);
        deep_merge(table, overlay);
        return;
    }

    if !matches!(table.get(&key), Some(Value::Table(_))) {
        table.insert(key.clone(), Value::Table(Table::new()));
    }

    if let Some(Value::Table(nested)) = table.get_mut(&key) {
        merge_at_path(nested, rest, value);
    }
}

fn existing_key(table: &Table, segment: &str) -> Option<String> {
    if table.contains_key(segment) {
        return Some(segment.to_string());
    }
    table
        .keys()
        .find(|key| key.eq_ignore_ascii_case(segment))
        .cloned()
}

pub(crate) fn deep_merge(base: &mut Table, overlay: Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(Value::Table(base_table)), Value::Table(overlay_table)) => {
                deep_merge(base_table, overlay_table);
            }
            (Some(Value::Array(base_items)), Value::Array(overlay_items)) => {
                tracing::trace!(
                    key = %key,
                    base = base_items.len(),
                    overlay = overlay_items.len(),
                    "concatenating sequences"
                );
                base_items.extend(overlay_items);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}
