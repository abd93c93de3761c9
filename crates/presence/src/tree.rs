use serde_json::{Map, Value};

use crate::path::DbPath;

pub(crate) fn value_at(root: &Value, path: &DbPath) -> Value {
    let mut node = root;
    for key in path.keys() {
        match node.get(key) {
            Some(child) => node = child,
            None => return Value::Null,
        }
    }
    node.clone()
}

/// Writes `value` at `path`. Writing `Null` removes the node.
pub(crate) fn write_at(root: &mut Value, path: &DbPath, value: Value) {
    if value.is_null() {
        remove_at(root, path);
        return;
    }

    let Some((leaf, parents)) = path.keys().split_last() else {
        *root = value;
        return;
    };

    let mut node = root;
    for key in parents {
        node = ensure_object(node)
            .entry(key.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    ensure_object(node).insert(leaf.clone(), value);
}

/// Removes the node at `path` and prunes parents left empty.
pub(crate) fn remove_at(root: &mut Value, path: &DbPath) {
    if path.is_root() {
        *root = Value::Null;
        return;
    }
    remove_recursive(root, path.keys());
    if root.as_object().is_some_and(Map::is_empty) {
        *root = Value::Null;
    }
}

fn remove_recursive(node: &mut Value, keys: &[String]) {
    let Some(object) = node.as_object_mut() else {
        return;
    };
    match keys {
        [] => {}
        [leaf] => {
            object.remove(leaf);
        }
        [head, rest @ ..] => {
            let Some(child) = object.get_mut(head) else {
                return;
            };
            remove_recursive(child, rest);
            let child_is_empty = match child {
                Value::Object(map) => map.is_empty(),
                Value::Null => true,
                _ => false,
            };
            if child_is_empty {
                object.remove(head);
            }
        }
    }
}

fn ensure_object(node: &mut Value) -> &mut Map<String, Value> {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => map,
        other => {
            *other = Value::Object(Map::new());
            ensure_object(other)
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn path(raw: &str) -> DbPath {
        DbPath::parse(raw).expect("path")
    }

    #[test]
    fn missing_path_reads_as_null() {
        let root = json!({"players": {"a": true}});
        assert_eq!(value_at(&root, &path("players/b")), Value::Null);
        assert_eq!(value_at(&root, &path("rooms/1/name")), Value::Null);
    }

    #[test]
    fn write_creates_intermediate_objects() {
        let mut root = Value::Null;
        write_at(&mut root, &path("players/a"), json!({"online": true}));
        write_at(&mut root, &path("players/b"), json!({"online": true}));

        assert_eq!(
            root,
            json!({"players": {"a": {"online": true}, "b": {"online": true}}})
        );
    }

    #[test]
    fn write_over_scalar_parent_replaces_it() {
        let mut root = json!({"players": 5});
        write_at(&mut root, &path("players/a"), json!(1));
        assert_eq!(root, json!({"players": {"a": 1}}));
    }

    #[test]
    fn removing_last_child_prunes_empty_parents() {
        let mut root = json!({"players": {"a": {"online": true}}, "motd": "hi"});
        remove_at(&mut root, &path("players/a"));
        assert_eq!(root, json!({"motd": "hi"}));

        remove_at(&mut root, &path("motd"));
        assert_eq!(root, Value::Null);
    }

    #[test]
    fn writing_null_is_remove() {
        let mut root = json!({"players": {"a": 1, "b": 2}});
        write_at(&mut root, &path("players/a"), Value::Null);
        assert_eq!(root, json!({"players": {"b": 2}}));
    }

    #[test]
    fn removing_missing_path_is_noop() {
        let mut root = json!({"players": {"a": 1}});
        remove_at(&mut root, &path("players/zzz/deep"));
        assert_eq!(root, json!({"players": {"a": 1}}));
    }
}
