//! Hierarchical parameter store (spec §4.2).
//!
//! Interior nodes are mappings from segment to subtree; leaves are
//! arbitrary XML-RPC values. Setting a value beneath a scalar path
//! silently replaces the scalar with a fresh mapping; the tree never
//! rejects a write because an intermediate happened to be a leaf.

use std::collections::{BTreeMap, HashMap};

use dxr::{DxrError, TryFromValue, TryToValue, Value};

use crate::error::MasterError;
use crate::name::split;

/// A node of the parameter tree. `Map` doubles as both "interior node" and
/// "a value that happens to be a mapping": the two are the same thing in
/// this data model (spec §3).
#[derive(Debug, Clone, PartialEq)]
pub enum ParamNode {
    Map(BTreeMap<String, ParamNode>),
    Leaf(Value),
}

impl ParamNode {
    fn empty_map() -> Self {
        ParamNode::Map(BTreeMap::new())
    }

    fn is_map(&self) -> bool {
        matches!(self, ParamNode::Map(_))
    }
}

impl From<&Value> for ParamNode {
    fn from(value: &Value) -> Self {
        if let Ok(map) = HashMap::<String, Value>::try_from_value(value) {
            return ParamNode::Map(
                map.into_iter()
                    .map(|(k, v)| (k, ParamNode::from(&v)))
                    .collect(),
            );
        }
        ParamNode::Leaf(value.clone())
    }
}

impl TryToValue for ParamNode {
    fn try_to_value(&self) -> Result<Value, DxrError> {
        match self {
            ParamNode::Leaf(v) => Ok(v.clone()),
            ParamNode::Map(map) => {
                let plain = map
                    .iter()
                    .map(|(k, v)| Ok((k.clone(), v.try_to_value()?)))
                    .collect::<Result<HashMap<String, Value>, DxrError>>()?;
                plain.try_to_value()
            }
        }
    }
}

/// The empty-mapping value `{}` used throughout the propagation rules as
/// "this path was removed by a subtree rewrite" (spec §4.4).
pub fn empty_mapping_value() -> Value {
    HashMap::<String, Value>::new()
        .try_to_value()
        .expect("empty map always converts")
}

pub struct ParamCache {
    root: ParamNode,
}

impl Default for ParamCache {
    fn default() -> Self {
        Self {
            root: ParamNode::empty_map(),
        }
    }
}

impl ParamCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// True iff `get` would succeed.
    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_ok()
    }

    /// Traverses `key` segment by segment. Fails with `ParamNotFound` if
    /// any intermediate is not a mapping or a segment is absent. The root
    /// returns the whole tree.
    pub fn get(&self, key: &str) -> Result<Value, MasterError> {
        let mut node = &self.root;
        for segment in split(key) {
            match node {
                ParamNode::Map(map) => {
                    node = map
                        .get(segment)
                        .ok_or_else(|| MasterError::ParamNotFound(key.to_string()))?;
                }
                ParamNode::Leaf(_) => {
                    return Err(MasterError::ParamNotFound(key.to_string()));
                }
            }
        }
        node.try_to_value()
            .map_err(|_| MasterError::ParamNotFound(key.to_string()))
    }

    /// Sets `key` to `value`. If `key == "/"`, `value` must convert to a
    /// mapping and replaces the whole tree atomically. For any other key,
    /// every intermediate segment is coerced into a mapping (replacing a
    /// non-mapping in place) before the leaf is assigned.
    pub fn set(&mut self, key: &str, value: Value) -> Result<(), MasterError> {
        if key == "/" {
            let node = ParamNode::from(&value);
            if !node.is_map() {
                return Err(MasterError::InvalidValue(key.to_string()));
            }
            self.root = node;
            return Ok(());
        }

        let segments = split(key);
        let split_at = segments.len() - 1;
        let (intermediate, leaf) = segments.split_at(split_at);
        let leaf = leaf[0];

        let mut node = &mut self.root;
        for segment in intermediate {
            if !node.is_map() {
                *node = ParamNode::empty_map();
            }
            let ParamNode::Map(map) = node else {
                unreachable!("just coerced to a map above")
            };
            node = map.entry((*segment).to_string()).or_insert_with(ParamNode::empty_map);
        }
        if !node.is_map() {
            *node = ParamNode::empty_map();
        }
        let ParamNode::Map(map) = node else {
            unreachable!("just coerced to a map above")
        };
        map.insert(leaf.to_string(), ParamNode::from(&value));
        Ok(())
    }

    /// Removes the leaf at `key`. Fails with `ParamNotFound` if absent.
    /// Deliberately does not prune now-empty intermediate mappings:
    /// subtree subscribers must still see them as present.
    pub fn delete(&mut self, key: &str) -> Result<(), MasterError> {
        let segments = split(key);
        if segments.is_empty() {
            return Err(MasterError::ParamNotFound(key.to_string()));
        }
        let split_at = segments.len() - 1;
        let (intermediate, leaf) = segments.split_at(split_at);
        let leaf = leaf[0];

        let mut node = &mut self.root;
        for segment in intermediate {
            node = match node {
                ParamNode::Map(map) => map
                    .get_mut(*segment)
                    .ok_or_else(|| MasterError::ParamNotFound(key.to_string()))?,
                ParamNode::Leaf(_) => return Err(MasterError::ParamNotFound(key.to_string())),
            };
        }
        match node {
            ParamNode::Map(map) => map
                .remove(leaf)
                .map(|_| ())
                .ok_or_else(|| MasterError::ParamNotFound(key.to_string())),
            ParamNode::Leaf(_) => Err(MasterError::ParamNotFound(key.to_string())),
        }
    }

    /// All leaf keys in plain form (`/a/b`), depth-first, sorted at every
    /// level. Interior mappings are never yielded.
    pub fn keys(&self) -> Vec<String> {
        let mut out = Vec::new();
        Self::collect_keys(&self.root, String::new(), &mut out);
        out
    }

    fn collect_keys(node: &ParamNode, prefix: String, out: &mut Vec<String>) {
        match node {
            ParamNode::Map(map) => {
                for (segment, child) in map {
                    Self::collect_keys(child, format!("{prefix}/{segment}"), out);
                }
            }
            ParamNode::Leaf(_) => out.push(prefix),
        }
    }

    /// Nearest-enclosing-namespace lookup. If `key` is absolute, it is
    /// returned as-is if present. Otherwise walks `caller_namespace`
    /// upward one segment at a time, returning the first ancestor under
    /// which `key`'s head segment resolves.
    pub fn search(&self, key: &str, caller_namespace: &str) -> Result<String, MasterError> {
        if key.starts_with('/') {
            return if self.has(key) {
                Ok(key.to_string())
            } else {
                Err(MasterError::ParamNotFound(key.to_string()))
            };
        }

        let segments = split(key);
        let head = *segments
            .first()
            .ok_or_else(|| MasterError::ParamNotFound(key.to_string()))?;
        let namespace_segments = split(caller_namespace);

        for depth in (0..=namespace_segments.len()).rev() {
            let ancestor = if depth == 0 {
                "/".to_string()
            } else {
                format!("/{}", namespace_segments[..depth].join("/"))
            };
            let candidate = if ancestor == "/" {
                format!("/{head}")
            } else {
                format!("{ancestor}/{head}")
            };
            if self.has(&candidate) {
                return Ok(if ancestor == "/" {
                    format!("/{key}")
                } else {
                    format!("{ancestor}/{key}")
                });
            }
        }

        Err(MasterError::ParamNotFound(key.to_string()))
    }
}

/// Enumerates every trailing-slash descendant key `prefix + p + "/"` for
/// each interior path `p` in `value`'s mapping tree (leaves included,
/// recursive). Returns `None` if `value` is not itself a mapping.
pub fn descendant_keys(prefix: &str, value: &Value) -> Option<Vec<String>> {
    let map = HashMap::<String, Value>::try_from_value(value).ok()?;
    let mut out = Vec::new();
    walk_descendants(prefix, &map, &mut out);
    Some(out)
}

fn walk_descendants(prefix: &str, map: &HashMap<String, Value>, out: &mut Vec<String>) {
    for (segment, child) in map {
        let key = format!("{prefix}{segment}/");
        out.push(key.clone());
        if let Ok(sub) = HashMap::<String, Value>::try_from_value(child) {
            walk_descendants(&key, &sub, out);
        }
    }
}

/// Extracts the value at `relative_key` (plain or trailing-slash form)
/// from `value`, treating `value` itself as a (possibly nested) mapping.
pub fn value_at_relative_path(value: &Value, relative_key: &str) -> Option<Value> {
    let mut node = ParamNode::from(value);
    for segment in split(relative_key) {
        match node {
            ParamNode::Map(mut map) => node = map.remove(segment)?,
            ParamNode::Leaf(_) => return None,
        }
    }
    node.try_to_value().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use maplit::hashmap;

    fn s(v: &str) -> Value {
        Value::string(v)
    }

    #[test]
    fn get_root_returns_whole_tree() {
        let mut cache = ParamCache::new();
        cache.set("/a", Value::i4(1)).unwrap();
        let tree = cache.get("/").unwrap();
        let as_map = HashMap::<String, Value>::try_from_value(&tree).unwrap();
        assert_eq!(as_map.get("a"), Some(&Value::i4(1)));
    }

    #[test]
    fn set_get_roundtrip_non_root() {
        let mut cache = ParamCache::new();
        cache.set("/robot/name", s("r2d2")).unwrap();
        assert_eq!(cache.get("/robot/name").unwrap(), s("r2d2"));
    }

    #[test]
    fn set_root_requires_mapping() {
        let mut cache = ParamCache::new();
        assert!(matches!(
            cache.set("/", Value::i4(1)),
            Err(MasterError::InvalidValue(_))
        ));
        assert!(cache.set("/", hashmap! {"x".to_string() => Value::i4(1)}.try_to_value().unwrap()).is_ok());
    }

    #[test]
    fn set_replaces_scalar_intermediate_with_mapping() {
        let mut cache = ParamCache::new();
        cache.set("/a", Value::i4(1)).unwrap();
        cache.set("/a/b", Value::i4(2)).unwrap();
        assert_eq!(cache.get("/a/b").unwrap(), Value::i4(2));
    }

    #[test]
    fn delete_removes_leaf_but_does_not_prune_parent() {
        let mut cache = ParamCache::new();
        cache.set("/a/b", Value::i4(1)).unwrap();
        cache.delete("/a/b").unwrap();
        assert!(!cache.has("/a/b"));
        assert!(cache.has("/a"));
    }

    #[test]
    fn delete_absent_is_not_found() {
        let mut cache = ParamCache::new();
        assert!(matches!(cache.delete("/missing"), Err(MasterError::ParamNotFound(_))));
    }

    #[test]
    fn keys_are_sorted_leaf_paths() {
        let mut cache = ParamCache::new();
        cache.set("/b", Value::i4(2)).unwrap();
        cache.set("/a/z", Value::i4(1)).unwrap();
        cache.set("/a/a", Value::i4(0)).unwrap();
        assert_eq!(cache.keys(), vec!["/a/a", "/a/z", "/b"]);
        for key in cache.keys() {
            assert!(cache.get(&key).is_ok());
        }
    }

    #[test]
    fn search_resolves_nearest_enclosing_namespace() {
        let mut cache = ParamCache::new();
        cache.set("/a/b/c", Value::i4(1)).unwrap();
        cache.set("/x/b/c", Value::i4(2)).unwrap();

        assert_eq!(cache.search("b/c", "/a").unwrap(), "/a/b/c");
        assert_eq!(cache.search("b/c", "/a/sub").unwrap(), "/a/b/c");
        assert!(cache.search("b/c", "/y").is_err());
        assert_eq!(cache.search("/a/b/c", "/y").unwrap(), "/a/b/c");
    }

    #[test]
    fn descendant_keys_recurses_into_nested_maps() {
        let value = hashmap! {
            "b".to_string() => Value::i4(9),
            "e".to_string() => hashmap!{"f".to_string() => Value::i4(1)}.try_to_value().unwrap(),
        }
        .try_to_value()
        .unwrap();
        let mut keys = descendant_keys("/a/", &value).unwrap();
        keys.sort();
        assert_eq!(keys, vec!["/a/b/", "/a/e/", "/a/e/f/"]);
    }

    #[test]
    fn value_at_relative_path_extracts_nested_value() {
        let value = hashmap! {
            "b".to_string() => Value::i4(9),
        }
        .try_to_value()
        .unwrap();
        assert_eq!(value_at_relative_path(&value, "b"), Some(Value::i4(9)));
        assert_eq!(value_at_relative_path(&value, "missing"), None);
    }
}
