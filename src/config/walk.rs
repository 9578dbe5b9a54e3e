//! Bottom-up traversal over a document tree.
//!
//! The walker yields every `(owner path, key)` pair in the tree, with all
//! entries nested under a mapping yielded before the mapping's own entry.
//! Each node's keys are snapshotted when the walker first enters it, and
//! every lookup goes back to the live tree, so a consumer may delete the
//! entry it was just handed (or otherwise rewrite the owning node) between
//! calls to [`Walker::next`].

use super::Document;
use serde_json::Value;

/// One step of a walk: the key and the path of the mapping that owns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    /// Keys leading from the root to the owning mapping (empty for the root).
    pub path: Vec<String>,
    /// The key inside the owning mapping.
    pub key: String,
}

impl WalkEntry {
    /// The mapping that owns this entry, if it still exists.
    pub fn owner<'a>(&self, root: &'a Document) -> Option<&'a Document> {
        node_at(root, &self.path)
    }

    /// Mutable access to the mapping that owns this entry.
    pub fn owner_mut<'a>(&self, root: &'a mut Document) -> Option<&'a mut Document> {
        node_at_mut(root, &self.path)
    }

    /// The entry's current value, if it has not been removed.
    pub fn value<'a>(&self, root: &'a Document) -> Option<&'a Value> {
        self.owner(root)?.get(&self.key)
    }
}

struct Frame {
    path: Vec<String>,
    keys: std::vec::IntoIter<String>,
    /// Key whose nested mapping is being walked; yielded once that finishes.
    descended: Option<String>,
}

impl Frame {
    fn new(path: Vec<String>, node: &Document) -> Self {
        let keys: Vec<String> = node.keys().cloned().collect();
        Self {
            path,
            keys: keys.into_iter(),
            descended: None,
        }
    }
}

/// Post-order cursor over a [`Document`].
///
/// The walker does not borrow the tree between steps; pass the same root to
/// every call of [`Walker::next`].
///
/// ```
/// use confchain::config::{Document, Walker};
/// use serde_json::json;
///
/// let mut root: Document = serde_json::from_value(json!({"a": null, "b": {"c": null, "d": 1}}))
///     .unwrap();
/// let mut walker = Walker::new(&root);
/// while let Some(entry) = walker.next(&root) {
///     if entry.value(&root).is_some_and(|v| v.is_null()) {
///         entry.owner_mut(&mut root).unwrap().shift_remove(&entry.key);
///     }
/// }
/// assert_eq!(serde_json::Value::Object(root), json!({"b": {"d": 1}}));
/// ```
pub struct Walker {
    stack: Vec<Frame>,
}

impl Walker {
    pub fn new(root: &Document) -> Self {
        Self {
            stack: vec![Frame::new(Vec::new(), root)],
        }
    }

    /// Advance the walk against the live tree.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self, root: &Document) -> Option<WalkEntry> {
        loop {
            let frame = self.stack.last_mut()?;

            if let Some(key) = frame.descended.take() {
                let still_present = node_at(root, &frame.path).is_some_and(|n| n.contains_key(&key));
                if still_present {
                    return Some(WalkEntry {
                        path: frame.path.clone(),
                        key,
                    });
                }
                continue;
            }

            let Some(key) = frame.keys.next() else {
                self.stack.pop();
                continue;
            };

            match node_at(root, &frame.path).and_then(|node| node.get(&key)) {
                // Removed since the keys were snapshotted.
                None => continue,
                Some(Value::Object(child)) => {
                    let mut child_path = frame.path.clone();
                    child_path.push(key.clone());
                    let child = Frame::new(child_path, child);
                    frame.descended = Some(key);
                    self.stack.push(child);
                }
                Some(_) => {
                    return Some(WalkEntry {
                        path: frame.path.clone(),
                        key,
                    });
                }
            }
        }
    }
}

/// Follow `path` from `root` through nested mappings.
pub fn node_at<'a>(root: &'a Document, path: &[String]) -> Option<&'a Document> {
    let mut node = root;
    for key in path {
        node = node.get(key)?.as_object()?;
    }
    Some(node)
}

/// Mutable variant of [`node_at`].
pub fn node_at_mut<'a>(root: &'a mut Document, path: &[String]) -> Option<&'a mut Document> {
    let mut node = root;
    for key in path {
        node = node.get_mut(key)?.as_object_mut()?;
    }
    Some(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn collect(root: &Document) -> Vec<(Vec<String>, String)> {
        let mut walker = Walker::new(root);
        let mut out = Vec::new();
        while let Some(entry) = walker.next(root) {
            out.push((entry.path, entry.key));
        }
        out
    }

    #[test]
    fn test_children_before_parent() {
        let root = doc(json!({
            "a": 1,
            "b": {"c": 2, "d": {"e": 3}},
            "f": 4
        }));

        let keys: Vec<String> = collect(&root).into_iter().map(|(_, k)| k).collect();
        assert_eq!(keys, vec!["a", "c", "e", "d", "b", "f"]);
    }

    #[test]
    fn test_paths_point_at_owner() {
        let root = doc(json!({"b": {"d": {"e": 3}}}));
        let entries = collect(&root);
        assert_eq!(
            entries[0],
            (vec!["b".to_string(), "d".to_string()], "e".to_string())
        );
        assert_eq!(entries[1], (vec!["b".to_string()], "d".to_string()));
        assert_eq!(entries[2], (vec![], "b".to_string()));
    }

    #[test]
    fn test_sequences_are_leaves() {
        let root = doc(json!({"list": [{"x": 1}, 2]}));
        let keys: Vec<String> = collect(&root).into_iter().map(|(_, k)| k).collect();
        assert_eq!(keys, vec!["list"]);
    }

    #[test]
    fn test_delete_current_key_during_walk() {
        let mut root = doc(json!({
            "a": null,
            "b": {"c": null, "d": 1},
            "e": 2
        }));

        let mut walker = Walker::new(&root);
        let mut seen = Vec::new();
        while let Some(entry) = walker.next(&root) {
            seen.push(entry.key.clone());
            if entry.value(&root).is_some_and(Value::is_null) {
                entry.owner_mut(&mut root).unwrap().shift_remove(&entry.key);
            }
        }

        assert_eq!(seen, vec!["a", "c", "d", "b", "e"]);
        assert_eq!(Value::Object(root), json!({"b": {"d": 1}, "e": 2}));
    }

    #[test]
    fn test_removed_sibling_is_skipped() {
        let mut root = doc(json!({"a": 1, "b": 2, "c": 3}));

        let mut walker = Walker::new(&root);
        let mut seen = Vec::new();
        while let Some(entry) = walker.next(&root) {
            if entry.key == "a" {
                root.shift_remove("b");
            }
            seen.push(entry.key);
        }

        assert_eq!(seen, vec!["a", "c"]);
    }

    #[test]
    fn test_empty_root() {
        let root = Document::new();
        assert!(collect(&root).is_empty());
    }
}
