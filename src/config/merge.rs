//! Shallow merge and null pruning for documents.
//!
//! Merging is always top-level only: a key present in the overlay replaces
//! the base's value wholesale, nested mappings included. Keys only present
//! in the base keep their position; new keys are appended.

use super::Document;
use super::walk::Walker;
use serde_json::Value;

/// Overwrite `base`'s top-level keys with those of `overlay`.
pub fn merge_shallow(base: &mut Document, overlay: Document) {
    for (key, value) in overlay {
        base.insert(key, value);
    }
}

/// Merge documents in order, with later documents taking precedence.
pub fn merge_all<'a>(documents: impl IntoIterator<Item = &'a Document>) -> Document {
    let mut merged = Document::new();
    for document in documents {
        for (key, value) in document {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

/// Delete every key, at any depth, whose value is null.
///
/// Mappings left empty by the removal are kept. Mappings inside sequences are
/// not visited.
pub fn prune_nulls(root: &mut Document) {
    let mut walker = Walker::new(root);
    while let Some(entry) = walker.next(root) {
        if !entry.value(root).is_some_and(Value::is_null) {
            continue;
        }
        if let Some(owner) = entry.owner_mut(root) {
            owner.shift_remove(&entry.key);
        }
    }
}
