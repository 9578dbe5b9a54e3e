//! Ordered chain of named configuration layers.

use super::Document;
use super::layer::PathLayer;
use super::merge::{merge_all, prune_nulls};
use crate::error::Result;
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

/// One layer in a [`ChainConfig`].
#[derive(Debug, Clone)]
pub enum Layer {
    /// Backed by a YAML file; refreshed before every merge.
    File(PathLayer),
    /// Fixed in-memory values, e.g. command-line overrides.
    Static(Document),
}

impl Layer {
    /// Refresh file-backed layers. Static layers never change.
    pub fn refresh(&mut self) -> Result<bool> {
        match self {
            Layer::File(layer) => layer.refresh(),
            Layer::Static(_) => Ok(false),
        }
    }

    pub fn document(&self) -> &Document {
        match self {
            Layer::File(layer) => layer.document(),
            Layer::Static(document) => document,
        }
    }

    pub fn as_file(&self) -> Option<&PathLayer> {
        match self {
            Layer::File(layer) => Some(layer),
            Layer::Static(_) => None,
        }
    }
}

impl From<PathLayer> for Layer {
    fn from(layer: PathLayer) -> Self {
        Layer::File(layer)
    }
}

impl From<Document> for Layer {
    fn from(document: Document) -> Self {
        Layer::Static(document)
    }
}

/// Named layers merged in insertion order; later layers win.
///
/// ```no_run
/// use confchain::config::{ChainConfig, Document, PathLayer};
///
/// let mut chain = ChainConfig::new();
/// chain.insert("base", PathLayer::new("/etc/app/base.yaml"));
/// chain.insert("app", PathLayer::new("app.yaml"));
/// chain.insert("cli", Document::new());
/// let merged = chain.merge()?;
/// # Ok::<(), confchain::error::ConfigError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct ChainConfig {
    layers: Vec<(String, Layer)>,
}

impl ChainConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a layer at the end of the chain.
    ///
    /// A layer with the same name is replaced where it stands and returned.
    pub fn insert(&mut self, name: impl Into<String>, layer: impl Into<Layer>) -> Option<Layer> {
        let name = name.into();
        let layer = layer.into();
        match self.layers.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => Some(std::mem::replace(slot, layer)),
            None => {
                self.layers.push((name, layer));
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Layer> {
        self.layers
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, layer)| layer)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Layer names in precedence order, lowest first.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.layers.iter().map(|(name, _)| name.as_str())
    }

    pub fn layers(&self) -> impl Iterator<Item = (&str, &Layer)> {
        self.layers.iter().map(|(name, layer)| (name.as_str(), layer))
    }

    /// Every file consulted by any file-backed layer, without duplicates.
    pub fn dependencies(&self) -> Vec<&Path> {
        let mut seen = HashSet::new();
        self.layers
            .iter()
            .filter_map(|(_, layer)| layer.as_file())
            .flat_map(PathLayer::dependencies)
            .filter(|path| seen.insert(*path))
            .collect()
    }

    /// Refresh every file-backed layer, returning the names that reloaded.
    pub fn refresh(&mut self) -> Result<Vec<String>> {
        let mut reloaded = Vec::new();
        for (name, layer) in &mut self.layers {
            if layer.refresh()? {
                debug!(layer = %name, "Layer reloaded");
                reloaded.push(name.clone());
            }
        }
        Ok(reloaded)
    }

    /// Refresh all layers and flatten them into one document.
    ///
    /// Top-level keys of later layers overwrite earlier ones wholesale, then
    /// every null value at any depth is removed. The result is a fresh copy;
    /// identical files and chain order always give an equal result.
    pub fn merge(&mut self) -> Result<Document> {
        self.refresh()?;

        let mut merged = merge_all(self.layers.iter().map(|(_, layer)| layer.document()));
        prune_nulls(&mut merged);
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn doc(value: Value) -> Document {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_later_layer_wins() {
        let mut chain = ChainConfig::new();
        chain.insert("a", doc(json!({"x": 1, "y": 2})));
        chain.insert("b", doc(json!({"y": 3})));

        let merged = chain.merge().unwrap();
        assert_eq!(Value::Object(merged), json!({"x": 1, "y": 3}));
    }

    #[test]
    fn test_null_removes_key_from_earlier_layer() {
        let mut chain = ChainConfig::new();
        chain.insert("a", doc(json!({"x": 1, "y": {"z": null, "w": 2}})));
        chain.insert("b", doc(json!({"x": null})));

        let merged = chain.merge().unwrap();
        assert_eq!(Value::Object(merged), json!({"y": {"w": 2}}));
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut chain = ChainConfig::new();
        chain.insert("a", doc(json!({"x": 1})));
        chain.insert("b", doc(json!({"x": 2})));
        let old = chain.insert("a", doc(json!({"x": 3, "y": 1})));

        assert!(old.is_some());
        assert_eq!(chain.names().collect::<Vec<_>>(), vec!["a", "b"]);
        let merged = chain.merge().unwrap();
        assert_eq!(Value::Object(merged), json!({"x": 2, "y": 1}));
    }

    #[test]
    fn test_static_layers_have_no_dependencies() {
        let mut chain = ChainConfig::new();
        chain.insert("a", doc(json!({"x": 1})));
        assert!(chain.dependencies().is_empty());
        assert!(chain.refresh().unwrap().is_empty());
        assert!(chain.contains("a"));
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn test_empty_chain_merges_to_empty() {
        let mut chain = ChainConfig::new();
        assert!(chain.is_empty());
        assert!(chain.merge().unwrap().is_empty());
    }
}
