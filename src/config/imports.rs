//! Recursive `import:` resolution.
//!
//! Any mapping in a document may carry an `import` key whose value maps
//! arbitrary names to file patterns:
//!
//! ```yaml
//! handlers:
//!   import:
//!     common: common.yaml        # taken as given (relative to the cwd)
//!     apps: apps/*/handlers.yaml # glob, relative to this file's directory
//!   login: {}
//! ```
//!
//! Each referenced file is loaded, has its own imports resolved relative to
//! itself, and is then shallow-merged into the mapping that named it: the
//! imported top-level keys replace same-named keys wholesale. The `import`
//! key is removed once all its patterns are applied.
//!
//! Wildcard patterns resolve against the importing file's directory while
//! literal patterns are used as written. Callers that want directory-relative
//! literal imports should write them as globs or as absolute paths.

use super::Document;
use super::files::{absolute_path, identity_path, load_document};
use super::merge::merge_shallow;
use super::snapshot::PathSnapshot;
use super::walk::Walker;
use crate::error::{ConfigError, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Reserved key holding import directives.
pub const IMPORT_KEY: &str = "import";

/// Resolve every `import` directive in `node`, in place.
///
/// `source` is the file `node` was read from. Returns a snapshot for `source`
/// followed by one snapshot per file opened while resolving, in the order
/// the files were opened.
pub fn resolve_imports(node: &mut Document, source: &Path) -> Result<Vec<PathSnapshot>> {
    let source = absolute_path(source);
    let mut resolver = Resolver::new(&source);
    resolver.snapshots.push(PathSnapshot::capture(&source));
    resolver.resolve(node, &source)?;
    Ok(resolver.snapshots)
}

/// Load `path` and resolve its imports.
///
/// The root snapshot is taken before the file is read, so an edit that lands
/// mid-load is picked up by the next staleness check.
pub fn load_resolved(path: &Path) -> Result<(Document, Vec<PathSnapshot>)> {
    let path = absolute_path(path);
    let mut resolver = Resolver::new(&path);
    resolver.snapshots.push(PathSnapshot::capture(&path));
    let mut document = load_document(&path)?;
    resolver.resolve(&mut document, &path)?;
    Ok((document, resolver.snapshots))
}

struct Resolver {
    snapshots: Vec<PathSnapshot>,
    /// Files currently being resolved, outermost first.
    ancestry: Vec<PathBuf>,
}

impl Resolver {
    fn new(root: &Path) -> Self {
        Self {
            snapshots: Vec::new(),
            ancestry: vec![identity_path(root)],
        }
    }

    fn resolve(&mut self, node: &mut Document, source: &Path) -> Result<()> {
        let base_dir = source
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let mut walker = Walker::new(node);
        while let Some(entry) = walker.next(node) {
            // Entries inside an import mapping are file patterns, not directives.
            if entry.key != IMPORT_KEY || entry.path.last().is_some_and(|k| k == IMPORT_KEY) {
                continue;
            }

            let Some(directive) = entry
                .owner_mut(node)
                .and_then(|owner| owner.shift_remove(IMPORT_KEY))
            else {
                continue;
            };
            let patterns = import_patterns(directive, source)?;

            for (name, pattern) in patterns {
                for path in expand_pattern(&pattern, &base_dir)? {
                    debug!(
                        source = %source.display(),
                        import = %name,
                        path = %path.display(),
                        "Importing config"
                    );
                    let imported = self.load_import(&path)?;
                    if let Some(owner) = entry.owner_mut(node) {
                        merge_shallow(owner, imported);
                    }
                }
            }
        }
        Ok(())
    }

    fn load_import(&mut self, path: &Path) -> Result<Document> {
        let path = absolute_path(path);
        let identity = identity_path(&path);
        if self.ancestry.contains(&identity) {
            let mut chain = self.ancestry.clone();
            chain.push(identity);
            return Err(ConfigError::ImportCycle { chain });
        }

        self.snapshots.push(PathSnapshot::capture(&path));
        let mut document = load_document(&path)?;

        self.ancestry.push(identity);
        let resolved = self.resolve(&mut document, &path);
        self.ancestry.pop();
        resolved?;

        Ok(document)
    }
}

/// Validate an `import` value: a mapping of names to pattern strings.
fn import_patterns(directive: Value, source: &Path) -> Result<Vec<(String, String)>> {
    let Value::Object(map) = directive else {
        return Err(ConfigError::invalid_import(
            source,
            format!("expected a mapping of name: pattern, found {}", kind(&directive)),
        ));
    };

    map.into_iter()
        .map(|(name, pattern)| match pattern {
            Value::String(pattern) => Ok((name, pattern)),
            other => Err(ConfigError::invalid_import(
                source,
                format!("pattern for '{name}' must be a string, found {}", kind(&other)),
            )),
        })
        .collect()
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}

fn is_wildcard(pattern: &str) -> bool {
    pattern.contains(['*', '?'])
}

/// Turn one import pattern into the list of files it names.
///
/// Globs are matched under `base_dir` and returned in lexicographic order;
/// a glob that matches nothing yields nothing. Literal patterns are returned
/// unchanged.
fn expand_pattern(pattern: &str, base_dir: &Path) -> Result<Vec<PathBuf>> {
    if !is_wildcard(pattern) {
        return Ok(vec![PathBuf::from(pattern)]);
    }

    let escaped_base = glob::Pattern::escape(&base_dir.to_string_lossy());
    let full = Path::new(&escaped_base).join(pattern);
    let entries = glob::glob(&full.to_string_lossy()).map_err(|source| ConfigError::Pattern {
        pattern: pattern.to_string(),
        source,
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) => paths.push(path),
            Err(err) => warn!(pattern = %pattern, error = %err, "Skipping unreadable import match"),
        }
    }
    paths.sort();

    if paths.is_empty() {
        debug!(pattern = %pattern, base = %base_dir.display(), "Import pattern matched no files");
    }
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_is_wildcard() {
        assert!(is_wildcard("conf/*.yaml"));
        assert!(is_wildcard("app?.yaml"));
        assert!(!is_wildcard("conf/app.yaml"));
    }

    #[test]
    fn test_import_patterns_rejects_non_mapping() {
        let err = import_patterns(json!("a.yaml"), Path::new("root.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidImport { .. }));
        assert!(err.to_string().contains("found a string"));
    }

    #[test]
    fn test_import_patterns_rejects_non_string_pattern() {
        let err = import_patterns(json!({"a": 5}), Path::new("root.yaml")).unwrap_err();
        assert!(err.to_string().contains("pattern for 'a' must be a string"));
    }

    #[test]
    fn test_expand_glob_sorted() {
        let temp = TempDir::new().unwrap();
        for name in ["b.yaml", "a.yaml", "c.txt"] {
            std::fs::write(temp.path().join(name), "x: 1\n").unwrap();
        }

        let paths = expand_pattern("*.yaml", temp.path()).unwrap();
        assert_eq!(
            paths,
            vec![temp.path().join("a.yaml"), temp.path().join("b.yaml")]
        );
    }

    #[test]
    fn test_expand_glob_without_matches() {
        let temp = TempDir::new().unwrap();
        assert!(expand_pattern("*.yaml", temp.path()).unwrap().is_empty());
    }

    #[test]
    fn test_expand_literal_is_untouched() {
        let paths = expand_pattern("conf/app.yaml", Path::new("/srv")).unwrap();
        assert_eq!(paths, vec![PathBuf::from("conf/app.yaml")]);
    }

    #[test]
    fn test_import_spliced_into_owner() {
        let temp = TempDir::new().unwrap();
        let sub = temp.path().join("sub.yaml");
        std::fs::write(&sub, "z: 5\n").unwrap();

        let source = temp.path().join("root.yaml");
        let mut node: Document = serde_json::from_value(json!({
            "section": {
                "keep": true,
                "import": {"a": sub.to_string_lossy()}
            }
        }))
        .unwrap();

        let snapshots = resolve_imports(&mut node, &source).unwrap();
        assert_eq!(
            Value::Object(node),
            json!({"section": {"keep": true, "z": 5}})
        );
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[0].path(), source.as_path());
        assert_eq!(snapshots[1].path(), sub.as_path());
    }

    #[test]
    fn test_import_key_inside_import_mapping_is_a_pattern() {
        let temp = TempDir::new().unwrap();
        let sub = temp.path().join("sub.yaml");
        std::fs::write(&sub, "z: 5\n").unwrap();

        let mut node: Document = serde_json::from_value(json!({
            "import": {"import": sub.to_string_lossy()}
        }))
        .unwrap();

        resolve_imports(&mut node, &temp.path().join("root.yaml")).unwrap();
        assert_eq!(Value::Object(node), json!({"z": 5}));
    }
}
