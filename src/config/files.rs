//! Reading YAML documents from disk.
//!
//! Missing or unreadable files are logged and load as empty documents.
//! Malformed YAML is fatal.

use super::Document;
use crate::error::{ConfigError, Result};
use serde_json::Value;
use serde_yaml::Value as Yaml;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Absolute form of `path`, without touching the filesystem.
pub fn absolute_path(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Identity used to detect import cycles: the canonical path when the file
/// exists, otherwise its absolute form.
pub(crate) fn identity_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| absolute_path(path))
}

/// Load a YAML file as a document.
pub fn load_document(path: &Path) -> Result<Document> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "Missing config");
            return Ok(Document::new());
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "Unreadable config");
            return Ok(Document::new());
        }
    };

    debug!(path = %path.display(), "Loading config");
    parse_document(&content, path)
}

/// Parse YAML text as a document; `origin` is used in errors and logs.
pub fn parse_document(content: &str, origin: &Path) -> Result<Document> {
    if content.trim().is_empty() {
        warn!(path = %origin.display(), "Empty config");
        return Ok(Document::new());
    }

    let parse_error = |source: serde_yaml::Error| ConfigError::Parse {
        path: origin.to_path_buf(),
        source,
    };
    let yaml: Yaml = serde_yaml::from_str(content).map_err(parse_error)?;

    match &yaml {
        Yaml::Null => {
            warn!(path = %origin.display(), "Empty config");
            return Ok(Document::new());
        }
        Yaml::Mapping(_) => {}
        _ => {
            return Err(ConfigError::NotAMapping {
                path: origin.to_path_buf(),
            });
        }
    }

    if let Some(key) = non_finite_key(&yaml) {
        return Err(ConfigError::NonFiniteNumber {
            path: origin.to_path_buf(),
            key,
        });
    }

    match serde_yaml::from_value(yaml).map_err(parse_error)? {
        Value::Object(map) => Ok(map),
        _ => Err(ConfigError::NotAMapping {
            path: origin.to_path_buf(),
        }),
    }
}

/// Dotted key of the first `.inf`, `-.inf` or `.nan` in `value`.
///
/// JSON has no such numbers; converting would turn them into null, and null
/// keys are pruned from the merged view.
pub(crate) fn non_finite_key(value: &Yaml) -> Option<String> {
    let mut path = Vec::new();
    find_non_finite(value, &mut path).then(|| path.join("."))
}

fn find_non_finite(value: &Yaml, path: &mut Vec<String>) -> bool {
    match value {
        Yaml::Number(n) => n.is_nan() || n.is_infinite(),
        Yaml::Sequence(items) => items
            .iter()
            .enumerate()
            .any(|(index, item)| descend(path, index.to_string(), item)),
        Yaml::Mapping(map) => map
            .iter()
            .any(|(key, item)| descend(path, key_name(key), item)),
        Yaml::Tagged(tagged) => find_non_finite(&tagged.value, path),
        _ => false,
    }
}

fn descend(path: &mut Vec<String>, segment: String, value: &Yaml) -> bool {
    path.push(segment);
    if find_non_finite(value, path) {
        return true;
    }
    path.pop();
    false
}

fn key_name(key: &Yaml) -> String {
    match key {
        Yaml::String(s) => s.clone(),
        Yaml::Number(n) => n.to_string(),
        Yaml::Bool(b) => b.to_string(),
        _ => "?".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let doc = load_document(&temp.path().join("nope.yaml")).unwrap();
        assert!(doc.is_empty());
    }

    #[test]
    fn test_empty_and_null_files_are_empty() {
        assert!(parse_document("", Path::new("a.yaml")).unwrap().is_empty());
        assert!(parse_document("  \n", Path::new("a.yaml")).unwrap().is_empty());
        assert!(parse_document("~\n", Path::new("a.yaml")).unwrap().is_empty());
    }

    #[test]
    fn test_preserves_key_order() {
        let doc = parse_document("zeta: 1\nalpha: 2\nmid: 3\n", Path::new("a.yaml")).unwrap();
        let keys: Vec<&str> = doc.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_nested_values() {
        let doc = parse_document(
            "server:\n  port: 8080\n  hosts: [a, b]\n  debug: null\n",
            Path::new("a.yaml"),
        )
        .unwrap();
        assert_eq!(
            Value::Object(doc),
            json!({"server": {"port": 8080, "hosts": ["a", "b"], "debug": null}})
        );
    }

    #[test]
    fn test_malformed_yaml_is_fatal() {
        let err = parse_document("a: [1, 2\n", Path::new("bad.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_infinite_number_is_rejected() {
        let err = parse_document("limit: .inf\nkeep: 1\n", Path::new("app.yaml")).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::NonFiniteNumber { ref key, .. } if key == "limit"
        ));
    }

    #[test]
    fn test_nested_nan_reports_dotted_key() {
        let err = parse_document(
            "server:\n  ratios: [1.5, .nan]\n",
            Path::new("app.yaml"),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::NonFiniteNumber { ref key, .. } if key == "server.ratios.1"
        ));
    }

    #[test]
    fn test_finite_floats_are_kept() {
        let doc = parse_document("ratio: 0.25\nneg: -0.5\n", Path::new("a.yaml")).unwrap();
        assert_eq!(Value::Object(doc), json!({"ratio": 0.25, "neg": -0.5}));
    }

    #[test]
    fn test_top_level_sequence_is_rejected() {
        let err = parse_document("- a\n- b\n", Path::new("list.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotAMapping { .. }));
    }
}
