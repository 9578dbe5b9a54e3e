//! `--set KEY=VALUE` overrides turned into a static layer.
//!
//! - Values are parsed as YAML, so `port=80` is a number and `hosts=[a, b]`
//!   a sequence. A value that is not valid YAML is kept as a string.
//!   `.inf` and `.nan` have no JSON form and are rejected.
//! - Dotted keys build nested mappings: `listen.port=80`.
//! - A bare key is `true`: `--set debug`.
//! - Repeating a key collects its values into a sequence.

use super::Document;
use super::files::non_finite_key;
use crate::error::{ConfigError, Result};
use serde_json::Value;

/// Build a document from override arguments, in argument order.
pub fn overrides_document<S: AsRef<str>>(args: &[S]) -> Result<Document> {
    let mut document = Document::new();
    for arg in args {
        apply_override(&mut document, arg.as_ref())?;
    }
    Ok(document)
}

fn apply_override(document: &mut Document, arg: &str) -> Result<()> {
    let (key, value) = match arg.split_once('=') {
        Some((key, raw)) => (key, parse_value(arg, raw)?),
        None => (arg, Value::Bool(true)),
    };

    let segments: Vec<&str> = key.split('.').collect();
    if segments.iter().any(|segment| segment.is_empty()) {
        return Err(ConfigError::invalid_override(arg, "empty key segment"));
    }
    let Some((leaf, parents)) = segments.split_last() else {
        return Err(ConfigError::invalid_override(arg, "missing key"));
    };

    let mut node = document;
    for segment in parents {
        let slot = node
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Document::new()));
        node = slot.as_object_mut().ok_or_else(|| {
            ConfigError::invalid_override(arg, format!("'{segment}' is already set to a value"))
        })?;
    }

    match node.get_mut(*leaf) {
        None | Some(Value::Bool(true)) => {
            node.insert(leaf.to_string(), value);
        }
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
    }
    Ok(())
}

fn parse_value(arg: &str, raw: &str) -> Result<Value> {
    if raw.is_empty() {
        return Ok(Value::Null);
    }
    let Ok(yaml) = serde_yaml::from_str::<serde_yaml::Value>(raw) else {
        return Ok(Value::String(raw.to_string()));
    };
    if non_finite_key(&yaml).is_some() {
        return Err(ConfigError::invalid_override(
            arg,
            "non-finite numbers are not supported",
        ));
    }
    Ok(serde_yaml::from_value(yaml).unwrap_or_else(|_| Value::String(raw.to_string())))
}
