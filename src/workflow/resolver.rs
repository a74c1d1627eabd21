//! Variable Resolution
//!
//! Substitutes `$NAME` placeholders in a JSON tree with environment-sourced
//! values before the definition is shaped and validated.
//!
//! Two different rules apply, and the asymmetry is deliberate:
//! - a string *value* `"$NAME"` must resolve; a missing variable aborts the
//!   whole resolution with a [`ConfigurationError`];
//! - a mapping *key* `"$NAME"` is replaced only when the variable is set,
//!   and is otherwise left unchanged.

use std::collections::HashMap;

use serde_json::{Map, Value};
use thiserror::Error;

/// A `$NAME` value reference pointed at an environment variable that is not set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("environment variable '{variable}' is not set but is referenced by the workflow definition")]
pub struct ConfigurationError {
    /// Name of the missing variable (without the `$` sigil).
    pub variable: String,
}

/// Resolves all `$NAME` placeholders in a JSON tree.
///
/// Returns a tree of the same shape with substitutions applied. Resolution is
/// a pure function of the tree and the supplied environment; no partial tree
/// is returned on failure.
///
/// # Example
///
/// ```
/// use std::collections::HashMap;
/// use serde_json::json;
/// use flowsync::workflow::resolver::resolve;
///
/// let env = HashMap::from([("REGION".to_string(), "eu-west".to_string())]);
/// let resolved = resolve(&json!({ "region": "$REGION" }), &env).unwrap();
/// assert_eq!(resolved, json!({ "region": "eu-west" }));
/// ```
pub fn resolve(tree: &Value, env: &HashMap<String, String>) -> Result<Value, ConfigurationError> {
    match tree {
        Value::String(text) => match text.strip_prefix('$') {
            Some(name) => match env.get(name) {
                Some(value) => Ok(Value::String(value.clone())),
                None => Err(ConfigurationError {
                    variable: name.to_string(),
                }),
            },
            None => Ok(tree.clone()),
        },
        Value::Array(items) => items
            .iter()
            .map(|item| resolve(item, env))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(entries) => {
            let mut resolved = Map::with_capacity(entries.len());
            for (key, value) in entries {
                resolved.insert(resolve_key(key, env), resolve(value, env)?);
            }
            Ok(Value::Object(resolved))
        }
        // Numbers, booleans, and null pass through untouched.
        other => Ok(other.clone()),
    }
}

/// Resolves a mapping key. Unlike values, keys degrade gracefully: a `$NAME`
/// key with no matching environment variable is kept verbatim.
fn resolve_key(key: &str, env: &HashMap<String, String>) -> String {
    match key.strip_prefix('$') {
        Some(name) => env.get(name).cloned().unwrap_or_else(|| key.to_string()),
        None => key.to_string(),
    }
}
