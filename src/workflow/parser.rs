//! Workflow Parser
//!
//! Turns raw definition JSON into a resolved, validated
//! [`WorkflowDefinition`]. The pipeline is:
//!
//! 1. Read and parse the JSON file (when loading from disk)
//! 2. Resolve `$NAME` placeholders against the environment
//! 3. Shape the resolved tree into the typed model
//! 4. Validate the step graph

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use log::{debug, info};
use serde_json::Value;
use thiserror::Error;

use super::model::WorkflowDefinition;
use super::resolver::{resolve, ConfigurationError};
use super::validator::{validate_definition, DefinitionError};

/// Failure while turning raw JSON into a usable definition.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to read workflow definition '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("workflow definition '{path}' is not valid JSON: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },

    #[error("workflow definition has an invalid shape: {0}")]
    Shape(serde_json::Error),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Definition(#[from] DefinitionError),
}

/// Resolves, shapes, and validates a raw JSON definition.
///
/// The environment is injected so callers (and tests) control exactly which
/// variables are visible to placeholder resolution.
pub fn parse_definition(
    raw: &Value,
    env: &HashMap<String, String>,
) -> Result<WorkflowDefinition, ParseError> {
    let resolved = resolve(raw, env)?;
    let definition: WorkflowDefinition =
        serde_json::from_value(resolved).map_err(ParseError::Shape)?;

    validate_definition(&definition)?;

    debug!(
        "Parsed definition '{}' v{}: {} steps",
        definition.label,
        definition.version,
        definition.flow.len()
    );

    Ok(definition)
}

/// Loads a workflow definition from a JSON file.
///
/// # Example
///
/// ```rust,no_run
/// use std::collections::HashMap;
/// use flowsync::workflow::load_definition;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let env: HashMap<String, String> = std::env::vars().collect();
///     let definition = load_definition("workflow.json".as_ref(), &env)?;
///     println!("Loaded '{}' with {} steps", definition.label, definition.len());
///     Ok(())
/// }
/// ```
pub fn load_definition(
    path: &Path,
    env: &HashMap<String, String>,
) -> Result<WorkflowDefinition, ParseError> {
    info!("Loading workflow definition from: {}", path.display());

    let content = fs::read_to_string(path).map_err(|source| ParseError::Read {
        path: path.display().to_string(),
        source,
    })?;

    let raw: Value = serde_json::from_str(&content).map_err(|source| ParseError::Json {
        path: path.display().to_string(),
        source,
    })?;

    parse_definition(&raw, env)
}

/// Reads a definition file without resolving or validating it.
///
/// Used by the orchestrator entry points, which take raw JSON so the full
/// resolve/validate pipeline runs inside one invocation.
pub fn load_raw(path: &Path) -> Result<Value, ParseError> {
    let content = fs::read_to_string(path).map_err(|source| ParseError::Read {
        path: path.display().to_string(),
        source,
    })?;

    serde_json::from_str(&content).map_err(|source| ParseError::Json {
        path: path.display().to_string(),
        source,
    })
}
