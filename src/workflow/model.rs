//! Workflow Data Model
//!
//! Core data structures representing a declarative workflow definition:
//! a named graph of steps, each delegating to an external worker and
//! declaring what happens after that worker completes.
//!
//! # Example JSON Format
//!
//! ```json
//! {
//!   "label": "Nightly Ingest",
//!   "description": "Pulls and aggregates partner feeds",
//!   "version": "1.2.0",
//!   "entry": "fetch",
//!   "flow": {
//!     "fetch":     { "worker": { "service": "$FETCH_SERVICE" }, "then": { "scatter": "parse" } },
//!     "parse":     { "worker": { "service": "parser-v2" },      "then": { "gather": "aggregate" } },
//!     "aggregate": { "worker": { "service": "aggregator" },     "then": { "done": true } }
//!   }
//! }
//! ```

use serde::de::{self, Deserializer};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// Opaque reference to the external unit of work a step delegates to.
///
/// The synchronizer never interprets this value; it is carried verbatim
/// into diffs and registration payloads.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(transparent)]
pub struct WorkerReference(pub Value);

impl WorkerReference {
    /// Creates a reference naming a worker service.
    pub fn service(id: impl Into<String>) -> Self {
        Self(json!({ "service": id.into() }))
    }
}

/// Routing instruction applied after a step's worker completes.
///
/// Exactly one of four shapes on the wire: `{"pass": "name"}`,
/// `{"scatter": "name"}`, `{"gather": "name"}`, or `{"done": true}`.
#[derive(Debug, Clone, PartialEq)]
pub enum Handoff {
    /// 1:1 continuation to the named step.
    Pass(String),
    /// Fan-out to N parallel invocations of the named step.
    Scatter(String),
    /// Fan-in collecting scattered outputs into the named step.
    Gather(String),
    /// Terminal step; nothing follows.
    Done,
}

impl Handoff {
    /// Returns the target step name, if this handoff has one.
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::Pass(target) | Self::Scatter(target) | Self::Gather(target) => Some(target),
            Self::Done => None,
        }
    }

    /// Returns the wire name of this handoff variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Pass(_) => "pass",
            Self::Scatter(_) => "scatter",
            Self::Gather(_) => "gather",
            Self::Done => "done",
        }
    }

    /// Renders this handoff as the JSON value it serializes to.
    pub fn as_value(&self) -> Value {
        match self {
            Self::Pass(target) => json!({ "pass": target }),
            Self::Scatter(target) => json!({ "scatter": target }),
            Self::Gather(target) => json!({ "gather": target }),
            Self::Done => json!({ "done": true }),
        }
    }
}

impl Serialize for Handoff {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(1))?;
        match self {
            Self::Pass(target) => map.serialize_entry("pass", target)?,
            Self::Scatter(target) => map.serialize_entry("scatter", target)?,
            Self::Gather(target) => map.serialize_entry("gather", target)?,
            Self::Done => map.serialize_entry("done", &true)?,
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Handoff {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Map::<String, Value>::deserialize(deserializer)?;

        if value.len() != 1 {
            return Err(de::Error::custom(
                "handoff must be an object with exactly one of 'pass', 'scatter', 'gather', 'done'",
            ));
        }

        let Some((key, payload)) = value.iter().next() else {
            return Err(de::Error::custom("handoff object is empty"));
        };

        match (key.as_str(), payload) {
            ("pass", Value::String(target)) => Ok(Self::Pass(target.clone())),
            ("scatter", Value::String(target)) => Ok(Self::Scatter(target.clone())),
            ("gather", Value::String(target)) => Ok(Self::Gather(target.clone())),
            ("pass" | "scatter" | "gather", _) => Err(de::Error::custom(format!(
                "handoff '{}' expects a step name string",
                key
            ))),
            ("done", Value::Bool(true)) => Ok(Self::Done),
            ("done", _) => Err(de::Error::custom("handoff 'done' expects the value true")),
            (other, _) => Err(de::Error::custom(format!(
                "unknown handoff '{}' (expected 'pass', 'scatter', 'gather', or 'done')",
                other
            ))),
        }
    }
}

/// A single named node in the workflow graph.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Step {
    /// External unit of work this step invokes.
    pub worker: WorkerReference,

    /// Routing applied after the worker completes.
    #[serde(rename = "then")]
    pub handoff: Handoff,
}

impl Step {
    /// Creates a new step delegating to the given worker.
    ///
    /// # Example
    ///
    /// ```
    /// use flowsync::workflow::{Handoff, Step, WorkerReference};
    ///
    /// let step = Step::new(WorkerReference::service("parser-v2"), Handoff::Pass("next".into()));
    /// assert_eq!(step.handoff.target(), Some("next"));
    /// ```
    pub fn new(worker: WorkerReference, handoff: Handoff) -> Self {
        Self { worker, handoff }
    }

    /// Renders this step as the JSON value it serializes to.
    pub fn as_value(&self) -> Value {
        json!({ "worker": self.worker.0, "then": self.handoff.as_value() })
    }
}

/// A complete declarative workflow definition.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WorkflowDefinition {
    /// Human-readable name for the workflow.
    pub label: String,

    /// Optional descriptive copy; not registration-relevant state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Definition version string.
    pub version: String,

    /// Name of the step execution begins at. Must be a key of `flow`.
    pub entry: String,

    /// Step name -> step. Keys are unique; ordering is not significant.
    pub flow: BTreeMap<String, Step>,
}

impl WorkflowDefinition {
    /// Creates a definition with an empty flow.
    pub fn new(
        label: impl Into<String>,
        version: impl Into<String>,
        entry: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            description: None,
            version: version.into(),
            entry: entry.into(),
            flow: BTreeMap::new(),
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds a step to the flow.
    pub fn with_step(mut self, name: impl Into<String>, step: Step) -> Self {
        self.flow.insert(name.into(), step);
        self
    }

    /// Returns a step by name.
    pub fn step(&self, name: &str) -> Option<&Step> {
        self.flow.get(name)
    }

    /// Returns the number of steps in the flow.
    pub fn len(&self) -> usize {
        self.flow.len()
    }

    /// Returns true if the flow has no steps.
    pub fn is_empty(&self) -> bool {
        self.flow.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn worker() -> WorkerReference {
        WorkerReference::service("worker-1")
    }

    #[test]
    fn test_handoff_deserialize_pass() {
        let handoff: Handoff = serde_json::from_value(json!({ "pass": "next" })).unwrap();
        assert_eq!(handoff, Handoff::Pass("next".to_string()));
        assert_eq!(handoff.target(), Some("next"));
        assert_eq!(handoff.kind(), "pass");
    }

    #[test]
    fn test_handoff_deserialize_scatter_gather() {
        let scatter: Handoff = serde_json::from_value(json!({ "scatter": "fan" })).unwrap();
        let gather: Handoff = serde_json::from_value(json!({ "gather": "join" })).unwrap();

        assert_eq!(scatter, Handoff::Scatter("fan".to_string()));
        assert_eq!(gather, Handoff::Gather("join".to_string()));
    }

    #[test]
    fn test_handoff_deserialize_done() {
        let handoff: Handoff = serde_json::from_value(json!({ "done": true })).unwrap();
        assert_eq!(handoff, Handoff::Done);
        assert_eq!(handoff.target(), None);
    }

    #[test]
    fn test_handoff_rejects_done_false() {
        let result: Result<Handoff, _> = serde_json::from_value(json!({ "done": false }));
        assert!(result.is_err());
    }

    #[test]
    fn test_handoff_rejects_unknown_variant() {
        let result: Result<Handoff, _> = serde_json::from_value(json!({ "jump": "next" }));
        let err = result.unwrap_err().to_string();
        assert!(err.contains("unknown handoff 'jump'"));
    }

    #[test]
    fn test_handoff_rejects_multiple_keys() {
        let result: Result<Handoff, _> =
            serde_json::from_value(json!({ "pass": "a", "done": true }));
        assert!(result.is_err());
    }

    #[test]
    fn test_handoff_rejects_non_string_target() {
        let result: Result<Handoff, _> = serde_json::from_value(json!({ "pass": 42 }));
        assert!(result.unwrap_err().to_string().contains("step name"));
    }

    #[test]
    fn test_handoff_serialize_shapes() {
        assert_eq!(
            serde_json::to_value(Handoff::Pass("s2".into())).unwrap(),
            json!({ "pass": "s2" })
        );
        assert_eq!(
            serde_json::to_value(Handoff::Scatter("s2".into())).unwrap(),
            json!({ "scatter": "s2" })
        );
        assert_eq!(
            serde_json::to_value(Handoff::Gather("s2".into())).unwrap(),
            json!({ "gather": "s2" })
        );
        assert_eq!(serde_json::to_value(Handoff::Done).unwrap(), json!({ "done": true }));
    }

    #[test]
    fn test_handoff_as_value_matches_serialization() {
        for handoff in [
            Handoff::Pass("a".into()),
            Handoff::Scatter("b".into()),
            Handoff::Gather("c".into()),
            Handoff::Done,
        ] {
            assert_eq!(handoff.as_value(), serde_json::to_value(&handoff).unwrap());
        }
    }

    #[test]
    fn test_step_wire_format() {
        let step: Step = serde_json::from_value(json!({
            "worker": { "service": "parser-v2" },
            "then": { "gather": "aggregate" }
        }))
        .unwrap();

        assert_eq!(step.worker, WorkerReference::service("parser-v2"));
        assert_eq!(step.handoff, Handoff::Gather("aggregate".to_string()));
    }

    #[test]
    fn test_step_as_value_round_trip() {
        let step = Step::new(worker(), Handoff::Pass("next".into()));
        let reparsed: Step = serde_json::from_value(step.as_value()).unwrap();
        assert_eq!(reparsed, step);
    }

    #[test]
    fn test_definition_deserialize_full_document() {
        let definition: WorkflowDefinition = serde_json::from_value(json!({
            "label": "Nightly Ingest",
            "description": "Pulls partner feeds",
            "version": "1.2.0",
            "entry": "fetch",
            "flow": {
                "fetch": { "worker": { "service": "fetcher" }, "then": { "scatter": "parse" } },
                "parse": { "worker": { "service": "parser" }, "then": { "gather": "aggregate" } },
                "aggregate": { "worker": { "service": "agg" }, "then": { "done": true } }
            }
        }))
        .unwrap();

        assert_eq!(definition.label, "Nightly Ingest");
        assert_eq!(definition.version, "1.2.0");
        assert_eq!(definition.entry, "fetch");
        assert_eq!(definition.len(), 3);
        assert_eq!(
            definition.step("parse").unwrap().handoff,
            Handoff::Gather("aggregate".to_string())
        );
    }

    #[test]
    fn test_definition_description_optional() {
        let definition: WorkflowDefinition = serde_json::from_value(json!({
            "label": "Minimal",
            "version": "0.1.0",
            "entry": "only",
            "flow": {
                "only": { "worker": { "service": "w" }, "then": { "done": true } }
            }
        }))
        .unwrap();

        assert!(definition.description.is_none());
        assert!(!definition.is_empty());
    }

    #[test]
    fn test_definition_missing_field_rejected() {
        let result: Result<WorkflowDefinition, _> = serde_json::from_value(json!({
            "label": "No version",
            "entry": "s1",
            "flow": {}
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_definition_builder() {
        let definition = WorkflowDefinition::new("Test", "1.0", "s1")
            .with_description("docs only")
            .with_step("s1", Step::new(worker(), Handoff::Done));

        assert_eq!(definition.description.as_deref(), Some("docs only"));
        assert!(definition.step("s1").is_some());
        assert!(definition.step("s2").is_none());
    }
}
