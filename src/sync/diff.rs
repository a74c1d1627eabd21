//! Diff & Sync Decision
//!
//! Compares a resolved workflow definition against prior registration state
//! and decides whether the remote resource must be created, updated, or left
//! untouched.
//!
//! The comparable fields are `label`, `version`, and the full `flow`
//! structure. `description` is documentation, not registration-relevant
//! state: a description-only change is `Unchanged` and triggers no remote
//! call.

use std::collections::BTreeSet;
use std::fmt;

use log::debug;
use serde_json::Value;

use crate::workflow::model::WorkflowDefinition;

use super::state::RegistrationState;

/// One field-level difference between a definition and prior state.
///
/// `from` is `None` for a field with no prior value (an added flow step);
/// a removed flow step carries `Value::Null` in `to`.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    /// Dotted field path: `label`, `version`, or `flow.<step name>`.
    pub field: String,
    pub from: Option<Value>,
    pub to: Value,
}

impl fmt::Display for FieldChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.from {
            Some(from) => write!(f, "{}: {} -> {}", self.field, from, self.to),
            None => write!(f, "{}: (new) {}", self.field, self.to),
        }
    }
}

/// The decision computed from a definition and optional prior state.
///
/// `Update` and `Unchanged` borrow the prior state they were computed from,
/// so neither can exist without one.
#[derive(Debug, PartialEq)]
pub enum SyncPlan<'a> {
    /// No prior registration; the entire definition is new.
    Create,
    /// Prior registration differs in at least one comparable field.
    Update {
        prior: &'a RegistrationState,
        changes: Vec<FieldChange>,
    },
    /// Prior registration matches every comparable field.
    Unchanged { prior: &'a RegistrationState },
}

/// Result of an applied registration.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// A remote resource was created and its state persisted.
    Created { state: RegistrationState },
    /// The remote resource was updated and the new state persisted.
    Updated {
        changes: Vec<FieldChange>,
        state: RegistrationState,
    },
    /// Nothing to do; prior state returned untouched.
    Unchanged { state: RegistrationState },
}

/// Result of a dry-run registration. Carries no state payload: nothing was
/// applied, so there is nothing to hand back.
#[derive(Debug, Clone, PartialEq)]
pub enum DryRunOutcome {
    WouldCreate,
    WouldUpdate { changes: Vec<FieldChange> },
    Unchanged,
}

/// Computes the sync decision for a definition against optional prior state.
pub fn plan<'a>(
    definition: &WorkflowDefinition,
    prior: Option<&'a RegistrationState>,
) -> SyncPlan<'a> {
    let Some(prior) = prior else {
        debug!("No prior registration for '{}': create", definition.label);
        return SyncPlan::Create;
    };

    let changes = diff_fields(definition, prior);

    if changes.is_empty() {
        debug!("Definition '{}' matches prior registration", definition.label);
        SyncPlan::Unchanged { prior }
    } else {
        debug!(
            "Definition '{}' differs from prior registration in {} field(s)",
            definition.label,
            changes.len()
        );
        SyncPlan::Update { prior, changes }
    }
}

/// Computes field-level differences in stable order: `label`, `version`,
/// then per-step flow changes in step-name order.
fn diff_fields(definition: &WorkflowDefinition, prior: &RegistrationState) -> Vec<FieldChange> {
    let mut changes = Vec::new();

    if definition.label != prior.label {
        changes.push(FieldChange {
            field: "label".to_string(),
            from: Some(Value::String(prior.label.clone())),
            to: Value::String(definition.label.clone()),
        });
    }

    if definition.version != prior.registered_version {
        changes.push(FieldChange {
            field: "version".to_string(),
            from: Some(Value::String(prior.registered_version.clone())),
            to: Value::String(definition.version.clone()),
        });
    }

    let step_names: BTreeSet<&String> = definition.flow.keys().chain(prior.flow.keys()).collect();

    for name in step_names {
        match (prior.flow.get(name), definition.flow.get(name)) {
            (Some(old), Some(new)) if old != new => changes.push(FieldChange {
                field: format!("flow.{}", name),
                from: Some(old.as_value()),
                to: new.as_value(),
            }),
            (Some(old), None) => changes.push(FieldChange {
                field: format!("flow.{}", name),
                from: Some(old.as_value()),
                to: Value::Null,
            }),
            (None, Some(new)) => changes.push(FieldChange {
                field: format!("flow.{}", name),
                from: None,
                to: new.as_value(),
            }),
            _ => {}
        }
    }

    changes
}
