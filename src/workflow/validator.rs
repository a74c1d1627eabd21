//! Workflow Validation
//!
//! Checks the internal references of a resolved workflow definition:
//! the entry step must exist, and every `pass`/`scatter`/`gather` handoff
//! must target a step present in the flow.
//!
//! Cycles in handoff chains are not rejected here. Whether a looping flow
//! terminates is decided by the execution platform, not at registration time.

use log::debug;
use thiserror::Error;

use super::model::{Handoff, WorkflowDefinition};

/// A structural problem in a workflow definition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    #[error("workflow has no steps")]
    EmptyFlow,

    #[error("entry step '{0}' is not defined in the flow")]
    UnknownEntry(String),

    #[error("step '{step}' hands off to unknown step '{target}'")]
    DanglingHandoff { step: String, target: String },
}

/// Validates the step graph of a resolved workflow definition.
///
/// Performs the following checks:
/// 1. The flow is not empty
/// 2. `entry` names a step in the flow
/// 3. Every `pass`/`scatter`/`gather` target names a step in the flow
///
/// `done` handoffs are terminal and need no further check.
pub fn validate_definition(definition: &WorkflowDefinition) -> Result<(), DefinitionError> {
    if definition.flow.is_empty() {
        return Err(DefinitionError::EmptyFlow);
    }

    if !definition.flow.contains_key(&definition.entry) {
        return Err(DefinitionError::UnknownEntry(definition.entry.clone()));
    }

    for (name, step) in &definition.flow {
        match &step.handoff {
            Handoff::Pass(target) | Handoff::Scatter(target) | Handoff::Gather(target) => {
                if !definition.flow.contains_key(target) {
                    return Err(DefinitionError::DanglingHandoff {
                        step: name.clone(),
                        target: target.clone(),
                    });
                }
            }
            Handoff::Done => {}
        }
    }

    debug!(
        "Definition '{}' validated: {} steps, entry '{}'",
        definition.label,
        definition.flow.len(),
        definition.entry
    );

    Ok(())
}
