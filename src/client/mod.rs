//! Registration Capability
//!
//! The opaque boundary to the platform that hosts workflow resources. The
//! core only needs two operations: create a workflow resource and update an
//! existing one. Transport, authentication, and retries are the
//! implementation's concern.

use thiserror::Error;

use crate::workflow::model::WorkflowDefinition;

pub mod http;

pub use http::HttpRegistrationClient;

/// Identifiers returned by a successful create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteIds {
    /// Identifier of the created workflow resource.
    pub workflow_id: String,
    /// Identifier of the collection accumulating the workflow's results.
    pub collection_id: String,
}

/// Failure reported by the registration endpoint.
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("registration request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("registration endpoint rejected the request with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("registration response is missing '{0}'")]
    MalformedResponse(&'static str),
}

/// Creates and updates remote workflow resources.
pub trait RegistrationClient {
    /// Registers a new workflow resource and returns its identifiers.
    fn create(&self, definition: &WorkflowDefinition) -> Result<RemoteIds, RegistrationError>;

    /// Replaces the definition of an existing workflow resource.
    fn update(
        &self,
        remote_workflow_id: &str,
        definition: &WorkflowDefinition,
    ) -> Result<(), RegistrationError>;
}
