//! Blocking HTTP implementation of the registration capability.
//!
//! `POST {base}/v1/workflows` creates a resource; the response carries
//! `workflow_id` and `collection_id`. `PUT {base}/v1/workflows/{id}`
//! replaces an existing definition. Nothing is retried here.

use log::debug;
use reqwest::blocking::Client;
use serde_json::Value;

use crate::workflow::model::WorkflowDefinition;

use super::{RegistrationClient, RegistrationError, RemoteIds};

/// Talks to a registration endpoint over HTTP.
pub struct HttpRegistrationClient {
    base_url: String,
    http: Client,
}

impl HttpRegistrationClient {
    /// Creates a client for the given endpoint base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            http: Client::new(),
        }
    }

    fn workflows_url(&self) -> String {
        format!("{}/v1/workflows", self.base_url)
    }

    fn workflow_url(&self, remote_workflow_id: &str) -> String {
        format!("{}/v1/workflows/{}", self.base_url, remote_workflow_id)
    }

    fn check_status(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, RegistrationError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().unwrap_or_default();
        Err(RegistrationError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

impl RegistrationClient for HttpRegistrationClient {
    fn create(&self, definition: &WorkflowDefinition) -> Result<RemoteIds, RegistrationError> {
        let url = self.workflows_url();
        debug!("POST {}", url);

        let response = self.http.post(&url).json(definition).send()?;
        let body: Value = Self::check_status(response)?.json()?;

        let workflow_id = body
            .get("workflow_id")
            .and_then(Value::as_str)
            .ok_or(RegistrationError::MalformedResponse("workflow_id"))?;
        let collection_id = body
            .get("collection_id")
            .and_then(Value::as_str)
            .ok_or(RegistrationError::MalformedResponse("collection_id"))?;

        Ok(RemoteIds {
            workflow_id: workflow_id.to_string(),
            collection_id: collection_id.to_string(),
        })
    }

    fn update(
        &self,
        remote_workflow_id: &str,
        definition: &WorkflowDefinition,
    ) -> Result<(), RegistrationError> {
        let url = self.workflow_url(remote_workflow_id);
        debug!("PUT {}", url);

        let response = self.http.put(&url).json(definition).send()?;
        Self::check_status(response)?;

        Ok(())
    }
}
