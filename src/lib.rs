//! Flowsync - Declarative Workflow Registration Synchronizer
//!
//! Reads a JSON workflow definition (a DAG of named steps, each delegating
//! to an external worker), resolves `$NAME` placeholders from the
//! environment, validates the step graph, diffs the result against the
//! previously registered state, and creates or updates the remote workflow
//! resource. Under dry-run it reports the decision without applying it.
//!
//! # Architecture
//!
//! The library is organized into three main modules:
//!
//! - [`workflow`]: Definition model, placeholder resolution, validation, parsing
//! - [`sync`]: Registration state, diffing, and the sync orchestrator
//! - [`client`]: The registration capability boundary and its HTTP implementation
//!
//! # Example
//!
//! ```rust,no_run
//! use std::collections::HashMap;
//! use flowsync::client::http::HttpRegistrationClient;
//! use flowsync::sync::{Network, StateStore, Synchronizer};
//! use flowsync::workflow::parser::load_raw;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Load the raw definition; resolution and validation run inside register()
//!     let raw = load_raw("workflow.json".as_ref())?;
//!     let env: HashMap<String, String> = std::env::vars().collect();
//!
//!     let synchronizer = Synchronizer::new(
//!         HttpRegistrationClient::new("https://registry.example.net"),
//!         StateStore::default_location(),
//!     );
//!
//!     let outcome = synchronizer.register("ingest", Network::Testnet, &raw, &env)?;
//!     println!("{:?}", outcome);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod sync;
pub mod workflow;

// Re-export commonly used types
pub use client::{HttpRegistrationClient, RegistrationClient, RemoteIds};
pub use sync::{preview, DryRunOutcome, Network, StateStore, SyncOutcome, Synchronizer};
pub use workflow::{load_definition, Handoff, Step, WorkerReference, WorkflowDefinition};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "Flowsync";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_version() {
        assert!(!VERSION.is_empty());
        assert!(VERSION.contains('.'));
    }

    #[test]
    fn test_app_name() {
        assert_eq!(APP_NAME, "Flowsync");
    }

    #[test]
    fn test_module_exports_definition() {
        let definition = WorkflowDefinition::new("Test", "1.0", "s1");
        assert_eq!(definition.label, "Test");
        assert!(definition.is_empty());
    }

    #[test]
    fn test_module_exports_handoff() {
        let handoff = Handoff::Pass("next".to_string());
        assert_eq!(handoff.target(), Some("next"));
    }
}
