//! Sync Orchestrator
//!
//! Sequences the full registration pipeline: resolve and validate the raw
//! definition, read prior state, compute the sync decision, and, in apply
//! mode only, call the registration endpoint and persist the new state.
//!
//! Apply and dry-run are separate entry points returning separate result
//! types. [`preview`] never receives a client, so the dry-run path has no
//! way to reach the remote side or persist anything.

use std::collections::HashMap;

use chrono::Utc;
use log::info;
use serde_json::Value;
use thiserror::Error;

use crate::client::{RegistrationClient, RegistrationError};
use crate::workflow::model::WorkflowDefinition;
use crate::workflow::parser::{parse_definition, ParseError};

use super::diff::{plan, DryRunOutcome, SyncOutcome, SyncPlan};
use super::state::{Network, RegistrationState, StateError, StateKey, StateStore};

/// Any failure terminating a registration attempt.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Registration(#[from] RegistrationError),
}

/// Applies registrations: owns the registration client and the state store.
///
/// # Example
///
/// ```rust,no_run
/// use std::collections::HashMap;
/// use flowsync::client::http::HttpRegistrationClient;
/// use flowsync::sync::{Network, StateStore, Synchronizer};
/// use flowsync::workflow::parser::load_raw;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let raw = load_raw("workflow.json".as_ref())?;
///     let env: HashMap<String, String> = std::env::vars().collect();
///
///     let synchronizer = Synchronizer::new(
///         HttpRegistrationClient::new("https://registry.example.net"),
///         StateStore::default_location(),
///     );
///     let outcome = synchronizer.register("ingest", Network::Testnet, &raw, &env)?;
///     println!("{:?}", outcome);
///     Ok(())
/// }
/// ```
pub struct Synchronizer<C> {
    client: C,
    store: StateStore,
}

impl<C: RegistrationClient> Synchronizer<C> {
    /// Creates a synchronizer from a registration client and a state store.
    pub fn new(client: C, store: StateStore) -> Self {
        Self { client, store }
    }

    /// Registers a workflow definition on the given network.
    ///
    /// On `create`/`update` the registration endpoint is called with the
    /// resolved, validated definition and the new state is persisted before
    /// returning. On `unchanged` neither happens.
    ///
    /// State is written only after the remote call succeeds. A crash between
    /// the two leaves the remote resource unrecorded, and a retry will
    /// attempt `create` again; without remote-side idempotency this is a
    /// known limitation of the single-writer store.
    pub fn register(
        &self,
        name: &str,
        network: Network,
        raw: &Value,
        env: &HashMap<String, String>,
    ) -> Result<SyncOutcome, SyncError> {
        let definition = parse_definition(raw, env)?;
        let key = StateKey::new(name, network);
        let prior = self.store.read(&key)?;

        match plan(&definition, prior.as_ref()) {
            SyncPlan::Create => {
                info!("Registering new workflow {}", key);
                let ids = self.client.create(&definition)?;
                let state = new_state(ids.workflow_id, ids.collection_id, &definition);
                self.store.write(&key, &state)?;
                Ok(SyncOutcome::Created { state })
            }
            SyncPlan::Update { prior, changes } => {
                info!(
                    "Updating workflow {} ({} changed field(s))",
                    key,
                    changes.len()
                );
                self.client
                    .update(&prior.remote_workflow_id, &definition)?;
                let state = new_state(
                    prior.remote_workflow_id.clone(),
                    prior.remote_collection_id.clone(),
                    &definition,
                );
                self.store.write(&key, &state)?;
                Ok(SyncOutcome::Updated { changes, state })
            }
            SyncPlan::Unchanged { prior } => {
                info!("Workflow {} is already up to date", key);
                Ok(SyncOutcome::Unchanged {
                    state: prior.clone(),
                })
            }
        }
    }
}

/// Computes the registration decision without applying it.
///
/// Takes only a state store reference; no client is in scope, so this path
/// cannot call the remote side, and it performs no writes.
pub fn preview(
    store: &StateStore,
    name: &str,
    network: Network,
    raw: &Value,
    env: &HashMap<String, String>,
) -> Result<DryRunOutcome, SyncError> {
    let definition = parse_definition(raw, env)?;
    let key = StateKey::new(name, network);
    let prior = store.read(&key)?;

    Ok(match plan(&definition, prior.as_ref()) {
        SyncPlan::Create => DryRunOutcome::WouldCreate,
        SyncPlan::Update { changes, .. } => DryRunOutcome::WouldUpdate { changes },
        SyncPlan::Unchanged { .. } => DryRunOutcome::Unchanged,
    })
}

fn new_state(
    remote_workflow_id: String,
    remote_collection_id: String,
    definition: &WorkflowDefinition,
) -> RegistrationState {
    RegistrationState {
        remote_workflow_id,
        remote_collection_id,
        registered_version: definition.version.clone(),
        label: definition.label.clone(),
        flow: definition.flow.clone(),
        registered_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::RemoteIds;
    use serde_json::json;
    use std::cell::RefCell;
    use tempfile::{tempdir, TempDir};

    /// Records calls and hands out fixed identifiers.
    struct RecordingClient {
        creates: RefCell<Vec<String>>,
        updates: RefCell<Vec<String>>,
        fail: bool,
    }

    impl RecordingClient {
        fn new() -> Self {
            Self {
                creates: RefCell::new(Vec::new()),
                updates: RefCell::new(Vec::new()),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new()
            }
        }
    }

    impl RegistrationClient for RecordingClient {
        fn create(&self, definition: &WorkflowDefinition) -> Result<RemoteIds, RegistrationError> {
            if self.fail {
                return Err(RegistrationError::Rejected {
                    status: 500,
                    body: "boom".to_string(),
                });
            }
            self.creates.borrow_mut().push(definition.label.clone());
            Ok(RemoteIds {
                workflow_id: "wf-registered".to_string(),
                collection_id: "col-registered".to_string(),
            })
        }

        fn update(
            &self,
            remote_workflow_id: &str,
            _definition: &WorkflowDefinition,
        ) -> Result<(), RegistrationError> {
            if self.fail {
                return Err(RegistrationError::Rejected {
                    status: 500,
                    body: "boom".to_string(),
                });
            }
            self.updates.borrow_mut().push(remote_workflow_id.to_string());
            Ok(())
        }
    }

    fn raw(version: &str) -> Value {
        json!({
            "label": "Ingest",
            "version": version,
            "entry": "s1",
            "flow": {
                "s1": { "worker": { "service": "w" }, "then": { "pass": "s2" } },
                "s2": { "worker": { "service": "w" }, "then": { "done": true } }
            }
        })
    }

    fn no_env() -> HashMap<String, String> {
        HashMap::new()
    }

    fn store_in(temp: &TempDir) -> StateStore {
        StateStore::new(temp.path().join("state"))
    }

    #[test]
    fn test_first_registration_creates() {
        let temp = tempdir().unwrap();
        let sync = Synchronizer::new(RecordingClient::new(), store_in(&temp));

        let outcome = sync
            .register("ingest", Network::Testnet, &raw("1.0"), &no_env())
            .unwrap();

        let SyncOutcome::Created { state } = outcome else {
            panic!("expected created");
        };
        assert_eq!(state.remote_workflow_id, "wf-registered");
        assert_eq!(state.remote_collection_id, "col-registered");
        assert_eq!(state.registered_version, "1.0");
        assert_eq!(sync.client.creates.borrow().len(), 1);
    }

    #[test]
    fn test_repeat_registration_is_unchanged() {
        let temp = tempdir().unwrap();
        let sync = Synchronizer::new(RecordingClient::new(), store_in(&temp));

        sync.register("ingest", Network::Testnet, &raw("1.0"), &no_env())
            .unwrap();
        let second = sync
            .register("ingest", Network::Testnet, &raw("1.0"), &no_env())
            .unwrap();

        assert!(matches!(second, SyncOutcome::Unchanged { .. }));
        assert_eq!(sync.client.creates.borrow().len(), 1);
        assert!(sync.client.updates.borrow().is_empty());
    }

    #[test]
    fn test_version_bump_updates_with_prior_remote_id() {
        let temp = tempdir().unwrap();
        let sync = Synchronizer::new(RecordingClient::new(), store_in(&temp));

        sync.register("ingest", Network::Testnet, &raw("1.0"), &no_env())
            .unwrap();
        let outcome = sync
            .register("ingest", Network::Testnet, &raw("2.0"), &no_env())
            .unwrap();

        let SyncOutcome::Updated { changes, state } = outcome else {
            panic!("expected updated");
        };
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field, "version");
        // Remote ids survive updates; only the snapshot advances.
        assert_eq!(state.remote_workflow_id, "wf-registered");
        assert_eq!(state.registered_version, "2.0");
        assert_eq!(
            sync.client.updates.borrow().as_slice(),
            ["wf-registered".to_string()]
        );
    }

    #[test]
    fn test_preview_reports_without_touching_store() {
        let temp = tempdir().unwrap();
        let store = store_in(&temp);

        let outcome =
            preview(&store, "ingest", Network::Testnet, &raw("1.0"), &no_env()).unwrap();
        assert_eq!(outcome, DryRunOutcome::WouldCreate);

        // Nothing was persisted: a later read still sees no registration.
        assert!(store
            .read(&StateKey::new("ingest", Network::Testnet))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_preview_would_update_after_real_registration() {
        let temp = tempdir().unwrap();
        let store = store_in(&temp);
        let sync = Synchronizer::new(RecordingClient::new(), store.clone());

        sync.register("ingest", Network::Testnet, &raw("1.0"), &no_env())
            .unwrap();

        let before = store
            .read(&StateKey::new("ingest", Network::Testnet))
            .unwrap();
        let outcome =
            preview(&store, "ingest", Network::Testnet, &raw("2.0"), &no_env()).unwrap();
        let after = store
            .read(&StateKey::new("ingest", Network::Testnet))
            .unwrap();

        assert!(matches!(outcome, DryRunOutcome::WouldUpdate { .. }));
        assert_eq!(before, after);
    }

    #[test]
    fn test_preview_unchanged_for_identical_definition() {
        let temp = tempdir().unwrap();
        let store = store_in(&temp);
        let sync = Synchronizer::new(RecordingClient::new(), store.clone());

        sync.register("ingest", Network::Testnet, &raw("1.0"), &no_env())
            .unwrap();

        let outcome =
            preview(&store, "ingest", Network::Testnet, &raw("1.0"), &no_env()).unwrap();
        assert_eq!(outcome, DryRunOutcome::Unchanged);
    }

    #[test]
    fn test_failed_remote_call_writes_no_state() {
        let temp = tempdir().unwrap();
        let store = store_in(&temp);
        let sync = Synchronizer::new(RecordingClient::failing(), store.clone());

        let result = sync.register("ingest", Network::Testnet, &raw("1.0"), &no_env());

        assert!(matches!(result, Err(SyncError::Registration(_))));
        assert!(store
            .read(&StateKey::new("ingest", Network::Testnet))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_invalid_definition_makes_no_remote_call() {
        let temp = tempdir().unwrap();
        let sync = Synchronizer::new(RecordingClient::new(), store_in(&temp));

        let dangling = json!({
            "label": "Dangling",
            "version": "1.0",
            "entry": "s1",
            "flow": {
                "s1": { "worker": { "service": "w" }, "then": { "pass": "ghost" } }
            }
        });

        let result = sync.register("ingest", Network::Testnet, &dangling, &no_env());

        assert!(matches!(result, Err(SyncError::Parse(_))));
        assert!(sync.client.creates.borrow().is_empty());
        assert!(sync.client.updates.borrow().is_empty());
    }

    #[test]
    fn test_networks_register_independently() {
        let temp = tempdir().unwrap();
        let sync = Synchronizer::new(RecordingClient::new(), store_in(&temp));

        let first = sync
            .register("ingest", Network::Testnet, &raw("1.0"), &no_env())
            .unwrap();
        let second = sync
            .register("ingest", Network::Mainnet, &raw("1.0"), &no_env())
            .unwrap();

        assert!(matches!(first, SyncOutcome::Created { .. }));
        assert!(matches!(second, SyncOutcome::Created { .. }));
        assert_eq!(sync.client.creates.borrow().len(), 2);
    }

    #[test]
    fn test_description_only_change_skips_remote_call() {
        let temp = tempdir().unwrap();
        let sync = Synchronizer::new(RecordingClient::new(), store_in(&temp));

        sync.register("ingest", Network::Testnet, &raw("1.0"), &no_env())
            .unwrap();

        let mut redocumented = raw("1.0");
        redocumented["description"] = json!("new docs, same workflow");
        let outcome = sync
            .register("ingest", Network::Testnet, &redocumented, &no_env())
            .unwrap();

        assert!(matches!(outcome, SyncOutcome::Unchanged { .. }));
        assert!(sync.client.updates.borrow().is_empty());
    }
}
