//! Registration State Persistence
//!
//! Stores the remote identifiers and diffable snapshot produced by each
//! successful registration, one JSON file per (workflow name, network)
//! under `.flowsync/` in the working directory.
//!
//! A missing file means "no prior registration" and is not an error. A file
//! that exists but cannot be parsed is corruption and is always fatal:
//! treating it as absent would trigger a fresh `create` and orphan or
//! duplicate the remote resource.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::workflow::model::Step;

/// Default directory for persisted registration state.
pub const DEFAULT_STATE_DIR: &str = ".flowsync";

/// Target network for a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Testnet,
    Mainnet,
}

impl Network {
    /// Returns the lowercase name used in file names and messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Testnet => "testnet",
            Self::Mainnet => "mainnet",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text {
            "testnet" => Ok(Self::Testnet),
            "mainnet" => Ok(Self::Mainnet),
            other => Err(format!(
                "unknown network '{}' (expected 'testnet' or 'mainnet')",
                other
            )),
        }
    }
}

/// Identifies one registration record: the same workflow name on two
/// networks never shares state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StateKey {
    pub workflow: String,
    pub network: Network,
}

impl StateKey {
    pub fn new(workflow: impl Into<String>, network: Network) -> Self {
        Self {
            workflow: workflow.into(),
            network,
        }
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' on {}", self.workflow, self.network)
    }
}

/// Remote identifiers and diffable snapshot from the last applied
/// registration.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RegistrationState {
    /// Identifier of the remote workflow resource.
    pub remote_workflow_id: String,

    /// Identifier of the remote collection accumulating the workflow's results.
    pub remote_collection_id: String,

    /// Version string that was registered.
    pub registered_version: String,

    /// Label at registration time (diffed on the next attempt).
    pub label: String,

    /// Flow at registration time (diffed on the next attempt).
    pub flow: BTreeMap<String, Step>,

    /// When this record was written.
    pub registered_at: DateTime<Utc>,
}

/// Failure while reading or writing registration state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("registration state for workflow {key} is corrupt: {source}")]
    Corrupt {
        key: StateKey,
        source: serde_json::Error,
    },

    #[error("failed to encode registration state for workflow {key}: {source}")]
    Encode {
        key: StateKey,
        source: serde_json::Error,
    },

    #[error("failed to access registration state for workflow {key}: {source}")]
    Io { key: StateKey, source: io::Error },
}

/// File-backed store for [`RegistrationState`], keyed by [`StateKey`].
///
/// The store owns all path and encoding concerns; callers never construct
/// storage locations themselves.
#[derive(Debug, Clone)]
pub struct StateStore {
    root: PathBuf,
}

impl StateStore {
    /// Creates a store rooted at the given directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Creates a store rooted at [`DEFAULT_STATE_DIR`] in the working directory.
    pub fn default_location() -> Self {
        Self::new(DEFAULT_STATE_DIR)
    }

    /// Returns the root directory of this store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn file_path(&self, key: &StateKey) -> PathBuf {
        self.root
            .join(format!("{}.{}.state.json", key.workflow, key.network))
    }

    /// Reads the state for a key.
    ///
    /// `Ok(None)` means no prior registration. A present-but-malformed file
    /// is [`StateError::Corrupt`], never `None`.
    pub fn read(&self, key: &StateKey) -> Result<Option<RegistrationState>, StateError> {
        let path = self.file_path(key);

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(source) if source.kind() == io::ErrorKind::NotFound => {
                debug!("No prior registration state for {}", key);
                return Ok(None);
            }
            Err(source) => {
                return Err(StateError::Io {
                    key: key.clone(),
                    source,
                })
            }
        };

        let state: RegistrationState =
            serde_json::from_str(&content).map_err(|source| StateError::Corrupt {
                key: key.clone(),
                source,
            })?;

        info!(
            "Loaded registration state for {} (remote id {})",
            key, state.remote_workflow_id
        );

        Ok(Some(state))
    }

    /// Writes the state for a key, creating the store directory on demand.
    pub fn write(&self, key: &StateKey, state: &RegistrationState) -> Result<(), StateError> {
        fs::create_dir_all(&self.root).map_err(|source| StateError::Io {
            key: key.clone(),
            source,
        })?;

        let path = self.file_path(key);
        let json = serde_json::to_string_pretty(state).map_err(|source| StateError::Encode {
            key: key.clone(),
            source,
        })?;

        fs::write(&path, json).map_err(|source| StateError::Io {
            key: key.clone(),
            source,
        })?;

        info!("Saved registration state for {} to {}", key, path.display());
        Ok(())
    }
}
