//! Registration Sync Module
//!
//! Decides and applies registrations against the remote platform.
//!
//! # Structure
//!
//! - [`state`]: Persisted registration state, keyed per (workflow, network)
//! - [`diff`]: Field-level diffing and the apply/dry-run outcome families
//! - [`engine`]: The orchestrator sequencing parse, diff, remote call, persist

pub mod diff;
pub mod engine;
pub mod state;

pub use diff::{DryRunOutcome, FieldChange, SyncOutcome, SyncPlan};
pub use engine::{preview, SyncError, Synchronizer};
pub use state::{Network, RegistrationState, StateError, StateKey, StateStore};
