//! Snapvote Ledger - Checkpointed voting power with delegation.
//!
//! This crate provides:
//! - Per-account checkpoint histories with point-in-time lookup
//! - A delegation registry that moves power between delegates
//! - The voting-power ledger fed by balance and delegation events
//! - JSON persistence of the full ledger state

pub mod checkpoint;
pub mod delegation;
pub mod ledger;
pub mod snapshot;
pub mod error;

pub use checkpoint::{Checkpoint, CheckpointHistory, CheckpointStore};
pub use delegation::{DelegateChanged, DelegationRegistry};
pub use ledger::VotingPowerLedger;
pub use snapshot::LedgerSnapshot;
pub use error::LedgerError;
