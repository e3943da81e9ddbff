//! Snapvote Ballot - Token-weighted voting against a ledger snapshot.
//!
//! This crate provides:
//! - The snapshot ballot state machine and winner computation
//! - The `VotingPowerSource` seam the ballot reads historical power through
//! - TOML ballot configuration

pub mod proposal;
pub mod source;
pub mod ballot;
pub mod config;
pub mod error;

pub use proposal::Proposal;
pub use source::{SharedLedger, VotingPowerSource};
pub use ballot::{SnapshotBallot, VoteCast};
pub use config::BallotConfig;
pub use error::BallotError;
