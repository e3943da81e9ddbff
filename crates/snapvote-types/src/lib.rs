//! Snapvote Types - Value types shared by the voting-power ledger and the ballot.
//!
//! This crate provides:
//! - Addresses (20-byte account identifiers, hex encoded)
//! - U256 (256-bit unsigned integer for balances and voting power)
//! - ProposalName (fixed 32-byte proposal label)

pub mod address;
pub mod u256;
pub mod proposal_name;
pub mod error;

#[cfg(feature = "serde")]
mod serialization;

pub use address::Address;
pub use u256::U256;
pub use proposal_name::ProposalName;
pub use error::TypesError;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{Address, ProposalName, TypesError, U256};
}
