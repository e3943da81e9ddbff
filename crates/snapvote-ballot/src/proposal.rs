//! Ballot proposals.

use snapvote_types::{ProposalName, U256};

/// A named option on the ballot with its running tally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proposal {
    /// Immutable label
    pub name: ProposalName,
    /// Accumulated votes; only ever increases
    pub vote_count: U256,
}

impl Proposal {
    pub fn new(name: ProposalName) -> Self {
        Self {
            name,
            vote_count: U256::ZERO,
        }
    }
}
