//! Snapshot ballot.
//!
//! A ballot is created with a fixed proposal list and a reference issuance
//! point. Each voter may spread votes over any proposals, as long as the sum
//! of everything they cast stays within their voting power at the reference
//! point. The ballot stays open for its whole life.
//!
//! Construction seals the source through the reference point, so power at
//! that point cannot change while votes are being spent against it.

use std::collections::{HashMap, HashSet};
use snapvote_types::{Address, ProposalName, U256};
use crate::config::BallotConfig;
use crate::error::BallotError;
use crate::proposal::Proposal;
use crate::source::VotingPowerSource;

/// Record of an accepted vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteCast {
    pub voter: Address,
    pub proposal: usize,
    pub amount: U256,
}

/// Ballot bounded by each voter's power at `reference_point`.
#[derive(Debug)]
pub struct SnapshotBallot<S> {
    /// Proposals in registration order; index is the proposal id
    proposals: Vec<Proposal>,
    /// Where historical power is read from
    source: S,
    /// Snapshot point, fixed at construction
    reference_point: u64,
    /// Votes cast so far per voter
    spent: HashMap<Address, U256>,
}

impl<S: VotingPowerSource> SnapshotBallot<S> {
    /// Create a ballot.
    ///
    /// `current_point` is the issuance point the ballot is created at; the
    /// reference point may not lie after it. The source is sealed through
    /// the reference point.
    ///
    /// # Errors
    /// - `EmptyProposalList` if `names` is empty
    /// - `DuplicateProposal` if a label appears twice
    /// - `InvalidReferencePoint` if `reference_point > current_point`
    pub fn new(
        names: Vec<ProposalName>,
        mut source: S,
        reference_point: u64,
        current_point: u64,
    ) -> Result<Self, BallotError> {
        if names.is_empty() {
            return Err(BallotError::EmptyProposalList);
        }

        let mut seen = HashSet::with_capacity(names.len());
        if let Some(dup) = names.iter().find(|name| !seen.insert(**name)) {
            return Err(BallotError::DuplicateProposal(dup.to_string()));
        }

        if reference_point > current_point {
            return Err(BallotError::InvalidReferencePoint {
                reference: reference_point,
                current: current_point,
            });
        }

        source.seal(reference_point);

        tracing::info!(
            proposals = names.len(),
            reference_point,
            "Ballot created"
        );

        Ok(Self {
            proposals: names.into_iter().map(Proposal::new).collect(),
            source,
            reference_point,
            spent: HashMap::new(),
        })
    }

    /// Create a ballot from plain labels.
    pub fn from_labels<I, L>(
        labels: I,
        source: S,
        reference_point: u64,
        current_point: u64,
    ) -> Result<Self, BallotError>
    where
        I: IntoIterator<Item = L>,
        L: AsRef<str>,
    {
        let names = labels
            .into_iter()
            .map(|l| ProposalName::new(l.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(names, source, reference_point, current_point)
    }

    /// Create a ballot from a loaded [`BallotConfig`].
    pub fn from_config(
        config: &BallotConfig,
        source: S,
        current_point: u64,
    ) -> Result<Self, BallotError> {
        Self::from_labels(&config.proposals, source, config.reference_point, current_point)
    }

    /// Cast `amount` votes from `voter` for the proposal at `proposal`.
    ///
    /// # Errors
    /// - `IndexOutOfRange` if `proposal` is not a valid index
    /// - `InsufficientVotingPower` if `amount` exceeds the voter's remaining power
    pub fn vote(
        &mut self,
        voter: Address,
        proposal: usize,
        amount: U256,
    ) -> Result<VoteCast, BallotError> {
        let count = self.proposals.len();
        let current_votes = self
            .proposals
            .get(proposal)
            .map(|p| p.vote_count)
            .ok_or(BallotError::IndexOutOfRange {
                index: proposal,
                count,
            })?;

        if amount.is_zero() {
            return Ok(VoteCast {
                voter,
                proposal,
                amount,
            });
        }

        let remaining = self.remaining_voting_power(&voter);
        if amount > remaining {
            tracing::debug!(%voter, %amount, %remaining, "Vote rejected");
            return Err(BallotError::InsufficientVotingPower {
                requested: amount,
                remaining,
            });
        }

        let new_votes = current_votes.checked_add(&amount).ok_or_else(|| {
            BallotError::Overflow(format!("vote count of proposal {}", proposal))
        })?;
        let new_spent = self.spent(&voter).checked_add(&amount).ok_or_else(|| {
            BallotError::Overflow(format!("votes spent by {}", voter))
        })?;

        self.proposals[proposal].vote_count = new_votes;
        self.spent.insert(voter, new_spent);

        tracing::info!(%voter, proposal, %amount, "Vote cast");

        Ok(VoteCast {
            voter,
            proposal,
            amount,
        })
    }

    /// Voting power of `voter` at the reference point.
    pub fn voting_power(&self, voter: &Address) -> U256 {
        self.source.power_of(voter, self.reference_point)
    }

    /// Power at the reference point minus votes already cast.
    pub fn remaining_voting_power(&self, voter: &Address) -> U256 {
        self.voting_power(voter).saturating_sub(&self.spent(voter))
    }

    /// Votes cast so far by `voter`.
    pub fn spent(&self, voter: &Address) -> U256 {
        self.spent.get(voter).copied().unwrap_or(U256::ZERO)
    }

    /// Index of the proposal with the most votes; the lowest index wins ties.
    pub fn winning_proposal_index(&self) -> usize {
        let mut winner = 0;
        let mut best = U256::ZERO;
        for (index, proposal) in self.proposals.iter().enumerate() {
            if proposal.vote_count > best {
                best = proposal.vote_count;
                winner = index;
            }
        }
        winner
    }

    /// Label of the winning proposal.
    pub fn winner_name(&self) -> ProposalName {
        self.proposals[self.winning_proposal_index()].name
    }

    pub fn proposal(&self, index: usize) -> Result<&Proposal, BallotError> {
        self.proposals.get(index).ok_or(BallotError::IndexOutOfRange {
            index,
            count: self.proposals.len(),
        })
    }

    pub fn proposals(&self) -> &[Proposal] {
        &self.proposals
    }

    pub fn proposal_count(&self) -> usize {
        self.proposals.len()
    }

    pub fn reference_point(&self) -> u64 {
        self.reference_point
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapvote_ledger::VotingPowerLedger;

    /// Fixed power per account, independent of the point.
    #[derive(Default)]
    struct FixedPower(HashMap<Address, U256>);

    impl FixedPower {
        fn with(mut self, account: Address, power: u64) -> Self {
            self.0.insert(account, U256::from(power));
            self
        }
    }

    impl VotingPowerSource for FixedPower {
        fn power_of(&self, account: &Address, _point: u64) -> U256 {
            self.0.get(account).copied().unwrap_or(U256::ZERO)
        }
    }

    fn test_address(n: u8) -> Address {
        let mut addr = [0u8; 20];
        addr[19] = n;
        Address::from_bytes(addr)
    }

    fn ballot(power: FixedPower) -> SnapshotBallot<FixedPower> {
        SnapshotBallot::from_labels(["P0", "P1", "P2"], power, 5, 5).unwrap()
    }

    #[test]
    fn test_construction() {
        let ballot = ballot(FixedPower::default());
        assert_eq!(ballot.proposal_count(), 3);
        assert_eq!(ballot.reference_point(), 5);
        assert_eq!(ballot.proposal(1).unwrap().name.as_str(), "P1");
        assert!(ballot.proposals().iter().all(|p| p.vote_count.is_zero()));
    }

    #[test]
    fn test_empty_proposals_rejected() {
        let result = SnapshotBallot::new(Vec::new(), FixedPower::default(), 0, 0);
        assert!(matches!(result, Err(BallotError::EmptyProposalList)));
    }

    #[test]
    fn test_duplicate_proposals_rejected() {
        let result = SnapshotBallot::from_labels(["A", "B", "A"], FixedPower::default(), 0, 0);
        assert_eq!(result.err(), Some(BallotError::DuplicateProposal("A".to_string())));
    }

    #[test]
    fn test_long_label_rejected() {
        let long = "x".repeat(40);
        let result = SnapshotBallot::from_labels([long], FixedPower::default(), 0, 0);
        assert!(matches!(result, Err(BallotError::InvalidProposalName(_))));
    }

    #[test]
    fn test_future_reference_point_rejected() {
        let result = SnapshotBallot::from_labels(["A"], FixedPower::default(), 11, 10);
        assert_eq!(
            result.err(),
            Some(BallotError::InvalidReferencePoint {
                reference: 11,
                current: 10,
            })
        );
    }

    #[test]
    fn test_vote_spends_snapshot_power() {
        let voter = test_address(1);
        let mut ballot = ballot(FixedPower::default().with(voter, 15));

        let event = ballot.vote(voter, 1, U256::from(15u64)).unwrap();
        assert_eq!(event.proposal, 1);
        assert_eq!(ballot.proposal(1).unwrap().vote_count, U256::from(15u64));
        assert_eq!(ballot.remaining_voting_power(&voter), U256::ZERO);

        let result = ballot.vote(voter, 0, U256::ONE);
        assert_eq!(
            result,
            Err(BallotError::InsufficientVotingPower {
                requested: U256::ONE,
                remaining: U256::ZERO,
            })
        );
        assert_eq!(ballot.proposal(0).unwrap().vote_count, U256::ZERO);
    }

    #[test]
    fn test_split_votes_across_proposals() {
        let voter = test_address(1);
        let mut ballot = ballot(FixedPower::default().with(voter, 10));

        ballot.vote(voter, 0, U256::from(4u64)).unwrap();
        ballot.vote(voter, 2, U256::from(3u64)).unwrap();
        ballot.vote(voter, 0, U256::from(3u64)).unwrap();

        assert_eq!(ballot.spent(&voter), U256::from(10u64));
        assert_eq!(ballot.proposal(0).unwrap().vote_count, U256::from(7u64));
        assert_eq!(ballot.proposal(2).unwrap().vote_count, U256::from(3u64));
    }

    #[test]
    fn test_bad_index_leaves_tallies() {
        let voter = test_address(1);
        let mut ballot = ballot(FixedPower::default().with(voter, 10));

        let result = ballot.vote(voter, 3, U256::ONE);
        assert_eq!(result, Err(BallotError::IndexOutOfRange { index: 3, count: 3 }));
        assert_eq!(ballot.spent(&voter), U256::ZERO);
        assert!(ballot.proposal(3).is_err());
    }

    #[test]
    fn test_voter_without_power() {
        let mut ballot = ballot(FixedPower::default());
        let stranger = test_address(9);

        assert!(ballot.vote(stranger, 0, U256::ZERO).is_ok());
        assert!(ballot.spent.is_empty());
        assert!(matches!(
            ballot.vote(stranger, 0, U256::ONE),
            Err(BallotError::InsufficientVotingPower { .. })
        ));
    }

    #[test]
    fn test_zero_vote_records_nothing() {
        let voter = test_address(1);
        let mut ballot = ballot(FixedPower::default().with(voter, 10));

        let event = ballot.vote(voter, 2, U256::ZERO).unwrap();
        assert_eq!(event.amount, U256::ZERO);
        assert!(ballot.spent.is_empty());
        assert_eq!(ballot.proposal(2).unwrap().vote_count, U256::ZERO);

        let result = ballot.vote(voter, 5, U256::ZERO);
        assert!(matches!(result, Err(BallotError::IndexOutOfRange { .. })));
    }

    #[test]
    fn test_from_config() {
        let voter = test_address(1);
        let config = BallotConfig {
            proposals: vec!["Yes".to_string(), "No".to_string()],
            reference_point: 3,
        };

        let mut ballot =
            SnapshotBallot::from_config(&config, FixedPower::default().with(voter, 4), 7).unwrap();
        assert_eq!(ballot.reference_point(), 3);
        assert_eq!(ballot.proposal(1).unwrap().name.as_str(), "No");
        ballot.vote(voter, 1, U256::from(4u64)).unwrap();
        assert_eq!(ballot.winner_name().as_str(), "No");

        let result = SnapshotBallot::from_config(&config, FixedPower::default(), 2);
        assert!(matches!(result, Err(BallotError::InvalidReferencePoint { .. })));
    }

    #[test]
    fn test_construction_seals_owned_ledger() {
        let voter = test_address(1);
        let mut ledger = VotingPowerLedger::new();
        ledger.on_delegation_change(voter, voter, 1).unwrap();
        ledger.on_balance_increase(voter, U256::from(10u64), 2).unwrap();

        let ballot = SnapshotBallot::from_labels(["P0"], ledger, 2, 2).unwrap();
        assert_eq!(ballot.source().sealed_through(), Some(2));
    }

    #[test]
    fn test_winner_with_no_votes_is_first() {
        let ballot = ballot(FixedPower::default());
        assert_eq!(ballot.winning_proposal_index(), 0);
        assert_eq!(ballot.winner_name().as_str(), "P0");
    }

    #[test]
    fn test_tie_goes_to_lowest_index() {
        let a = test_address(1);
        let b = test_address(2);
        let mut ballot = ballot(FixedPower::default().with(a, 20).with(b, 20));

        ballot.vote(a, 2, U256::from(20u64)).unwrap();
        ballot.vote(b, 1, U256::from(20u64)).unwrap();

        assert_eq!(ballot.winning_proposal_index(), 1);
        assert_eq!(ballot.winning_proposal_index(), 1);
        assert_eq!(ballot.winner_name().as_str(), "P1");
    }

    #[test]
    fn test_strictly_greater_wins() {
        let a = test_address(1);
        let b = test_address(2);
        let mut ballot = ballot(FixedPower::default().with(a, 20).with(b, 21));

        ballot.vote(a, 0, U256::from(20u64)).unwrap();
        ballot.vote(b, 2, U256::from(21u64)).unwrap();

        assert_eq!(ballot.winning_proposal_index(), 2);
    }
}
