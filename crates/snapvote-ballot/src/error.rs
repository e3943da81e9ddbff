use snapvote_types::U256;
use thiserror::Error;

/// Errors that can occur in ballot operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BallotError {
    #[error("Insufficient voting power: requested {requested}, remaining {remaining}")]
    InsufficientVotingPower { requested: U256, remaining: U256 },

    #[error("Proposal index {index} out of range ({count} proposals)")]
    IndexOutOfRange { index: usize, count: usize },

    #[error("Reference point {reference} is after current point {current}")]
    InvalidReferencePoint { reference: u64, current: u64 },

    #[error("Ballot needs at least one proposal")]
    EmptyProposalList,

    #[error("Duplicate proposal: {0}")]
    DuplicateProposal(String),

    #[error("Invalid proposal name: {0}")]
    InvalidProposalName(String),

    #[error("Arithmetic overflow: {0}")]
    Overflow(String),
}

impl From<snapvote_types::TypesError> for BallotError {
    fn from(e: snapvote_types::TypesError) -> Self {
        BallotError::InvalidProposalName(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BallotError::IndexOutOfRange { index: 7, count: 3 };
        assert!(err.to_string().contains('7'));
        assert!(err.to_string().contains('3'));
    }

    #[test]
    fn test_reference_point_error() {
        let err = BallotError::InvalidReferencePoint { reference: 200, current: 100 };
        assert!(err.to_string().contains("200"));
        assert!(err.to_string().contains("100"));
    }
}
