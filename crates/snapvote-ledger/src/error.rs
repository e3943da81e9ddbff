use snapvote_types::U256;
use thiserror::Error;

/// Errors that can occur in ledger operations.
///
/// Every failing operation leaves the ledger exactly as it was.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LedgerError {
    /// A caller contract bug: non-monotonic issuance point or a power
    /// subtraction that would go below zero.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Insufficient balance: required {required}, have {available}")]
    InsufficientBalance { required: U256, available: U256 },

    #[error("Arithmetic overflow: {0}")]
    Overflow(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<std::io::Error> for LedgerError {
    fn from(e: std::io::Error) -> Self {
        LedgerError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(e: serde_json::Error) -> Self {
        LedgerError::Storage(e.to_string())
    }
}
