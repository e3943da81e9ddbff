use thiserror::Error;

/// Errors that can occur in type operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TypesError {
    #[error("Invalid address format: {0}")]
    InvalidAddressFormat(String),

    #[error("Invalid address length: expected 20, got {0}")]
    InvalidAddressLength(usize),

    #[error("U256 overflow")]
    U256Overflow,

    #[error("Invalid U256 string: {0}")]
    InvalidU256String(String),

    #[error("Too many fractional digits: max {max}, got {actual}")]
    TooManyDecimals { max: u8, actual: usize },

    #[error("Proposal label too long: max {max} bytes, got {actual}")]
    LabelTooLong { max: usize, actual: usize },

    #[error("Invalid proposal label: {0}")]
    InvalidLabel(String),

    #[error("Invalid hex: {0}")]
    InvalidHex(String),
}

impl From<hex::FromHexError> for TypesError {
    fn from(e: hex::FromHexError) -> Self {
        TypesError::InvalidHex(e.to_string())
    }
}
