use crate::error::TypesError;
use std::fmt;
use std::str::FromStr;

/// Fixed-width proposal label.
///
/// Labels are stored zero-padded in 32 bytes. At most 31 bytes of UTF-8 are
/// accepted so the encoded form always keeps a terminating zero byte.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProposalName {
    bytes: [u8; 32],
    len: u8,
}

impl ProposalName {
    /// Encoded width in bytes.
    pub const WIDTH: usize = 32;
    /// Longest accepted label in bytes.
    pub const MAX_LEN: usize = Self::WIDTH - 1;

    pub fn new(label: &str) -> Result<Self, TypesError> {
        if label.len() > Self::MAX_LEN {
            return Err(TypesError::LabelTooLong {
                max: Self::MAX_LEN,
                actual: label.len(),
            });
        }
        if label.contains('\0') {
            return Err(TypesError::InvalidLabel(label.escape_default().to_string()));
        }

        let mut bytes = [0u8; 32];
        bytes[..label.len()].copy_from_slice(label.as_bytes());
        Ok(Self {
            bytes,
            len: label.len() as u8,
        })
    }

    /// Decode a zero-padded 32-byte label.
    pub fn from_padded(bytes: [u8; 32]) -> Result<Self, TypesError> {
        let len = bytes.iter().position(|&b| b == 0).unwrap_or(Self::WIDTH);
        if bytes[len..].iter().any(|&b| b != 0) {
            return Err(TypesError::InvalidLabel("bytes after terminator".to_string()));
        }
        let label = std::str::from_utf8(&bytes[..len])
            .map_err(|e| TypesError::InvalidLabel(e.to_string()))?;
        Self::new(label)
    }

    pub fn as_str(&self) -> &str {
        // Constructors only admit valid UTF-8.
        std::str::from_utf8(&self.bytes[..self.len as usize]).unwrap_or_default()
    }

    /// Zero-padded encoded form.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }
}

impl fmt::Display for ProposalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for ProposalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProposalName({:?})", self.as_str())
    }
}

impl FromStr for ProposalName {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for ProposalName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}
