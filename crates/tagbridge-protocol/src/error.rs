//! Error types for the card protocol.

use crate::status::StatusWord;

/// Result type alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while interpreting card responses or identifiers.
///
/// None of these mean the reader is broken. A poller treats every variant as
/// "no valid tag this tick"; transport failures live in the hardware crate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// The card answered with a status word other than `90 00`.
    #[error("Card returned non-success status word {0}")]
    NonSuccessStatus(StatusWord),

    /// The response did not even contain a status word.
    #[error("Response too short: {len} byte(s), expected at least 2")]
    Truncated { len: usize },

    /// The card reported success but sent no identifier bytes.
    #[error("Card returned success without identifier bytes")]
    EmptyIdentifier,

    /// A printable identifier could not be decoded.
    #[error("Invalid hex identifier '{input}': {reason}")]
    InvalidHex { input: String, reason: String },
}

impl ProtocolError {
    /// Create a new invalid hex error.
    pub fn invalid_hex(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidHex {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// The status word carried by this error, if any.
    pub fn status_word(&self) -> Option<StatusWord> {
        match self {
            Self::NonSuccessStatus(sw) => Some(*sw),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_success_display() {
        let error = ProtocolError::NonSuccessStatus(StatusWord::new(0x6A, 0x81));
        assert_eq!(
            error.to_string(),
            "Card returned non-success status word 6A81"
        );
        assert_eq!(error.status_word(), Some(StatusWord::new(0x6A, 0x81)));
    }

    #[test]
    fn test_truncated_display() {
        let error = ProtocolError::Truncated { len: 1 };
        assert_eq!(
            error.to_string(),
            "Response too short: 1 byte(s), expected at least 2"
        );
        assert_eq!(error.status_word(), None);
    }

    #[test]
    fn test_invalid_hex_constructor() {
        let error = ProtocolError::invalid_hex("ZZ", "not a hex digit");
        assert!(matches!(error, ProtocolError::InvalidHex { .. }));
        assert_eq!(
            error.to_string(),
            "Invalid hex identifier 'ZZ': not a hex digit"
        );
    }
}
