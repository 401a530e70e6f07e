//! Error types for reader operations.
//!
//! The poller only needs to tell three situations apart: no card in the
//! field (a normal state), a reader that is gone (re-enumerate), and a
//! transport failure (drop the connection and reconnect).

use tagbridge_core::{Classify, Error as CoreError};

/// Result type alias for reader operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur while talking to a card reader.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// No reader is attached.
    #[error("No card reader connected")]
    NoReader,

    /// The named reader disappeared.
    #[error("Reader disconnected: {reader}")]
    ReaderRemoved { reader: String },

    /// No card in the reader field, or the card left it.
    #[error("No card in reader field")]
    NoCard,

    /// Exchange with the card or reader failed.
    #[error("Card transport error: {message}")]
    Transport { message: String },

    /// The reader service itself failed (e.g. pcscd not running).
    #[error("Reader service error: {message}")]
    Context { message: String },

    /// Operation is not supported by this driver.
    #[error("Unsupported operation: {operation}")]
    Unsupported { operation: String },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HardwareError {
    /// Create a new reader removed error.
    pub fn reader_removed(reader: impl Into<String>) -> Self {
        Self::ReaderRemoved {
            reader: reader.into(),
        }
    }

    /// Create a new transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a new reader service error.
    pub fn context(message: impl Into<String>) -> Self {
        Self::Context {
            message: message.into(),
        }
    }

    /// Create a new unsupported operation error.
    pub fn unsupported(operation: impl Into<String>) -> Self {
        Self::Unsupported {
            operation: operation.into(),
        }
    }

    /// Whether the error only means that no card is being presented.
    pub fn is_no_card(&self) -> bool {
        matches!(self, Self::NoCard)
    }

    /// Whether the reader has to be enumerated again.
    pub fn is_reader_gone(&self) -> bool {
        matches!(
            self,
            Self::NoReader | Self::ReaderRemoved { .. } | Self::Context { .. }
        )
    }
}

impl Classify for HardwareError {}

impl From<HardwareError> for CoreError {
    fn from(err: HardwareError) -> Self {
        if err.is_reader_gone() {
            CoreError::ReaderUnavailable(err.to_string())
        } else {
            CoreError::CardTransportFault(err.to_string())
        }
    }
}
