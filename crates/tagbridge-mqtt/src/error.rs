//! Error types for broker operations.

use tagbridge_core::{Classify, Error as CoreError};
use thiserror::Error;

/// Result type alias for broker operations.
pub type Result<T> = std::result::Result<T, BusError>;

/// Errors raised by the message bus and its session.
#[derive(Debug, Error)]
pub enum BusError {
    /// The broker could not be reached.
    #[error("Broker unavailable: {message}")]
    Unavailable { message: String },

    /// An established session dropped.
    #[error("Broker session lost: {message}")]
    SessionLost { message: String },

    /// The broker answered the connect with a non-success code.
    #[error("Broker refused connection: {message}")]
    Refused { message: String },

    /// A publish could not be handed to the client.
    #[error("Publish failed: {message}")]
    Publish { message: String },

    /// No session is established.
    #[error("Not connected to broker")]
    NotConnected,

    /// A payload could not be encoded.
    #[error("Payload encoding failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BusError {
    /// Create a new broker unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Create a new session lost error.
    pub fn session_lost(message: impl Into<String>) -> Self {
        Self::SessionLost {
            message: message.into(),
        }
    }

    /// Create a new connection refused error.
    pub fn refused(message: impl Into<String>) -> Self {
        Self::Refused {
            message: message.into(),
        }
    }

    /// Create a new publish error.
    pub fn publish(message: impl Into<String>) -> Self {
        Self::Publish {
            message: message.into(),
        }
    }
}

// A refused connect is retried like an unreachable broker: credentials or
// ACLs may be fixed on the broker side while the bridge keeps running.
impl Classify for BusError {}

impl From<BusError> for CoreError {
    fn from(err: BusError) -> Self {
        match err {
            BusError::Unavailable { .. } | BusError::Refused { .. } => {
                CoreError::BrokerUnavailable(err.to_string())
            }
            other => CoreError::BrokerSessionLost(other.to_string()),
        }
    }
}
