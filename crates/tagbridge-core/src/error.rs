//! Process-level error taxonomy.
//!
//! Component crates have their own error enums; this one is what the bridge
//! reports. Only [`Error::Configuration`] ends the process. Everything else
//! is recovered locally by reconnecting.

use thiserror::Error;

use crate::supervisor::{Classify, FailureClass};
use tagbridge_protocol::ProtocolError;

#[derive(Error, Debug)]
pub enum Error {
    // Reader errors
    #[error("No card reader available: {0}")]
    ReaderUnavailable(String),

    #[error("Card transport fault: {0}")]
    CardTransportFault(String),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    // Broker errors
    #[error("Broker unavailable: {0}")]
    BrokerUnavailable(String),

    #[error("Broker session lost: {0}")]
    BrokerSessionLost(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Shutdown requested")]
    Cancelled,

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error must terminate the process.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

impl Classify for Error {
    fn class(&self) -> FailureClass {
        if self.is_fatal() {
            FailureClass::Fatal
        } else {
            FailureClass::Transient
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tagbridge_protocol::StatusWord;

    #[rstest]
    #[case(Error::ReaderUnavailable("none".into()), false)]
    #[case(Error::CardTransportFault("reset".into()), false)]
    #[case(Error::BrokerUnavailable("refused".into()), false)]
    #[case(Error::BrokerSessionLost("eof".into()), false)]
    #[case(Error::Cancelled, false)]
    #[case(Error::Configuration("MQTT_HOST not set".into()), true)]
    fn test_only_configuration_is_fatal(#[case] error: Error, #[case] fatal: bool) {
        assert_eq!(error.is_fatal(), fatal);
        let expected = if fatal {
            FailureClass::Fatal
        } else {
            FailureClass::Transient
        };
        assert_eq!(error.class(), expected);
    }

    #[test]
    fn test_protocol_conversion() {
        let error: Error = ProtocolError::NonSuccessStatus(StatusWord::new(0x63, 0x00)).into();
        assert!(matches!(error, Error::Protocol(_)));
        assert_eq!(
            error.to_string(),
            "Protocol error: Card returned non-success status word 6300"
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(
            Error::Configuration("MQTT_HOST not set".into()).to_string(),
            "Configuration error: MQTT_HOST not set"
        );
    }
}
