//! Types shared by reader drivers.

use std::fmt;

/// A reader as reported by the driver's enumeration.
///
/// Only the name is kept; drivers resolve it again on every connect, so a
/// handle stays valid across unplug/replug of the same device.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReaderHandle {
    name: String,
}

impl ReaderHandle {
    /// Create a handle from a reader name.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Reader name (e.g., "ACS ACR122U PICC Interface 00 00").
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for ReaderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl From<&str> for ReaderHandle {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Where a [`CardPoller`](crate::CardPoller) is in its connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollerState {
    /// No reader selected; the next tick enumerates.
    #[default]
    Idle,

    /// Enumeration found no reader; still looking.
    AwaitingReader,

    /// Reader selected, no card connection held.
    Connected,

    /// Card connection held and answering.
    Polling,
}

impl fmt::Display for PollerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::AwaitingReader => "awaiting-reader",
            Self::Connected => "connected",
            Self::Polling => "polling",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_handle_display() {
        let handle = ReaderHandle::new("ACS ACR122U 00 00");
        assert_eq!(handle.to_string(), "ACS ACR122U 00 00");
        assert_eq!(handle.name(), "ACS ACR122U 00 00");
        assert_eq!(handle, ReaderHandle::from("ACS ACR122U 00 00"));
    }

    #[test]
    fn test_poller_state_default() {
        assert_eq!(PollerState::default(), PollerState::Idle);
        assert_eq!(PollerState::AwaitingReader.to_string(), "awaiting-reader");
    }
}
