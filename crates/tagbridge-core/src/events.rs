//! Presence and edge events.

use std::fmt;

use tagbridge_protocol::TagIdentifier;

/// Outcome of one polling tick.
///
/// A poller yields exactly one of these per tick, including ticks where the
/// reader failed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PresenceEvent {
    /// A card answered `GET DATA` with `90 00`.
    TagPresent(TagIdentifier),

    /// No card in the field, or the card did not return a valid identifier.
    TagAbsent,

    /// The reader or its connection failed; the poller reconnects next tick.
    ReaderFault,
}

/// Change in card presence as seen by consumers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EdgeEvent {
    /// A card (newly) entered the field.
    TagArrived(TagIdentifier),

    /// The previously reported card is gone.
    TagLeft,
}

/// What the deduplicator currently believes is on the reader.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum PresenceState {
    /// Nothing reported.
    #[default]
    NoCard,

    /// This card was reported and has not left since.
    CardPresent(TagIdentifier),
}

impl PresenceState {
    /// The identifier of the seated card, if any.
    pub fn current(&self) -> Option<&TagIdentifier> {
        match self {
            Self::NoCard => None,
            Self::CardPresent(id) => Some(id),
        }
    }
}

impl fmt::Display for PresenceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TagPresent(id) => write!(f, "TagPresent({id})"),
            Self::TagAbsent => write!(f, "TagAbsent"),
            Self::ReaderFault => write!(f, "ReaderFault"),
        }
    }
}

impl fmt::Display for EdgeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TagArrived(id) => write!(f, "TagArrived({id})"),
            Self::TagLeft => write!(f, "TagLeft"),
        }
    }
}
