//! Presence deduplication.
//!
//! A card resting on the reader answers every poll, so the raw presence
//! stream repeats the same identifier once per tick. The deduplicator keeps
//! the last reported state and only lets changes through.
//!
//! # Transitions
//!
//! | current | event | next | emitted |
//! |---|---|---|---|
//! | `NoCard` | `TagPresent(id)` | `CardPresent(id)` | `TagArrived(id)` |
//! | `CardPresent(id)` | `TagPresent(id)` | `CardPresent(id)` | - |
//! | `CardPresent(id)` | `TagPresent(id2)` | `CardPresent(id2)` | `TagLeft`, `TagArrived(id2)` |
//! | `CardPresent(id)` | `TagAbsent` / `ReaderFault` | `NoCard` | `TagLeft` |
//! | `NoCard` | `TagAbsent` / `ReaderFault` | `NoCard` | - |
//!
//! A different identifier showing up without an observed removal (a fast
//! card swap between two ticks) is reported as a removal followed by an
//! insertion.

use crate::events::{EdgeEvent, PresenceEvent, PresenceState};

/// Pure transition function.
///
/// # Examples
///
/// ```
/// use tagbridge_core::{EdgeEvent, PresenceEvent, PresenceState, TagIdentifier, step};
///
/// let id = TagIdentifier::new(vec![0x04, 0xA1, 0xB2, 0xC3]).unwrap();
///
/// let (state, edges) = step(PresenceState::NoCard, PresenceEvent::TagPresent(id.clone()));
/// assert_eq!(edges, vec![EdgeEvent::TagArrived(id.clone())]);
///
/// let (state, edges) = step(state, PresenceEvent::TagPresent(id.clone()));
/// assert!(edges.is_empty());
/// assert_eq!(state, PresenceState::CardPresent(id));
/// ```
pub fn step(state: PresenceState, event: PresenceEvent) -> (PresenceState, Vec<EdgeEvent>) {
    match (state, event) {
        (PresenceState::NoCard, PresenceEvent::TagPresent(id)) => (
            PresenceState::CardPresent(id.clone()),
            vec![EdgeEvent::TagArrived(id)],
        ),
        (PresenceState::CardPresent(current), PresenceEvent::TagPresent(id)) if current == id => {
            (PresenceState::CardPresent(current), Vec::new())
        }
        (PresenceState::CardPresent(_), PresenceEvent::TagPresent(id)) => (
            PresenceState::CardPresent(id.clone()),
            vec![EdgeEvent::TagLeft, EdgeEvent::TagArrived(id)],
        ),
        (PresenceState::CardPresent(_), PresenceEvent::TagAbsent | PresenceEvent::ReaderFault) => {
            (PresenceState::NoCard, vec![EdgeEvent::TagLeft])
        }
        (PresenceState::NoCard, PresenceEvent::TagAbsent | PresenceEvent::ReaderFault) => {
            (PresenceState::NoCard, Vec::new())
        }
    }
}

/// Owner of the [`PresenceState`], applying [`step`] in place.
#[derive(Debug, Default)]
pub struct Deduplicator {
    state: PresenceState,
}

impl Deduplicator {
    /// Create a deduplicator with no card reported.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    pub fn state(&self) -> &PresenceState {
        &self.state
    }

    /// Feed one presence event, returning the edges it produces in order.
    pub fn apply(&mut self, event: PresenceEvent) -> Vec<EdgeEvent> {
        let (next, edges) = step(std::mem::take(&mut self.state), event);
        self.state = next;
        edges
    }

    /// Forget the current card without emitting anything.
    ///
    /// Used when the reader is re-acquired: whatever is on the new reader
    /// gets reported as a fresh arrival.
    pub fn reset(&mut self) -> PresenceState {
        std::mem::take(&mut self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tagbridge_protocol::TagIdentifier;

    fn tag(bytes: &[u8]) -> TagIdentifier {
        TagIdentifier::new(bytes).unwrap()
    }

    #[test]
    fn test_arrival_from_no_card() {
        let a = tag(&[0x04, 0xA1, 0xB2, 0xC3]);
        let (state, edges) = step(PresenceState::NoCard, PresenceEvent::TagPresent(a.clone()));
        assert_eq!(state, PresenceState::CardPresent(a.clone()));
        assert_eq!(edges, vec![EdgeEvent::TagArrived(a)]);
    }

    #[test]
    fn test_same_card_is_suppressed() {
        let a = tag(&[0x04, 0xA1, 0xB2, 0xC3]);
        let (state, edges) = step(
            PresenceState::CardPresent(a.clone()),
            PresenceEvent::TagPresent(a.clone()),
        );
        assert_eq!(state, PresenceState::CardPresent(a));
        assert!(edges.is_empty());
    }

    #[test]
    fn test_swap_emits_implicit_removal() {
        let a = tag(&[0x01, 0x02, 0x03, 0x04]);
        let b = tag(&[0x05, 0x06, 0x07, 0x08]);
        let (state, edges) = step(
            PresenceState::CardPresent(a),
            PresenceEvent::TagPresent(b.clone()),
        );
        assert_eq!(state, PresenceState::CardPresent(b.clone()));
        assert_eq!(edges, vec![EdgeEvent::TagLeft, EdgeEvent::TagArrived(b)]);
    }

    #[rstest]
    #[case(PresenceEvent::TagAbsent)]
    #[case(PresenceEvent::ReaderFault)]
    fn test_removal(#[case] event: PresenceEvent) {
        let a = tag(&[0x01, 0x02, 0x03, 0x04]);
        let (state, edges) = step(PresenceState::CardPresent(a), event);
        assert_eq!(state, PresenceState::NoCard);
        assert_eq!(edges, vec![EdgeEvent::TagLeft]);
    }

    #[rstest]
    #[case(PresenceEvent::TagAbsent)]
    #[case(PresenceEvent::ReaderFault)]
    fn test_idle_stays_idle(#[case] event: PresenceEvent) {
        let (state, edges) = step(PresenceState::NoCard, event);
        assert_eq!(state, PresenceState::NoCard);
        assert!(edges.is_empty());
    }

    #[test]
    fn test_deduplicator_sequence() {
        let a = tag(&[0x04, 0xA1, 0xB2, 0xC3]);
        let mut dedup = Deduplicator::new();

        let mut emitted = Vec::new();
        for event in [
            PresenceEvent::TagPresent(a.clone()),
            PresenceEvent::TagPresent(a.clone()),
            PresenceEvent::TagPresent(a.clone()),
            PresenceEvent::TagAbsent,
            PresenceEvent::TagAbsent,
            PresenceEvent::TagPresent(a.clone()),
        ] {
            emitted.extend(dedup.apply(event));
        }

        assert_eq!(
            emitted,
            vec![
                EdgeEvent::TagArrived(a.clone()),
                EdgeEvent::TagLeft,
                EdgeEvent::TagArrived(a.clone()),
            ]
        );
        assert_eq!(dedup.state(), &PresenceState::CardPresent(a));
    }

    #[test]
    fn test_reset_allows_rearrival_without_left() {
        let a = tag(&[0x04, 0xA1, 0xB2, 0xC3]);
        let mut dedup = Deduplicator::new();

        dedup.apply(PresenceEvent::TagPresent(a.clone()));
        let previous = dedup.reset();
        assert_eq!(previous, PresenceState::CardPresent(a.clone()));
        assert_eq!(dedup.state(), &PresenceState::NoCard);

        assert_eq!(
            dedup.apply(PresenceEvent::TagPresent(a.clone())),
            vec![EdgeEvent::TagArrived(a)]
        );
    }
}
