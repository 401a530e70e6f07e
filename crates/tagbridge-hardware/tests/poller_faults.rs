//! Poller behaviour under injected reader faults.

use std::time::Duration;

use futures::StreamExt;
use rstest::rstest;
use tagbridge_core::{Deduplicator, EdgeEvent, PresenceEvent, TagIdentifier};
use tagbridge_hardware::CardPoller;
use tagbridge_hardware::mock::MockReader;
use tokio::time::Instant;

const UID: [u8; 4] = [0x04, 0xA1, 0xB2, 0xC3];

fn tag() -> TagIdentifier {
    TagIdentifier::new(UID.to_vec()).unwrap()
}

#[rstest]
#[case(2)]
#[case(3)]
#[case(5)]
#[tokio::test(start_paused = true)]
async fn test_failing_every_nth_transmit_keeps_one_event_per_tick(#[case] n: u64) {
    let (driver, handle) = MockReader::new();
    handle.present_card(UID);
    handle.fail_every(n);

    let period = Duration::from_millis(500);
    let mut poller = CardPoller::new(driver, period);
    let start = Instant::now();
    let ticks = 20;

    let mut events = Vec::new();
    for _ in 0..ticks {
        events.push(poller.next_event().await);
    }

    assert_eq!(events.len(), ticks);
    assert_eq!(start.elapsed(), period * (ticks as u32 - 1));

    let faults = events
        .iter()
        .filter(|e| matches!(e, PresenceEvent::ReaderFault))
        .count();
    assert!(faults > 0);
    assert!(
        events
            .iter()
            .all(|e| matches!(e, PresenceEvent::ReaderFault | PresenceEvent::TagPresent(_)))
    );
    assert!(events.contains(&PresenceEvent::TagPresent(tag())));
    assert_eq!(handle.transmit_count(), ticks as u64);
}

#[tokio::test(start_paused = true)]
async fn test_stream_yields_one_event_per_tick() {
    let (driver, handle) = MockReader::new();
    handle.present_card(UID);
    handle.fail_every(4);

    let events: Vec<_> = CardPoller::new(driver, Duration::from_secs(1))
        .into_stream()
        .take(8)
        .collect()
        .await;

    assert_eq!(
        events,
        vec![
            PresenceEvent::TagPresent(tag()),
            PresenceEvent::TagPresent(tag()),
            PresenceEvent::TagPresent(tag()),
            PresenceEvent::ReaderFault,
            PresenceEvent::TagPresent(tag()),
            PresenceEvent::TagPresent(tag()),
            PresenceEvent::TagPresent(tag()),
            PresenceEvent::ReaderFault,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_visit_reported_once_through_dedup() {
    let (driver, handle) = MockReader::new();
    let mut poller = CardPoller::new(driver, Duration::from_secs(1));
    let mut dedup = Deduplicator::new();
    let mut edges = Vec::new();

    handle.present_card(UID);
    for _ in 0..3 {
        edges.extend(dedup.apply(poller.next_event().await));
    }
    handle.remove_card();
    for _ in 0..2 {
        edges.extend(dedup.apply(poller.next_event().await));
    }

    assert_eq!(edges, vec![EdgeEvent::TagArrived(tag()), EdgeEvent::TagLeft]);
}

#[tokio::test(start_paused = true)]
async fn test_fault_mid_visit_splits_it() {
    let (driver, handle) = MockReader::new();
    let mut poller = CardPoller::new(driver, Duration::from_secs(1));
    let mut dedup = Deduplicator::new();
    let mut edges = Vec::new();

    handle.present_card(UID);
    for _ in 0..2 {
        edges.extend(dedup.apply(poller.next_event().await));
    }
    handle.fail_next(1);
    for _ in 0..3 {
        edges.extend(dedup.apply(poller.next_event().await));
    }

    assert_eq!(
        edges,
        vec![
            EdgeEvent::TagArrived(tag()),
            EdgeEvent::TagLeft,
            EdgeEvent::TagArrived(tag()),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_swap_on_open_connection() {
    let other = TagIdentifier::new(vec![0x01, 0x02, 0x03, 0x04]).unwrap();
    let (driver, handle) = MockReader::new();
    let mut poller = CardPoller::new(driver, Duration::from_secs(1));
    let mut dedup = Deduplicator::new();

    handle.present_card(UID);
    assert_eq!(
        dedup.apply(poller.next_event().await),
        vec![EdgeEvent::TagArrived(tag())]
    );

    handle.swap_card(other.as_bytes());
    assert_eq!(
        dedup.apply(poller.next_event().await),
        vec![EdgeEvent::TagLeft, EdgeEvent::TagArrived(other)]
    );
    assert_eq!(handle.connect_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_reader_service_outage() {
    let (driver, handle) = MockReader::new();
    let mut poller = CardPoller::new(driver, Duration::from_secs(1));
    handle.present_card(UID);

    assert_eq!(poller.next_event().await, PresenceEvent::TagPresent(tag()));

    handle.set_service_down(true);
    handle.fail_next(1);
    assert_eq!(poller.next_event().await, PresenceEvent::ReaderFault);
    assert_eq!(poller.next_event().await, PresenceEvent::ReaderFault);

    handle.set_service_down(false);
    assert_eq!(poller.next_event().await, PresenceEvent::TagPresent(tag()));
}
