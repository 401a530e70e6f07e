//! Pull-based card presence polling.
//!
//! A [`CardPoller`] owns a driver and at most one card connection. Every
//! interval tick it sends the get-identifier command and turns whatever
//! happens into exactly one [`PresenceEvent`]:
//!
//! | outcome | event |
//! |---|---|
//! | `90 00` with an identifier | `TagPresent(id)` |
//! | empty field, card left, non-success status | `TagAbsent` |
//! | no reader, transport failure | `ReaderFault` |
//!
//! A fault discards the connection and the selected reader; the next tick
//! starts again from enumeration. The sequence never ends on its own.

use std::time::Duration;

use futures::Stream;
use tagbridge_core::{ConnectionSupervisor, PresenceEvent, SupervisorError};
use tagbridge_protocol::{GET_IDENTIFIER_COMMAND, ProtocolError, read_identifier};
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::{HardwareError, PollerState, ReaderDriver, ReaderHandle, Result};

/// Polls a reader for the identifier of the card in its field.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use tagbridge_core::PresenceEvent;
/// use tagbridge_hardware::{CardPoller, mock::MockReader};
///
/// # #[tokio::main(flavor = "current_thread", start_paused = true)]
/// # async fn main() {
/// let (driver, handle) = MockReader::new();
/// let mut poller = CardPoller::new(driver, Duration::from_secs(1));
///
/// assert_eq!(poller.next_event().await, PresenceEvent::TagAbsent);
///
/// handle.present_card([0x04, 0xA1, 0xB2, 0xC3]);
/// match poller.next_event().await {
///     PresenceEvent::TagPresent(id) => assert_eq!(id.to_spaced_hex(), "04 A1 B2 C3"),
///     other => panic!("unexpected {other}"),
/// }
/// # }
/// ```
pub struct CardPoller<D: ReaderDriver> {
    driver: D,
    period: Duration,
    ticker: Option<Interval>,
    reader: Option<ReaderHandle>,
    connection: Option<D::Connection>,
    known_readers: Vec<ReaderHandle>,
    state: PollerState,
}

impl<D: ReaderDriver> CardPoller<D> {
    /// Create a poller ticking every `period`.
    ///
    /// The first tick completes immediately.
    pub fn new(driver: D, period: Duration) -> Self {
        Self {
            driver,
            period,
            ticker: None,
            reader: None,
            connection: None,
            known_readers: Vec::new(),
            state: PollerState::Idle,
        }
    }

    /// Polling period.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PollerState {
        self.state
    }

    /// The reader currently selected, if any.
    pub fn reader(&self) -> Option<&ReaderHandle> {
        self.reader.as_ref()
    }

    /// The underlying driver.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Wait until a reader is attached and select the first one.
    ///
    /// Enumeration is retried through `supervisor` with its backoff, so an
    /// empty reader list or a stopped reader service is never fatal.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorError::Cancelled`] if shutdown is requested
    /// before a reader shows up.
    pub async fn acquire_reader(
        &mut self,
        supervisor: &ConnectionSupervisor,
    ) -> std::result::Result<ReaderHandle, SupervisorError<HardwareError>> {
        let reader = supervisor
            .retry("reader acquisition", async || self.select_reader().await)
            .await?;
        info!(reader = %reader, "Using card reader");
        Ok(reader)
    }

    /// Wait for the next tick and poll once.
    pub async fn next_event(&mut self) -> PresenceEvent {
        let period = self.period;
        let ticker = self.ticker.get_or_insert_with(|| {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });
        ticker.tick().await;

        self.poll_once().await
    }

    /// Poll the reader once, without waiting for a tick.
    pub async fn poll_once(&mut self) -> PresenceEvent {
        if self.connection.is_none() {
            if let Some(event) = self.open_connection().await {
                return event;
            }
        }

        let Some(connection) = self.connection.as_mut() else {
            return PresenceEvent::ReaderFault;
        };

        let outcome = self
            .driver
            .transmit(connection, &GET_IDENTIFIER_COMMAND)
            .await;

        match outcome {
            Ok(raw) => {
                self.state = PollerState::Polling;
                match read_identifier(&raw) {
                    Ok(id) => {
                        if !id.is_standard_length() {
                            debug!(uid = %id, len = id.len(), "Identifier has unusual length");
                        }
                        PresenceEvent::TagPresent(id)
                    }
                    Err(ProtocolError::NonSuccessStatus(status)) => {
                        debug!(
                            status = %status,
                            meaning = status.description().unwrap_or("unknown"),
                            "Card did not return an identifier"
                        );
                        PresenceEvent::TagAbsent
                    }
                    Err(e) => {
                        warn!(error = %e, "Malformed reader response");
                        PresenceEvent::TagAbsent
                    }
                }
            }
            Err(e) if e.is_no_card() => {
                debug!("Card left the field");
                self.close_connection().await;
                PresenceEvent::TagAbsent
            }
            Err(e) => {
                warn!(error = %e, "Card transport fault, reconnecting");
                self.fault();
                PresenceEvent::ReaderFault
            }
        }
    }

    /// Turn the poller into an endless stream of events, one per tick.
    pub fn into_stream(self) -> impl Stream<Item = PresenceEvent>
    where
        D: 'static,
    {
        futures::stream::unfold(self, |mut poller| async move {
            let event = poller.next_event().await;
            Some((event, poller))
        })
    }

    /// Disconnect from the card, if connected.
    pub async fn release(&mut self) {
        if let Some(connection) = self.connection.take() {
            match self.driver.disconnect(connection).await {
                Ok(()) => debug!("Card connection released"),
                Err(e) => warn!(error = %e, "Failed to release card connection"),
            }
        }
        self.state = if self.reader.is_some() {
            PollerState::Connected
        } else {
            PollerState::Idle
        };
    }

    /// Ensure a card connection. Returns the event for this tick if no
    /// connection could be made.
    async fn open_connection(&mut self) -> Option<PresenceEvent> {
        let reader = match self.reader.clone() {
            Some(reader) => reader,
            None => match self.select_reader().await {
                Ok(reader) => {
                    info!(reader = %reader, "Using card reader");
                    reader
                }
                Err(e) => {
                    debug!(error = %e, "No reader this tick");
                    self.state = PollerState::AwaitingReader;
                    return Some(PresenceEvent::ReaderFault);
                }
            },
        };

        match self.driver.connect(&reader).await {
            Ok(connection) => {
                debug!(reader = %reader, "Connected to card");
                self.connection = Some(connection);
                self.state = PollerState::Connected;
                None
            }
            Err(e) if e.is_no_card() => {
                self.state = PollerState::Connected;
                Some(PresenceEvent::TagAbsent)
            }
            Err(e) => {
                warn!(reader = %reader, error = %e, "Reader connection failed");
                self.fault();
                Some(PresenceEvent::ReaderFault)
            }
        }
    }

    /// Enumerate readers, log changes to the set and select the first.
    async fn select_reader(&mut self) -> Result<ReaderHandle> {
        let readers = self.driver.list_readers().await?;

        if readers != self.known_readers {
            let names: Vec<&str> = readers.iter().map(ReaderHandle::name).collect();
            info!(count = readers.len(), readers = ?names, "Reader set changed");
            self.known_readers = readers;
        }

        let reader = self
            .known_readers
            .first()
            .cloned()
            .ok_or(HardwareError::NoReader)?;
        self.reader = Some(reader.clone());
        self.state = PollerState::Connected;
        Ok(reader)
    }

    async fn close_connection(&mut self) {
        if let Some(connection) = self.connection.take() {
            if let Err(e) = self.driver.disconnect(connection).await {
                debug!(error = %e, "Ignoring disconnect failure after card removal");
            }
        }
        self.state = PollerState::Connected;
    }

    fn fault(&mut self) {
        self.connection = None;
        self.reader = None;
        self.state = PollerState::Idle;
    }
}

impl<D: ReaderDriver + std::fmt::Debug> std::fmt::Debug for CardPoller<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardPoller")
            .field("driver", &self.driver)
            .field("period", &self.period)
            .field("reader", &self.reader)
            .field("connected", &self.connection.is_some())
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{DEFAULT_MOCK_READER_NAME, MockReader};
    use tagbridge_core::{Backoff, TagIdentifier};
    use tagbridge_protocol::StatusWord;
    use tokio::time::Instant;
    use tokio_util::sync::CancellationToken;

    const UID: [u8; 4] = [0x04, 0xA1, 0xB2, 0xC3];

    fn tag() -> TagIdentifier {
        TagIdentifier::new(UID.to_vec()).unwrap()
    }

    fn poller() -> (CardPoller<MockReader>, crate::mock::MockReaderHandle) {
        let (driver, handle) = MockReader::new();
        (CardPoller::new(driver, Duration::from_secs(1)), handle)
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_field_is_absent() {
        let (mut poller, _handle) = poller();
        assert_eq!(poller.next_event().await, PresenceEvent::TagAbsent);
        assert_eq!(poller.state(), PollerState::Connected);
        assert_eq!(
            poller.reader(),
            Some(&ReaderHandle::new(DEFAULT_MOCK_READER_NAME))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_seated_card_is_present_every_tick() {
        let (mut poller, handle) = poller();
        handle.present_card(UID);

        for _ in 0..3 {
            assert_eq!(poller.next_event().await, PresenceEvent::TagPresent(tag()));
        }
        assert_eq!(poller.state(), PollerState::Polling);
        assert_eq!(handle.connect_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_follow_period() {
        let (mut poller, _handle) = poller();
        let start = Instant::now();

        poller.next_event().await;
        poller.next_event().await;
        poller.next_event().await;

        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_removal_then_reinsertion() {
        let (mut poller, handle) = poller();
        handle.present_card(UID);
        assert_eq!(poller.next_event().await, PresenceEvent::TagPresent(tag()));

        handle.remove_card();
        assert_eq!(poller.next_event().await, PresenceEvent::TagAbsent);
        assert_eq!(poller.next_event().await, PresenceEvent::TagAbsent);

        handle.present_card(UID);
        assert_eq!(poller.next_event().await, PresenceEvent::TagPresent(tag()));
        assert_eq!(handle.connect_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_success_status_is_absent() {
        let (mut poller, handle) = poller();
        handle.present_card(UID);
        handle.set_status(StatusWord::new(0x6A, 0x81));

        assert_eq!(poller.next_event().await, PresenceEvent::TagAbsent);

        handle.set_status(StatusWord::SUCCESS);
        assert_eq!(poller.next_event().await, PresenceEvent::TagPresent(tag()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_fault_recovers() {
        let (mut poller, handle) = poller();
        handle.present_card(UID);
        handle.fail_next(1);

        assert_eq!(poller.next_event().await, PresenceEvent::ReaderFault);
        assert_eq!(poller.state(), PollerState::Idle);
        assert!(poller.reader().is_none());

        assert_eq!(poller.next_event().await, PresenceEvent::TagPresent(tag()));
        assert_eq!(handle.connect_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_reader_is_fault() {
        let (driver, handle) = MockReader::with_readers(Vec::<String>::new());
        let mut poller = CardPoller::new(driver, Duration::from_secs(1));

        assert_eq!(poller.next_event().await, PresenceEvent::ReaderFault);
        assert_eq!(poller.state(), PollerState::AwaitingReader);

        handle.plug_reader("Late Reader");
        handle.present_card(UID);
        assert_eq!(poller.next_event().await, PresenceEvent::TagPresent(tag()));
        assert_eq!(poller.reader().map(ReaderHandle::name), Some("Late Reader"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unplugged_reader_is_fault_until_replugged() {
        let (mut poller, handle) = poller();
        handle.present_card(UID);
        assert_eq!(poller.next_event().await, PresenceEvent::TagPresent(tag()));

        handle.unplug_all();
        assert_eq!(poller.next_event().await, PresenceEvent::ReaderFault);
        assert_eq!(poller.next_event().await, PresenceEvent::ReaderFault);

        handle.plug_reader(DEFAULT_MOCK_READER_NAME);
        assert_eq!(poller.next_event().await, PresenceEvent::TagPresent(tag()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_reader_waits_for_reader() {
        let (driver, handle) = MockReader::with_readers(Vec::<String>::new());
        let mut poller = CardPoller::new(driver, Duration::from_secs(1));
        let supervisor = ConnectionSupervisor::new(
            Backoff::Fixed(Duration::from_secs(2)),
            CancellationToken::new(),
        );

        let plug = async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            handle.plug_reader("Reader B");
        };
        let (acquired, ()) = tokio::join!(poller.acquire_reader(&supervisor), plug);

        assert_eq!(acquired.unwrap(), ReaderHandle::new("Reader B"));
        assert_eq!(poller.reader(), Some(&ReaderHandle::new("Reader B")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_reader_picks_first() {
        let (driver, _handle) = MockReader::with_readers(["Reader A", "Reader B"]);
        let mut poller = CardPoller::new(driver, Duration::from_secs(1));
        let supervisor = ConnectionSupervisor::new(Backoff::default(), CancellationToken::new());

        let reader = poller.acquire_reader(&supervisor).await.unwrap();
        assert_eq!(reader.name(), "Reader A");
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_reader_cancelled() {
        let (driver, _handle) = MockReader::with_readers(Vec::<String>::new());
        let mut poller = CardPoller::new(driver, Duration::from_secs(1));
        let cancel = CancellationToken::new();
        let supervisor = ConnectionSupervisor::new(Backoff::default(), cancel.clone());

        let stop = async {
            tokio::time::sleep(Duration::from_secs(3)).await;
            cancel.cancel();
        };
        let (acquired, ()) = tokio::join!(poller.acquire_reader(&supervisor), stop);

        assert!(acquired.unwrap_err().is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_disconnects() {
        let (mut poller, handle) = poller();
        handle.present_card(UID);
        poller.next_event().await;

        poller.release().await;
        assert_eq!(poller.state(), PollerState::Connected);

        // A new connection is opened on the next poll.
        assert_eq!(poller.next_event().await, PresenceEvent::TagPresent(tag()));
        assert_eq!(handle.connect_count(), 2);
    }
}
