//! Mock PC/SC reader.
//!
//! The reader and its handle share state behind a mutex that is never held
//! across an await. Cards are "seated" and "removed" through the handle;
//! faults can be injected to exercise the poller's recovery paths.

use std::sync::{Arc, Mutex, MutexGuard};

use tagbridge_protocol::{GET_IDENTIFIER_COMMAND, StatusWord};

use crate::{HardwareError, ReaderDriver, ReaderHandle, Result};

/// Name of the reader created by [`MockReader::new`].
pub const DEFAULT_MOCK_READER_NAME: &str = "Mock NFC Reader 00 00";

/// Status word returned for commands the mock does not know.
const INS_NOT_SUPPORTED: StatusWord = StatusWord::new(0x6D, 0x00);

#[derive(Debug)]
struct MockState {
    readers: Vec<String>,
    card: Option<Vec<u8>>,
    status: StatusWord,
    generation: u64,
    fail_next: u32,
    fail_every: Option<u64>,
    service_down: bool,
    transmits: u64,
    connects: u64,
}

impl MockState {
    fn new(readers: Vec<String>) -> Self {
        Self {
            readers,
            card: None,
            status: StatusWord::SUCCESS,
            generation: 0,
            fail_next: 0,
            fail_every: None,
            service_down: false,
            transmits: 0,
            connects: 0,
        }
    }

    fn has_reader(&self, name: &str) -> bool {
        self.readers.iter().any(|r| r == name)
    }
}

fn lock(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    // A panicking test thread must not hide the state from the others.
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Mock card reader driver.
///
/// # Examples
///
/// ```
/// use tagbridge_hardware::ReaderDriver;
/// use tagbridge_hardware::mock::MockReader;
/// use tagbridge_protocol::{GET_IDENTIFIER_COMMAND, read_identifier};
///
/// #[tokio::main]
/// async fn main() -> tagbridge_hardware::Result<()> {
///     let (mut driver, handle) = MockReader::new();
///     handle.present_card([0x04, 0xA1, 0xB2, 0xC3]);
///
///     let readers = driver.list_readers().await?;
///     let mut connection = driver.connect(&readers[0]).await?;
///     let raw = driver.transmit(&mut connection, &GET_IDENTIFIER_COMMAND).await?;
///
///     let id = read_identifier(&raw).unwrap();
///     assert_eq!(id.to_spaced_hex(), "04 A1 B2 C3");
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockReader {
    state: Arc<Mutex<MockState>>,
}

impl MockReader {
    /// Create a mock driver with one attached reader and an empty field.
    ///
    /// Returns a tuple of (MockReader, MockReaderHandle) where the handle
    /// controls cards, readers and injected faults.
    pub fn new() -> (Self, MockReaderHandle) {
        Self::with_readers([DEFAULT_MOCK_READER_NAME])
    }

    /// Create a mock driver with the given readers attached.
    ///
    /// The card field belongs to whichever reader is connected; the mock
    /// models a single field shared by all of them.
    pub fn with_readers<I, S>(readers: I) -> (Self, MockReaderHandle)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let state = Arc::new(Mutex::new(MockState::new(
            readers.into_iter().map(Into::into).collect(),
        )));

        let driver = Self {
            state: Arc::clone(&state),
        };
        let handle = MockReaderHandle { state };

        (driver, handle)
    }
}

/// Connection returned by [`MockReader::connect`].
///
/// Becomes stale as soon as the seated card changes, like a PC/SC card
/// handle after a removal.
#[derive(Debug)]
pub struct MockConnection {
    reader: String,
    generation: u64,
}

impl MockConnection {
    /// Name of the reader this connection belongs to.
    pub fn reader(&self) -> &str {
        &self.reader
    }
}

impl ReaderDriver for MockReader {
    type Connection = MockConnection;

    async fn list_readers(&mut self) -> Result<Vec<ReaderHandle>> {
        let state = lock(&self.state);
        if state.service_down {
            return Err(HardwareError::context("mock reader service stopped"));
        }
        Ok(state
            .readers
            .iter()
            .map(|name| ReaderHandle::new(name.as_str()))
            .collect())
    }

    async fn connect(&mut self, reader: &ReaderHandle) -> Result<MockConnection> {
        let mut state = lock(&self.state);
        if state.service_down {
            return Err(HardwareError::context("mock reader service stopped"));
        }
        if !state.has_reader(reader.name()) {
            return Err(HardwareError::reader_removed(reader.name()));
        }
        if state.card.is_none() {
            return Err(HardwareError::NoCard);
        }

        state.connects += 1;
        Ok(MockConnection {
            reader: reader.name().to_string(),
            generation: state.generation,
        })
    }

    async fn transmit(
        &mut self,
        connection: &mut MockConnection,
        command: &[u8],
    ) -> Result<Vec<u8>> {
        let mut state = lock(&self.state);
        state.transmits += 1;

        if !state.has_reader(&connection.reader) {
            return Err(HardwareError::reader_removed(connection.reader.as_str()));
        }
        if state.fail_next > 0 {
            state.fail_next -= 1;
            return Err(HardwareError::transport("injected transmit failure"));
        }
        if let Some(n) = state.fail_every
            && state.transmits % n == 0
        {
            return Err(HardwareError::transport(format!(
                "injected failure on transmit {}",
                state.transmits
            )));
        }
        if connection.generation != state.generation {
            return Err(HardwareError::NoCard);
        }
        let Some(uid) = state.card.as_ref() else {
            return Err(HardwareError::NoCard);
        };

        if command != GET_IDENTIFIER_COMMAND.as_slice() {
            return Ok(vec![INS_NOT_SUPPORTED.sw1, INS_NOT_SUPPORTED.sw2]);
        }

        let mut response = Vec::with_capacity(uid.len() + 2);
        if state.status.is_success() {
            response.extend_from_slice(uid);
        }
        response.push(state.status.sw1);
        response.push(state.status.sw2);
        Ok(response)
    }

    async fn disconnect(&mut self, _connection: MockConnection) -> Result<()> {
        Ok(())
    }
}

/// Handle for controlling a [`MockReader`].
///
/// # Examples
///
/// ```
/// use tagbridge_hardware::mock::MockReader;
///
/// let (_driver, handle) = MockReader::new();
/// handle.present_card([0x04, 0xA1, 0xB2, 0xC3]);
/// handle.fail_every(3);
/// handle.remove_card();
/// assert_eq!(handle.transmit_count(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct MockReaderHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockReaderHandle {
    /// Seat a card with the given UID, replacing any card in the field.
    pub fn present_card(&self, uid: impl Into<Vec<u8>>) {
        let mut state = lock(&self.state);
        state.card = Some(uid.into());
        state.generation += 1;
    }

    /// Replace the card without invalidating open connections, as a reader
    /// does when it misses the removal of a quickly swapped card.
    pub fn swap_card(&self, uid: impl Into<Vec<u8>>) {
        lock(&self.state).card = Some(uid.into());
    }

    /// Take the card out of the field.
    pub fn remove_card(&self) {
        let mut state = lock(&self.state);
        if state.card.take().is_some() {
            state.generation += 1;
        }
    }

    /// Status word the card answers with. Anything but `90 00` makes the
    /// card return no data.
    pub fn set_status(&self, status: StatusWord) {
        lock(&self.state).status = status;
    }

    /// Attach a reader.
    pub fn plug_reader(&self, name: impl Into<String>) {
        let name = name.into();
        let mut state = lock(&self.state);
        if !state.has_reader(&name) {
            state.readers.push(name);
        }
    }

    /// Detach a reader. Connections to it fail from now on.
    pub fn unplug_reader(&self, name: &str) {
        lock(&self.state).readers.retain(|r| r != name);
    }

    /// Detach every reader.
    pub fn unplug_all(&self) {
        lock(&self.state).readers.clear();
    }

    /// Make enumeration and connects fail as if the reader service stopped.
    pub fn set_service_down(&self, down: bool) {
        lock(&self.state).service_down = down;
    }

    /// Fail the next `count` transmits with a transport error.
    pub fn fail_next(&self, count: u32) {
        lock(&self.state).fail_next = count;
    }

    /// Fail every `n`-th transmit with a transport error. `0` disables.
    pub fn fail_every(&self, n: u64) {
        lock(&self.state).fail_every = (n > 0).then_some(n);
    }

    /// Number of transmits attempted so far.
    pub fn transmit_count(&self) -> u64 {
        lock(&self.state).transmits
    }

    /// Number of successful connects so far.
    pub fn connect_count(&self) -> u64 {
        lock(&self.state).connects
    }

    /// Names of the attached readers.
    pub fn readers(&self) -> Vec<String> {
        lock(&self.state).readers.clone()
    }
}
