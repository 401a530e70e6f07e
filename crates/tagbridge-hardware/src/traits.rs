//! Reader driver trait.
//!
//! A driver enumerates readers, opens a connection to the card in a
//! reader's field and exchanges raw APDUs over it. Insertion and removal
//! notifications are not part of the contract: the poller asks every tick.
//!
//! Methods use native `async fn` (Rust 1.90 + Edition 2024 RPITIT).

#![allow(async_fn_in_trait)]

use crate::error::Result;
use crate::types::ReaderHandle;

/// Card reader driver abstraction.
///
/// Implemented by [`MockReader`](crate::mock::MockReader) and, with the
/// `hardware-pcsc` feature, by `PcscDriver`.
///
/// # Examples
///
/// ```no_run
/// use tagbridge_hardware::{ReaderDriver, Result};
///
/// async fn first_response<D: ReaderDriver>(driver: &mut D, apdu: &[u8]) -> Result<Vec<u8>> {
///     let readers = driver.list_readers().await?;
///     let reader = readers
///         .first()
///         .ok_or(tagbridge_hardware::HardwareError::NoReader)?;
///     let mut connection = driver.connect(reader).await?;
///     let response = driver.transmit(&mut connection, apdu).await;
///     driver.disconnect(connection).await?;
///     response
/// }
/// ```
pub trait ReaderDriver: Send {
    /// Card connection; owned exclusively by the caller between calls.
    type Connection: Send;

    /// Enumerate attached readers. An empty list is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::Context`](crate::HardwareError::Context)
    /// if the reader service is unavailable.
    async fn list_readers(&mut self) -> Result<Vec<ReaderHandle>>;

    /// Connect to the card currently in `reader`'s field.
    ///
    /// # Errors
    ///
    /// - [`HardwareError::NoCard`](crate::HardwareError::NoCard) when the
    ///   field is empty
    /// - [`HardwareError::ReaderRemoved`](crate::HardwareError::ReaderRemoved)
    ///   when the reader is gone
    async fn connect(&mut self, reader: &ReaderHandle) -> Result<Self::Connection>;

    /// Send `command` and return the raw response, status word included.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::NoCard`](crate::HardwareError::NoCard) if the
    /// card left the field, any other variant on transport failure. The
    /// connection should be discarded after an error.
    async fn transmit(
        &mut self,
        connection: &mut Self::Connection,
        command: &[u8],
    ) -> Result<Vec<u8>>;

    /// Release a connection, leaving the card powered.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver could not release the handle cleanly.
    async fn disconnect(&mut self, connection: Self::Connection) -> Result<()>;
}
