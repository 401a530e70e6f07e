//! Card reader access for the tag bridge.
//!
//! This crate provides the driver abstraction for PC/SC card readers and the
//! [`CardPoller`] that turns a driver into a stream of presence events.
//!
//! # Drivers
//!
//! The [`ReaderDriver`] trait uses native `async fn` methods. Two
//! implementations exist:
//!
//! - [`mock::MockReader`]: a programmable reader for development and tests,
//!   controlled through a [`mock::MockReaderHandle`]
//! - `PcscDriver` (feature `hardware-pcsc`): real readers through the system
//!   PC/SC service; blocking calls run on tokio's blocking pool
//!
//! # Polling
//!
//! ```no_run
//! use std::time::Duration;
//! use futures::StreamExt;
//! use tagbridge_hardware::{CardPoller, mock::MockReader};
//!
//! # async fn run() {
//! let (driver, _handle) = MockReader::new();
//! let events = CardPoller::new(driver, Duration::from_secs(1)).into_stream();
//! futures::pin_mut!(events);
//!
//! while let Some(event) = events.next().await {
//!     println!("{event}");
//! }
//! # }
//! ```
//!
//! # Error Handling
//!
//! Driver operations return [`Result<T>`][error::Result] with a
//! [`HardwareError`]. The poller never surfaces these errors: they become
//! `TagAbsent` or `ReaderFault` events.

pub mod error;
pub mod mock;
#[cfg(feature = "hardware-pcsc")]
pub mod pcsc;
pub mod poller;
pub mod traits;
pub mod types;

// Re-export commonly used types for convenience
pub use error::{HardwareError, Result};
pub use poller::CardPoller;
pub use traits::ReaderDriver;
pub use types::{PollerState, ReaderHandle};

#[cfg(feature = "hardware-pcsc")]
pub use crate::pcsc::{PcscConnection, PcscDriver};
