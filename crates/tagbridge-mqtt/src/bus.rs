//! Message bus abstraction.
//!
//! The client is split in two halves, mirroring how MQTT client libraries
//! work: a cheap, cloneable sender that only enqueues ([`MessageBus`]) and
//! the event loop that owns the socket ([`SessionDriver`]). Publishing never
//! waits on the network; the session has to be driven for anything to move.

#![allow(async_fn_in_trait)]

use std::fmt;
use std::time::Duration;

use crate::error::{BusError, Result};

/// MQTT delivery guarantee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QoS {
    /// Fire and forget.
    #[default]
    AtMostOnce,

    /// Acknowledged, possibly duplicated.
    AtLeastOnce,

    /// Acknowledged exactly once.
    ExactlyOnce,
}

impl fmt::Display for QoS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self {
            Self::AtMostOnce => 0,
            Self::AtLeastOnce => 1,
            Self::ExactlyOnce => 2,
        };
        write!(f, "{level}")
    }
}

/// Sending half of a broker client.
///
/// Both methods only enqueue and return immediately, so they can be called
/// while holding a synchronous lock.
pub trait MessageBus: Send + Sync {
    /// Enqueue a publish.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::Publish`] if the request queue is closed or full.
    fn publish(&self, topic: &str, payload: Vec<u8>, qos: QoS, retain: bool) -> Result<()>;

    /// Enqueue a clean disconnect.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::Publish`] if the request queue is closed or full.
    fn disconnect(&self) -> Result<()>;
}

/// Network half of a broker client.
pub trait SessionDriver: Send {
    /// Open a session and wait for the broker's acknowledgement.
    ///
    /// # Errors
    ///
    /// - [`BusError::Unavailable`] when the broker cannot be reached
    /// - [`BusError::Refused`] when the broker rejects the connect
    async fn connect(&mut self) -> Result<()>;

    /// Drive the established session until it drops.
    ///
    /// Never returns while the session is healthy; the returned error says
    /// why it ended.
    async fn run_until_lost(&mut self) -> BusError;

    /// Flush queued requests after a disconnect was enqueued, for at most
    /// `timeout`.
    async fn drain(&mut self, timeout: Duration);
}
