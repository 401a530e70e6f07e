//! Publishes bridge state to the broker.
//!
//! The [`Publisher`] tracks the broker session and decides what may be sent
//! when. Discovery and `online` are enqueued under the session lock before
//! the state flips to `Connected`, and arrivals are enqueued under the same
//! lock only while `Connected`, so a tag never reaches the broker ahead of
//! the discovery descriptor of its session.

use std::fmt;
use std::sync::{Mutex, MutexGuard};

use serde::Serialize;
use tagbridge_core::constants::{PAYLOAD_OFFLINE, PAYLOAD_ONLINE};
use tagbridge_core::{EdgeEvent, HexFormat, TagIdentifier};
use tracing::{debug, info, warn};

use crate::bus::{MessageBus, QoS};
use crate::discovery::DiscoveryDescriptor;
use crate::error::{BusError, Result};
use crate::topics::Topics;

/// Broker session lifecycle as seen by the publisher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        };
        f.write_str(name)
    }
}

/// What happened to a state publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Enqueued on the bus.
    Published,

    /// Dropped because no session was established.
    Skipped,

    /// Nothing to send for this event.
    Logged,
}

/// Publisher settings.
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    /// Topic layout.
    pub topics: Topics,

    /// Descriptor republished on every session.
    pub discovery: DiscoveryDescriptor,

    /// Printable form of identifiers on the state topic.
    pub format: HexFormat,

    /// Also send Home Assistant tag-scanned events.
    pub publish_tag_scanned: bool,
}

#[derive(Serialize)]
struct TagScanned<'a> {
    tag_id: &'a str,
}

/// Sends discovery, availability and tag state over a [`MessageBus`].
#[derive(Debug)]
pub struct Publisher<B: MessageBus> {
    bus: B,
    topics: Topics,
    discovery: Vec<u8>,
    format: HexFormat,
    publish_tag_scanned: bool,
    session: Mutex<SessionState>,
}

impl<B: MessageBus> Publisher<B> {
    /// Create a publisher.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::Serialization`] if the discovery descriptor
    /// cannot be encoded.
    pub fn new(bus: B, config: PublisherConfig) -> Result<Self> {
        Ok(Self {
            bus,
            discovery: config.discovery.to_json()?,
            topics: config.topics,
            format: config.format,
            publish_tag_scanned: config.publish_tag_scanned,
            session: Mutex::new(SessionState::Disconnected),
        })
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Topic layout in use.
    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    /// Current session state.
    pub fn session_state(&self) -> SessionState {
        *self.lock()
    }

    /// Record that a connection attempt is starting.
    pub fn on_connecting(&self) {
        *self.lock() = SessionState::Connecting;
    }

    /// Announce the bridge on a freshly established session.
    ///
    /// The state becomes `Connected` even if an enqueue fails: the session
    /// is up, and a broken client surfaces through the session driver.
    ///
    /// # Errors
    ///
    /// Returns the first enqueue failure.
    pub fn on_session_established(&self) -> Result<()> {
        let mut session = self.lock();
        let announced = self.publish_discovery();
        *session = SessionState::Connected;
        info!(topic = %self.topics.discovery, "Published discovery, bridge online");
        announced
    }

    /// Enqueue the discovery descriptor, then `online`, both retained.
    ///
    /// Called once per session by [`Publisher::on_session_established`].
    ///
    /// # Errors
    ///
    /// Returns the first enqueue failure.
    pub fn publish_discovery(&self) -> Result<()> {
        self.bus.publish(
            &self.topics.discovery,
            self.discovery.clone(),
            QoS::AtLeastOnce,
            true,
        )?;
        self.bus.publish(
            &self.topics.availability,
            PAYLOAD_ONLINE.as_bytes().to_vec(),
            QoS::AtLeastOnce,
            true,
        )
    }

    /// Record that the session dropped.
    pub fn on_session_lost(&self, reason: &BusError) {
        let mut session = self.lock();
        if *session == SessionState::Connected {
            warn!(error = %reason, "Broker session lost");
        }
        *session = SessionState::Disconnected;
    }

    /// Publish a newly arrived tag.
    ///
    /// # Errors
    ///
    /// Returns an error if a publish cannot be enqueued.
    pub fn publish_arrival(&self, id: &TagIdentifier) -> Result<PublishOutcome> {
        let session = self.lock();
        let state = *session;
        if state != SessionState::Connected {
            warn!(uid = %id, session = %state, "Broker not connected, tag not published");
            return Ok(PublishOutcome::Skipped);
        }

        self.bus.publish(
            &self.topics.state,
            id.format(self.format).into_bytes(),
            QoS::AtLeastOnce,
            false,
        )?;

        if self.publish_tag_scanned {
            let compact = id.to_hex();
            let payload = serde_json::to_vec(&TagScanned { tag_id: &compact })?;
            self.bus
                .publish(&self.topics.tag_scanned, payload, QoS::AtLeastOnce, false)?;
        }

        info!(uid = %id, topic = %self.topics.state, "Tag published");
        Ok(PublishOutcome::Published)
    }

    /// Record that the tag left. Nothing is sent.
    pub fn publish_departure(&self) -> PublishOutcome {
        info!("Tag removed");
        PublishOutcome::Logged
    }

    /// Dispatch an edge event.
    ///
    /// # Errors
    ///
    /// Returns an error if a publish cannot be enqueued.
    pub fn publish_edge(&self, edge: &EdgeEvent) -> Result<PublishOutcome> {
        match edge {
            EdgeEvent::TagArrived(id) => self.publish_arrival(id),
            EdgeEvent::TagLeft => Ok(self.publish_departure()),
        }
    }

    /// Best-effort goodbye: `offline` retained, then disconnect.
    ///
    /// Failures are logged and swallowed.
    pub fn on_shutdown(&self) {
        let mut session = self.lock();

        if *session == SessionState::Connected {
            match self.bus.publish(
                &self.topics.availability,
                PAYLOAD_OFFLINE.as_bytes().to_vec(),
                QoS::AtLeastOnce,
                true,
            ) {
                Ok(()) => info!("Published offline status"),
                Err(e) => warn!(error = %e, "Failed to publish offline status"),
            }
        } else {
            let state = *session;
            debug!(session = %state, "No session, skipping offline status");
        }

        if let Err(e) = self.bus.disconnect() {
            warn!(error = %e, "Failed to request broker disconnect");
        }
        *session = SessionState::Disconnected;
    }
}
