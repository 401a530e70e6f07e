//! MQTT side of the tag bridge.
//!
//! - [`bus`]: the [`MessageBus`] / [`SessionDriver`] client halves
//! - [`mqtt`]: rumqttc implementation of both halves
//! - [`mock`]: in-memory broker for tests
//! - [`topics`] and [`discovery`]: topic layout and the Home Assistant
//!   discovery descriptor
//! - [`publisher`]: what gets published when
//! - [`session`]: the reconnecting session loop
//!
//! # Example
//!
//! ```no_run
//! use tagbridge_core::{Backoff, ConnectionSupervisor, HexFormat};
//! use tagbridge_mqtt::{
//!     DiscoveryDescriptor, MqttConfig, Publisher, PublisherConfig, Topics, maintain_session,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> tagbridge_mqtt::Result<()> {
//! let topics = Topics::new("homeassistant/nfc/tag", "homeassistant", "kiosk-1", None);
//! let (bus, mut session) = tagbridge_mqtt::client(&MqttConfig {
//!     host: "broker.local".to_string(),
//!     availability_topic: topics.availability.clone(),
//!     ..MqttConfig::default()
//! });
//!
//! let publisher = Publisher::new(
//!     bus,
//!     PublisherConfig {
//!         discovery: DiscoveryDescriptor::new("kiosk-1", "NFC Kiosk Reader", &topics),
//!         topics,
//!         format: HexFormat::Spaced,
//!         publish_tag_scanned: true,
//!     },
//! )?;
//!
//! let supervisor = ConnectionSupervisor::new(Backoff::default(), CancellationToken::new());
//! maintain_session(&mut session, &publisher, &supervisor).await
//! # }
//! ```

pub mod bus;
pub mod discovery;
pub mod error;
pub mod mock;
pub mod mqtt;
pub mod publisher;
pub mod session;
pub mod topics;

pub use bus::{MessageBus, QoS, SessionDriver};
pub use discovery::{DeviceDescriptor, DiscoveryDescriptor};
pub use error::{BusError, Result};
pub use mock::{MockBroker, MockBrokerHandle, MockBus, MockSession, RecordedMessage};
pub use mqtt::{MqttBus, MqttConfig, MqttSession, client};
pub use publisher::{PublishOutcome, Publisher, PublisherConfig, SessionState};
pub use session::maintain_session;
pub use topics::Topics;
