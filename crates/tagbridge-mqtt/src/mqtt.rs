//! rumqttc-backed client.
//!
//! [`MqttBus`] wraps the `AsyncClient` request sender; [`MqttSession`] owns
//! the `EventLoop`, which performs the actual network I/O only while it is
//! polled. Publishes are enqueued with `try_publish` and never block.

use std::time::Duration;

use rumqttc::{
    AsyncClient, ConnectReturnCode, ConnectionError, Event, EventLoop, LastWill, MqttOptions,
    Outgoing, Packet,
};
use tagbridge_core::constants::{DEFAULT_KEEP_ALIVE, DEFAULT_MQTT_PORT, PAYLOAD_OFFLINE};
use tracing::{debug, info, trace, warn};

use crate::bus::{MessageBus, QoS, SessionDriver};
use crate::error::{BusError, Result};

/// Capacity of the client request queue.
const REQUEST_CAPACITY: usize = 64;

impl From<QoS> for rumqttc::QoS {
    fn from(qos: QoS) -> Self {
        match qos {
            QoS::AtMostOnce => rumqttc::QoS::AtMostOnce,
            QoS::AtLeastOnce => rumqttc::QoS::AtLeastOnce,
            QoS::ExactlyOnce => rumqttc::QoS::ExactlyOnce,
        }
    }
}

/// Broker connection settings.
///
/// # Example
///
/// ```
/// use tagbridge_mqtt::MqttConfig;
///
/// let config = MqttConfig {
///     host: "broker.local".to_string(),
///     client_id: "nfc-kiosk-1".to_string(),
///     availability_topic: "homeassistant/sensor/kiosk-1/availability".to_string(),
///     ..MqttConfig::default()
/// };
/// assert_eq!(config.port, 1883);
/// ```
#[derive(Debug, Clone)]
pub struct MqttConfig {
    /// Broker host name or address.
    pub host: String,

    /// Broker TCP port.
    pub port: u16,

    /// MQTT client identifier.
    pub client_id: String,

    /// Optional user name.
    pub username: Option<String>,

    /// Password, only sent together with a user name.
    pub password: Option<String>,

    /// Keep-alive interval.
    pub keep_alive: Duration,

    /// Topic of the `offline` last will.
    pub availability_topic: String,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_MQTT_PORT,
            client_id: "nfc-bridge".to_string(),
            username: None,
            password: None,
            keep_alive: DEFAULT_KEEP_ALIVE,
            availability_topic: String::new(),
        }
    }
}

impl MqttConfig {
    fn options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(&self.client_id, &self.host, self.port);
        options.set_keep_alive(self.keep_alive);
        options.set_clean_session(true);

        if let Some(username) = &self.username {
            options.set_credentials(username, self.password.as_deref().unwrap_or_default());
        } else if self.password.is_some() {
            warn!("MQTT password given without a user name, ignoring it");
        }

        if !self.availability_topic.is_empty() {
            options.set_last_will(LastWill::new(
                &self.availability_topic,
                PAYLOAD_OFFLINE,
                rumqttc::QoS::AtLeastOnce,
                true,
            ));
        }

        options
    }
}

/// Create both halves of an MQTT client. No I/O happens until
/// [`SessionDriver::connect`] is awaited.
pub fn client(config: &MqttConfig) -> (MqttBus, MqttSession) {
    let (client, eventloop) = AsyncClient::new(config.options(), REQUEST_CAPACITY);
    let broker = format!("{}:{}", config.host, config.port);

    (MqttBus { client }, MqttSession { eventloop, broker })
}

/// Sending half of the MQTT client.
#[derive(Debug, Clone)]
pub struct MqttBus {
    client: AsyncClient,
}

impl MessageBus for MqttBus {
    fn publish(&self, topic: &str, payload: Vec<u8>, qos: QoS, retain: bool) -> Result<()> {
        self.client
            .try_publish(topic, qos.into(), retain, payload)
            .map_err(|e| BusError::publish(e.to_string()))
    }

    fn disconnect(&self) -> Result<()> {
        self.client
            .try_disconnect()
            .map_err(|e| BusError::publish(e.to_string()))
    }
}

/// Network half of the MQTT client.
pub struct MqttSession {
    eventloop: EventLoop,
    broker: String,
}

impl std::fmt::Debug for MqttSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MqttSession")
            .field("broker", &self.broker)
            .finish_non_exhaustive()
    }
}

impl SessionDriver for MqttSession {
    async fn connect(&mut self) -> Result<()> {
        debug!(broker = %self.broker, "Connecting to broker");

        loop {
            match self.eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    if ack.code == ConnectReturnCode::Success {
                        info!(broker = %self.broker, "Connected to broker");
                        return Ok(());
                    }
                    return Err(BusError::refused(format!("{:?}", ack.code)));
                }
                Ok(event) => trace!(?event, "Event before acknowledgement"),
                Err(ConnectionError::ConnectionRefused(code)) => {
                    return Err(BusError::refused(format!("{code:?}")));
                }
                Err(e) => return Err(BusError::unavailable(e.to_string())),
            }
        }
    }

    async fn run_until_lost(&mut self) -> BusError {
        loop {
            match self.eventloop.poll().await {
                Ok(event) => trace!(?event, "MQTT event"),
                Err(e) => return BusError::session_lost(e.to_string()),
            }
        }
    }

    async fn drain(&mut self, timeout: Duration) {
        let flushed = tokio::time::timeout(timeout, async {
            loop {
                match self.eventloop.poll().await {
                    Ok(Event::Outgoing(Outgoing::Disconnect)) => return,
                    Ok(event) => trace!(?event, "Draining"),
                    Err(e) => {
                        debug!(error = %e, "Session closed while draining");
                        return;
                    }
                }
            }
        })
        .await;

        match flushed {
            Ok(()) => debug!("Broker session drained"),
            Err(_) => warn!(
                timeout_ms = timeout.as_millis() as u64,
                "Timed out draining broker session"
            ),
        }
    }
}
