//! In-memory broker for testing and development.
//!
//! [`MockBroker::new`] returns the two client halves plus a handle that
//! plays the broker: it can refuse connections, drop the session and
//! inspect everything that was published. Publishes enqueued while no
//! session is up are delivered when the next one starts, like a real
//! client's request queue.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::Notify;
use tracing::debug;

use crate::bus::{MessageBus, QoS, SessionDriver};
use crate::error::{BusError, Result};

/// A message as the broker received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub qos: QoS,
    pub retain: bool,

    /// Session number (1-based) the message was delivered on.
    pub session: u64,

    /// Published by the broker on the client's behalf (last will).
    pub from_will: bool,
}

impl RecordedMessage {
    /// Payload as UTF-8, lossy.
    pub fn payload_str(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

#[derive(Debug)]
struct Pending {
    topic: String,
    payload: Vec<u8>,
    qos: QoS,
    retain: bool,
}

#[derive(Debug, Default)]
struct BrokerState {
    reachable: bool,
    refuse: Option<String>,
    connected: bool,
    closing: bool,
    sessions: u64,
    connect_attempts: u64,
    will: Option<(String, Vec<u8>)>,
    queued: Vec<Pending>,
    messages: Vec<RecordedMessage>,
    retained: HashMap<String, Vec<u8>>,
}

impl BrokerState {
    fn deliver(&mut self, pending: Pending, from_will: bool) {
        if pending.retain {
            self.retained
                .insert(pending.topic.clone(), pending.payload.clone());
        }
        self.messages.push(RecordedMessage {
            topic: pending.topic,
            payload: pending.payload,
            qos: pending.qos,
            retain: pending.retain,
            session: self.sessions,
            from_will,
        });
    }
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<BrokerState>,
    changed: Notify,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, BrokerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Factory for a mock broker connection.
///
/// # Examples
///
/// ```
/// use tagbridge_mqtt::{MessageBus, QoS, SessionDriver, mock::MockBroker};
///
/// #[tokio::main]
/// async fn main() -> tagbridge_mqtt::Result<()> {
///     let (bus, mut session, handle) = MockBroker::new();
///
///     session.connect().await?;
///     bus.publish("nfc/tag", b"04 A1 B2 C3".to_vec(), QoS::AtLeastOnce, false)?;
///
///     assert_eq!(handle.messages_on("nfc/tag")[0].payload_str(), "04 A1 B2 C3");
///     Ok(())
/// }
/// ```
pub struct MockBroker;

impl MockBroker {
    /// Create a reachable broker.
    pub fn new() -> (MockBus, MockSession, MockBrokerHandle) {
        let shared = Arc::new(Shared::default());
        shared.lock().reachable = true;

        (
            MockBus {
                shared: Arc::clone(&shared),
            },
            MockSession {
                shared: Arc::clone(&shared),
            },
            MockBrokerHandle { shared },
        )
    }

    /// Create a broker that refuses TCP connections until
    /// [`MockBrokerHandle::set_reachable`] is called.
    pub fn unreachable() -> (MockBus, MockSession, MockBrokerHandle) {
        let parts = Self::new();
        parts.2.set_reachable(false);
        parts
    }
}

/// Sending half of the mock client.
#[derive(Debug, Clone)]
pub struct MockBus {
    shared: Arc<Shared>,
}

impl MessageBus for MockBus {
    fn publish(&self, topic: &str, payload: Vec<u8>, qos: QoS, retain: bool) -> Result<()> {
        let mut state = self.shared.lock();
        if state.closing {
            return Err(BusError::publish("client disconnected"));
        }

        let pending = Pending {
            topic: topic.to_string(),
            payload,
            qos,
            retain,
        };
        if state.connected {
            state.deliver(pending, false);
        } else {
            state.queued.push(pending);
        }
        Ok(())
    }

    fn disconnect(&self) -> Result<()> {
        let mut state = self.shared.lock();
        state.closing = true;
        state.connected = false;
        drop(state);

        self.shared.changed.notify_waiters();
        Ok(())
    }
}

/// Network half of the mock client.
#[derive(Debug)]
pub struct MockSession {
    shared: Arc<Shared>,
}

impl MockSession {
    /// Register a last will the broker publishes if the session drops
    /// uncleanly.
    pub fn set_last_will(&mut self, topic: impl Into<String>, payload: impl Into<Vec<u8>>) {
        self.shared.lock().will = Some((topic.into(), payload.into()));
    }
}

impl SessionDriver for MockSession {
    async fn connect(&mut self) -> Result<()> {
        let mut state = self.shared.lock();
        state.connect_attempts += 1;

        if state.closing {
            return Err(BusError::unavailable("client disconnected"));
        }
        if !state.reachable {
            return Err(BusError::unavailable("connection refused"));
        }
        if let Some(reason) = state.refuse.clone() {
            return Err(BusError::refused(reason));
        }

        state.sessions += 1;
        state.connected = true;
        let queued = std::mem::take(&mut state.queued);
        for pending in queued {
            state.deliver(pending, false);
        }
        debug!(session = state.sessions, "Mock broker session established");
        Ok(())
    }

    async fn run_until_lost(&mut self) -> BusError {
        loop {
            let changed = self.shared.changed.notified();
            {
                let state = self.shared.lock();
                if state.closing {
                    return BusError::session_lost("client disconnected");
                }
                if !state.connected {
                    return BusError::session_lost("connection reset by broker");
                }
            }
            changed.await;
        }
    }

    async fn drain(&mut self, _timeout: Duration) {
        self.shared.lock().connected = false;
    }
}

/// Broker-side control over a [`MockBroker`].
#[derive(Debug, Clone)]
pub struct MockBrokerHandle {
    shared: Arc<Shared>,
}

impl MockBrokerHandle {
    /// Accept or refuse TCP connections. Refusing drops a live session.
    pub fn set_reachable(&self, reachable: bool) {
        let mut state = self.shared.lock();
        state.reachable = reachable;
        if !reachable {
            Self::drop_locked(&mut state);
        }
        drop(state);
        self.shared.changed.notify_waiters();
    }

    /// Reject connects with the given reason, or accept them again.
    pub fn refuse_connections(&self, reason: Option<&str>) {
        self.shared.lock().refuse = reason.map(str::to_string);
    }

    /// Drop the live session uncleanly; the last will is published.
    pub fn drop_session(&self) {
        Self::drop_locked(&mut self.shared.lock());
        self.shared.changed.notify_waiters();
    }

    fn drop_locked(state: &mut BrokerState) {
        if !state.connected {
            return;
        }
        state.connected = false;
        if let Some((topic, payload)) = state.will.clone() {
            state.deliver(
                Pending {
                    topic,
                    payload,
                    qos: QoS::AtLeastOnce,
                    retain: true,
                },
                true,
            );
        }
    }

    /// Whether a session is up.
    pub fn is_connected(&self) -> bool {
        self.shared.lock().connected
    }

    /// Sessions established so far.
    pub fn session_count(&self) -> u64 {
        self.shared.lock().sessions
    }

    /// Connect attempts so far, successful or not.
    pub fn connect_attempts(&self) -> u64 {
        self.shared.lock().connect_attempts
    }

    /// Every message delivered, in order.
    pub fn messages(&self) -> Vec<RecordedMessage> {
        self.shared.lock().messages.clone()
    }

    /// Messages delivered on `topic`, in order.
    pub fn messages_on(&self, topic: &str) -> Vec<RecordedMessage> {
        self.shared
            .lock()
            .messages
            .iter()
            .filter(|m| m.topic == topic)
            .cloned()
            .collect()
    }

    /// Current retained payload of `topic`.
    pub fn retained(&self, topic: &str) -> Option<Vec<u8>> {
        self.shared.lock().retained.get(topic).cloned()
    }
}
