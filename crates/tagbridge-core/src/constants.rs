//! Defaults shared across the bridge.
//!
//! Every value here can be overridden through configuration; these are what
//! an unconfigured installation uses.

use std::time::Duration;

// ============================================================================
// Card polling
// ============================================================================

/// Time between two identifier reads.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Lower bound accepted for the polling interval.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(50);

// ============================================================================
// Retry / backoff
// ============================================================================

/// First delay after a failed reader or broker attempt.
pub const DEFAULT_RETRY_INITIAL: Duration = Duration::from_secs(2);

/// Ceiling for the exponential backoff.
pub const DEFAULT_RETRY_MAX: Duration = Duration::from_secs(30);

/// How long shutdown waits for the offline message to leave the socket.
pub const SHUTDOWN_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

// ============================================================================
// MQTT
// ============================================================================

/// Standard unencrypted MQTT port.
pub const DEFAULT_MQTT_PORT: u16 = 1883;

/// Keepalive advertised in CONNECT.
pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(60);

/// Topic receiving tag identifiers.
pub const DEFAULT_STATE_TOPIC: &str = "homeassistant/nfc/tag";

/// Home Assistant discovery prefix.
pub const DEFAULT_DISCOVERY_PREFIX: &str = "homeassistant";

/// Device name shown in Home Assistant.
pub const DEFAULT_DEVICE_NAME: &str = "NFC Kiosk Reader";

/// Device id used when the host name cannot be determined.
pub const FALLBACK_DEVICE_ID: &str = "nfc-bridge";

/// Availability payload while the bridge runs.
pub const PAYLOAD_ONLINE: &str = "online";

/// Availability payload after shutdown (also the MQTT last will).
pub const PAYLOAD_OFFLINE: &str = "offline";

/// Icon advertised in the discovery descriptor.
pub const DISCOVERY_ICON: &str = "mdi:nfc";

/// Manufacturer advertised in the discovery descriptor.
pub const DEVICE_MANUFACTURER: &str = "DIY";

/// Model advertised in the discovery descriptor.
pub const DEVICE_MODEL: &str = "USB NFC Reader";
