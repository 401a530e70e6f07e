//! Home Assistant MQTT discovery descriptor.
//!
//! Published retained on `<prefix>/sensor/<device id>/config` at the start of
//! every session so Home Assistant creates (or keeps) a sensor entity whose
//! state is the last scanned tag.

use serde::{Deserialize, Serialize};
use tagbridge_core::constants::{DEVICE_MANUFACTURER, DEVICE_MODEL, DISCOVERY_ICON};

use crate::topics::Topics;

/// Sensor discovery payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryDescriptor {
    /// Entity name shown in Home Assistant.
    pub name: String,

    /// Stable entity id; the device id.
    pub unique_id: String,

    /// Topic carrying the tag identifier.
    pub state_topic: String,

    /// Topic carrying `online` / `offline`.
    pub availability_topic: String,

    /// Material Design icon.
    pub icon: String,

    /// Device registry entry.
    pub device: DeviceDescriptor,
}

/// Device block of a [`DiscoveryDescriptor`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    pub identifiers: Vec<String>,
    pub name: String,
    pub manufacturer: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sw_version: Option<String>,
}

impl DiscoveryDescriptor {
    /// Build the descriptor for a device.
    ///
    /// # Examples
    ///
    /// ```
    /// use tagbridge_mqtt::{DiscoveryDescriptor, Topics};
    ///
    /// let topics = Topics::new("homeassistant/nfc/tag", "homeassistant", "kiosk-1", None);
    /// let descriptor = DiscoveryDescriptor::new("kiosk-1", "NFC Kiosk Reader", &topics);
    ///
    /// assert_eq!(descriptor.unique_id, "kiosk-1");
    /// assert_eq!(descriptor.device.identifiers, vec!["kiosk-1".to_string()]);
    /// ```
    pub fn new(device_id: &str, device_name: &str, topics: &Topics) -> Self {
        Self {
            name: device_name.to_string(),
            unique_id: device_id.to_string(),
            state_topic: topics.state.clone(),
            availability_topic: topics.availability.clone(),
            icon: DISCOVERY_ICON.to_string(),
            device: DeviceDescriptor {
                identifiers: vec![device_id.to_string()],
                name: device_name.to_string(),
                manufacturer: DEVICE_MANUFACTURER.to_string(),
                model: DEVICE_MODEL.to_string(),
                sw_version: None,
            },
        }
    }

    /// Attach the bridge version to the device block.
    pub fn with_sw_version(mut self, version: impl Into<String>) -> Self {
        self.device.sw_version = Some(version.into());
        self
    }

    /// Serialize to the JSON payload.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn descriptor() -> DiscoveryDescriptor {
        let topics = Topics::new("homeassistant/nfc/tag", "homeassistant", "kiosk-1", None);
        DiscoveryDescriptor::new("kiosk-1", "NFC Kiosk Reader", &topics)
    }

    #[test]
    fn test_payload_shape() {
        let payload: Value = serde_json::from_slice(&descriptor().to_json().unwrap()).unwrap();

        assert_eq!(
            payload,
            json!({
                "name": "NFC Kiosk Reader",
                "unique_id": "kiosk-1",
                "state_topic": "homeassistant/nfc/tag",
                "availability_topic": "homeassistant/sensor/kiosk-1/availability",
                "icon": "mdi:nfc",
                "device": {
                    "identifiers": ["kiosk-1"],
                    "name": "NFC Kiosk Reader",
                    "manufacturer": "DIY",
                    "model": "USB NFC Reader"
                }
            })
        );
    }

    #[test]
    fn test_sw_version_is_serialized_when_set() {
        let descriptor = descriptor().with_sw_version("0.1.0");
        let payload: Value = serde_json::from_slice(&descriptor.to_json().unwrap()).unwrap();
        assert_eq!(payload["device"]["sw_version"], "0.1.0");
    }

    #[test]
    fn test_deserialize_roundtrip() {
        let descriptor = descriptor();
        let parsed: DiscoveryDescriptor =
            serde_json::from_slice(&descriptor.to_json().unwrap()).unwrap();
        assert_eq!(parsed, descriptor);
    }
}
