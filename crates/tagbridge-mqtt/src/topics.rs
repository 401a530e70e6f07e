//! Topic layout.

use tagbridge_core::constants::DEFAULT_DISCOVERY_PREFIX;

/// Every topic the bridge publishes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    /// Tag identifiers.
    pub state: String,

    /// Home Assistant discovery descriptor.
    pub discovery: String,

    /// `online` / `offline` availability.
    pub availability: String,

    /// Home Assistant tag-scanned events.
    pub tag_scanned: String,
}

impl Topics {
    /// Derive the topic set for a device.
    ///
    /// `availability` overrides the derived availability topic.
    ///
    /// # Examples
    ///
    /// ```
    /// use tagbridge_mqtt::Topics;
    ///
    /// let topics = Topics::new("homeassistant/nfc/tag", "homeassistant", "kiosk-1", None);
    /// assert_eq!(topics.discovery, "homeassistant/sensor/kiosk-1/config");
    /// assert_eq!(topics.availability, "homeassistant/sensor/kiosk-1/availability");
    /// assert_eq!(topics.tag_scanned, "homeassistant/tag/scanned");
    /// ```
    pub fn new(
        state: impl Into<String>,
        discovery_prefix: &str,
        device_id: &str,
        availability: Option<String>,
    ) -> Self {
        let prefix = discovery_prefix.trim_end_matches('/');
        let prefix = if prefix.is_empty() {
            DEFAULT_DISCOVERY_PREFIX
        } else {
            prefix
        };

        Self {
            state: state.into(),
            discovery: format!("{prefix}/sensor/{device_id}/config"),
            availability: availability
                .unwrap_or_else(|| format!("{prefix}/sensor/{device_id}/availability")),
            tag_scanned: format!("{prefix}/tag/scanned"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("homeassistant", "homeassistant/sensor/kiosk/config")]
    #[case("homeassistant/", "homeassistant/sensor/kiosk/config")]
    #[case("ha", "ha/sensor/kiosk/config")]
    #[case("", "homeassistant/sensor/kiosk/config")]
    fn test_discovery_topic(#[case] prefix: &str, #[case] expected: &str) {
        let topics = Topics::new("state", prefix, "kiosk", None);
        assert_eq!(topics.discovery, expected);
    }

    #[test]
    fn test_availability_override() {
        let topics = Topics::new(
            "state",
            "homeassistant",
            "kiosk",
            Some("kiosk/status".to_string()),
        );
        assert_eq!(topics.availability, "kiosk/status");
        assert_eq!(topics.state, "state");
    }
}
