//! Command line and environment configuration.
//!
//! Every option can be given as a flag or through the environment variable
//! named next to it. [`Cli`] is the raw input; [`Settings`] is the
//! validated form the bridge runs with.

use std::time::Duration;

use clap::builder::BoolishValueParser;
use clap::{Parser, ValueEnum};
use tagbridge_core::Backoff;
use tagbridge_core::HexFormat;
use tagbridge_core::constants::{
    DEFAULT_DEVICE_NAME, DEFAULT_DISCOVERY_PREFIX, DEFAULT_KEEP_ALIVE, DEFAULT_MQTT_PORT,
    DEFAULT_STATE_TOPIC, FALLBACK_DEVICE_ID, MIN_POLL_INTERVAL,
};
use tagbridge_mqtt::{DiscoveryDescriptor, MqttConfig, PublisherConfig, Topics};
use thiserror::Error;

use crate::logging::LogFormat;

/// Shortest non-zero keep-alive the MQTT client accepts.
const MIN_KEEP_ALIVE_SECS: u64 = 5;

/// Configuration errors. Any of these ends the process.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("MQTT_HOST is required (set it or pass --mqtt-host)")]
    MissingHost,

    #[error("Invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

impl From<ConfigError> for tagbridge_core::Error {
    fn from(err: ConfigError) -> Self {
        tagbridge_core::Error::Configuration(err.to_string())
    }
}

/// Printable form of tag identifiers on the state topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TagFormat {
    /// Space separated byte pairs, e.g. `04 A1 B2 C3`
    #[default]
    Spaced,
    /// Contiguous hex, e.g. `04A1B2C3`
    Compact,
}

impl From<TagFormat> for HexFormat {
    fn from(format: TagFormat) -> Self {
        match format {
            TagFormat::Spaced => HexFormat::Spaced,
            TagFormat::Compact => HexFormat::Compact,
        }
    }
}

/// Bridge a PC/SC NFC reader to MQTT with Home Assistant discovery.
#[derive(Debug, Parser)]
#[command(name = "tagbridge", version, about)]
pub struct Cli {
    /// MQTT broker host
    #[arg(long, env = "MQTT_HOST")]
    pub mqtt_host: Option<String>,

    /// MQTT broker port
    #[arg(long, env = "MQTT_PORT", default_value_t = DEFAULT_MQTT_PORT)]
    pub mqtt_port: u16,

    /// MQTT user name
    #[arg(long, env = "MQTT_USERNAME")]
    pub mqtt_username: Option<String>,

    /// MQTT password
    #[arg(long, env = "MQTT_PASSWORD", hide_env_values = true)]
    pub mqtt_password: Option<String>,

    /// MQTT client id (defaults to `nfc-<device id>`)
    #[arg(long, env = "MQTT_CLIENT_ID")]
    pub mqtt_client_id: Option<String>,

    /// MQTT keep-alive in seconds
    #[arg(
        long = "mqtt-keep-alive",
        env = "MQTT_KEEP_ALIVE_SECS",
        default_value_t = DEFAULT_KEEP_ALIVE.as_secs()
    )]
    pub mqtt_keep_alive_secs: u64,

    /// Topic receiving scanned tag identifiers
    #[arg(long, env = "MQTT_TOPIC", default_value = DEFAULT_STATE_TOPIC)]
    pub mqtt_topic: String,

    /// Home Assistant discovery prefix
    #[arg(long, env = "DISCOVERY_PREFIX", default_value = DEFAULT_DISCOVERY_PREFIX)]
    pub discovery_prefix: String,

    /// Availability topic (defaults to `<prefix>/sensor/<device id>/availability`)
    #[arg(long, env = "AVAILABILITY_TOPIC")]
    pub availability_topic: Option<String>,

    /// Device id used in topics and as the entity's unique id (defaults to the host name)
    #[arg(long, env = "DEVICE_ID")]
    pub device_id: Option<String>,

    /// Device name shown in Home Assistant
    #[arg(long, env = "DEVICE_NAME", default_value = DEFAULT_DEVICE_NAME)]
    pub device_name: String,

    /// Identifier format on the state topic
    #[arg(long, env = "TAG_FORMAT", value_enum, default_value_t = TagFormat::Spaced)]
    pub tag_format: TagFormat,

    /// Also publish Home Assistant `tag/scanned` events
    #[arg(
        long,
        env = "PUBLISH_TAG_SCANNED",
        default_value_t = true,
        action = clap::ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    pub publish_tag_scanned: bool,

    /// Reader polling interval in milliseconds
    #[arg(long, env = "POLL_INTERVAL_MS", default_value_t = 1000)]
    pub poll_interval_ms: u64,

    /// First reconnect delay in milliseconds
    #[arg(long, env = "RETRY_INITIAL_MS", default_value_t = 2000)]
    pub retry_initial_ms: u64,

    /// Reconnect delay cap in milliseconds
    #[arg(long, env = "RETRY_MAX_MS", default_value_t = 30000)]
    pub retry_max_ms: u64,

    /// Log level or filter directive (RUST_LOG takes precedence)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

/// Validated bridge settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub mqtt: MqttConfig,
    pub device_id: String,
    pub device_name: String,
    pub topics: Topics,
    pub format: HexFormat,
    pub publish_tag_scanned: bool,
    pub poll_interval: Duration,
    pub backoff: Backoff,
}

impl Settings {
    /// Validate raw options.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the broker host is missing or an option
    /// is out of range.
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let host = cli.mqtt_host.ok_or(ConfigError::MissingHost)?;
        let host = host.trim().to_string();
        if host.is_empty() {
            return Err(ConfigError::MissingHost);
        }
        if cli.mqtt_port == 0 {
            return Err(ConfigError::invalid("MQTT_PORT", "port must be non-zero"));
        }

        let device_id = resolve_device_id(
            cli.device_id,
            std::env::var("HOSTNAME").ok(),
            std::fs::read_to_string("/etc/hostname").ok(),
        );
        validate_topic_segment("DEVICE_ID", &device_id)?;
        validate_topic("MQTT_TOPIC", &cli.mqtt_topic)?;
        if let Some(topic) = &cli.availability_topic {
            validate_topic("AVAILABILITY_TOPIC", topic)?;
        }

        if (1..MIN_KEEP_ALIVE_SECS).contains(&cli.mqtt_keep_alive_secs) {
            return Err(ConfigError::invalid(
                "MQTT_KEEP_ALIVE_SECS",
                format!("must be 0 (disabled) or at least {MIN_KEEP_ALIVE_SECS}"),
            ));
        }

        let poll_interval = Duration::from_millis(cli.poll_interval_ms);
        if poll_interval < MIN_POLL_INTERVAL {
            return Err(ConfigError::invalid(
                "POLL_INTERVAL_MS",
                format!("must be at least {}", MIN_POLL_INTERVAL.as_millis()),
            ));
        }

        if cli.retry_initial_ms == 0 {
            return Err(ConfigError::invalid("RETRY_INITIAL_MS", "must be non-zero"));
        }
        if cli.retry_max_ms < cli.retry_initial_ms {
            return Err(ConfigError::invalid(
                "RETRY_MAX_MS",
                "must not be smaller than RETRY_INITIAL_MS",
            ));
        }
        let backoff = Backoff::Exponential {
            initial: Duration::from_millis(cli.retry_initial_ms),
            max: Duration::from_millis(cli.retry_max_ms),
        };

        let topics = Topics::new(
            cli.mqtt_topic,
            &cli.discovery_prefix,
            &device_id,
            cli.availability_topic,
        );

        let mqtt = MqttConfig {
            host,
            port: cli.mqtt_port,
            client_id: cli
                .mqtt_client_id
                .unwrap_or_else(|| format!("nfc-{device_id}")),
            username: cli.mqtt_username.filter(|u| !u.is_empty()),
            password: cli.mqtt_password,
            keep_alive: Duration::from_secs(cli.mqtt_keep_alive_secs),
            availability_topic: topics.availability.clone(),
        };

        Ok(Self {
            mqtt,
            device_name: cli.device_name,
            device_id,
            topics,
            format: cli.tag_format.into(),
            publish_tag_scanned: cli.publish_tag_scanned,
            poll_interval,
            backoff,
        })
    }

    /// Publisher settings derived from these settings.
    pub fn publisher_config(&self) -> PublisherConfig {
        PublisherConfig {
            discovery: DiscoveryDescriptor::new(&self.device_id, &self.device_name, &self.topics)
                .with_sw_version(tagbridge_core::VERSION),
            topics: self.topics.clone(),
            format: self.format,
            publish_tag_scanned: self.publish_tag_scanned,
        }
    }
}

/// Pick the device id: explicit value, then the host name from the
/// environment, then `/etc/hostname`, then a fixed fallback.
pub fn resolve_device_id(
    explicit: Option<String>,
    hostname_env: Option<String>,
    hostname_file: Option<String>,
) -> String {
    [explicit, hostname_env, hostname_file]
        .into_iter()
        .flatten()
        .map(|candidate| candidate.trim().to_string())
        .find(|candidate| !candidate.is_empty())
        .unwrap_or_else(|| FALLBACK_DEVICE_ID.to_string())
}

fn validate_topic(field: &'static str, topic: &str) -> Result<(), ConfigError> {
    if topic.is_empty() {
        return Err(ConfigError::invalid(field, "topic must not be empty"));
    }
    if topic.contains(['+', '#']) {
        return Err(ConfigError::invalid(
            field,
            format!("wildcards are not allowed in a publish topic: {topic}"),
        ));
    }
    Ok(())
}

fn validate_topic_segment(field: &'static str, segment: &str) -> Result<(), ConfigError> {
    if segment.contains(['/', '+', '#']) {
        return Err(ConfigError::invalid(
            field,
            format!("must be a single topic level: {segment}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["tagbridge", "--device-id", "kiosk-1"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_cli(parse(&["--mqtt-host", "broker.local"])).unwrap();

        assert_eq!(settings.mqtt.host, "broker.local");
        assert_eq!(settings.mqtt.port, 1883);
        assert_eq!(settings.mqtt.client_id, "nfc-kiosk-1");
        assert_eq!(settings.mqtt.keep_alive, Duration::from_secs(60));
        assert_eq!(settings.mqtt.username, None);
        assert_eq!(settings.topics.state, "homeassistant/nfc/tag");
        assert_eq!(settings.topics.discovery, "homeassistant/sensor/kiosk-1/config");
        assert_eq!(
            settings.mqtt.availability_topic,
            "homeassistant/sensor/kiosk-1/availability"
        );
        assert_eq!(settings.device_name, "NFC Kiosk Reader");
        assert_eq!(settings.format, HexFormat::Spaced);
        assert!(settings.publish_tag_scanned);
        assert_eq!(settings.poll_interval, Duration::from_secs(1));
        assert_eq!(
            settings.backoff,
            Backoff::Exponential {
                initial: Duration::from_secs(2),
                max: Duration::from_secs(30),
            }
        );
    }

    #[test]
    fn test_missing_host_is_fatal() {
        let err = Settings::from_cli(parse(&[])).unwrap_err();
        assert_eq!(err, ConfigError::MissingHost);

        let core: tagbridge_core::Error = err.into();
        assert!(core.is_fatal());
    }

    #[test]
    fn test_blank_host_is_missing() {
        let err = Settings::from_cli(parse(&["--mqtt-host", "  "])).unwrap_err();
        assert_eq!(err, ConfigError::MissingHost);
    }

    #[test]
    fn test_overrides() {
        let settings = Settings::from_cli(parse(&[
            "--mqtt-host",
            "10.0.0.2",
            "--mqtt-port",
            "8883",
            "--mqtt-username",
            "bridge",
            "--mqtt-password",
            "secret",
            "--mqtt-client-id",
            "custom",
            "--mqtt-topic",
            "kiosk/tag",
            "--availability-topic",
            "kiosk/status",
            "--tag-format",
            "compact",
            "--publish-tag-scanned",
            "false",
            "--poll-interval-ms",
            "250",
        ]))
        .unwrap();

        assert_eq!(settings.mqtt.port, 8883);
        assert_eq!(settings.mqtt.username.as_deref(), Some("bridge"));
        assert_eq!(settings.mqtt.password.as_deref(), Some("secret"));
        assert_eq!(settings.mqtt.client_id, "custom");
        assert_eq!(settings.topics.state, "kiosk/tag");
        assert_eq!(settings.topics.availability, "kiosk/status");
        assert_eq!(settings.mqtt.availability_topic, "kiosk/status");
        assert_eq!(settings.format, HexFormat::Compact);
        assert!(!settings.publish_tag_scanned);
        assert_eq!(settings.poll_interval, Duration::from_millis(250));
    }

    #[rstest]
    #[case(&["--mqtt-port", "0"], "MQTT_PORT")]
    #[case(&["--mqtt-keep-alive", "2"], "MQTT_KEEP_ALIVE_SECS")]
    #[case(&["--poll-interval-ms", "10"], "POLL_INTERVAL_MS")]
    #[case(&["--retry-initial-ms", "0"], "RETRY_INITIAL_MS")]
    #[case(&["--retry-initial-ms", "5000", "--retry-max-ms", "1000"], "RETRY_MAX_MS")]
    #[case(&["--mqtt-topic", "nfc/#"], "MQTT_TOPIC")]
    #[case(&["--mqtt-topic", ""], "MQTT_TOPIC")]
    #[case(&["--availability-topic", "a/+/b"], "AVAILABILITY_TOPIC")]
    fn test_invalid_options(#[case] args: &[&str], #[case] expected_field: &str) {
        let mut all = vec!["--mqtt-host", "broker.local"];
        all.extend_from_slice(args);

        match Settings::from_cli(parse(&all)) {
            Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, expected_field),
            other => panic!("expected invalid {expected_field}, got {other:?}"),
        }
    }

    #[test]
    fn test_device_id_with_slash_rejected() {
        let cli = Cli::try_parse_from([
            "tagbridge",
            "--mqtt-host",
            "broker.local",
            "--device-id",
            "a/b",
        ])
        .unwrap();
        assert!(matches!(
            Settings::from_cli(cli),
            Err(ConfigError::Invalid {
                field: "DEVICE_ID",
                ..
            })
        ));
    }

    #[rstest]
    #[case(Some("explicit"), Some("env-host"), Some("file-host\n"), "explicit")]
    #[case(None, Some("env-host"), Some("file-host\n"), "env-host")]
    #[case(None, None, Some("file-host\n"), "file-host")]
    #[case(None, Some("  "), None, "nfc-bridge")]
    #[case(None, None, None, "nfc-bridge")]
    fn test_resolve_device_id(
        #[case] explicit: Option<&str>,
        #[case] env: Option<&str>,
        #[case] file: Option<&str>,
        #[case] expected: &str,
    ) {
        let resolved = resolve_device_id(
            explicit.map(str::to_string),
            env.map(str::to_string),
            file.map(str::to_string),
        );
        assert_eq!(resolved, expected);
    }

    #[rstest]
    #[case("yes", true)]
    #[case("1", true)]
    #[case("off", false)]
    #[case("0", false)]
    fn test_boolish_tag_scanned(#[case] value: &str, #[case] expected: bool) {
        let cli = parse(&["--publish-tag-scanned", value]);
        assert_eq!(cli.publish_tag_scanned, expected);
    }

    #[test]
    fn test_publisher_config_carries_version() {
        let settings = Settings::from_cli(parse(&["--mqtt-host", "broker.local"])).unwrap();
        let config = settings.publisher_config();
        assert_eq!(config.discovery.unique_id, "kiosk-1");
        assert_eq!(
            config.discovery.device.sw_version.as_deref(),
            Some(tagbridge_core::VERSION)
        );
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
