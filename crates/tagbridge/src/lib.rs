//! Bridge a PC/SC NFC reader to an MQTT broker.
//!
//! Scanned tags are published with Home Assistant discovery and
//! availability, and reader or broker outages are ridden out by
//! reconnecting. The binary is a thin wrapper around [`serve`].
//!
//! - [`config`]: flags and environment into validated [`Settings`]
//! - [`logging`]: tracing subscriber setup
//! - [`signal`]: SIGINT / SIGTERM into a cancellation token
//! - [`bridge`]: the [`Bridge`] orchestrator

pub mod bridge;
pub mod config;
pub mod logging;
pub mod signal;

pub use bridge::{Bridge, serve};
pub use config::{Cli, ConfigError, Settings};
pub use logging::LogFormat;
