//! Shared building blocks of the tag bridge.
//!
//! - [`events`]: presence events produced by a poller and the edge events
//!   derived from them
//! - [`dedup`]: the state machine turning presence into edges
//! - [`supervisor`]: retry with interruptible backoff for external resources
//! - [`error`]: the process-level error taxonomy
//! - [`constants`]: defaults shared by the other crates

pub mod constants;
pub mod dedup;
pub mod error;
pub mod events;
pub mod supervisor;

pub use dedup::{Deduplicator, step};
pub use error::{Error, Result};
pub use events::{EdgeEvent, PresenceEvent, PresenceState};
pub use supervisor::{Backoff, Classify, ConnectionSupervisor, FailureClass, SupervisorError};

pub use tagbridge_protocol::{HexFormat, TagIdentifier};

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
