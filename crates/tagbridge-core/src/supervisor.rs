//! Retry supervision for external resources.
//!
//! The reader and the broker both come and go. Instead of failing, every
//! attempt to acquire one of them goes through a [`ConnectionSupervisor`],
//! which retries transient failures with a bounded backoff and gives up only
//! on failures classified as fatal.
//!
//! All waits race against a [`CancellationToken`] so a shutdown request is
//! honoured immediately, even in the middle of a long backoff.
//!
//! ```
//! use std::time::Duration;
//! use tagbridge_core::{Backoff, Classify, ConnectionSupervisor};
//! use tokio_util::sync::CancellationToken;
//!
//! #[derive(Debug)]
//! struct Refused;
//!
//! impl std::fmt::Display for Refused {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "connection refused")
//!     }
//! }
//!
//! impl Classify for Refused {}
//!
//! # #[tokio::main(flavor = "current_thread", start_paused = true)]
//! # async fn main() {
//! let supervisor = ConnectionSupervisor::new(
//!     Backoff::Fixed(Duration::from_secs(2)),
//!     CancellationToken::new(),
//! );
//!
//! let mut remaining = 2;
//! let value = supervisor
//!     .retry("example", || {
//!         let ready = remaining == 0;
//!         remaining -= 1;
//!         async move { if ready { Ok(42) } else { Err(Refused) } }
//!     })
//!     .await
//!     .unwrap();
//! assert_eq!(value, 42);
//! # }
//! ```

use std::fmt;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::constants::{DEFAULT_RETRY_INITIAL, DEFAULT_RETRY_MAX};

/// Delay policy between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay after every failure.
    Fixed(Duration),

    /// `initial * 2^attempt`, capped at `max`.
    Exponential {
        /// Delay after the first failure.
        initial: Duration,
        /// Upper bound on any delay.
        max: Duration,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Exponential {
            initial: DEFAULT_RETRY_INITIAL,
            max: DEFAULT_RETRY_MAX,
        }
    }
}

impl Backoff {
    /// Delay to wait after the given number of consecutive failures minus one
    /// (`attempt = 0` is the delay after the first failure).
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        match *self {
            Self::Fixed(delay) => delay,
            Self::Exponential { initial, max } => {
                let factor = 2u32.checked_pow(attempt.min(31)).unwrap_or(u32::MAX);
                initial.checked_mul(factor).unwrap_or(max).min(max)
            }
        }
    }

    /// Longest delay this policy can produce.
    #[must_use]
    pub fn max_delay(&self) -> Duration {
        match *self {
            Self::Fixed(delay) => delay,
            Self::Exponential { max, .. } => max,
        }
    }
}

/// How a failure should be handled by the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Worth retrying after a delay.
    Transient,

    /// Retrying cannot help; abort.
    Fatal,
}

/// Classification of errors passed through the supervisor.
///
/// Defaults to [`FailureClass::Transient`]; error types override it for
/// the few variants that must abort.
pub trait Classify {
    /// Class of this failure.
    fn class(&self) -> FailureClass {
        FailureClass::Transient
    }
}

/// Why a supervised operation stopped without succeeding.
#[derive(Debug, thiserror::Error)]
pub enum SupervisorError<E> {
    /// The operation failed with a fatal error.
    #[error("{operation} failed: {source}")]
    Fatal {
        /// Name of the supervised operation.
        operation: String,
        /// The fatal error.
        source: E,
    },

    /// Shutdown was requested before the operation succeeded.
    #[error("{operation} cancelled")]
    Cancelled {
        /// Name of the supervised operation.
        operation: String,
    },
}

impl<E> SupervisorError<E> {
    /// Whether the operation stopped because of cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Retries operations against an external resource.
///
/// Cheap to clone; clones share the cancellation token.
#[derive(Debug, Clone)]
pub struct ConnectionSupervisor {
    backoff: Backoff,
    cancel: CancellationToken,
}

impl ConnectionSupervisor {
    /// Create a supervisor with the given policy and shutdown token.
    pub fn new(backoff: Backoff, cancel: CancellationToken) -> Self {
        Self { backoff, cancel }
    }

    /// The delay policy.
    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    /// The shutdown token.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Whether shutdown has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Wait the backoff delay for `attempt`.
    ///
    /// Returns `false` if shutdown was requested before the delay elapsed.
    pub async fn pause(&self, attempt: u32) -> bool {
        self.sleep(self.backoff.delay(attempt)).await
    }

    /// Interruptible sleep.
    ///
    /// Returns `false` if shutdown was requested before `delay` elapsed.
    pub async fn sleep(&self, delay: Duration) -> bool {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }

    /// Run `attempt` until it succeeds, fails fatally, or shutdown is requested.
    ///
    /// `attempt` may be an async closure borrowing its environment mutably,
    /// so an attempt can reuse state owned by the caller between tries.
    ///
    /// Transient failures are logged at `warn` with the upcoming delay; a
    /// fatal failure is logged at `error` and returned. An attempt in flight
    /// when shutdown is requested is dropped.
    ///
    /// # Errors
    ///
    /// - [`SupervisorError::Fatal`] when `attempt` returns a fatal error
    /// - [`SupervisorError::Cancelled`] when shutdown is requested
    pub async fn retry<T, E, F>(
        &self,
        operation: &str,
        mut attempt: F,
    ) -> Result<T, SupervisorError<E>>
    where
        F: AsyncFnMut() -> Result<T, E>,
        E: Classify + fmt::Display,
    {
        let mut failures: u32 = 0;

        loop {
            let outcome = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                outcome = attempt() => Some(outcome),
            };

            let Some(outcome) = outcome else {
                debug!(operation, "Supervised operation cancelled");
                return Err(SupervisorError::Cancelled {
                    operation: operation.to_string(),
                });
            };

            match outcome {
                Ok(value) => {
                    if failures > 0 {
                        info!(operation, attempts = failures + 1, "Recovered after retrying");
                    }
                    return Ok(value);
                }
                Err(e) if e.class() == FailureClass::Fatal => {
                    error!(operation, error = %e, "Fatal failure, not retrying");
                    return Err(SupervisorError::Fatal {
                        operation: operation.to_string(),
                        source: e,
                    });
                }
                Err(e) => {
                    let delay = self.backoff.delay(failures);
                    failures = failures.saturating_add(1);
                    warn!(
                        operation,
                        error = %e,
                        attempt = failures,
                        retry_in_ms = delay.as_millis() as u64,
                        "Attempt failed, retrying"
                    );

                    if !self.sleep(delay).await {
                        debug!(operation, "Retry wait interrupted by shutdown");
                        return Err(SupervisorError::Cancelled {
                            operation: operation.to_string(),
                        });
                    }
                }
            }
        }
    }
}
