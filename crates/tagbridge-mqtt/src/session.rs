//! Broker session supervision.

use tagbridge_core::{ConnectionSupervisor, SupervisorError};
use tracing::{debug, info, warn};

use crate::bus::{MessageBus, SessionDriver};
use crate::error::Result;
use crate::publisher::Publisher;

/// Keep a broker session up until shutdown is requested.
///
/// Each round connects through `supervisor` (retrying with backoff while
/// the broker is unreachable), announces the bridge through `publisher`
/// and drives the session until it drops. After a drop the first backoff
/// delay is waited before reconnecting.
///
/// Returns `Ok(())` on cancellation, with the session left open so the
/// caller can still say goodbye and drain it.
///
/// # Errors
///
/// Returns the connect error if the supervisor classifies it as fatal.
pub async fn maintain_session<S, B>(
    session: &mut S,
    publisher: &Publisher<B>,
    supervisor: &ConnectionSupervisor,
) -> Result<()>
where
    S: SessionDriver,
    B: MessageBus,
{
    loop {
        publisher.on_connecting();

        let connected = supervisor
            .retry("broker connection", async || session.connect().await)
            .await;
        match connected {
            Ok(()) => {}
            Err(SupervisorError::Cancelled { .. }) => return Ok(()),
            Err(SupervisorError::Fatal { source, .. }) => return Err(source),
        }

        if let Err(e) = publisher.on_session_established() {
            warn!(error = %e, "Failed to enqueue discovery");
        }

        let lost = tokio::select! {
            biased;
            _ = supervisor.cancellation().cancelled() => None,
            lost = session.run_until_lost() => Some(lost),
        };

        let Some(reason) = lost else {
            debug!("Broker session loop stopping");
            return Ok(());
        };
        publisher.on_session_lost(&reason);

        if !supervisor.pause(0).await {
            return Ok(());
        }
        info!("Reconnecting to broker");
    }
}

