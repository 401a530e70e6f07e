//! The bridge orchestrator.
//!
//! Two loops share one task:
//!
//! ```text
//! broker loop:  connect (retry) ─> announce ─> run until lost ─┐
//!                  ^───────────────── backoff ─────────────────┘
//!
//! card loop:    acquire reader ─> tick ─> poll ─> dedup ─> publish ─┐
//!                                  ^─────────────────────────────────┘
//! ```
//!
//! The broker loop only touches the session; the card loop only touches
//! the poller. They meet in the [`Publisher`], whose session lock orders
//! discovery before any tag state. On cancellation both loops stop, the
//! bridge says `offline`, drains the session and releases the card.

use std::time::Duration;

use tagbridge_core::constants::SHUTDOWN_DRAIN_TIMEOUT;
use tagbridge_core::{Backoff, ConnectionSupervisor, Deduplicator, Error, Result};
use tagbridge_hardware::{CardPoller, ReaderDriver};
use tagbridge_mqtt::{
    BusError, MessageBus, PublishOutcome, Publisher, SessionDriver, maintain_session,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::config::Settings;

/// Reader, broker session and publisher wired together.
pub struct Bridge<D, S, B>
where
    D: ReaderDriver,
    S: SessionDriver,
    B: MessageBus,
{
    poller: CardPoller<D>,
    session: S,
    publisher: Publisher<B>,
    backoff: Backoff,
    drain_timeout: Duration,
}

impl<D, S, B> Bridge<D, S, B>
where
    D: ReaderDriver,
    S: SessionDriver,
    B: MessageBus,
{
    /// Assemble a bridge.
    pub fn new(
        poller: CardPoller<D>,
        session: S,
        publisher: Publisher<B>,
        backoff: Backoff,
    ) -> Self {
        Self {
            poller,
            session,
            publisher,
            backoff,
            drain_timeout: SHUTDOWN_DRAIN_TIMEOUT,
        }
    }

    /// Bound on the final session drain.
    pub fn with_drain_timeout(mut self, drain_timeout: Duration) -> Self {
        self.drain_timeout = drain_timeout;
        self
    }

    /// The publisher.
    pub fn publisher(&self) -> &Publisher<B> {
        &self.publisher
    }

    /// Run until `cancel` fires.
    ///
    /// Reader and broker outages are retried indefinitely and never end
    /// the run.
    ///
    /// # Errors
    ///
    /// Returns an error only if the broker connection fails in a way
    /// classified as fatal; the card loop is stopped as well.
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<()> {
        let supervisor = ConnectionSupervisor::new(self.backoff, cancel);
        info!(
            poll_interval_ms = self.poller.period().as_millis() as u64,
            "Bridge starting"
        );

        let Self {
            poller,
            session,
            publisher,
            drain_timeout,
            ..
        } = self;
        let publisher = &*publisher;

        let (broker, ()) = tokio::join!(
            Self::broker_loop(session, publisher, &supervisor),
            Self::card_loop(poller, publisher, &supervisor),
        );

        publisher.on_shutdown();
        session.drain(*drain_timeout).await;
        poller.release().await;
        info!("Bridge stopped");

        broker.map_err(Error::from)
    }

    async fn broker_loop(
        session: &mut S,
        publisher: &Publisher<B>,
        supervisor: &ConnectionSupervisor,
    ) -> std::result::Result<(), BusError> {
        let outcome = maintain_session(session, publisher, supervisor).await;
        if let Err(e) = &outcome {
            error!(error = %e, "Broker loop failed, stopping bridge");
            supervisor.cancellation().cancel();
        }
        outcome
    }

    async fn card_loop(
        poller: &mut CardPoller<D>,
        publisher: &Publisher<B>,
        supervisor: &ConnectionSupervisor,
    ) {
        if let Err(e) = poller.acquire_reader(supervisor).await {
            debug!(error = %e, "Card loop stopping before a reader was found");
            return;
        }

        let mut dedup = Deduplicator::new();

        loop {
            let event = tokio::select! {
                biased;
                _ = supervisor.cancellation().cancelled() => break,
                event = poller.next_event() => event,
            };
            trace!(%event, "Presence event");

            for edge in dedup.apply(event) {
                match publisher.publish_edge(&edge) {
                    // Forget the unpublished card so the next tick with a
                    // session reports it again.
                    Ok(PublishOutcome::Skipped) => {
                        dedup.reset();
                    }
                    Ok(_) => {}
                    Err(e) => warn!(error = %e, %edge, "Failed to publish edge event"),
                }
            }
        }

        debug!("Card loop stopped");
    }
}

/// Build the bridge from settings and run it until `cancel` fires.
///
/// # Errors
///
/// Returns an error if the publisher cannot be built or the bridge fails
/// fatally.
pub async fn serve<D: ReaderDriver>(
    settings: &Settings,
    driver: D,
    cancel: CancellationToken,
) -> Result<()> {
    info!(
        broker = %format!("{}:{}", settings.mqtt.host, settings.mqtt.port),
        client_id = %settings.mqtt.client_id,
        device_id = %settings.device_id,
        state_topic = %settings.topics.state,
        "Starting tag bridge"
    );

    let (bus, session) = tagbridge_mqtt::client(&settings.mqtt);
    let publisher = Publisher::new(bus, settings.publisher_config())?;
    let poller = CardPoller::new(driver, settings.poll_interval);

    Bridge::new(poller, session, publisher, settings.backoff)
        .run(cancel)
        .await
}
