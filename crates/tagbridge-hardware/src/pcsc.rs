//! PC/SC reader driver (feature `hardware-pcsc`).
//!
//! Wraps the `pcsc` crate. Every PC/SC call blocks until the reader
//! answers, so each one runs on tokio's blocking pool and the card handle
//! is moved in and out of the closure.

use std::ffi::CString;

use pcsc::{Card, Context, Disposition, MAX_BUFFER_SIZE, Protocols, Scope, ShareMode};
use tracing::{debug, info};

use crate::{HardwareError, ReaderDriver, ReaderHandle, Result};

impl From<pcsc::Error> for HardwareError {
    fn from(err: pcsc::Error) -> Self {
        match err {
            pcsc::Error::NoSmartcard | pcsc::Error::RemovedCard => HardwareError::NoCard,
            pcsc::Error::NoReadersAvailable => HardwareError::NoReader,
            pcsc::Error::ReaderUnavailable | pcsc::Error::UnknownReader => {
                HardwareError::reader_removed(err.to_string())
            }
            pcsc::Error::NoService | pcsc::Error::ServiceStopped | pcsc::Error::InvalidHandle => {
                HardwareError::context(err.to_string())
            }
            other => HardwareError::transport(other.to_string()),
        }
    }
}

async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| HardwareError::transport(format!("blocking PC/SC call failed: {e}")))?
}

/// PC/SC driver backed by the system smart card service.
///
/// The context is established lazily and re-established after the service
/// restarts.
#[derive(Default)]
pub struct PcscDriver {
    context: Option<Context>,
}

impl PcscDriver {
    /// Create a driver; no PC/SC call is made until the first enumeration.
    pub fn new() -> Self {
        Self::default()
    }

    async fn context(&mut self) -> Result<Context> {
        if let Some(context) = &self.context {
            return Ok(context.clone());
        }

        let context = blocking(|| Ok(Context::establish(Scope::User)?)).await?;
        info!("PC/SC context established");
        self.context = Some(context.clone());
        Ok(context)
    }

    fn forget_context_on(&mut self, err: &HardwareError) {
        if matches!(err, HardwareError::Context { .. }) {
            debug!(error = %err, "Dropping PC/SC context");
            self.context = None;
        }
    }
}

impl std::fmt::Debug for PcscDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PcscDriver")
            .field("established", &self.context.is_some())
            .finish()
    }
}

/// Card handle opened by [`PcscDriver`].
#[derive(Debug)]
pub struct PcscConnection {
    reader: String,
    card: Option<Card>,
}

impl PcscConnection {
    /// Name of the reader this connection belongs to.
    pub fn reader(&self) -> &str {
        &self.reader
    }
}

impl ReaderDriver for PcscDriver {
    type Connection = PcscConnection;

    async fn list_readers(&mut self) -> Result<Vec<ReaderHandle>> {
        let context = self.context().await?;
        let outcome = blocking(move || match context.list_readers_owned() {
            Ok(names) => Ok(names),
            Err(pcsc::Error::NoReadersAvailable) => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        })
        .await;

        match outcome {
            Ok(names) => Ok(names
                .iter()
                .map(|name| ReaderHandle::new(name.to_string_lossy()))
                .collect()),
            Err(e) => {
                self.forget_context_on(&e);
                Err(e)
            }
        }
    }

    async fn connect(&mut self, reader: &ReaderHandle) -> Result<PcscConnection> {
        let context = self.context().await?;
        let name = CString::new(reader.name())
            .map_err(|_| HardwareError::reader_removed(reader.name()))?;

        let outcome = blocking(move || {
            Ok(context.connect(&name, ShareMode::Shared, Protocols::ANY)?)
        })
        .await;

        match outcome {
            Ok(card) => Ok(PcscConnection {
                reader: reader.name().to_string(),
                card: Some(card),
            }),
            Err(e) => {
                self.forget_context_on(&e);
                Err(e)
            }
        }
    }

    async fn transmit(
        &mut self,
        connection: &mut PcscConnection,
        command: &[u8],
    ) -> Result<Vec<u8>> {
        let card = connection
            .card
            .take()
            .ok_or_else(|| HardwareError::transport("card handle already released"))?;
        let command = command.to_vec();

        let (card, response) = tokio::task::spawn_blocking(move || {
            let mut buffer = [0u8; MAX_BUFFER_SIZE];
            let response = card
                .transmit(&command, &mut buffer)
                .map(<[u8]>::to_vec)
                .map_err(HardwareError::from);
            (card, response)
        })
        .await
        .map_err(|e| HardwareError::transport(format!("blocking PC/SC call failed: {e}")))?;

        connection.card = Some(card);
        response
    }

    async fn disconnect(&mut self, connection: PcscConnection) -> Result<()> {
        let Some(card) = connection.card else {
            return Ok(());
        };

        blocking(move || {
            card.disconnect(Disposition::LeaveCard)
                .map_err(|(_card, e)| HardwareError::from(e))
        })
        .await
    }
}
