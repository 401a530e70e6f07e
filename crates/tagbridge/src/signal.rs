//! Shutdown signal handling.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Wait for SIGINT or, on Unix, SIGTERM. Returns the signal name.
///
/// # Errors
///
/// Returns an error if a signal handler cannot be registered.
pub async fn shutdown_signal() -> std::io::Result<&'static str> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result.map(|()| "SIGINT"),
            _ = terminate.recv() => Ok("SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.map(|()| "ctrl-c")
    }
}

/// Cancel `cancel` when a shutdown signal arrives.
///
/// If the handlers cannot be installed the error is logged and the token is
/// left alone; the process then only stops when killed.
pub fn listen_for_shutdown(cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        match shutdown_signal().await {
            Ok(signal) => {
                info!(signal, "Shutdown requested");
                cancel.cancel();
            }
            Err(e) => error!(error = %e, "Failed to install signal handlers"),
        }
    })
}
