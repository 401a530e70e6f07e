use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::error;

use tagbridge::{Cli, Settings, logging, signal};
use tagbridge_hardware::PcscDriver;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(&cli.log_level, cli.log_format);

    let settings = match Settings::from_cli(cli) {
        Ok(settings) => settings,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    match run(settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{e:#}"), "Bridge failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(settings: Settings) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    signal::listen_for_shutdown(cancel.clone());

    tagbridge::serve(&settings, PcscDriver::new(), cancel)
        .await
        .context("tag bridge stopped with an error")
}
