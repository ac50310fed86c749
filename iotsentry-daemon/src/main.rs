use anyhow::Result;
use clap::Parser;

use iotsentry_daemon::cli::DaemonCli;
use iotsentry_daemon::logging;
use iotsentry_daemon::orchestrator::Orchestrator;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();

    let config = cli.load_config().await?;

    if cli.validate {
        println!("configuration is valid: {}", cli.config.display());
        return Ok(());
    }

    logging::init_tracing(&config.general)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "iotsentry-daemon starting");

    let mut orchestrator = Orchestrator::build_from_config(config).await?;
    let state = orchestrator.run().await?;

    tracing::info!(state = %state, "iotsentry-daemon exiting");
    Ok(())
}
