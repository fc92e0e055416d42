//! Shot-outcome pipeline - Main Entry Point

use clap::Parser;
use kobe_pipeline::cli::{cmd_all, cmd_apply, cmd_dashboard, cmd_prepare, cmd_train, load_config, Cli, Commands};
use kobe_pipeline::tracking::ExperimentTracker;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kobe_pipeline=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Some(Commands::Prepare) => {
            cmd_prepare(&config, &ExperimentTracker::from_config(&config))?;
        }
        Some(Commands::Train) => {
            cmd_train(&config, &ExperimentTracker::from_config(&config))?;
        }
        Some(Commands::Apply) => {
            cmd_apply(&config, &ExperimentTracker::from_config(&config))?;
        }
        Some(Commands::Dashboard { host, port }) => {
            cmd_dashboard(&config, host, port).await?;
        }
        None => {
            cmd_all(&config)?;
        }
    }

    Ok(())
}
