mod cli;
mod commands;
mod telemetry;

use clap::Parser;
use tracing::info;

use crate::cli::{Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    telemetry::init(cli.verbose, cli.log_json);

    info!(version = env!("CARGO_PKG_VERSION"), "parlance starting");
    let config = cli.rag_config()?;

    match &cli.command {
        Command::Ingest { docs, index } => commands::ingest(&cli, config, docs, index).await,
        Command::Ask { question, corpus } => commands::ask(&cli, config, question, corpus).await,
        Command::Chat { corpus } => commands::chat(&cli, config, corpus).await,
    }
}
