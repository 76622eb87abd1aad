// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! DeployKnot entry point: `deployknot server` and
//! `deployknot worker`.

mod commands;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use dk_core::Config;

#[derive(Parser, Debug)]
#[command(name = "deployknot", version, about = "Remote application deployment orchestrator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API server.
    Server,
    /// Run a deployment worker.
    Worker,
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string()));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env().context("failed to load configuration")?;
    init_tracing(&config.logging.level);

    match cli.command {
        Command::Server => commands::server(config).await,
        Command::Worker => commands::worker(config).await,
    }
}
