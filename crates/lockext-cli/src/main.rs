#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod command;
mod config;

use std::process;

use crate::config::{Cli, Command, create_state};

// Tracing target constants
pub const TRACING_TARGET_STARTUP: &str = "lockext_cli::startup";
pub const TRACING_TARGET_SHUTDOWN: &str = "lockext_cli::shutdown";
pub const TRACING_TARGET_CONFIG: &str = "lockext_cli::config";
pub const TRACING_TARGET_COMMAND: &str = "lockext_cli::command";

#[tokio::main]
async fn main() {
    let Err(error) = run().await else {
        tracing::info!(
            target: TRACING_TARGET_SHUTDOWN,
            "Application terminated successfully"
        );
        process::exit(0);
    };

    if tracing::enabled!(tracing::Level::ERROR) {
        tracing::error!(
            target: TRACING_TARGET_SHUTDOWN,
            error = %format_args!("{error:#}"),
            "Application terminated with error"
        );
    } else {
        eprintln!("Error: {error:#}");
    }

    process::exit(1);
}

/// Main application entry point.
async fn run() -> anyhow::Result<()> {
    let cli = Cli::init();

    cli.init_tracing();
    cli.log();

    let state = create_state(&cli).await?;

    match &cli.command {
        Command::Serve => command::serve(state, &cli.worker).await,
        Command::Invoke { stage, event } => command::invoke(&state, *stage, event).await,
        Command::Health => command::health(&state, &cli.worker).await,
    }
}
