//! routehub-admin - Main entry point
//!
//! Parses the command line, sets up logging and runs one subcommand.
//! Reports go to stdout, logs to stderr.

use std::process::ExitCode;

use clap::Parser;
use routehub_admin::cli::Cli;
use routehub_admin::commands;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "routehub_admin=debug,routehub_common=debug"
    } else {
        "routehub_admin=info,routehub_common=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting routehub-admin v{}", env!("CARGO_PKG_VERSION"));

    match commands::run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
