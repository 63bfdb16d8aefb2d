//! Subcommand implementations
//!
//! Each command loads what it needs from [`AdminConfig`], runs, and prints
//! either a text report or JSON to stdout. Logs go to stderr.

pub mod activate;
pub mod coverage;
pub mod geocoding;
pub mod reconcile;
pub mod verify_db;

use crate::cli::{Cli, Command, FilterArgs};
use crate::rest::RestClient;
use anyhow::{Context, Result};
use routehub_common::config::AdminConfig;
use routehub_common::models::{AssociationStatus, ParentStatus, StatusFilter};
use serde::Serialize;
use std::process::ExitCode;

/// Exit status when some reconciliation batches failed
pub const EXIT_PARTIAL_FAILURE: u8 = 2;

const RULE_WIDTH: usize = 80;

pub async fn run(cli: Cli) -> Result<ExitCode> {
    let config = AdminConfig::load(&cli.overrides()).context("Failed to load configuration")?;
    tracing::debug!(?config, "Resolved configuration");

    match &cli.command {
        Command::Activate => activate::run(&config, cli.json).await,
        Command::Reconcile(args) => reconcile::run(&config, args, cli.json).await,
        Command::Coverage(filters) => coverage::run(&config, filters, cli.json).await,
        Command::GeocodingStats => geocoding::run(&config, cli.json).await,
        Command::VerifyDb => verify_db::run(&config, cli.json).await,
    }
}

fn rest_client(config: &AdminConfig) -> Result<RestClient> {
    let backend = config.require_backend()?;
    RestClient::new(backend, config.resources.clone()).context("Failed to build REST client")
}

/// CLI filter values win over the configured defaults
fn resolve_filters(
    config: &AdminConfig,
    filters: &FilterArgs,
) -> Result<(StatusFilter<ParentStatus>, StatusFilter<AssociationStatus>)> {
    let parents = match &filters.parent_status {
        Some(s) => s
            .parse::<StatusFilter<ParentStatus>>()
            .context("--parent-status")?,
        None => config.reconcile.parent_filter()?,
    };
    let associations = match &filters.association_status {
        Some(s) => s
            .parse::<StatusFilter<AssociationStatus>>()
            .context("--association-status")?,
        None => config.reconcile.association_filter()?,
    };
    Ok((parents, associations))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn rule(c: char) -> String {
    std::iter::repeat(c).take(RULE_WIDTH).collect()
}

fn heading(title: &str) -> String {
    format!("{}\n{}\n{}\n", rule('='), title, rule('='))
}

fn percent(count: f64, total: f64) -> String {
    if total == 0.0 {
        "0.0%".to_string()
    } else {
        format!("{:.1}%", count * 100.0 / total)
    }
}
