//! Command-line arguments for routehub-admin

use clap::{Args, Parser, Subcommand};
use routehub_common::config::ConfigOverrides;
use std::path::PathBuf;

/// Administrative tasks for the RouteHub backend
#[derive(Parser, Debug)]
#[command(name = "routehub-admin")]
#[command(about = "Administrative tasks for the RouteHub backend")]
#[command(version)]
pub struct Cli {
    /// TOML config file (default: <config dir>/routehub/admin.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Backend project URL
    #[arg(long, global = true)]
    pub backend_url: Option<String>,

    /// Backend API key
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    /// PostgreSQL URL for verify-db
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    /// Print reports as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Set every non-active company to active
    Activate,

    /// Assign the default service to companies without any service
    Reconcile(ReconcileArgs),

    /// Count companies with and without services
    Coverage(FilterArgs),

    /// Classify company coordinates by geocoding quality
    GeocodingStats,

    /// Query the database directly for verification counts
    VerifyDb,
}

/// Status filters; values are `any` or a status name
#[derive(Args, Debug, Default)]
pub struct FilterArgs {
    /// Which companies must be covered (default from config: active)
    #[arg(long)]
    pub parent_status: Option<String>,

    /// Which existing services count as coverage (default from config: any)
    #[arg(long)]
    pub association_status: Option<String>,
}

#[derive(Args, Debug, Default)]
pub struct ReconcileArgs {
    /// Name of the service type to assign
    #[arg(long)]
    pub type_name: Option<String>,

    /// Links created per request
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Concurrent batch requests
    #[arg(long)]
    pub max_in_flight: Option<usize>,

    #[command(flatten)]
    pub filters: FilterArgs,

    /// Report what would be assigned without writing
    #[arg(long)]
    pub dry_run: bool,

    /// Activate non-active companies first
    #[arg(long)]
    pub activate_first: bool,

    /// Exit 0 even when some batches failed
    #[arg(long)]
    pub allow_partial: bool,
}

impl Cli {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            config_path: self.config.clone(),
            backend_url: self.backend_url.clone(),
            api_key: self.api_key.clone(),
            database_url: self.database_url.clone(),
        }
    }
}
