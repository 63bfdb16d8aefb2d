//! `activate`: bulk status change of companies to active

use super::{print_json, rest_client};
use anyhow::{Context, Result};
use routehub_common::config::AdminConfig;
use routehub_common::store::ParentActivation;
use serde_json::json;
use std::process::ExitCode;
use tracing::info;

pub async fn run(config: &AdminConfig, json: bool) -> Result<ExitCode> {
    let client = rest_client(config)?;

    info!("Activating all inactive/pending companies...");
    let activated = client
        .activate_non_active_parents()
        .await
        .context("Failed to activate companies")?;

    if json {
        print_json(&json!({ "activated": activated }))?;
    } else {
        println!("[OK] Activated {} companies", activated);
    }
    Ok(ExitCode::SUCCESS)
}
