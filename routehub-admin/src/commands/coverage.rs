//! `coverage`: companies with and without services

use super::{heading, percent, print_json, resolve_filters, rest_client};
use crate::cli::FilterArgs;
use anyhow::{Context, Result};
use routehub_common::config::AdminConfig;
use routehub_common::coverage::{load_coverage, CoverageReport};
use routehub_common::models::{ParentStatus, StatusFilter};
use std::process::ExitCode;

pub async fn run(config: &AdminConfig, filters: &FilterArgs, json: bool) -> Result<ExitCode> {
    let client = rest_client(config)?;
    let (parent_filter, association_filter) = resolve_filters(config, filters)?;

    let report = load_coverage(&client, parent_filter, association_filter)
        .await
        .context("Failed to load coverage")?;

    if json {
        print_json(&report)?;
    } else {
        print!("{}", heading("SERVICE COVERAGE"));
        print!("{}", render(&report, parent_filter));
    }
    Ok(ExitCode::SUCCESS)
}

pub fn render(report: &CoverageReport, parent_filter: StatusFilter<ParentStatus>) -> String {
    let scope = match parent_filter {
        StatusFilter::Any => "Total companies".to_string(),
        StatusFilter::Only(status) => format!("Total {} companies", status),
    };
    let total = report.total_parents as f64;

    format!(
        "{}: {}\nCompanies with services: {} ({})\nCompanies without services: {} ({})\n",
        scope,
        report.total_parents,
        report.with_associations,
        percent(report.with_associations as f64, total),
        report.without_associations,
        percent(report.without_associations as f64, total),
    )
}
