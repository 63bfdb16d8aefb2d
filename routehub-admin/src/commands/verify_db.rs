//! `verify-db`: read-only counts straight from PostgreSQL

use super::{heading, percent, print_json};
use crate::verify::{self, VerificationReport, RESERVED_USER_IDS};
use anyhow::{Context, Result};
use routehub_common::config::AdminConfig;
use std::fmt::Write;
use std::process::ExitCode;

pub async fn run(config: &AdminConfig, json: bool) -> Result<ExitCode> {
    let url = config.require_database_url()?;
    let pool = verify::connect(url, config.database.max_connections)
        .await
        .context("Failed to connect to database")?;

    let report = VerificationReport::collect(&pool)
        .await
        .context("Verification queries failed")?;
    pool.close().await;

    if json {
        print_json(&report)?;
    } else {
        print!("{}", heading("DATABASE VERIFICATION"));
        print!("{}", render(&report));
    }
    Ok(ExitCode::SUCCESS)
}

pub fn render(report: &VerificationReport) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "\nUsers:");
    match &report.users {
        Some(users) => {
            let _ = writeln!(out, "   Total: {}", users.total);
            for (role, count) in &users.by_role {
                let _ = writeln!(out, "   - {}: {}", role, count);
            }
        }
        None => missing(&mut out),
    }

    let _ = writeln!(out, "\nCompanies:");
    match &report.companies {
        Some(companies) => {
            let total = companies.total as f64;
            let _ = writeln!(out, "   Total: {}", companies.total);
            let _ = writeln!(
                out,
                "   - At default coordinates: {} ({})",
                companies.at_default_coordinates,
                percent(companies.at_default_coordinates as f64, total)
            );
            let _ = writeln!(
                out,
                "   - With real coordinates: {} ({})",
                companies.with_real_coordinates,
                percent(companies.with_real_coordinates as f64, total)
            );
        }
        None => missing(&mut out),
    }

    let _ = writeln!(out, "\nServices:");
    match &report.services {
        Some(services) => {
            let _ = writeln!(out, "   Total: {}", services.total);
            for name in &services.sample_names {
                let _ = writeln!(out, "   - {}", name);
            }
        }
        None => missing(&mut out),
    }

    let _ = writeln!(out, "\nCompany services:");
    match &report.relations {
        Some(relations) => {
            let _ = writeln!(out, "   Total: {}", relations.total);
            if !relations.top_inspectors.is_empty() {
                let _ = writeln!(out, "   Top inspectors:");
                for (name, count) in &relations.top_inspectors {
                    let _ = writeln!(out, "   - {}: {} assignments", name, count);
                }
            }
        }
        None => missing(&mut out),
    }

    let _ = writeln!(out, "\nConflict checks:");
    match report.conflicts.reserved_user_ids_taken {
        Some(0) => {
            let _ = writeln!(
                out,
                "   [OK] User ids {}-{} are free",
                RESERVED_USER_IDS.0, RESERVED_USER_IDS.1
            );
        }
        Some(n) => {
            let _ = writeln!(
                out,
                "   [WARN] {} users already use ids {}-{}",
                n, RESERVED_USER_IDS.0, RESERVED_USER_IDS.1
            );
        }
        None => {
            let _ = writeln!(out, "   Reserved user ids: not checked");
        }
    }
    match report.conflicts.duplicate_tax_numbers {
        Some(0) => {
            let _ = writeln!(out, "   [OK] No duplicate tax numbers");
        }
        Some(n) => {
            let _ = writeln!(out, "   [WARN] {} tax numbers shared by several companies", n);
        }
        None => {
            let _ = writeln!(out, "   Duplicate tax numbers: not checked");
        }
    }
    out
}

fn missing(out: &mut String) {
    let _ = writeln!(out, "   (table missing)");
}
