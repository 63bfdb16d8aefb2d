//! `reconcile`: assign the default service to uncovered companies

use super::{heading, print_json, resolve_filters, rest_client, rule, EXIT_PARTIAL_FAILURE};
use crate::cli::ReconcileArgs;
use anyhow::{Context, Result};
use routehub_common::config::AdminConfig;
use routehub_common::coverage::{load_coverage, CoverageReport};
use routehub_common::models::{AssociationStatus, ParentStatus, StatusFilter};
use routehub_common::reconcile::ReconcileOptions;
use routehub_common::store::{AssociationQuery, ParentActivation, ParentQuery};
use routehub_common::{Error, ReconciliationJob, ReconciliationReport};
use serde::Serialize;
use std::fmt::Write;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Conventional 128 + SIGINT
const EXIT_INTERRUPTED: i32 = 130;

#[derive(Serialize)]
struct Output<'a> {
    activated: Option<u64>,
    reconciliation: &'a ReconciliationReport,
    /// `None` when interrupted before the final verification
    coverage: Option<&'a CoverageReport>,
}

pub async fn run(config: &AdminConfig, args: &ReconcileArgs, json: bool) -> Result<ExitCode> {
    let client = rest_client(config)?;
    let job = build_job(config, args)?;

    // Resolve before activation so a missing type writes nothing at all
    let association_type = match job.resolve_type(&client).await {
        Ok(association_type) => association_type,
        Err(Error::LookupFailure(name)) => {
            error!("Service type '{}' not found, nothing written", name);
            anyhow::bail!("Service type '{}' not found", name);
        }
        Err(e) => return Err(e).context("Service type lookup failed"),
    };

    let activated = if args.activate_first && !args.dry_run {
        info!("Activating all inactive/pending companies...");
        Some(
            client
                .activate_non_active_parents()
                .await
                .context("Failed to activate companies")?,
        )
    } else {
        None
    };

    let cancel = job.options.cancel.clone();
    let watcher = tokio::spawn(watch_interrupts(cancel.clone()));

    let outcome = async {
        let report = job
            .run_with_type(&client, association_type)
            .await
            .context("Reconciliation failed")?;
        let coverage = final_verification(&client, job.parent_filter, job.association_filter, &cancel)
            .await
            .context("Final verification failed")?;
        Ok::<_, anyhow::Error>((report, coverage))
    }
    .await;
    watcher.abort();
    let (report, coverage) = outcome?;

    if json {
        print_json(&Output {
            activated,
            reconciliation: &report,
            coverage: coverage.as_ref(),
        })?;
    } else {
        print!("{}", heading("RECONCILIATION"));
        if let Some(count) = activated {
            println!("Activated {} companies", count);
        }
        print!("{}", render(&report));
        println!("\n{}\nFINAL VERIFICATION\n{}", rule('='), rule('='));
        match &coverage {
            Some(coverage) => print!("{}", super::coverage::render(coverage, job.parent_filter)),
            None => println!("Skipped (interrupted)"),
        }
    }

    Ok(ExitCode::from(exit_status(&report, args.allow_partial)))
}

/// First Ctrl-C stops issuing batches and skips the final verification;
/// in-flight batches finish. A second Ctrl-C exits immediately.
async fn watch_interrupts(cancel: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_err() {
        return;
    }
    warn!("Interrupted, finishing in-flight batches (Ctrl-C again to abort)");
    cancel.cancel();

    if tokio::signal::ctrl_c().await.is_ok() {
        error!("Aborted");
        std::process::exit(EXIT_INTERRUPTED);
    }
}

/// Coverage after the run, or `None` once `cancel` fired
pub async fn final_verification<S>(
    store: &S,
    parent_filter: StatusFilter<ParentStatus>,
    association_filter: StatusFilter<AssociationStatus>,
    cancel: &CancellationToken,
) -> routehub_common::Result<Option<CoverageReport>>
where
    S: ParentQuery + AssociationQuery + ?Sized,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            warn!("Final verification skipped");
            Ok(None)
        }
        coverage = load_coverage(store, parent_filter, association_filter) => coverage.map(Some),
    }
}

fn build_job(config: &AdminConfig, args: &ReconcileArgs) -> Result<ReconciliationJob> {
    let (parent_filter, association_filter) = resolve_filters(config, &args.filters)?;
    let batch_size = args.batch_size.unwrap_or(config.reconcile.batch_size);
    let max_in_flight = args.max_in_flight.unwrap_or(config.reconcile.max_in_flight);
    if batch_size == 0 || max_in_flight == 0 {
        anyhow::bail!("--batch-size and --max-in-flight must be at least 1");
    }

    Ok(ReconciliationJob {
        association_type_name: args
            .type_name
            .clone()
            .unwrap_or_else(|| config.reconcile.default_association_type.clone()),
        parent_filter,
        association_filter,
        options: ReconcileOptions::sequential(batch_size).with_max_in_flight(max_in_flight),
        dry_run: args.dry_run,
    })
}

/// Partial failure is an overall failure unless the caller allows it
pub fn exit_status(report: &ReconciliationReport, allow_partial: bool) -> u8 {
    match &report.result {
        Some(result) if !result.is_complete() && !allow_partial => EXIT_PARTIAL_FAILURE,
        _ => 0,
    }
}

pub fn render(report: &ReconciliationReport) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "Service type: {} ({})",
        report.association_type.name, report.association_type.id
    );
    let _ = writeln!(out, "Companies considered: {}", report.parents_considered);
    let _ = writeln!(out, "Existing services: {}", report.associations_seen);
    let _ = writeln!(out, "Companies without services: {}", report.missing.len());

    match &report.result {
        None => {
            let _ = writeln!(out, "\nDry run, nothing written. Would assign to:");
            for id in &report.missing {
                let _ = writeln!(out, "   - {}", id);
            }
        }
        Some(result) if result.batches == 0 => {
            let _ = writeln!(out, "\n[OK] All companies already have services assigned!");
        }
        Some(result) => {
            let _ = writeln!(
                out,
                "\nAssigned to {}/{} companies in {} batches",
                result.succeeded, result.attempted, result.batches
            );
            for failure in &result.failed_batches {
                let _ = writeln!(
                    out,
                    "[ERROR] Batch {} ({} companies): {}",
                    failure.index, failure.size, failure.cause
                );
            }
            if !result.skipped_batches.is_empty() {
                let _ = writeln!(
                    out,
                    "[WARN] {} batches not issued (cancelled)",
                    result.skipped_batches.len()
                );
            }
        }
    }
    out
}
