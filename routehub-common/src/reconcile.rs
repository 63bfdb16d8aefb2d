//! Reconciliation of companies lacking any service link
//!
//! Two halves kept apart so each can be tested without a backend:
//! - [`compute_missing`] is a pure set difference over parent ids
//! - [`reconcile`] / [`reconcile_concurrent`] write default links in batches
//!
//! Batch writes are fail-open: a rejected batch is recorded in the
//! [`ReconciliationResult`] and the remaining batches are still issued.

use crate::models::{AssociationRef, NewAssociation, Parent, RecordId};
use crate::store::AssociationWriter;
use crate::{Error, Result};
use futures::{future, stream, StreamExt};
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::pin::pin;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default number of links created per request
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Parent ids that no association refers to
///
/// Returns `ids(parents) - parent_ids(associations)`. No status filtering
/// happens here; callers pre-filter `parents` if only some statuses count.
/// The result is ordered so repeated runs log and write in the same order.
pub fn compute_missing(parents: &[Parent], associations: &[AssociationRef]) -> BTreeSet<RecordId> {
    let covered: HashSet<&RecordId> = associations.iter().map(|a| &a.parent_id).collect();

    parents
        .iter()
        .filter(|p| !covered.contains(&p.id))
        .map(|p| p.id.clone())
        .collect()
}

/// Split `ids` into consecutive batches of at most `batch_size`
pub fn plan_batches(ids: &[RecordId], batch_size: usize) -> Result<Vec<&[RecordId]>> {
    if batch_size == 0 {
        return Err(Error::InvalidInput("batch size must be at least 1".to_string()));
    }
    Ok(ids.chunks(batch_size).collect())
}

/// One rejected batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchFailure {
    /// 0-based batch index in issue order
    pub index: usize,
    /// Number of links the batch carried
    pub size: usize,
    /// Reason reported by the store
    pub cause: String,
}

/// Aggregate outcome of a reconcile call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationResult {
    /// Number of batches planned
    pub batches: usize,
    /// Links sent to the store (successful or not)
    pub attempted: usize,
    /// Links the store accepted
    pub succeeded: usize,
    /// Rejected batches, ordered by index
    pub failed_batches: Vec<BatchFailure>,
    /// Batches never issued because the run was cancelled
    pub skipped_batches: Vec<usize>,
}

impl ReconciliationResult {
    pub fn failed_indices(&self) -> Vec<usize> {
        self.failed_batches.iter().map(|f| f.index).collect()
    }

    pub fn failed(&self) -> usize {
        self.attempted - self.succeeded
    }

    /// Every planned batch was issued and accepted
    pub fn is_complete(&self) -> bool {
        self.failed_batches.is_empty() && self.skipped_batches.is_empty()
    }
}

/// Dispatch settings for [`reconcile_concurrent`]
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    pub batch_size: usize,
    /// Upper bound on outstanding batch requests (1 = sequential)
    pub max_in_flight: usize,
    /// Stops issuing further batches once cancelled
    pub cancel: CancellationToken,
}

impl ReconcileOptions {
    pub fn sequential(batch_size: usize) -> Self {
        Self {
            batch_size,
            max_in_flight: 1,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self::sequential(DEFAULT_BATCH_SIZE)
    }
}

/// Create a default link for each id, one batch at a time
///
/// Batch failures never surface as `Err`; they are reported in the result.
/// `Err` is only returned for an unusable `batch_size`.
pub async fn reconcile<W>(
    writer: &W,
    missing_ids: &[RecordId],
    association_type_id: &RecordId,
    batch_size: usize,
) -> Result<ReconciliationResult>
where
    W: AssociationWriter + ?Sized,
{
    reconcile_concurrent(
        writer,
        missing_ids,
        association_type_id,
        &ReconcileOptions::sequential(batch_size),
    )
    .await
}

/// [`reconcile`] with bounded parallel dispatch and cancellation
///
/// Batches are issued in input order; with `max_in_flight > 1` they may
/// complete out of order, which does not change the aggregate result.
pub async fn reconcile_concurrent<W>(
    writer: &W,
    missing_ids: &[RecordId],
    association_type_id: &RecordId,
    options: &ReconcileOptions,
) -> Result<ReconciliationResult>
where
    W: AssociationWriter + ?Sized,
{
    let planned = plan_batches(missing_ids, options.batch_size)?;
    let total = missing_ids.len();

    let mut result = ReconciliationResult {
        batches: planned.len(),
        ..Default::default()
    };

    if planned.is_empty() {
        debug!("Nothing to reconcile");
        return Ok(result);
    }

    let batches: Vec<Vec<NewAssociation>> = planned
        .iter()
        .map(|ids| {
            ids.iter()
                .map(|id| NewAssociation::default_for(id.clone(), association_type_id.clone()))
                .collect()
        })
        .collect();

    let cancel = options.cancel.clone();
    let mut issued = vec![false; batches.len()];

    let mut outcomes = pin!(stream::iter(batches.into_iter().enumerate())
        .take_while(move |_| future::ready(!cancel.is_cancelled()))
        .map(move |(index, batch)| async move {
            let outcome = writer.create_associations(&batch).await;
            (index, batch.len(), outcome)
        })
        .buffer_unordered(options.max_in_flight.max(1)));

    while let Some((index, size, outcome)) = outcomes.next().await {
        issued[index] = true;
        result.attempted += size;

        match outcome {
            Ok(()) => {
                result.succeeded += size;
                debug!(batch = index, size, "Batch created");
                info!("Processed {}/{} parents", result.succeeded, total);
            }
            Err(e) => {
                warn!(batch = index, size, error = %e, "Batch rejected, continuing");
                result.failed_batches.push(BatchFailure {
                    index,
                    size,
                    cause: e.cause(),
                });
            }
        }
    }

    result.failed_batches.sort_by_key(|f| f.index);
    result.skipped_batches = issued
        .iter()
        .enumerate()
        .filter(|(_, done)| !**done)
        .map(|(i, _)| i)
        .collect();

    if !result.skipped_batches.is_empty() {
        warn!(
            skipped = result.skipped_batches.len(),
            "Reconciliation cancelled before all batches were issued"
        );
    }

    info!(
        attempted = result.attempted,
        succeeded = result.succeeded,
        failed_batches = result.failed_batches.len(),
        "Reconciliation finished"
    );

    Ok(result)
}
