//! End-to-end reconciliation run against a store
//!
//! Resolves the default service type, lists companies and links with
//! explicit status filters, computes the missing set and writes default
//! links for it.

use crate::models::{
    AssociationStatus, AssociationType, ParentStatus, RecordId, StatusFilter,
};
use crate::reconcile::{compute_missing, reconcile_concurrent, ReconcileOptions, ReconciliationResult};
use crate::store::{AssociationQuery, AssociationTypeLookup, AssociationWriter, ParentQuery};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

/// Parameters of one reconciliation run
#[derive(Debug, Clone)]
pub struct ReconciliationJob {
    /// Name of the service type assigned by default
    pub association_type_name: String,
    /// Which companies must be covered
    pub parent_filter: StatusFilter<ParentStatus>,
    /// Which existing links count as coverage
    pub association_filter: StatusFilter<AssociationStatus>,
    pub options: ReconcileOptions,
    /// Compute and report only, write nothing
    pub dry_run: bool,
}

/// Outcome of [`ReconciliationJob::run`]
#[derive(Debug, Clone, Serialize)]
pub struct ReconciliationReport {
    pub association_type: AssociationType,
    pub parents_considered: usize,
    pub associations_seen: usize,
    /// Companies without any link before writing, in write order
    pub missing: Vec<RecordId>,
    /// `None` for a dry run
    pub result: Option<ReconciliationResult>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ReconciliationJob {
    pub fn new(association_type_name: impl Into<String>) -> Self {
        Self {
            association_type_name: association_type_name.into(),
            parent_filter: StatusFilter::Only(ParentStatus::Active),
            association_filter: StatusFilter::Any,
            options: ReconcileOptions::default(),
            dry_run: false,
        }
    }

    /// Run the job. Only a failed lookup or listing aborts the run, and both
    /// happen before any write.
    pub async fn run<S>(&self, store: &S) -> Result<ReconciliationReport>
    where
        S: ParentQuery + AssociationQuery + AssociationTypeLookup + AssociationWriter + ?Sized,
    {
        let association_type = self.resolve_type(store).await?;
        self.run_with_type(store, association_type).await
    }

    /// Look up the configured service type; `LookupFailure` when absent
    ///
    /// Callers with writes of their own (activation) resolve first so a
    /// missing type stops them too.
    pub async fn resolve_type<S>(&self, store: &S) -> Result<AssociationType>
    where
        S: AssociationTypeLookup + ?Sized,
    {
        let association_type = store
            .find_association_type_by_name(&self.association_type_name)
            .await?
            .ok_or_else(|| Error::LookupFailure(self.association_type_name.clone()))?;
        info!(
            id = %association_type.id,
            name = %association_type.name,
            "Resolved default service type"
        );
        Ok(association_type)
    }

    /// Run the job with an already resolved service type
    pub async fn run_with_type<S>(
        &self,
        store: &S,
        association_type: AssociationType,
    ) -> Result<ReconciliationReport>
    where
        S: ParentQuery + AssociationQuery + AssociationWriter + ?Sized,
    {
        let started_at = Utc::now();

        let parents = store.list_parents(self.parent_filter).await?;
        info!(filter = %self.parent_filter, count = parents.len(), "Listed companies");

        let associations = store.list_associations(self.association_filter).await?;
        info!(
            filter = %self.association_filter,
            count = associations.len(),
            "Listed company services"
        );

        let missing: Vec<RecordId> = compute_missing(&parents, &associations).into_iter().collect();
        info!("Found {} companies without services", missing.len());

        let result = if self.dry_run {
            info!("Dry run, no links written");
            None
        } else {
            Some(reconcile_concurrent(store, &missing, &association_type.id, &self.options).await?)
        };

        Ok(ReconciliationReport {
            association_type,
            parents_considered: parents.len(),
            associations_seen: associations.len(),
            missing,
            result,
            started_at,
            finished_at: Utc::now(),
        })
    }
}
