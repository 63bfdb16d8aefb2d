//! Service coverage statistics

use crate::models::{AssociationRef, AssociationStatus, Parent, ParentStatus, StatusFilter};
use crate::store::{AssociationQuery, ParentQuery};
use crate::Result;
use serde::Serialize;
use std::collections::HashSet;

/// How many companies have at least one service link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CoverageReport {
    pub total_parents: usize,
    pub with_associations: usize,
    pub without_associations: usize,
}

impl CoverageReport {
    /// Links pointing at companies outside `parents` are not counted
    pub fn compute(parents: &[Parent], associations: &[AssociationRef]) -> Self {
        let covered: HashSet<_> = associations.iter().map(|a| &a.parent_id).collect();
        let with_associations = parents.iter().filter(|p| covered.contains(&p.id)).count();

        Self {
            total_parents: parents.len(),
            with_associations,
            without_associations: parents.len() - with_associations,
        }
    }

    /// Fraction of covered companies in percent, 0 for an empty set
    pub fn covered_percent(&self) -> f64 {
        if self.total_parents == 0 {
            0.0
        } else {
            self.with_associations as f64 * 100.0 / self.total_parents as f64
        }
    }
}

/// Fetch both sides and compute coverage
pub async fn load_coverage<S>(
    store: &S,
    parent_filter: StatusFilter<ParentStatus>,
    association_filter: StatusFilter<AssociationStatus>,
) -> Result<CoverageReport>
where
    S: ParentQuery + AssociationQuery + ?Sized,
{
    let parents = store.list_parents(parent_filter).await?;
    let associations = store.list_associations(association_filter).await?;
    Ok(CoverageReport::compute(&parents, &associations))
}
