//! Test Helper Utilities
//!
//! In-memory store implementing every collaborator trait

#![allow(dead_code)]

use async_trait::async_trait;
use routehub_common::models::{
    AssociationRef, AssociationStatus, AssociationType, NewAssociation, Parent, ParentStatus,
    RecordId, StatusFilter,
};
use routehub_common::store::{
    AssociationQuery, AssociationTypeLookup, AssociationWriter, ParentActivation, ParentQuery,
};
use routehub_common::{Error, Result};
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Stored link with its status
#[derive(Debug, Clone)]
pub struct StoredLink {
    pub link: AssociationRef,
    pub status: AssociationStatus,
}

/// In-memory backend
///
/// Without a uniqueness constraint, like the hosted table.
#[derive(Default)]
pub struct MemoryStore {
    pub parents: Mutex<Vec<Parent>>,
    pub links: Mutex<Vec<StoredLink>>,
    pub types: Vec<AssociationType>,
    /// Sizes of create requests in arrival order
    pub batches: Mutex<Vec<usize>>,
    /// Reject the n-th create request (0-based arrival order)
    pub reject_batches: Vec<usize>,
    /// Reject batches referencing unknown companies
    pub enforce_foreign_key: bool,
    /// Cancel this token once the n-th request has been received
    pub cancel_after: Option<(usize, CancellationToken)>,
    /// Per-request delay, indexed by arrival order
    pub delays_ms: Vec<u64>,
    /// Delay any batch containing this company
    pub slow_parents: Vec<(String, u64)>,
    /// Reject any batch containing one of these companies
    pub reject_parents: Vec<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parents(self, parents: Vec<Parent>) -> Self {
        *self.parents.lock().unwrap() = parents;
        self
    }

    pub fn with_link(self, parent_id: &str, type_id: &str, status: AssociationStatus) -> Self {
        self.links.lock().unwrap().push(StoredLink {
            link: AssociationRef::new(parent_id, type_id),
            status,
        });
        self
    }

    pub fn with_type(mut self, id: &str, name: &str) -> Self {
        self.types.push(AssociationType {
            id: RecordId::from(id),
            name: name.to_string(),
        });
        self
    }

    pub fn link_count(&self) -> usize {
        self.links.lock().unwrap().len()
    }

    pub fn links_for(&self, parent_id: &str) -> usize {
        self.links
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.link.parent_id.as_str() == parent_id)
            .count()
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches.lock().unwrap().clone()
    }
}

/// `n` active companies with ids `c000`, `c001`, ...
pub fn active_parents(n: usize) -> Vec<Parent> {
    (0..n)
        .map(|i| Parent::new(format!("c{:03}", i).as_str(), ParentStatus::Active))
        .collect()
}

#[async_trait]
impl ParentQuery for MemoryStore {
    async fn list_parents(&self, filter: StatusFilter<ParentStatus>) -> Result<Vec<Parent>> {
        Ok(self
            .parents
            .lock()
            .unwrap()
            .iter()
            .filter(|p| match filter {
                StatusFilter::Any => true,
                StatusFilter::Only(s) => p.status == Some(s),
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AssociationQuery for MemoryStore {
    async fn list_associations(
        &self,
        filter: StatusFilter<AssociationStatus>,
    ) -> Result<Vec<AssociationRef>> {
        Ok(self
            .links
            .lock()
            .unwrap()
            .iter()
            .filter(|l| match filter {
                StatusFilter::Any => true,
                StatusFilter::Only(s) => l.status == s,
            })
            .map(|l| l.link.clone())
            .collect())
    }
}

#[async_trait]
impl AssociationTypeLookup for MemoryStore {
    async fn find_association_type_by_name(&self, name: &str) -> Result<Option<AssociationType>> {
        Ok(self.types.iter().find(|t| t.name == name).cloned())
    }
}

#[async_trait]
impl AssociationWriter for MemoryStore {
    async fn create_associations(&self, batch: &[NewAssociation]) -> Result<()> {
        let index = {
            let mut batches = self.batches.lock().unwrap();
            batches.push(batch.len());
            batches.len() - 1
        };

        if let Some((after, token)) = &self.cancel_after {
            if index == *after {
                token.cancel();
            }
        }

        if let Some(ms) = self.delays_ms.get(index) {
            tokio::time::sleep(Duration::from_millis(*ms)).await;
        }

        let contains = |id: &str| batch.iter().any(|n| n.parent_id.as_str() == id);
        for (id, ms) in &self.slow_parents {
            if contains(id) {
                tokio::time::sleep(Duration::from_millis(*ms)).await;
            }
        }

        if self.reject_batches.contains(&index) || self.reject_parents.iter().any(|id| contains(id)) {
            return Err(Error::Http {
                status: 503,
                body: "upstream unavailable".to_string(),
            });
        }

        if self.enforce_foreign_key {
            let parents = self.parents.lock().unwrap();
            if let Some(orphan) = batch
                .iter()
                .find(|n| !parents.iter().any(|p| p.id == n.parent_id))
            {
                return Err(Error::Http {
                    status: 409,
                    body: format!("company {} does not exist", orphan.parent_id),
                });
            }
        }

        let mut links = self.links.lock().unwrap();
        for new in batch {
            links.push(StoredLink {
                link: AssociationRef {
                    parent_id: new.parent_id.clone(),
                    association_type_id: new.association_type_id.clone(),
                },
                status: new.status,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ParentActivation for MemoryStore {
    async fn activate_non_active_parents(&self) -> Result<u64> {
        let mut changed = 0;
        for parent in self.parents.lock().unwrap().iter_mut() {
            if parent.status != Some(ParentStatus::Active) {
                parent.status = Some(ParentStatus::Active);
                changed += 1;
            }
        }
        Ok(changed)
    }
}
