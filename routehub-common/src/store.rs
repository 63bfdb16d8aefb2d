//! Collaborator interfaces for the backend store
//!
//! Reconciliation and the admin reports only talk to these traits. The REST
//! client in `routehub-admin` implements all of them; tests use in-memory
//! fakes.

use crate::models::{
    AssociationRef, AssociationStatus, AssociationType, NewAssociation, Parent, ParentStatus,
    StatusFilter,
};
use crate::Result;
use async_trait::async_trait;

/// Read access to companies
#[async_trait]
pub trait ParentQuery: Send + Sync {
    /// Complete set of parents matching `filter` (pagination handled inside)
    async fn list_parents(&self, filter: StatusFilter<ParentStatus>) -> Result<Vec<Parent>>;
}

/// Read access to company-service links
#[async_trait]
pub trait AssociationQuery: Send + Sync {
    /// Complete set of links matching `filter` (pagination handled inside)
    async fn list_associations(
        &self,
        filter: StatusFilter<AssociationStatus>,
    ) -> Result<Vec<AssociationRef>>;
}

/// Service type lookup
#[async_trait]
pub trait AssociationTypeLookup: Send + Sync {
    /// `Ok(None)` when no type carries this name
    async fn find_association_type_by_name(&self, name: &str) -> Result<Option<AssociationType>>;
}

/// Write access to company-service links
#[async_trait]
pub trait AssociationWriter: Send + Sync {
    /// Create every link in `batch` with a single request.
    ///
    /// An `Err` means the whole batch was rejected; its cause is recorded by
    /// the caller.
    async fn create_associations(&self, batch: &[NewAssociation]) -> Result<()>;
}

/// Bulk status change for companies
#[async_trait]
pub trait ParentActivation: Send + Sync {
    /// Set every non-active parent to active, returning how many changed
    async fn activate_non_active_parents(&self) -> Result<u64>;
}

