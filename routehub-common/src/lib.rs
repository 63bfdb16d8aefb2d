//! # RouteHub Common Library
//!
//! Shared code for the RouteHub admin tooling:
//! - Domain records with closed status/priority enums
//! - Store collaborator traits
//! - Reconciliation of companies lacking a service link
//! - Coverage and geocoding statistics
//! - Configuration loading

pub mod config;
pub mod coverage;
pub mod error;
pub mod geocoding;
pub mod job;
pub mod models;
pub mod reconcile;
pub mod store;

pub use error::{Error, Result};
pub use job::{ReconciliationJob, ReconciliationReport};
pub use reconcile::{compute_missing, reconcile, reconcile_concurrent, ReconciliationResult};
