//! routehub-admin library - administrative tasks for the RouteHub backend
//!
//! Talks to the backend's PostgREST interface for company/service
//! reconciliation and reporting, and to PostgreSQL directly for
//! verification counts.

pub mod cli;
pub mod commands;
pub mod rest;
pub mod verify;

pub use rest::RestClient;
