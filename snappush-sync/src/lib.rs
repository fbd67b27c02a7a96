//! # snappush-sync
//!
//! Reconciliation and the run driver.
//!
//! Call [`pipeline::run`] to bring a destination in line with a source, or
//! [`reconcile::reconcile`] to compute the plan without touching anything.

pub mod error;
pub mod pipeline;
pub mod reconcile;

pub use error::{Conflict, ReconcileError, SyncError};
pub use pipeline::{run, DeleteResult, SyncOptions, SyncReport, TransferResult};
pub use reconcile::{reconcile, Reconciliation};
