//! Run driver: one reconciliation pass from listing to last transfer.
//!
//! ## Sequence
//!
//! 1. List the source (fatal if it holds no snapshots).
//! 2. List the destination.
//! 3. Doom orphaned/conflicting destination snapshots.
//! 4. Delete them, stopping at the first failure.
//! 5. Plan the transfer chain.
//! 6. For each step: send → receive → copy metadata. A failed receive
//!    discards the partially received snapshot before the run stops.
//!
//! In dry-run mode steps 4 and 6 only report what they would do.

use serde::Serialize;

use snappush_core::{Inventory, Snapshot, TransferStep};
use snappush_location::Location;

use crate::error::{ReconcileError, SyncError};
use crate::reconcile::{find_matches, find_mismatches, plan_transfers};

/// Per-run behavior switches, fixed before the run starts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOptions {
    /// Report deletions and transfers instead of performing them.
    pub dry_run: bool,
    /// Delete conflicting destination snapshots instead of aborting.
    pub force: bool,
}

/// Outcome of one destination deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeleteResult {
    Deleted { snapshot: Snapshot },
    /// `--dry-run` mode: the snapshot *would* have been deleted.
    WouldDelete { snapshot: Snapshot },
}

/// Outcome of one planned transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TransferResult {
    Transferred { step: TransferStep },
    /// `--dry-run` mode: the snapshot *would* have been transferred.
    WouldTransfer { step: TransferStep },
}

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub source: String,
    pub destination: String,
    pub deletes: Vec<DeleteResult>,
    pub transfers: Vec<TransferResult>,
}

impl SyncReport {
    pub fn is_noop(&self) -> bool {
        self.deletes.is_empty() && self.transfers.is_empty()
    }
}

/// Current inventories of both locations, source listed for send and
/// destination listed for receive.
pub fn inventories(
    source: &dyn Location,
    destination: &dyn Location,
) -> Result<(Inventory, Inventory), SyncError> {
    Ok((list_source(source)?, list_destination(destination)?))
}

/// Run one full reconciliation pass.
pub fn run(
    source: &dyn Location,
    destination: &dyn Location,
    options: &SyncOptions,
) -> Result<SyncReport, SyncError> {
    let source_snapshots = list_source(source)?;
    if source_snapshots.is_empty() {
        return Err(ReconcileError::EmptySource.into());
    }
    let mut destination_snapshots = list_destination(destination)?;
    tracing::info!(
        source = ?source_snapshots.ids(),
        destination = ?destination_snapshots.ids(),
        "listed snapshots"
    );

    let doomed = find_mismatches(&source_snapshots, &mut destination_snapshots, options)?;
    let mut deletes = Vec::with_capacity(doomed.len());
    for snapshot in doomed {
        deletes.push(delete(destination, snapshot, options.dry_run)?);
    }

    let matches = find_matches(&source_snapshots, &destination_snapshots);
    let plan = plan_transfers(&source_snapshots, &destination_snapshots, &matches)?;
    let mut transfers = Vec::with_capacity(plan.len());
    for step in plan {
        transfers.push(transfer(source, destination, step, options.dry_run)?);
    }

    Ok(SyncReport {
        source: source.describe(),
        destination: destination.describe(),
        deletes,
        transfers,
    })
}

fn list_source(location: &dyn Location) -> Result<Inventory, SyncError> {
    location
        .list_for_send()
        .map(|text| Inventory::from_listing(&text))
        .map_err(|source| SyncError::List {
            location: location.describe(),
            source,
        })
}

fn list_destination(location: &dyn Location) -> Result<Inventory, SyncError> {
    location
        .list_for_receive()
        .map(|text| Inventory::from_listing(&text))
        .map_err(|source| SyncError::List {
            location: location.describe(),
            source,
        })
}

fn delete(
    destination: &dyn Location,
    snapshot: Snapshot,
    dry_run: bool,
) -> Result<DeleteResult, SyncError> {
    if dry_run {
        tracing::info!("[dry-run] would delete: {snapshot}");
        return Ok(DeleteResult::WouldDelete { snapshot });
    }
    if let Err(source) = destination.delete(&snapshot) {
        return Err(SyncError::Delete { snapshot, source });
    }
    tracing::info!("deleted: {snapshot}");
    Ok(DeleteResult::Deleted { snapshot })
}

fn transfer(
    source: &dyn Location,
    destination: &dyn Location,
    step: TransferStep,
    dry_run: bool,
) -> Result<TransferResult, SyncError> {
    if dry_run {
        tracing::info!("[dry-run] would transfer: {step}");
        return Ok(TransferResult::WouldTransfer { step });
    }

    let failed = |step: &TransferStep, source| SyncError::Transfer {
        parent: step.parent.clone(),
        child: step.child.clone(),
        source,
    };
    let dir = step.child.dir();

    let mut stream = source
        .send(step.parent.as_ref(), &step.child)
        .map_err(|e| failed(&step, e))?;
    tracing::debug!(sender = stream.label(), "receiving into {}", dir.display());
    if let Err(e) = destination.receive(&mut stream, dir) {
        stream.abort();
        discard_partial(destination, &step.child);
        return Err(failed(&step, e));
    }
    if let Err(e) = stream.finish() {
        discard_partial(destination, &step.child);
        return Err(failed(&step, e));
    }

    let metadata_failed = |source| SyncError::Metadata {
        snapshot: step.child.clone(),
        source,
    };
    let metadata = source.read_metadata(dir).map_err(metadata_failed)?;
    destination
        .write_metadata(dir, &metadata)
        .map_err(metadata_failed)?;

    tracing::info!("transferred: {step}");
    Ok(TransferResult::Transferred { step })
}

/// A failed receive can leave a subvolume without a received uuid, which
/// later listings skip. Remove it so the next run can receive `child` again.
fn discard_partial(destination: &dyn Location, child: &Snapshot) {
    match destination.delete(child) {
        Ok(()) => tracing::info!("discarded partial receive: {child}"),
        Err(e) => tracing::warn!("could not discard partial receive of {child}: {e}"),
    }
}
