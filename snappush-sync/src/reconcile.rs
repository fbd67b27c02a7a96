//! Source/destination reconciliation.
//!
//! Three stages, run in order:
//!
//! 1. [`find_mismatches`]: dooms destination snapshots whose path is absent
//!    from the source (orphans) or held by a different source snapshot
//!    (conflicts, fatal unless forced), and drops them from the destination
//!    inventory.
//! 2. [`find_matches`]: source snapshots present unmodified at the
//!    destination.
//! 3. [`plan_transfers`]: the ascending chain of transfers that extends the
//!    destination from its newest match (or from scratch when empty).
//!
//! The driver deletes doomed snapshots between stages 1 and 2;
//! [`reconcile`] runs all three for callers that only need the plan.

use snappush_core::{Inventory, Snapshot, TransferStep};

use crate::error::{Conflict, ReconcileError};
use crate::SyncOptions;

/// Everything one reconciliation pass decides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// Destination snapshots to delete, ascending id.
    pub doomed: Vec<Snapshot>,
    /// Source snapshots already present at the destination, ascending id.
    pub matches: Vec<Snapshot>,
    pub plan: Vec<TransferStep>,
}

/// Stage 1: classify destination snapshots that cannot stay.
///
/// Doomed snapshots are removed from `destination` before returning, so
/// later stages never see them. On a conflict without `force`, returns every
/// conflicting pair and leaves `destination` untouched.
pub fn find_mismatches(
    source: &Inventory,
    destination: &mut Inventory,
    options: &SyncOptions,
) -> Result<Vec<Snapshot>, ReconcileError> {
    let mut doomed = Vec::new();
    let mut conflicts = Vec::new();

    for snapshot in destination.iter() {
        match source.get_by_path(&snapshot.path) {
            Some(reference) if same_snapshot(reference, snapshot) => {}
            Some(reference) => {
                if options.force {
                    tracing::warn!(
                        source = %reference,
                        destination = %snapshot,
                        "conflicting destination snapshot will be deleted"
                    );
                    doomed.push(snapshot.clone());
                } else {
                    tracing::error!(source = %reference, destination = %snapshot, "bad match");
                    conflicts.push(Conflict {
                        source: reference.clone(),
                        destination: snapshot.clone(),
                    });
                }
            }
            None => {
                tracing::info!(destination = %snapshot, "no source for destination snapshot");
                doomed.push(snapshot.clone());
            }
        }
    }

    if !conflicts.is_empty() {
        return Err(ReconcileError::Conflict { conflicts });
    }

    for snapshot in &doomed {
        destination.remove(snapshot);
    }
    Ok(doomed)
}

/// Stage 2: source snapshots with an identical destination counterpart
/// (same path, id and identity), ascending id.
pub fn find_matches(source: &Inventory, destination: &Inventory) -> Vec<Snapshot> {
    destination
        .iter()
        .filter_map(|snapshot| {
            source
                .get_by_path(&snapshot.path)
                .filter(|reference| same_snapshot(reference, snapshot))
                .cloned()
        })
        .collect()
}

/// Stage 3: the ordered transfers that bring the destination up to date.
///
/// With matches, the chain starts at the newest match and covers every newer
/// source snapshot. With an empty destination the first transfer is a full
/// send. Each step's parent is the previous step's child.
pub fn plan_transfers(
    source: &Inventory,
    destination: &Inventory,
    matches: &[Snapshot],
) -> Result<Vec<TransferStep>, ReconcileError> {
    if source.is_empty() {
        return Err(ReconcileError::EmptySource);
    }

    let mut parent = if destination.is_empty() {
        tracing::info!("no snapshots at destination, starting fresh");
        None
    } else {
        let newest = matches
            .iter()
            .max_by_key(|snapshot| snapshot.id)
            .ok_or_else(|| ReconcileError::NoCommonSnapshot {
                source_paths: source.paths(),
                destination_paths: destination.paths(),
            })?;
        tracing::debug!(parent = %newest, "newest common snapshot");
        Some(newest.clone())
    };

    let floor = parent.as_ref().map(|p| p.id);
    let mut plan = Vec::new();
    for child in source.iter().filter(|s| floor.map_or(true, |floor| s.id > floor)) {
        plan.push(TransferStep {
            parent: parent.clone(),
            child: child.clone(),
        });
        parent = Some(child.clone());
    }
    Ok(plan)
}

/// Run all three stages against a scratch copy of `destination`.
pub fn reconcile(
    source: &Inventory,
    destination: &Inventory,
    options: &SyncOptions,
) -> Result<Reconciliation, ReconcileError> {
    if source.is_empty() {
        return Err(ReconcileError::EmptySource);
    }
    let mut remaining = destination.clone();
    let doomed = find_mismatches(source, &mut remaining, options)?;
    let matches = find_matches(source, &remaining);
    let plan = plan_transfers(source, &remaining, &matches)?;
    Ok(Reconciliation {
        doomed,
        matches,
        plan,
    })
}

fn same_snapshot(reference: &Snapshot, snapshot: &Snapshot) -> bool {
    reference.id == snapshot.id && reference.identity == snapshot.identity
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
