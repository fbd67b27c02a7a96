//! Error types for snappush-sync.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use snappush_core::Snapshot;
use snappush_location::LocationError;

/// A destination snapshot occupying a source path with different contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub source: Snapshot,
    pub destination: Snapshot,
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "source {} vs destination {}", self.source, self.destination)
    }
}

/// Reasons a reconciliation pass cannot produce a plan.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("no source snapshots")]
    EmptySource,

    /// Destination paths collide with different source snapshots and force
    /// mode is off.
    #[error(
        "conflicting snapshot(s) at destination; re-run with --force to delete them:\n{}",
        list_lines(.conflicts)
    )]
    Conflict { conflicts: Vec<Conflict> },

    /// The destination still holds snapshots but none match the source.
    #[error(
        "no common snapshot: destination has {} but source has {}",
        list_paths(.destination_paths),
        list_paths(.source_paths)
    )]
    NoCommonSnapshot {
        source_paths: Vec<PathBuf>,
        destination_paths: Vec<PathBuf>,
    },
}

/// All errors that can arise from a sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error("listing {location} failed: {source}")]
    List {
        location: String,
        #[source]
        source: LocationError,
    },

    #[error("deleting {snapshot} failed: {source}")]
    Delete {
        snapshot: Snapshot,
        #[source]
        source: LocationError,
    },

    #[error("transferring {child}{} failed: {source}", parent_suffix(.parent))]
    Transfer {
        parent: Option<Snapshot>,
        child: Snapshot,
        #[source]
        source: LocationError,
    },

    #[error("copying metadata for {snapshot} failed: {source}")]
    Metadata {
        snapshot: Snapshot,
        #[source]
        source: LocationError,
    },
}

fn list_lines<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|item| format!("  {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn list_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "[]".to_string();
    }
    let names: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
    format!("[{}]", names.join(", "))
}

fn parent_suffix(parent: &Option<Snapshot>) -> String {
    match parent {
        Some(parent) => format!(" (parent {})", parent.path.display()),
        None => String::new(),
    }
}
