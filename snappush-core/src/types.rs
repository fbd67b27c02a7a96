//! Domain types for snapshot replication.
//!
//! All path fields use `PathBuf`; snapshot paths are always relative to the
//! root of the location that holds them.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Leaf name of every managed subvolume: `<id>/snapshot`.
pub const SNAPSHOT_LEAF: &str = "snapshot";

/// Length of the hyphenated identity form, e.g. `0b9e6d9c-5c0e-4b4e-9d0a-3f1c2b7a6e51`.
const IDENTITY_LEN: usize = 36;
const IDENTITY_HYPHENS: [usize; 4] = [8, 13, 18, 23];

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Generation number assigned by the snapshot manager.
///
/// Strictly increasing over a location's history, so ordering by id is
/// chronological ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotId(pub u64);

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<u64> for SnapshotId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Content-identity token of a subvolume.
///
/// Two records at different locations with the same identity denote the
/// same snapshot content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(pub Uuid);

impl Identity {
    /// Parse the 36-character hyphenated hex form.
    ///
    /// Other spellings accepted by [`Uuid::parse_str`] (simple, braced, urn)
    /// are rejected: listings only ever carry the hyphenated form.
    pub fn parse(s: &str) -> Option<Self> {
        let bytes = s.as_bytes();
        if bytes.len() != IDENTITY_LEN {
            return None;
        }
        let shaped = bytes.iter().enumerate().all(|(i, b)| {
            if IDENTITY_HYPHENS.contains(&i) {
                *b == b'-'
            } else {
                b.is_ascii_hexdigit()
            }
        });
        if !shaped {
            return None;
        }
        Uuid::parse_str(s).ok().map(Self)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

// ---------------------------------------------------------------------------
// Snapshot record
// ---------------------------------------------------------------------------

/// One snapshot at one location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: SnapshotId,
    /// Relative to the location root, always `<id>/snapshot`.
    pub path: PathBuf,
    pub identity: Identity,
}

impl Snapshot {
    pub fn new(id: impl Into<SnapshotId>, path: impl Into<PathBuf>, identity: Identity) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            identity,
        }
    }

    /// The directory holding the subvolume and the manager's metadata file.
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {} ({})", self.id, self.path.display(), self.identity)
    }
}

/// Relative path of the snapshot with generation `id`.
pub fn snapshot_path(id: SnapshotId) -> PathBuf {
    PathBuf::from(id.to_string()).join(SNAPSHOT_LEAF)
}

/// One incremental transfer: send `child`, as a delta against `parent` when
/// present, as a full stream otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferStep {
    pub parent: Option<Snapshot>,
    pub child: Snapshot,
}

impl fmt::Display for TransferStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.parent {
            Some(parent) => write!(f, "{} -> {}", parent.path.display(), self.child.path.display()),
            None => write!(f, "(full) -> {}", self.child.path.display()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
