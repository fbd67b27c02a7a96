//! Per-location snapshot inventory.
//!
//! # Listing format
//!
//! Built from the output of `btrfs subvolume list -o -p -u|-R <root>/`, one
//! subvolume per line:
//!
//! ```text
//! ID 262 gen 51 parent 5 top level 5 uuid 0b9e6d9c-5c0e-4b4e-9d0a-3f1c2b7a6e51 path @snapshots/42/snapshot
//! ```
//!
//! Token 10 is the identity, token 12 the subvolume path. Only paths ending
//! in `<id>/snapshot` with a positive id describe managed snapshots; every
//! other line is skipped.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use crate::types::{Identity, Snapshot, SnapshotId, SNAPSHOT_LEAF};

const IDENTITY_TOKEN: usize = 10;
const PATH_TOKEN: usize = 12;

/// btrfs prints `-` when a subvolume has no (received) uuid.
const NO_IDENTITY: &str = "-";

/// Snapshot records of one location, reachable by id, path and identity.
///
/// Records live in the id map; the path and identity maps index into it, so
/// the three views always describe the same record set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    by_id: BTreeMap<SnapshotId, Snapshot>,
    by_path: HashMap<PathBuf, SnapshotId>,
    by_identity: HashMap<Identity, SnapshotId>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an inventory from raw listing text, skipping unrelated lines.
    pub fn from_listing(text: &str) -> Self {
        let mut inventory = Self::new();
        for line in text.lines() {
            let Some(snapshot) = parse_listing_line(line) else {
                continue;
            };
            let kept = snapshot.to_string();
            for dropped in inventory.add(snapshot) {
                tracing::warn!(
                    kept = %kept,
                    dropped = %dropped,
                    "listing has two subvolumes sharing a key; the earlier one is ignored"
                );
            }
        }
        inventory
    }

    /// Insert `snapshot`, replacing any record that shares one of its keys.
    /// Returns the replaced records that differ from `snapshot`.
    pub fn add(&mut self, snapshot: Snapshot) -> Vec<Snapshot> {
        let stale: Vec<SnapshotId> = [
            Some(snapshot.id),
            self.by_path.get(&snapshot.path).copied(),
            self.by_identity.get(&snapshot.identity).copied(),
        ]
        .into_iter()
        .flatten()
        .collect();
        let mut evicted = Vec::new();
        for id in stale {
            if let Some(old) = self.by_id.get(&id).cloned() {
                self.remove(&old);
                if old != snapshot && !evicted.contains(&old) {
                    evicted.push(old);
                }
            }
        }

        self.by_path.insert(snapshot.path.clone(), snapshot.id);
        self.by_identity.insert(snapshot.identity, snapshot.id);
        self.by_id.insert(snapshot.id, snapshot);
        evicted
    }

    /// Remove `snapshot` from all three indices. Absent records are ignored.
    pub fn remove(&mut self, snapshot: &Snapshot) {
        if self.by_id.get(&snapshot.id) == Some(snapshot) {
            self.by_id.remove(&snapshot.id);
        }
        if self.by_path.get(&snapshot.path) == Some(&snapshot.id) {
            self.by_path.remove(&snapshot.path);
        }
        if self.by_identity.get(&snapshot.identity) == Some(&snapshot.id) {
            self.by_identity.remove(&snapshot.identity);
        }
    }

    pub fn get_by_id(&self, id: SnapshotId) -> Option<&Snapshot> {
        self.by_id.get(&id)
    }

    pub fn get_by_path(&self, path: &Path) -> Option<&Snapshot> {
        self.by_path.get(path).and_then(|id| self.by_id.get(id))
    }

    pub fn get_by_identity(&self, identity: &Identity) -> Option<&Snapshot> {
        self.by_identity.get(identity).and_then(|id| self.by_id.get(id))
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Records in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Snapshot> {
        self.by_id.values()
    }

    pub fn ids(&self) -> Vec<SnapshotId> {
        self.by_id.keys().copied().collect()
    }

    /// Paths in ascending id order.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.by_id.values().map(|s| s.path.clone()).collect()
    }
}

impl FromIterator<Snapshot> for Inventory {
    fn from_iter<I: IntoIterator<Item = Snapshot>>(iter: I) -> Self {
        let mut inventory = Self::new();
        for snapshot in iter {
            let _ = inventory.add(snapshot);
        }
        inventory
    }
}

/// Parse one listing line into a managed snapshot record.
///
/// Returns `None` for anything that is not a managed snapshot: the root
/// subvolume, unrelated subvolumes, subvolumes without an identity, or
/// malformed lines.
pub fn parse_listing_line(line: &str) -> Option<Snapshot> {
    if line.trim().is_empty() {
        return None;
    }
    let tokens = match shell_words::split(line) {
        Ok(tokens) => tokens,
        Err(err) => {
            tracing::debug!(%line, error = %err, "skipping untokenizable listing line");
            return None;
        }
    };
    let (Some(identity), Some(path)) = (tokens.get(IDENTITY_TOKEN), tokens.get(PATH_TOKEN)) else {
        tracing::debug!(%line, "skipping short listing line");
        return None;
    };

    let Some((id, path)) = managed_path(Path::new(path)) else {
        tracing::debug!(%path, "skipping subvolume outside the snapshot layout");
        return None;
    };

    if identity == NO_IDENTITY {
        tracing::debug!(path = %path.display(), "skipping subvolume without identity");
        return None;
    }
    let Some(identity) = Identity::parse(identity) else {
        tracing::debug!(path = %path.display(), %identity, "skipping malformed identity");
        return None;
    };

    Some(Snapshot { id, path, identity })
}

/// Split `.../<id>/snapshot` into the id and the relative `<id>/snapshot`.
fn managed_path(path: &Path) -> Option<(SnapshotId, PathBuf)> {
    if path.file_name()? != SNAPSHOT_LEAF {
        return None;
    }
    let dir = path.parent()?.file_name()?.to_str()?;
    let id: u64 = dir.parse().ok()?;
    if id == 0 {
        return None;
    }
    Some((SnapshotId(id), Path::new(dir).join(SNAPSHOT_LEAF)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const UUID_A: &str = "0b9e6d9c-5c0e-4b4e-9d0a-3f1c2b7a6e51";
    const UUID_B: &str = "5d2f0a3e-1b7c-4e0d-8a96-2c4b1e9f7d30";

    fn line(identity: &str, path: &str) -> String {
        format!("ID 262 gen 51 parent 5 top level 5 uuid {identity} path {path}")
    }

    fn snap(id: u64, identity: &str) -> Snapshot {
        Snapshot::new(id, format!("{id}/snapshot"), Identity::parse(identity).unwrap())
    }

    #[test]
    fn parses_managed_snapshot_line() {
        let parsed = parse_listing_line(&line(UUID_A, "@snapshots/42/snapshot")).expect("parsed");
        assert_eq!(parsed.id, SnapshotId(42));
        assert_eq!(parsed.path, PathBuf::from("42/snapshot"));
        assert_eq!(parsed.identity.to_string(), UUID_A);
    }

    #[test]
    fn skips_placeholder_identity() {
        assert!(parse_listing_line(&line("-", "@snapshots/42/snapshot")).is_none());
    }

    #[test]
    fn skips_unrelated_and_zero_id_paths() {
        assert!(parse_listing_line(&line(UUID_A, "@home")).is_none());
        assert!(parse_listing_line(&line(UUID_A, "@snapshots/0/snapshot")).is_none());
        assert!(parse_listing_line(&line(UUID_A, "@snapshots/x/snapshot")).is_none());
        assert!(parse_listing_line(&line(UUID_A, "@snapshots/42/other")).is_none());
    }

    #[test]
    fn skips_short_and_blank_lines() {
        assert!(parse_listing_line("").is_none());
        assert!(parse_listing_line("ID 5 gen 1").is_none());
        assert!(parse_listing_line("ID 'unbalanced").is_none());
    }

    #[test]
    fn quoted_path_tokens_are_unquoted() {
        let parsed = parse_listing_line(&line(UUID_A, "'my snaps/7/snapshot'")).expect("parsed");
        assert_eq!(parsed.id, SnapshotId(7));
    }

    #[test]
    fn add_then_remove_clears_every_index() {
        let mut inventory = Inventory::new();
        let s = snap(3, UUID_A);
        inventory.add(s.clone());
        assert_eq!(inventory.get_by_id(s.id), Some(&s));

        inventory.remove(&s);
        assert!(inventory.get_by_id(s.id).is_none());
        assert!(inventory.get_by_path(&s.path).is_none());
        assert!(inventory.get_by_identity(&s.identity).is_none());
        assert!(inventory.is_empty());
    }

    #[test]
    fn remove_absent_is_noop() {
        let mut inventory: Inventory = [snap(1, UUID_A)].into_iter().collect();
        inventory.remove(&snap(2, UUID_B));
        assert_eq!(inventory.len(), 1);
    }

    #[test]
    fn add_evicts_records_sharing_a_key() {
        let mut inventory: Inventory = [snap(1, UUID_A), snap(2, UUID_B)].into_iter().collect();
        // Same identity as #1 under a new id.
        let evicted = inventory.add(snap(3, UUID_A));
        assert_eq!(evicted, vec![snap(1, UUID_A)]);
        assert_eq!(inventory.ids(), vec![SnapshotId(2), SnapshotId(3)]);
        assert_eq!(inventory.get_by_identity(&Identity::parse(UUID_A).unwrap()).unwrap().id, SnapshotId(3));
        assert!(inventory.get_by_path(Path::new("1/snapshot")).is_none());
    }

    #[test]
    fn from_listing_skips_root_and_keeps_order() {
        let text = [
            line(UUID_B, "@snapshots/10/snapshot"),
            "ID 5 gen 9 parent 0 top level 0 uuid - path <FS_TREE>".to_string(),
            line(UUID_A, "@snapshots/2/snapshot"),
            String::new(),
        ]
        .join("\n");
        let inventory = Inventory::from_listing(&text);
        assert_eq!(inventory.ids(), vec![SnapshotId(2), SnapshotId(10)]);
    }

    #[test]
    fn re_adding_an_identical_record_evicts_nothing() {
        let mut inventory: Inventory = [snap(1, UUID_A)].into_iter().collect();
        assert!(inventory.add(snap(1, UUID_A)).is_empty());
        assert_eq!(inventory.len(), 1);
    }

    #[test]
    fn from_listing_keeps_later_of_two_received_copies() {
        // A snapshot taken of a received subvolume inherits its received_uuid.
        let text = [line(UUID_A, "@snapshots/4/snapshot"), line(UUID_A, "@snapshots/9/snapshot")]
            .join("\n");
        let inventory = Inventory::from_listing(&text);
        assert_eq!(inventory.ids(), vec![SnapshotId(9)]);
        assert!(inventory.get_by_path(Path::new("4/snapshot")).is_none());
    }
}
