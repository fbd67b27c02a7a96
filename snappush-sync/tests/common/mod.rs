//! In-memory `Location` used by the driver tests.
//!
//! Listings are rendered in `btrfs subvolume list` format so the real
//! parser runs. A received stream carries the sent snapshot's id and
//! identity, so a completed run leaves the destination listing exactly what
//! a real receive would. A failed receive leaves a partial subvolume that
//! lists without an identity and blocks later receives until deleted.
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::Read;
use std::path::{Path, PathBuf};

use snappush_core::{snapshot_path, Identity, Snapshot, SnapshotId};
use snappush_location::{Location, LocationError, SnapshotStream};

pub fn identity(n: u64) -> Identity {
    Identity::parse(&format!("00000000-0000-4000-8000-{n:012x}")).unwrap()
}

pub fn snap(id: u64) -> Snapshot {
    Snapshot::new(id, snapshot_path(SnapshotId(id)), identity(id))
}

/// Which operation should fail, for error-path tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fail {
    List,
    Delete(u64),
    Send(u64),
    Receive(u64),
    ReadMetadata(u64),
}

#[derive(Default)]
pub struct MemoryLocation {
    name: String,
    snapshots: RefCell<BTreeMap<SnapshotId, Snapshot>>,
    metadata: RefCell<HashMap<PathBuf, Vec<u8>>>,
    partial: RefCell<BTreeSet<u64>>,
    calls: RefCell<Vec<String>>,
    fail: RefCell<Option<Fail>>,
}

impl MemoryLocation {
    pub fn new(name: &str, snapshots: impl IntoIterator<Item = Snapshot>) -> Self {
        let location = Self {
            name: name.to_string(),
            ..Self::default()
        };
        for snapshot in snapshots {
            location
                .metadata
                .borrow_mut()
                .insert(snapshot.dir().to_path_buf(), metadata_for(&snapshot));
            location.snapshots.borrow_mut().insert(snapshot.id, snapshot);
        }
        location
    }

    pub fn with_ids(name: &str, ids: &[u64]) -> Self {
        Self::new(name, ids.iter().map(|id| snap(*id)))
    }

    pub fn failing(self, fail: Fail) -> Self {
        *self.fail.borrow_mut() = Some(fail);
        self
    }

    /// Clear the injected failure, keeping whatever state it left behind.
    pub fn heal(&self) {
        *self.fail.borrow_mut() = None;
    }

    /// Ids holding a partially received subvolume.
    pub fn partial(&self) -> Vec<u64> {
        self.partial.borrow().iter().copied().collect()
    }

    pub fn ids(&self) -> Vec<u64> {
        self.snapshots.borrow().keys().map(|id| id.0).collect()
    }

    pub fn snapshot(&self, id: u64) -> Option<Snapshot> {
        self.snapshots.borrow().get(&SnapshotId(id)).cloned()
    }

    pub fn metadata(&self, dir: &str) -> Option<Vec<u8>> {
        self.metadata.borrow().get(Path::new(dir)).cloned()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    /// Calls that change state.
    pub fn mutations(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with("delete") || c.starts_with("receive") || c.starts_with("write"))
            .collect()
    }

    fn record(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }

    fn check(&self, op: Fail) -> Result<(), LocationError> {
        if self.fail.borrow().as_ref() == Some(&op) {
            return Err(LocationError::Io {
                context: format!("{op:?}"),
                source: std::io::Error::other("injected failure"),
            });
        }
        Ok(())
    }

    fn listing(&self, column: &str) -> Result<String, LocationError> {
        self.check(Fail::List)?;
        let mut text = format!("ID 5 gen 1 parent 0 top level 0 {column} - path {}\n", self.name);
        for id in self.partial.borrow().iter() {
            text.push_str(&format!(
                "ID {} gen 10 parent 256 top level 256 {column} - path {}/{}\n",
                300 + id,
                self.name,
                snapshot_path(SnapshotId(*id)).display()
            ));
        }
        for snapshot in self.snapshots.borrow().values() {
            text.push_str(&format!(
                "ID {} gen 10 parent 256 top level 256 {column} {} path {}/{}\n",
                300 + snapshot.id.0,
                snapshot.identity,
                self.name,
                snapshot.path.display()
            ));
        }
        Ok(text)
    }
}

fn metadata_for(snapshot: &Snapshot) -> Vec<u8> {
    format!("<snapshot><num>{}</num></snapshot>", snapshot.id).into_bytes()
}

impl Location for MemoryLocation {
    fn describe(&self) -> String {
        self.name.clone()
    }

    fn list_for_send(&self) -> Result<String, LocationError> {
        self.record("list send".to_string());
        self.listing("uuid")
    }

    fn list_for_receive(&self) -> Result<String, LocationError> {
        self.record("list receive".to_string());
        self.listing("received_uuid")
    }

    fn delete(&self, snapshot: &Snapshot) -> Result<(), LocationError> {
        self.record(format!("delete {}", snapshot.id));
        self.check(Fail::Delete(snapshot.id.0))?;
        self.snapshots.borrow_mut().remove(&snapshot.id);
        self.partial.borrow_mut().remove(&snapshot.id.0);
        self.metadata.borrow_mut().remove(snapshot.dir());
        Ok(())
    }

    fn send(
        &self,
        parent: Option<&Snapshot>,
        child: &Snapshot,
    ) -> Result<SnapshotStream, LocationError> {
        let parent_id = parent.map_or("-".to_string(), |p| p.id.to_string());
        self.record(format!("send {parent_id} {}", child.id));
        self.check(Fail::Send(child.id.0))?;
        let payload = format!("{} {}", child.id, child.identity);
        Ok(SnapshotStream::from_bytes(payload, "memory send"))
    }

    fn receive(&self, stream: &mut dyn Read, dir: &Path) -> Result<(), LocationError> {
        let mut payload = String::new();
        stream
            .read_to_string(&mut payload)
            .map_err(|e| LocationError::Io {
                context: "read stream".to_string(),
                source: e,
            })?;
        let (id, identity) = payload.split_once(' ').expect("payload shape");
        let id: u64 = id.parse().expect("payload id");
        self.record(format!("receive {id} into {}", dir.display()));
        if self.partial.borrow().contains(&id) || self.snapshots.borrow().contains_key(&SnapshotId(id)) {
            return Err(LocationError::Io {
                context: format!("receive {id}"),
                source: std::io::Error::from(std::io::ErrorKind::AlreadyExists),
            });
        }
        if let Err(e) = self.check(Fail::Receive(id)) {
            self.partial.borrow_mut().insert(id);
            return Err(e);
        }
        let snapshot = Snapshot::new(id, snapshot_path(SnapshotId(id)), Identity::parse(identity).unwrap());
        self.snapshots.borrow_mut().insert(snapshot.id, snapshot);
        Ok(())
    }

    fn read_metadata(&self, dir: &Path) -> Result<Vec<u8>, LocationError> {
        self.record(format!("read {}", dir.display()));
        let id: u64 = dir.to_string_lossy().parse().expect("dir is an id");
        self.check(Fail::ReadMetadata(id))?;
        self.metadata
            .borrow()
            .get(dir)
            .cloned()
            .ok_or_else(|| LocationError::Io {
                context: format!("read {}", dir.display()),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            })
    }

    fn write_metadata(&self, dir: &Path, contents: &[u8]) -> Result<(), LocationError> {
        self.record(format!("write {}", dir.display()));
        self.metadata
            .borrow_mut()
            .insert(dir.to_path_buf(), contents.to_vec());
        Ok(())
    }
}
