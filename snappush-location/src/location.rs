//! The capability every snapshot location exposes.

use std::io::Read;
use std::path::Path;

use snappush_core::Snapshot;

use crate::error::LocationError;
use crate::stream::SnapshotStream;

/// A place holding snapshots, local or remote.
///
/// Listings are raw text in `btrfs subvolume list` format; parsing them is
/// the caller's job. `dir` arguments are snapshot directories relative to
/// the location root (see [`Snapshot::dir`]).
pub trait Location {
    /// Human-readable location, used in logs and errors.
    fn describe(&self) -> String;

    /// Subvolumes usable as send sources, with their own uuids.
    fn list_for_send(&self) -> Result<String, LocationError>;

    /// Subvolumes usable as incremental parents on the receiving side, with
    /// the uuid they were received from.
    fn list_for_receive(&self) -> Result<String, LocationError>;

    /// Remove `snapshot` and its directory. Deleting an absent snapshot
    /// succeeds.
    fn delete(&self, snapshot: &Snapshot) -> Result<(), LocationError>;

    /// Stream `child`, as a delta against `parent` when given.
    fn send(
        &self,
        parent: Option<&Snapshot>,
        child: &Snapshot,
    ) -> Result<SnapshotStream, LocationError>;

    /// Materialize a send stream inside `dir`, creating it as needed.
    fn receive(&self, stream: &mut dyn Read, dir: &Path) -> Result<(), LocationError>;

    /// The snapshot manager's descriptor stored in `dir`.
    fn read_metadata(&self, dir: &Path) -> Result<Vec<u8>, LocationError>;

    fn write_metadata(&self, dir: &Path, contents: &[u8]) -> Result<(), LocationError>;
}
