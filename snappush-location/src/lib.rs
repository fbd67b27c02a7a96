//! Snapshot locations: where snapshots live and how to reach them.
//!
//! A [`Location`] is addressed by a [`LocationSpec`] (`[user@]host:path` or
//! a local path). [`BtrfsLocation`] runs btrfs through a [`Transport`],
//! either `sh -c` locally or ssh remotely.

mod btrfs;
mod error;
mod location;
pub mod spec;
mod stream;
pub mod transport;

pub use btrfs::BtrfsLocation;
pub use error::LocationError;
pub use location::Location;
pub use spec::LocationSpec;
pub use stream::SnapshotStream;
pub use transport::Transport;
