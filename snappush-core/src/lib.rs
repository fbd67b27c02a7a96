//! snappush core library: snapshot records, inventories, configuration.
//!
//! - [`types`]: ids, identities, snapshot records, transfer steps
//! - [`inventory`]: triple-indexed inventory and listing parser
//! - [`config`]: optional YAML configuration
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod error;
pub mod inventory;
pub mod types;

pub use config::{Config, SshConfig};
pub use error::ConfigError;
pub use inventory::{parse_listing_line, Inventory};
pub use types::{snapshot_path, Identity, Snapshot, SnapshotId, TransferStep};
