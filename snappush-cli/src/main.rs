//! snappush: mirror a directory of numbered btrfs snapshots to a backup
//! location with incremental send/receive.
//!
//! # Usage
//!
//! ```text
//! snappush [OPTIONS] <SOURCE> <DESTINATION>
//! snappush --list [--json] <SOURCE> <DESTINATION>
//! ```
//!
//! Either location may be a local path or `[user@]host:path`.

mod commands;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};

use snappush_core::{config, Config};
use snappush_location::BtrfsLocation;
use snappush_sync::SyncOptions;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "snappush",
    version,
    about = "Push numbered btrfs snapshots to a backup location",
    long_about = None,
)]
struct Cli {
    /// Snapshot directory to read from: a local path or `[user@]host:path`.
    source: String,

    /// Snapshot directory to bring up to date: a local path or `[user@]host:path`.
    destination: String,

    /// Show what would be deleted and transferred without changing anything.
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Delete destination snapshots that conflict with the source.
    #[arg(short, long)]
    force: bool,

    /// Print both snapshot inventories and exit.
    #[arg(short, long)]
    list: bool,

    /// Emit machine-readable JSON (with `--list`).
    #[arg(long, requires = "list")]
    json: bool,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Log every command that is run (same as -vv).
    #[arg(long)]
    debug: bool,

    /// Read configuration from this file instead of the user config directory.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

impl Cli {
    fn log_level(&self) -> &'static str {
        if self.debug || self.verbose >= 2 {
            "debug"
        } else if self.verbose == 1 {
            "info"
        } else {
            "warn"
        }
    }

    fn options(&self) -> SyncOptions {
        SyncOptions {
            dry_run: self.dry_run,
            force: self.force,
        }
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level());

    let config = load_config(cli.config.as_deref())?;
    tracing::debug!(?config, "configuration");
    let source = BtrfsLocation::parse(&cli.source, &config)
        .with_context(|| format!("invalid source '{}'", cli.source))?;
    let destination = BtrfsLocation::parse(&cli.destination, &config)
        .with_context(|| format!("invalid destination '{}'", cli.destination))?;

    if cli.list {
        return commands::list::run(&source, &destination, cli.json);
    }
    commands::push::run(&source, &destination, cli.options())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => config::load_file(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => config::load().context("failed to load user config"),
    }
}

/// Logs go to stderr so stdout stays clean for `--json`. `RUST_LOG` wins
/// over the command-line level.
fn init_tracing(default_level: &str) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
