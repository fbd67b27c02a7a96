//! Default mode: reconcile the destination with the source.

use anyhow::{Context, Result};
use colored::Colorize;

use snappush_location::Location;
use snappush_sync::{pipeline, DeleteResult, SyncOptions, SyncReport, TransferResult};

pub fn run(source: &dyn Location, destination: &dyn Location, options: SyncOptions) -> Result<()> {
    let report = pipeline::run(source, destination, &options).with_context(|| {
        format!(
            "sync from '{}' to '{}' failed",
            source.describe(),
            destination.describe()
        )
    })?;
    print_report(&report, options.dry_run);
    Ok(())
}

fn print_report(report: &SyncReport, dry_run: bool) {
    let prefix = if dry_run { "[dry-run] " } else { "" };
    let target = format!("'{}' -> '{}'", report.source, report.destination);

    if report.is_noop() {
        println!("{prefix}{} {target}: nothing to do", "✓".green());
        return;
    }

    let (deletes, transfers) = (report.deletes.len(), report.transfers.len());
    if dry_run {
        println!(
            "{prefix}{} {target}: would delete {deletes}, would transfer {transfers}",
            "✓".green()
        );
    } else {
        println!(
            "{} {target} synced ({deletes} deleted, {transfers} transferred)",
            "✓".green()
        );
    }

    for d in &report.deletes {
        match d {
            DeleteResult::Deleted { snapshot } => println!("  {}  {snapshot}", "✗".red()),
            DeleteResult::WouldDelete { snapshot } => println!("  {}  {snapshot}", "-".yellow()),
        }
    }
    for t in &report.transfers {
        match t {
            TransferResult::Transferred { step } => println!("  {}  {step}", "✎".green()),
            TransferResult::WouldTransfer { step } => println!("  {}  {step}", "~".cyan()),
        }
    }
}
