//! `--list`: print both inventories without changing anything.

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use snappush_core::{Inventory, Snapshot};
use snappush_location::Location;
use snappush_sync::pipeline;

#[derive(Serialize)]
struct InventoryJson<'a> {
    location: String,
    snapshots: Vec<&'a Snapshot>,
}

#[derive(Serialize)]
struct ListingJson<'a> {
    source: InventoryJson<'a>,
    destination: InventoryJson<'a>,
}

#[derive(Tabled)]
struct SnapshotRow {
    #[tabled(rename = "id")]
    id: u64,
    #[tabled(rename = "path")]
    path: String,
    #[tabled(rename = "identity")]
    identity: String,
}

pub fn run(source: &dyn Location, destination: &dyn Location, json: bool) -> Result<()> {
    let (source_snapshots, destination_snapshots) =
        pipeline::inventories(source, destination).context("failed to list snapshots")?;

    if json {
        let payload = ListingJson {
            source: InventoryJson {
                location: source.describe(),
                snapshots: source_snapshots.iter().collect(),
            },
            destination: InventoryJson {
                location: destination.describe(),
                snapshots: destination_snapshots.iter().collect(),
            },
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&payload).context("failed to serialize listing JSON")?
        );
        return Ok(());
    }

    print_table("source", &source.describe(), &source_snapshots);
    print_table("destination", &destination.describe(), &destination_snapshots);
    Ok(())
}

fn print_table(role: &str, location: &str, inventory: &Inventory) {
    println!(
        "{} {location} ({} snapshots)",
        role.to_uppercase().bold(),
        inventory.len()
    );
    if inventory.is_empty() {
        println!("No snapshots.");
        return;
    }
    let rows: Vec<SnapshotRow> = inventory
        .iter()
        .map(|s| SnapshotRow {
            id: s.id.0,
            path: s.path.display().to_string(),
            identity: s.identity.to_string(),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}
