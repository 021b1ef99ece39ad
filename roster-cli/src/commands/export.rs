//! Print an account's cached contacts as a roster snapshot.

use anyhow::{Context, Result};
use roster_client::JsonFileStore;
use roster_core::RosterItem;
use roster_types::{Address, RosterSnapshot};

use super::cached_contacts;

/// Run the export command.
pub async fn run(store: &JsonFileStore, account: &Address) -> Result<()> {
    let snapshot = snapshot(store, account).await?;
    println!("{}", snapshot.to_json().context("Failed to encode snapshot")?);
    Ok(())
}

async fn snapshot(store: &JsonFileStore, account: &Address) -> Result<RosterSnapshot> {
    let mut snapshot = RosterSnapshot::new();
    for item in cached_contacts(store, account).await? {
        snapshot.insert(item.address(), item.to_snapshot_entry());
    }
    Ok(snapshot)
}
