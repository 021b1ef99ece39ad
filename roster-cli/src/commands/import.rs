//! Replace an account's cached contacts with a roster snapshot.

use anyhow::{Context, Result};
use roster_client::{CacheScope, CacheStore, JsonFileStore};
use roster_core::{ContactItem, RosterItem};
use roster_types::{Address, CacheRecord, RecordKind};
use std::path::Path;

use super::read_snapshot;

/// Run the import command.
pub async fn run(store: &JsonFileStore, account: &Address, file: &Path) -> Result<()> {
    let snapshot = read_snapshot(file).await?;
    let entries = snapshot
        .entries()
        .with_context(|| format!("Invalid entry in {}", file.display()))?;

    let account = account.bare();
    let records: Vec<CacheRecord> = entries
        .iter()
        .map(|entry| ContactItem::wrap(&account, entry).to_record())
        .collect();
    let count = records.len();

    store
        .put(&CacheScope::account(&account), RecordKind::Contact, records)
        .await
        .with_context(|| format!("Failed to write cached contacts of {}", account))?;

    tracing::info!("Imported {} contacts for {}", count, account);
    println!("Imported {} contacts for {}", count, account);
    Ok(())
}
