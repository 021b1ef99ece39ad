//! Apply a roster snapshot through the sync engine.
//!
//! The account is attached to an in-process mock service seeded from the
//! cache. The differences to the snapshot are then emitted as live
//! notifications, and the engine persists the result on shutdown exactly as
//! it would for a real connection.

use anyhow::{Context, Result};
use roster_client::{runtime, JsonFileStore, MockLiveService};
use roster_core::DelayConfig;
use roster_types::{Address, ContactEvent, RosterEntry};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use super::read_snapshot;

/// What a replay changed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Report {
    /// New contacts.
    pub added: usize,
    /// Contacts whose entry differed.
    pub changed: usize,
    /// Contacts missing from the snapshot.
    pub removed: usize,
    /// Contacts already up to date.
    pub unchanged: usize,
}

/// Run the replay command.
pub async fn run(
    store: &JsonFileStore,
    account: &Address,
    file: &Path,
    delay: DelayConfig,
) -> Result<()> {
    let snapshot = read_snapshot(file).await?;
    let wanted = snapshot
        .entries()
        .with_context(|| format!("Invalid entry in {}", file.display()))?;

    let report = replay(store, account, wanted, delay).await?;
    println!(
        "Replayed {} for {}: {} added, {} changed, {} removed, {} unchanged",
        file.display(),
        account.bare(),
        report.added,
        report.changed,
        report.removed,
        report.unchanged
    );
    Ok(())
}

async fn replay(
    store: &JsonFileStore,
    account: &Address,
    wanted: Vec<RosterEntry>,
    delay: DelayConfig,
) -> Result<Report> {
    let (roster, task) = runtime::spawn(Arc::new(store.clone()), delay);
    let live = MockLiveService::new();
    roster
        .attach(Arc::new(live.connection(account)))
        .await
        .with_context(|| format!("Failed to attach {}", account))?;

    // Attaching pushed the cached contacts to the service.
    let current = live.entries();
    let by_address: HashMap<&Address, &RosterEntry> =
        current.iter().map(|entry| (&entry.address, entry)).collect();

    let mut report = Report::default();
    let mut keep = HashSet::new();
    for entry in wanted {
        keep.insert(entry.address.clone());
        match by_address.get(&entry.address) {
            Some(existing) if **existing == entry => report.unchanged += 1,
            Some(_) => {
                live.emit_contact(ContactEvent::EntryChanged(entry));
                report.changed += 1;
            }
            None => {
                live.emit_contact(ContactEvent::EntryAdded(entry));
                report.added += 1;
            }
        }
    }
    for entry in current.iter().filter(|entry| !keep.contains(&entry.address)) {
        live.emit_contact(ContactEvent::EntryRemoved(entry.clone()));
        report.removed += 1;
    }
    tracing::debug!("Replay emitted {:?}", report);

    roster.shutdown().await.context("Failed to shut down roster")?;
    task.await.context("Roster task failed")?;
    Ok(report)
}
