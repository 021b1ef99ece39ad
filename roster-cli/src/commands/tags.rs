//! Show the tag index over several accounts.

use anyhow::Result;
use roster_client::JsonFileStore;
use roster_core::{RosterItem, TagIndex};
use roster_types::Address;

use super::cached_contacts;

/// Run the tags command.
pub async fn run(store: &JsonFileStore, accounts: &[Address]) -> Result<()> {
    let index = collect(store, accounts).await?;

    if index.is_empty() {
        println!("No tags in use.");
        return Ok(());
    }
    let width = index.iter().map(|(tag, _)| tag.len()).max().unwrap_or(0);
    for (tag, count) in index.iter() {
        println!("{:width$}  {}", tag, count, width = width);
    }
    Ok(())
}

/// Count every tag carried by the accounts' cached contacts.
async fn collect(store: &JsonFileStore, accounts: &[Address]) -> Result<TagIndex> {
    let mut index = TagIndex::new();
    for account in accounts {
        for item in cached_contacts(store, account).await? {
            for tag in item.tags() {
                index.add(tag);
            }
        }
    }
    Ok(index)
}
