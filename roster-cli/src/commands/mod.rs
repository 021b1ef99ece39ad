//! CLI command implementations.

pub mod export;
pub mod import;
pub mod list;
pub mod replay;
pub mod tags;

use anyhow::{Context, Result};
use roster_client::{CacheScope, CacheStore, JsonFileStore};
use roster_core::{BookmarkItem, ContactItem};
use roster_types::{Address, CacheRecord, RecordKind, RosterSnapshot};
use std::path::Path;

/// Cached contacts of `account`, in stored order.
pub(crate) async fn cached_contacts(
    store: &JsonFileStore,
    account: &Address,
) -> Result<Vec<ContactItem>> {
    let account = account.bare();
    let records = store
        .get_all(&CacheScope::account(&account), RecordKind::Contact)
        .await
        .with_context(|| format!("Failed to read cached contacts of {}", account))?;

    Ok(records
        .iter()
        .filter_map(|record| match record {
            CacheRecord::Contact(record) => Some(ContactItem::from_record(&account, record)),
            CacheRecord::Bookmark(_) => None,
        })
        .collect())
}

/// Cached bookmarks of `account`, in stored order.
pub(crate) async fn cached_bookmarks(
    store: &JsonFileStore,
    account: &Address,
) -> Result<Vec<BookmarkItem>> {
    let account = account.bare();
    let records = store
        .get_all(&CacheScope::account(&account), RecordKind::Bookmark)
        .await
        .with_context(|| format!("Failed to read cached bookmarks of {}", account))?;

    Ok(records
        .iter()
        .filter_map(|record| match record {
            CacheRecord::Bookmark(record) => Some(BookmarkItem::from_record(&account, record)),
            CacheRecord::Contact(_) => None,
        })
        .collect())
}

/// Read a roster snapshot file.
pub(crate) async fn read_snapshot(path: &Path) -> Result<RosterSnapshot> {
    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    RosterSnapshot::from_json(&json)
        .with_context(|| format!("Failed to parse roster snapshot {}", path.display()))
}
