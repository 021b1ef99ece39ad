//! Group chat bookmark adapter.
//!
//! Bookmarks carry no tags. Label changes replace the whole bookmark on the
//! live service.

use roster_core::{AdapterState, BookmarkItem, LifecycleEvent, RosterItem, ServiceKind};
use roster_types::{
    AdapterId, Address, BookmarkEvent, CacheRecord, Conference, ConnectionId, RecordKind,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::task::JoinHandle;

use super::{AdapterAction, CacheWriter, ItemList, PendingMutation};
use crate::cache::{CacheScope, CacheStore};
use crate::error::RosterError;
use crate::live::{BookmarkClient, EventSink, LiveConnection, Subscription};
use crate::writeback::WriteManager;

const KIND: ServiceKind = ServiceKind::Bookmarks;

/// Adapter for one account's bookmarks.
pub struct BookmarkService {
    id: AdapterId,
    account: Address,
    scope: CacheScope,
    state: AdapterState,
    items: ItemList<BookmarkItem>,
    dirty: bool,
    writer: CacheWriter,
    writeman: WriteManager,
    client: Option<Arc<dyn BookmarkClient>>,
    subscription: Option<Subscription>,
}

impl BookmarkService {
    /// Create an unprepared, empty adapter for `account`.
    pub fn new(account: &Address, writeman: WriteManager) -> Self {
        let account = account.bare();
        Self {
            id: AdapterId::next(),
            scope: CacheScope::account(&account),
            account,
            state: AdapterState::new(),
            items: ItemList::new(),
            dirty: false,
            writer: CacheWriter::new(),
            writeman,
            client: None,
            subscription: None,
        }
    }

    /// Adapter id.
    pub fn id(&self) -> AdapterId {
        self.id
    }

    /// Owning account.
    pub fn account(&self) -> &Address {
        &self.account
    }

    /// Lifecycle state.
    pub fn state(&self) -> AdapterState {
        self.state
    }

    /// Items in order.
    pub fn items(&self) -> &ItemList<BookmarkItem> {
        &self.items
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// True iff bound to a live connection.
    pub fn is_writable(&self) -> bool {
        self.state.is_writable()
    }

    /// Whether unsaved changes exist.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Load cached bookmarks. Same rules as [`ContactService::load`].
    ///
    /// [`ContactService::load`]: super::ContactService::load
    pub async fn load(&mut self, store: &dyn CacheStore) -> Result<Vec<AdapterAction>, RosterError> {
        let next = self.state.on_event(LifecycleEvent::Load)?;
        let records = store.get_all(&self.scope, RecordKind::Bookmark).await?;
        tracing::debug!(
            "Obtained {} bookmark records from cache for {}",
            records.len(),
            self.account
        );

        let mut actions = Vec::new();
        for record in records {
            let CacheRecord::Bookmark(record) = record else {
                tracing::warn!("Skipping non-bookmark record in bookmark cache of {}", self.account);
                continue;
            };
            match self.items.push(BookmarkItem::from_record(&self.account, &record)) {
                Some(index) => actions.push(AdapterAction::Inserted { index }),
                None => tracing::warn!(
                    "Skipping duplicate cached bookmark {} of {}",
                    record.address,
                    self.account
                ),
            }
        }

        self.state = next;
        Ok(actions)
    }

    /// Bind to `connection` and subscribe to bookmark notifications.
    pub fn prepare(
        &mut self,
        connection: &dyn LiveConnection,
        sink: EventSink,
    ) -> Result<(), RosterError> {
        let next = self.state.on_event(LifecycleEvent::Prepare(connection.id()))?;

        let client = connection.bookmarks();
        self.subscription = Some(client.subscribe(self.id, sink));
        self.client = Some(client);
        self.state = next;

        tracing::debug!("Bookmarks of {} prepared for {}", self.account, connection.id());
        Ok(())
    }

    /// Unbind from `connection`.
    pub fn shutdown(&mut self, connection: ConnectionId) -> Result<(), RosterError> {
        self.state.apply(LifecycleEvent::Shutdown(connection))?;
        if let Some(subscription) = self.subscription.take() {
            subscription.release();
        }
        self.client = None;

        tracing::debug!("Bookmarks of {} shut down from {}", self.account, connection);
        Ok(())
    }

    /// Drop all items so the cache can be loaded again.
    pub fn clear(&mut self) -> Result<(), RosterError> {
        self.state.apply(LifecycleEvent::Clear)?;
        self.items.clear();
        self.dirty = false;
        Ok(())
    }

    /// Apply a live notification.
    pub fn handle_event(&mut self, event: BookmarkEvent) -> Result<Vec<AdapterAction>, RosterError> {
        if !self.state.is_writable() {
            tracing::debug!(
                "Dropping bookmark event for {} while not prepared: {:?}",
                self.account,
                event
            );
            return Ok(Vec::new());
        }

        match event {
            BookmarkEvent::Added(conference) => Ok(self.upsert(&conference)),
            BookmarkEvent::Removed(conference) => self.remove(&conference.address),
            BookmarkEvent::Changed { old, new } if old.address != new.address => {
                // Moved to another room: the old entry goes away.
                let mut actions = self.remove(&old.address)?;
                actions.extend(self.upsert(&new));
                Ok(actions)
            }
            BookmarkEvent::Changed { new, .. } => {
                if self.items.position(&new.address).is_none() {
                    return Err(inconsistent(&self.account, &new.address));
                }
                Ok(self.upsert(&new))
            }
        }
    }

    fn upsert(&mut self, conference: &Conference) -> Vec<AdapterAction> {
        let action = match self.items.get_mut(&conference.address) {
            Some((index, item)) => {
                item.update(conference);
                AdapterAction::Changed { index }
            }
            None => match self.items.push(BookmarkItem::wrap(&self.account, conference)) {
                Some(index) => AdapterAction::Inserted { index },
                None => return Vec::new(),
            },
        };
        self.mark_dirty();
        vec![action]
    }

    fn remove(&mut self, address: &Address) -> Result<Vec<AdapterAction>, RosterError> {
        let (index, _) = self
            .items
            .remove(address)
            .ok_or_else(|| inconsistent(&self.account, address))?;
        self.mark_dirty();
        Ok(vec![AdapterAction::Removed { index }])
    }

    fn mark_dirty(&mut self) {
        self.dirty = true;
        self.writeman.request_writeback();
    }

    /// Persist bookmarks if they changed.
    pub fn save(&mut self, store: &Arc<dyn CacheStore>) -> Option<JoinHandle<()>> {
        if !self.dirty {
            return None;
        }
        let records: Vec<CacheRecord> = self.items.iter().map(|item| item.to_record()).collect();
        self.dirty = false;
        Some(self.writer.spawn_put(
            Arc::clone(store),
            self.scope.clone(),
            RecordKind::Bookmark,
            records,
        ))
    }

    /// Build a bookmark replacement carrying the new label.
    pub fn label_request(
        &self,
        address: &Address,
        label: Option<String>,
    ) -> Result<PendingMutation, RosterError> {
        let client = match (&self.client, self.state.is_writable()) {
            (Some(client), true) => Arc::clone(client),
            _ => {
                return Err(RosterError::NotWritable {
                    account: self.account.clone(),
                    kind: KIND,
                })
            }
        };
        let (_, item) = self
            .items
            .get(address)
            .ok_or_else(|| RosterError::UnknownItem {
                account: self.account.clone(),
                kind: KIND,
                address: address.clone(),
            })?;

        let old = item.to_conference();
        let new = Conference {
            name: label,
            ..old.clone()
        };
        Ok(PendingMutation::UpdateBookmark { client, old, new })
    }

    /// Bookmarks cannot be tagged. Always fails.
    pub fn tags_request(
        &self,
        _address: &Address,
        _add: BTreeSet<String>,
        _remove: BTreeSet<String>,
    ) -> Result<PendingMutation, RosterError> {
        Err(RosterError::Unsupported {
            kind: KIND,
            operation: "update_tags",
        })
    }

    /// Ask the live service to relabel a bookmark and wait for the answer.
    pub async fn set_label(&self, address: &Address, label: Option<String>) -> Result<(), RosterError> {
        self.label_request(address, label)?.send().await
    }
}

fn inconsistent(account: &Address, address: &Address) -> RosterError {
    tracing::error!(
        "Live service refers to unknown bookmark {} of {}",
        address,
        account
    );
    RosterError::Inconsistent {
        account: account.clone(),
        kind: KIND,
        address: address.clone(),
    }
}

impl std::fmt::Debug for BookmarkService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookmarkService")
            .field("id", &self.id)
            .field("account", &self.account)
            .field("state", &self.state)
            .field("items", &self.items.len())
            .field("dirty", &self.dirty)
            .finish()
    }
}
