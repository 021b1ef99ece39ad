//! Roster service adapters.
//!
//! An adapter owns the items of one (account, backend kind) pair and bridges
//! a live service with the cache:
//!
//! ```text
//! cache --load()--> items <--live events-- live service
//!                     |                        ^
//!        save() <-- dirty                      | set_label / update_tags
//! ```
//!
//! State changes follow `roster_core::lifecycle`. Live events are the only
//! source of change while prepared; local edits are forwarded to the live
//! service and take effect when its notification comes back.
//!
//! Handlers return [`AdapterAction`]s with adapter-local indices. The
//! aggregator turns them into global notifications and tag counts.

mod bookmarks;
mod contacts;
mod list;

pub use bookmarks::BookmarkService;
pub use contacts::ContactService;
pub use list::ItemList;

use roster_core::{RosterItem, ServiceKind};
use roster_types::{AdapterId, Address, CacheRecord, Conference, ConnectionId, LiveEvent, RecordKind};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::cache::{CacheScope, CacheStore};
use crate::error::RosterError;
use crate::live::{BookmarkClient, ContactClient, EntryChange, EventSink, LiveConnection};
use crate::writeback::WriteManager;

/// What an adapter operation did, in adapter-local terms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterAction {
    /// An item was added at `index`.
    Inserted {
        /// Local index.
        index: usize,
    },
    /// The item at `index` was removed.
    Removed {
        /// Local index before removal.
        index: usize,
    },
    /// The item at `index` changed in place.
    Changed {
        /// Local index.
        index: usize,
    },
    /// One more item carries the tag.
    TagAdded(String),
    /// One item fewer carries the tag.
    TagRemoved(String),
    /// The account started using a group name.
    GroupAdded(String),
    /// The account stopped using a group name.
    GroupRemoved(String),
}

/// A mutation ready to be sent to the live service.
///
/// Holds its own handle to the service, so sending it borrows nothing from
/// the adapter. If the adapter is shut down while the request is in flight,
/// the request still completes or fails on its own.
pub enum PendingMutation {
    /// Edit a contact list entry.
    SetEntry {
        /// Contact service of the connection.
        client: Arc<dyn ContactClient>,
        /// Entry to edit.
        address: Address,
        /// Requested change.
        change: EntryChange,
    },
    /// Replace a bookmark.
    UpdateBookmark {
        /// Bookmark service of the connection.
        client: Arc<dyn BookmarkClient>,
        /// Current value.
        old: Conference,
        /// Requested value.
        new: Conference,
    },
}

impl PendingMutation {
    /// Send and wait for the acknowledgement.
    pub async fn send(self) -> Result<(), RosterError> {
        match self {
            PendingMutation::SetEntry {
                client,
                address,
                change,
            } => client.set_entry(&address, change).await?,
            PendingMutation::UpdateBookmark { client, old, new } => {
                client.update_bookmark(&old, &new).await?
            }
        }
        Ok(())
    }
}

impl fmt::Debug for PendingMutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PendingMutation::SetEntry {
                address, change, ..
            } => f
                .debug_struct("SetEntry")
                .field("address", address)
                .field("change", change)
                .finish(),
            PendingMutation::UpdateBookmark { old, new, .. } => f
                .debug_struct("UpdateBookmark")
                .field("old", old)
                .field("new", new)
                .finish(),
        }
    }
}

/// Orders the cache writes of one adapter.
///
/// Each write runs on a detached task that only logs its outcome. Writes
/// take a shared gate one at a time, and a write that gets the gate after a
/// newer one has landed is skipped, so the newest snapshot always wins.
#[derive(Debug, Default)]
pub(crate) struct CacheWriter {
    issued: u64,
    landed: Arc<Mutex<u64>>,
}

impl CacheWriter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Hand an overwrite-all write to a detached task.
    pub(crate) fn spawn_put(
        &mut self,
        store: Arc<dyn CacheStore>,
        scope: CacheScope,
        kind: RecordKind,
        records: Vec<CacheRecord>,
    ) -> JoinHandle<()> {
        self.issued += 1;
        let seq = self.issued;
        let landed = Arc::clone(&self.landed);
        tokio::spawn(async move {
            let mut landed = landed.lock().await;
            if *landed > seq {
                tracing::debug!("Skipping superseded {} write #{} for {}", kind, seq, scope);
                return;
            }
            let count = records.len();
            match store.put(&scope, kind, records).await {
                Ok(()) => tracing::debug!("Saved {} {} records for {}", count, kind, scope),
                Err(e) => tracing::error!("Failed to save {} records for {}: {}", kind, scope, e),
            }
            *landed = seq;
        })
    }
}

/// Either kind of adapter.
#[derive(Debug)]
pub enum ServiceAdapter {
    /// Contact list adapter.
    Contacts(ContactService),
    /// Bookmark adapter.
    Bookmarks(BookmarkService),
}

macro_rules! dispatch {
    ($self:expr, $svc:ident => $body:expr) => {
        match $self {
            ServiceAdapter::Contacts($svc) => $body,
            ServiceAdapter::Bookmarks($svc) => $body,
        }
    };
}

impl ServiceAdapter {
    /// Create an unprepared, empty adapter of `kind`.
    pub fn new(kind: ServiceKind, account: &Address, writeman: WriteManager) -> Self {
        match kind {
            ServiceKind::Contacts => Self::Contacts(ContactService::new(account, writeman)),
            ServiceKind::Bookmarks => Self::Bookmarks(BookmarkService::new(account, writeman)),
        }
    }

    /// Adapter id, used to route live events.
    pub fn id(&self) -> AdapterId {
        dispatch!(self, svc => svc.id())
    }

    /// Backend kind.
    pub fn kind(&self) -> ServiceKind {
        match self {
            Self::Contacts(_) => ServiceKind::Contacts,
            Self::Bookmarks(_) => ServiceKind::Bookmarks,
        }
    }

    /// Owning account.
    pub fn account(&self) -> &Address {
        dispatch!(self, svc => svc.account())
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        dispatch!(self, svc => svc.len())
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Item at a local index.
    pub fn item(&self, index: usize) -> Option<&dyn RosterItem> {
        match self {
            Self::Contacts(svc) => svc.items().at(index).map(|i| i as &dyn RosterItem),
            Self::Bookmarks(svc) => svc.items().at(index).map(|i| i as &dyn RosterItem),
        }
    }

    /// Items in local order.
    pub fn items(&self) -> Box<dyn Iterator<Item = &dyn RosterItem> + '_> {
        match self {
            Self::Contacts(svc) => Box::new(svc.items().iter().map(|i| i as &dyn RosterItem)),
            Self::Bookmarks(svc) => Box::new(svc.items().iter().map(|i| i as &dyn RosterItem)),
        }
    }

    /// Local index of the item with `address`.
    pub fn position(&self, address: &Address) -> Option<usize> {
        dispatch!(self, svc => svc.items().position(address))
    }

    /// Whether a live service is bound.
    pub fn is_writable(&self) -> bool {
        dispatch!(self, svc => svc.is_writable())
    }

    /// Whether unsaved changes exist.
    pub fn is_dirty(&self) -> bool {
        dispatch!(self, svc => svc.is_dirty())
    }

    /// Load cached items. See [`ContactService::load`].
    pub async fn load(&mut self, store: &dyn CacheStore) -> Result<Vec<AdapterAction>, RosterError> {
        match self {
            Self::Contacts(svc) => svc.load(store).await,
            Self::Bookmarks(svc) => svc.load(store).await,
        }
    }

    /// Bind to a live connection.
    pub fn prepare(
        &mut self,
        connection: &dyn LiveConnection,
        sink: EventSink,
    ) -> Result<(), RosterError> {
        dispatch!(self, svc => svc.prepare(connection, sink))
    }

    /// Unbind from a live connection.
    pub fn shutdown(&mut self, connection: ConnectionId) -> Result<(), RosterError> {
        dispatch!(self, svc => svc.shutdown(connection))
    }

    /// Apply a live notification.
    ///
    /// Notifications of the other backend kind are ignored.
    pub fn handle_event(&mut self, event: LiveEvent) -> Result<Vec<AdapterAction>, RosterError> {
        match (self, event) {
            (Self::Contacts(svc), LiveEvent::Contact(event)) => svc.handle_event(event),
            (Self::Bookmarks(svc), LiveEvent::Bookmark(event)) => svc.handle_event(event),
            (adapter, event) => {
                tracing::warn!(
                    "Ignoring {:?} delivered to {} adapter of {}",
                    event,
                    adapter.kind(),
                    adapter.account()
                );
                Ok(Vec::new())
            }
        }
    }

    /// Persist if dirty. See [`ContactService::save`].
    pub fn save(&mut self, store: &Arc<dyn CacheStore>) -> Option<JoinHandle<()>> {
        dispatch!(self, svc => svc.save(store))
    }

    /// Drop all items.
    pub fn clear(&mut self) -> Result<(), RosterError> {
        dispatch!(self, svc => svc.clear())
    }

    /// Prepare a label change of the item with `address`.
    pub fn label_request(
        &self,
        address: &Address,
        label: Option<String>,
    ) -> Result<PendingMutation, RosterError> {
        dispatch!(self, svc => svc.label_request(address, label))
    }

    /// Prepare a tag change of the item with `address`.
    pub fn tags_request(
        &self,
        address: &Address,
        add: BTreeSet<String>,
        remove: BTreeSet<String>,
    ) -> Result<PendingMutation, RosterError> {
        dispatch!(self, svc => svc.tags_request(address, add, remove))
    }
}
