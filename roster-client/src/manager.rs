//! Roster aggregator.
//!
//! [`RosterManager`] owns one adapter per (connection, backend kind) and
//! presents their items as a single list. Global indices are the offset of
//! the owning adapter plus the local index, in attach order. It also keeps
//! the reference-counted tag index and fans [`RosterEvent`]s out to
//! subscribers.
//!
//! The manager is not shared. Drive it from one task, or use
//! [`runtime::spawn`](crate::runtime::spawn) which does exactly that.

use roster_core::{RosterItem, ServiceKind, TagChange, TagIndex};
use roster_types::{AdapterId, Address, ConnectionId};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::adapter::{AdapterAction, PendingMutation, ServiceAdapter};
use crate::cache::CacheStore;
use crate::error::RosterError;
use crate::live::{EventSink, LiveConnection, SourceEvent};
use crate::writeback::WriteManager;

/// Stable reference to an item: the adapter holding it and its address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemKey {
    /// Owning adapter.
    pub source: AdapterId,
    /// Item address.
    pub address: Address,
}

/// Owned snapshot of one item, positioned in the global list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemView {
    /// Global index.
    pub index: usize,
    /// Owning adapter.
    pub source: AdapterId,
    /// Backend kind.
    pub kind: ServiceKind,
    /// Owning account.
    pub account: Address,
    /// Item address.
    pub address: Address,
    /// Display label, falling back to the address.
    pub label: String,
    /// Tags; empty for bookmarks.
    pub tags: BTreeSet<String>,
}

impl ItemView {
    fn new(index: usize, source: AdapterId, item: &dyn RosterItem) -> Self {
        Self {
            index,
            source,
            kind: item.kind(),
            account: item.account().clone(),
            address: item.address().clone(),
            label: item.label().into_owned(),
            tags: item.tags().clone(),
        }
    }

    /// Key of the viewed item.
    pub fn key(&self) -> ItemKey {
        ItemKey {
            source: self.source,
            address: self.address.clone(),
        }
    }
}

/// Notification about the aggregated roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RosterEvent {
    /// An item now sits at `index`.
    ItemInserted {
        /// Global index.
        index: usize,
    },
    /// The item at `index` is gone; later items moved up by one.
    ItemRemoved {
        /// Global index before removal.
        index: usize,
    },
    /// The item at `index` changed.
    ItemChanged {
        /// Global index.
        index: usize,
    },
    /// The first item carrying the tag appeared.
    TagAppeared(String),
    /// The last item carrying the tag went away.
    TagDisappeared(String),
    /// An account started using a group name.
    GroupAdded {
        /// Account reporting the group.
        account: Address,
        /// Group name.
        group: String,
    },
    /// An account stopped using a group name.
    GroupRemoved {
        /// Account reporting the group.
        account: Address,
        /// Group name.
        group: String,
    },
    /// A connection's adapters joined the roster.
    SourceAttached {
        /// Account of the connection.
        account: Address,
        /// The connection.
        connection: ConnectionId,
    },
    /// A connection's adapters left the roster.
    SourceDetached {
        /// Account of the connection.
        account: Address,
        /// The connection.
        connection: ConnectionId,
    },
}

/// Aggregates the adapters of all attached connections.
pub struct RosterManager {
    store: Arc<dyn CacheStore>,
    writeman: WriteManager,
    sink: EventSink,
    sources: Vec<ServiceAdapter>,
    connections: HashMap<ConnectionId, (Address, Vec<AdapterId>)>,
    tags: TagIndex,
    subscribers: Vec<mpsc::UnboundedSender<RosterEvent>>,
}

impl RosterManager {
    /// Create an empty roster.
    ///
    /// Returns the receiving end of the live event channel; feed what arrives
    /// there into [`dispatch`](Self::dispatch).
    pub fn new(
        store: Arc<dyn CacheStore>,
        writeman: WriteManager,
    ) -> (Self, mpsc::UnboundedReceiver<SourceEvent>) {
        let (sink, rx) = mpsc::unbounded_channel();
        let manager = Self {
            store,
            writeman,
            sink,
            sources: Vec::new(),
            connections: HashMap::new(),
            tags: TagIndex::new(),
            subscribers: Vec::new(),
        };
        (manager, rx)
    }

    /// Subscribe to roster notifications.
    ///
    /// Every subscriber gets every notification from now on, however large
    /// the burst (attaching a big cached roster emits one insert per item).
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<RosterEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    fn emit(&mut self, event: RosterEvent) {
        tracing::trace!("Roster event: {:?}", event);
        // Subscribers whose receiver is gone are dropped.
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Attach a live connection: one adapter per backend kind, loaded from
    /// the cache and bound to the connection.
    ///
    /// A cache read failure is logged and the adapter starts empty.
    pub async fn attach(&mut self, connection: &dyn LiveConnection) -> Result<(), RosterError> {
        let id = connection.id();
        if self.connections.contains_key(&id) {
            return Err(RosterError::AlreadyAttached(id));
        }
        let account = connection.account().bare();

        let mut attached = Vec::with_capacity(ServiceKind::ALL.len());
        for kind in ServiceKind::ALL {
            let mut adapter = ServiceAdapter::new(kind, &account, self.writeman.clone());
            let actions = match adapter.load(self.store.as_ref()).await {
                Ok(actions) => actions,
                Err(e) => {
                    tracing::warn!("Failed to load cached {} of {}: {}", kind, account, e);
                    Vec::new()
                }
            };
            adapter.prepare(connection, self.sink.clone())?;
            attached.push((adapter, actions));
        }

        let mut ids = Vec::with_capacity(attached.len());
        for (adapter, actions) in attached {
            ids.push(adapter.id());
            self.sources.push(adapter);
            self.apply(self.sources.len() - 1, actions);
        }
        self.connections.insert(id, (account.clone(), ids));

        tracing::info!("Attached {} via {}", account, id);
        self.emit(RosterEvent::SourceAttached {
            account,
            connection: id,
        });
        Ok(())
    }

    /// Detach a connection, dropping its adapters after a final save.
    ///
    /// Returns the pending cache writes.
    pub fn detach(&mut self, connection: ConnectionId) -> Result<Vec<JoinHandle<()>>, RosterError> {
        let (account, ids) = self
            .connections
            .remove(&connection)
            .ok_or(RosterError::UnknownConnection(connection))?;

        let mut writes = Vec::new();
        for id in ids {
            let Some(pos) = self.position(id) else {
                continue;
            };
            if let Err(e) = self.sources[pos].shutdown(connection) {
                tracing::warn!("Shutting down {} of {}: {}", self.sources[pos].kind(), account, e);
            }

            let offset = self.offset(pos);
            let carried: Vec<Vec<String>> = self.sources[pos]
                .items()
                .map(|item| item.tags().iter().cloned().collect())
                .collect();
            for (local, tags) in carried.into_iter().enumerate().rev() {
                for tag in tags {
                    self.untag(&tag);
                }
                self.emit(RosterEvent::ItemRemoved {
                    index: offset + local,
                });
            }

            writes.extend(self.sources[pos].save(&self.store));
            self.sources.remove(pos);
        }

        tracing::info!("Detached {} via {}", account, connection);
        self.emit(RosterEvent::SourceDetached {
            account,
            connection,
        });
        Ok(writes)
    }

    /// Detach every connection.
    pub fn shutdown(&mut self) -> Vec<JoinHandle<()>> {
        let connections: Vec<ConnectionId> = self.connections.keys().copied().collect();
        let mut writes = Vec::new();
        for connection in connections {
            match self.detach(connection) {
                Ok(pending) => writes.extend(pending),
                Err(e) => tracing::warn!("Detaching {}: {}", connection, e),
            }
        }
        writes
    }

    /// Route a live notification to the adapter that subscribed for it.
    ///
    /// Notifications for adapters that are gone are dropped.
    pub fn dispatch(&mut self, event: SourceEvent) -> Result<(), RosterError> {
        let Some(pos) = self.position(event.source) else {
            tracing::debug!("Dropping event for detached {}", event.source);
            return Ok(());
        };
        let actions = self.sources[pos].handle_event(event.event)?;
        self.apply(pos, actions);
        Ok(())
    }

    fn apply(&mut self, pos: usize, actions: Vec<AdapterAction>) {
        let offset = self.offset(pos);
        for action in actions {
            match action {
                AdapterAction::Inserted { index } => self.emit(RosterEvent::ItemInserted {
                    index: offset + index,
                }),
                AdapterAction::Removed { index } => self.emit(RosterEvent::ItemRemoved {
                    index: offset + index,
                }),
                AdapterAction::Changed { index } => self.emit(RosterEvent::ItemChanged {
                    index: offset + index,
                }),
                AdapterAction::TagAdded(tag) => {
                    if let Some(TagChange::Appeared(tag)) = self.tags.add(&tag) {
                        self.emit(RosterEvent::TagAppeared(tag));
                    }
                }
                AdapterAction::TagRemoved(tag) => self.untag(&tag),
                AdapterAction::GroupAdded(group) => self.emit(RosterEvent::GroupAdded {
                    account: self.sources[pos].account().clone(),
                    group,
                }),
                AdapterAction::GroupRemoved(group) => self.emit(RosterEvent::GroupRemoved {
                    account: self.sources[pos].account().clone(),
                    group,
                }),
            }
        }
    }

    fn untag(&mut self, tag: &str) {
        if let Some(TagChange::Disappeared(tag)) = self.tags.remove(tag) {
            self.emit(RosterEvent::TagDisappeared(tag));
        }
    }

    /// Save every dirty adapter. Returns the pending cache writes.
    pub fn save_all(&mut self) -> Vec<JoinHandle<()>> {
        let store = &self.store;
        self.sources
            .iter_mut()
            .filter_map(|adapter| adapter.save(store))
            .collect()
    }

    fn position(&self, source: AdapterId) -> Option<usize> {
        self.sources.iter().position(|adapter| adapter.id() == source)
    }

    fn offset(&self, pos: usize) -> usize {
        self.sources[..pos].iter().map(ServiceAdapter::len).sum()
    }

    fn source(&self, source: AdapterId) -> Result<&ServiceAdapter, RosterError> {
        self.sources
            .iter()
            .find(|adapter| adapter.id() == source)
            .ok_or(RosterError::UnknownSource(source))
    }

    /// Global index of an item.
    pub fn index(&self, key: &ItemKey) -> Option<usize> {
        let mut offset = 0;
        for adapter in &self.sources {
            if adapter.id() == key.source {
                return adapter.position(&key.address).map(|local| offset + local);
            }
            offset += adapter.len();
        }
        None
    }

    /// Total number of items.
    pub fn len(&self) -> usize {
        self.sources.iter().map(ServiceAdapter::len).sum()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Item at a global index.
    pub fn get(&self, index: usize) -> Option<ItemView> {
        let mut offset = 0;
        for adapter in &self.sources {
            if index < offset + adapter.len() {
                return adapter
                    .item(index - offset)
                    .map(|item| ItemView::new(index, adapter.id(), item));
            }
            offset += adapter.len();
        }
        None
    }

    /// All items in global order.
    pub fn iter(&self) -> impl Iterator<Item = ItemView> + '_ {
        self.sources
            .iter()
            .flat_map(|adapter| adapter.items().map(move |item| (adapter.id(), item)))
            .enumerate()
            .map(|(index, (source, item))| ItemView::new(index, source, item))
    }

    /// Tag index.
    pub fn tags(&self) -> &TagIndex {
        &self.tags
    }

    /// Attached adapters in attach order.
    pub fn sources(&self) -> &[ServiceAdapter] {
        &self.sources
    }

    /// Attached connections.
    pub fn connections(&self) -> impl Iterator<Item = (ConnectionId, &Address)> + '_ {
        self.connections
            .iter()
            .map(|(id, (account, _))| (*id, account))
    }

    /// Prepare a label change of an item.
    pub fn label_request(
        &self,
        key: &ItemKey,
        label: Option<String>,
    ) -> Result<PendingMutation, RosterError> {
        self.source(key.source)?.label_request(&key.address, label)
    }

    /// Prepare a tag change of an item.
    pub fn tags_request(
        &self,
        key: &ItemKey,
        add: BTreeSet<String>,
        remove: BTreeSet<String>,
    ) -> Result<PendingMutation, RosterError> {
        self.source(key.source)?.tags_request(&key.address, add, remove)
    }
}

impl std::fmt::Debug for RosterManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RosterManager")
            .field("sources", &self.sources.len())
            .field("connections", &self.connections.len())
            .field("items", &self.len())
            .field("tags", &self.tags.len())
            .finish()
    }
}
