//! Contact list adapter.

use roster_core::{AdapterState, ContactItem, LifecycleEvent, RosterItem, ServiceKind};
use roster_types::{
    AdapterId, Address, CacheRecord, ConnectionId, ContactEvent, RecordKind, RosterEntry,
    RosterSnapshot,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::task::JoinHandle;

use super::{AdapterAction, CacheWriter, ItemList, PendingMutation};
use crate::cache::{CacheScope, CacheStore};
use crate::error::RosterError;
use crate::live::{ContactClient, EntryChange, EventSink, LiveConnection, Subscription};
use crate::writeback::WriteManager;

const KIND: ServiceKind = ServiceKind::Contacts;

/// Adapter for one account's contact list.
pub struct ContactService {
    id: AdapterId,
    account: Address,
    scope: CacheScope,
    state: AdapterState,
    items: ItemList<ContactItem>,
    dirty: bool,
    writer: CacheWriter,
    writeman: WriteManager,
    client: Option<Arc<dyn ContactClient>>,
    subscription: Option<Subscription>,
}

impl ContactService {
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
    pub fn items(&self) -> &ItemList<ContactItem> {
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

    /// True iff bound to a live connection. Never cache this.
    pub fn is_writable(&self) -> bool {
        self.state.is_writable()
    }

    /// Whether unsaved changes exist.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Load the cached contact list.
    ///
    /// Fails with a lifecycle error when items were loaded already (until
    /// [`clear`](Self::clear)) or when prepared. A cache failure leaves the
    /// adapter unloaded.
    pub async fn load(&mut self, store: &dyn CacheStore) -> Result<Vec<AdapterAction>, RosterError> {
        let next = self.state.on_event(LifecycleEvent::Load)?;
        let records = store.get_all(&self.scope, RecordKind::Contact).await?;
        tracing::debug!(
            "Obtained {} contact records from cache for {}",
            records.len(),
            self.account
        );

        let mut actions = Vec::new();
        for record in records {
            let CacheRecord::Contact(record) = record else {
                tracing::warn!("Skipping non-contact record in contact cache of {}", self.account);
                continue;
            };
            let item = ContactItem::from_record(&self.account, &record);
            let tags: Vec<String> = item.tags().iter().cloned().collect();
            match self.items.push(item) {
                Some(index) => {
                    actions.push(AdapterAction::Inserted { index });
                    actions.extend(tags.into_iter().map(AdapterAction::TagAdded));
                }
                None => tracing::warn!(
                    "Skipping duplicate cached contact {} of {}",
                    record.address,
                    self.account
                ),
            }
        }

        self.state = next;
        Ok(actions)
    }

    /// Bind to `connection`: subscribe to contact list notifications and
    /// push the current items to the service as a snapshot.
    pub fn prepare(
        &mut self,
        connection: &dyn LiveConnection,
        sink: EventSink,
    ) -> Result<(), RosterError> {
        let next = self.state.on_event(LifecycleEvent::Prepare(connection.id()))?;

        let client = connection.contacts();
        self.subscription = Some(client.subscribe(self.id, sink));
        client.import_snapshot(self.snapshot());
        self.client = Some(client);
        self.state = next;

        tracing::debug!("Contacts of {} prepared for {}", self.account, connection.id());
        Ok(())
    }

    /// Unbind from `connection` and stop receiving notifications.
    ///
    /// Requests already sent to the service are not cancelled.
    pub fn shutdown(&mut self, connection: ConnectionId) -> Result<(), RosterError> {
        self.state.apply(LifecycleEvent::Shutdown(connection))?;
        if let Some(subscription) = self.subscription.take() {
            subscription.release();
        }
        self.client = None;

        tracing::debug!("Contacts of {} shut down from {}", self.account, connection);
        Ok(())
    }

    /// Drop all items so the cache can be loaded again.
    pub fn clear(&mut self) -> Result<(), RosterError> {
        self.state.apply(LifecycleEvent::Clear)?;
        self.items.clear();
        self.dirty = false;
        Ok(())
    }

    /// The current contact list as a roster snapshot.
    pub fn snapshot(&self) -> RosterSnapshot {
        let mut snapshot = RosterSnapshot::new();
        for item in self.items.iter() {
            snapshot.insert(item.address(), item.to_snapshot_entry());
        }
        snapshot
    }

    /// Apply a live notification.
    ///
    /// Notifications arriving while not prepared are dropped.
    pub fn handle_event(&mut self, event: ContactEvent) -> Result<Vec<AdapterAction>, RosterError> {
        if !self.state.is_writable() {
            tracing::debug!(
                "Dropping contact event for {} while not prepared: {:?}",
                self.account,
                event
            );
            return Ok(Vec::new());
        }

        match event {
            ContactEvent::EntryAdded(entry) => {
                if self.items.position(&entry.address).is_some() {
                    tracing::debug!(
                        "Contact {} of {} added twice; applying as change",
                        entry.address,
                        self.account
                    );
                    return self.entry_changed(&entry);
                }
                Ok(self.entry_added(&entry))
            }
            ContactEvent::EntryRemoved(entry) => self.entry_removed(&entry.address),
            ContactEvent::EntryChanged(entry) => self.entry_changed(&entry),
            ContactEvent::GroupAdded(group) => Ok(vec![AdapterAction::GroupAdded(group)]),
            ContactEvent::GroupRemoved(group) => Ok(vec![AdapterAction::GroupRemoved(group)]),
        }
    }

    fn entry_added(&mut self, entry: &RosterEntry) -> Vec<AdapterAction> {
        let item = ContactItem::wrap(&self.account, entry);
        let tags: Vec<String> = item.tags().iter().cloned().collect();

        let mut actions = Vec::with_capacity(1 + tags.len());
        if let Some(index) = self.items.push(item) {
            actions.push(AdapterAction::Inserted { index });
            actions.extend(tags.into_iter().map(AdapterAction::TagAdded));
        }
        self.mark_dirty();
        actions
    }

    fn entry_removed(&mut self, address: &Address) -> Result<Vec<AdapterAction>, RosterError> {
        let (index, item) = self
            .items
            .remove(address)
            .ok_or_else(|| inconsistent(&self.account, address))?;

        let mut actions: Vec<AdapterAction> = item
            .tags()
            .iter()
            .cloned()
            .map(AdapterAction::TagRemoved)
            .collect();
        actions.push(AdapterAction::Removed { index });
        self.mark_dirty();
        Ok(actions)
    }

    fn entry_changed(&mut self, entry: &RosterEntry) -> Result<Vec<AdapterAction>, RosterError> {
        let (index, item) = self
            .items
            .get_mut(&entry.address)
            .ok_or_else(|| inconsistent(&self.account, &entry.address))?;
        let delta = item.update(entry);

        let mut actions = vec![AdapterAction::Changed { index }];
        actions.extend(delta.added.into_iter().map(AdapterAction::TagAdded));
        actions.extend(delta.removed.into_iter().map(AdapterAction::TagRemoved));
        self.mark_dirty();
        Ok(actions)
    }

    fn mark_dirty(&mut self) {
        self.dirty = true;
        self.writeman.request_writeback();
    }

    /// Persist the contact list if it changed.
    ///
    /// The dirty flag is cleared as soon as the write is handed off; a write
    /// that later fails is only logged and the changes stay unsaved until
    /// the next modification.
    pub fn save(&mut self, store: &Arc<dyn CacheStore>) -> Option<JoinHandle<()>> {
        if !self.dirty {
            return None;
        }
        let records: Vec<CacheRecord> = self.items.iter().map(|item| item.to_record()).collect();
        self.dirty = false;
        Some(self.writer.spawn_put(
            Arc::clone(store),
            self.scope.clone(),
            RecordKind::Contact,
            records,
        ))
    }

    fn writable_client(&self) -> Result<Arc<dyn ContactClient>, RosterError> {
        match (&self.client, self.state.is_writable()) {
            (Some(client), true) => Ok(Arc::clone(client)),
            _ => Err(RosterError::NotWritable {
                account: self.account.clone(),
                kind: KIND,
            }),
        }
    }

    fn require_item(&self, address: &Address) -> Result<(), RosterError> {
        match self.items.position(address) {
            Some(_) => Ok(()),
            None => Err(RosterError::UnknownItem {
                account: self.account.clone(),
                kind: KIND,
                address: address.clone(),
            }),
        }
    }

    /// Build a label change for the contact with `address`.
    pub fn label_request(
        &self,
        address: &Address,
        label: Option<String>,
    ) -> Result<PendingMutation, RosterError> {
        let client = self.writable_client()?;
        self.require_item(address)?;
        Ok(PendingMutation::SetEntry {
            client,
            address: address.clone(),
            change: EntryChange::rename(label),
        })
    }

    /// Build a tag change for the contact with `address`.
    pub fn tags_request(
        &self,
        address: &Address,
        add: BTreeSet<String>,
        remove: BTreeSet<String>,
    ) -> Result<PendingMutation, RosterError> {
        let client = self.writable_client()?;
        self.require_item(address)?;
        Ok(PendingMutation::SetEntry {
            client,
            address: address.clone(),
            change: EntryChange::regroup(add, remove),
        })
    }

    /// Ask the live service to relabel a contact and wait for the answer.
    pub async fn set_label(&self, address: &Address, label: Option<String>) -> Result<(), RosterError> {
        self.label_request(address, label)?.send().await
    }

    /// Ask the live service to retag a contact and wait for the answer.
    pub async fn update_tags(
        &self,
        address: &Address,
        add: BTreeSet<String>,
        remove: BTreeSet<String>,
    ) -> Result<(), RosterError> {
        self.tags_request(address, add, remove)?.send().await
    }
}

fn inconsistent(account: &Address, address: &Address) -> RosterError {
    tracing::error!(
        "Live service refers to unknown contact {} of {}",
        address,
        account
    );
    RosterError::Inconsistent {
        account: account.clone(),
        kind: KIND,
        address: address.clone(),
    }
}

impl std::fmt::Debug for ContactService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContactService")
            .field("id", &self.id)
            .field("account", &self.account)
            .field("state", &self.state)
            .field("items", &self.items.len())
            .field("dirty", &self.dirty)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCacheStore;
    use crate::live::{LiveError, MockLiveService};
    use roster_core::{DelayConfig, LifecycleError};
    use roster_types::{ContactRecord, LiveEvent};
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn addr(s: &str) -> Address {
        Address::parse(s).unwrap()
    }

    fn account() -> Address {
        addr("me@example.org")
    }

    fn writeman() -> WriteManager {
        WriteManager::new(DelayConfig::new(Duration::from_secs(3600), None), || {})
    }

    fn cached(store: &MemoryCacheStore, contacts: &[(&str, &[&str])]) {
        let records = contacts
            .iter()
            .map(|(address, tags)| {
                let mut record = ContactRecord::new(addr(address));
                record.tags = tags.iter().map(|t| t.to_string()).collect();
                CacheRecord::Contact(record)
            })
            .collect();
        store.insert(&CacheScope::account(&account()), RecordKind::Contact, records);
    }

    fn prepared(
        service: &MockLiveService,
    ) -> (ContactService, mpsc::UnboundedReceiver<crate::live::SourceEvent>, ConnectionId) {
        let mut svc = ContactService::new(&account(), writeman());
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = service.connection(&account());
        svc.prepare(&conn, tx).unwrap();
        (svc, rx, conn.id())
    }

    // ===========================================
    // Loading
    // ===========================================

    #[tokio::test]
    async fn load_materializes_cached_contacts() {
        let store = MemoryCacheStore::new();
        cached(&store, &[("a@x.example", &["Work"]), ("b@x.example", &["Work", "Chess"])]);

        let mut svc = ContactService::new(&account(), writeman());
        let actions = svc.load(&store).await.unwrap();

        assert_eq!(svc.len(), 2);
        assert_eq!(
            actions,
            vec![
                AdapterAction::Inserted { index: 0 },
                AdapterAction::TagAdded("Work".into()),
                AdapterAction::Inserted { index: 1 },
                AdapterAction::TagAdded("Chess".into()),
                AdapterAction::TagAdded("Work".into()),
            ]
        );
        assert!(!svc.is_dirty());
    }

    #[tokio::test]
    async fn second_load_fails_until_cleared() {
        let store = MemoryCacheStore::new();
        let mut svc = ContactService::new(&account(), writeman());
        svc.load(&store).await.unwrap();

        for _ in 0..2 {
            assert!(matches!(
                svc.load(&store).await,
                Err(RosterError::Lifecycle(LifecycleError::AlreadyLoaded))
            ));
        }

        svc.clear().unwrap();
        assert!(svc.load(&store).await.is_ok());
    }

    #[tokio::test]
    async fn load_while_prepared_fails() {
        let live = MockLiveService::new();
        let (mut svc, _rx, _) = prepared(&live);
        let store = MemoryCacheStore::new();

        assert!(matches!(
            svc.load(&store).await,
            Err(RosterError::Lifecycle(LifecycleError::LoadWhilePrepared(_)))
        ));
    }

    #[tokio::test]
    async fn failed_cache_read_leaves_adapter_unloaded() {
        let store = MemoryCacheStore::new();
        store.fail_next_get("offline");
        let mut svc = ContactService::new(&account(), writeman());

        assert!(matches!(svc.load(&store).await, Err(RosterError::Cache(_))));
        assert!(svc.load(&store).await.is_ok());
    }

    // ===========================================
    // Lifecycle
    // ===========================================

    #[tokio::test]
    async fn prepare_pushes_snapshot_and_subscribes() {
        let store = MemoryCacheStore::new();
        cached(&store, &[("a@x.example", &["Work"])]);
        let live = MockLiveService::new();

        let mut svc = ContactService::new(&account(), writeman());
        svc.load(&store).await.unwrap();
        let (tx, _rx) = mpsc::unbounded_channel();
        let conn = live.connection(&account());
        svc.prepare(&conn, tx.clone()).unwrap();

        assert!(svc.is_writable());
        assert_eq!(live.contact_subscribers(), 1);
        let snapshots = live.imported_snapshots();
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].items["a@x.example"].groups, vec!["Work".to_string()]);

        assert!(matches!(
            svc.prepare(&conn, tx),
            Err(RosterError::Lifecycle(LifecycleError::AlreadyPrepared(_)))
        ));
    }

    #[tokio::test]
    async fn shutdown_releases_subscription() {
        let live = MockLiveService::new();
        let (mut svc, _rx, conn) = prepared(&live);

        assert!(matches!(
            svc.shutdown(ConnectionId::next()),
            Err(RosterError::Lifecycle(LifecycleError::ConnectionMismatch { .. }))
        ));
        svc.shutdown(conn).unwrap();

        assert!(!svc.is_writable());
        assert_eq!(live.contact_subscribers(), 0);
        assert!(matches!(
            svc.shutdown(conn),
            Err(RosterError::Lifecycle(LifecycleError::NotPrepared))
        ));
    }

    // ===========================================
    // Live events
    // ===========================================

    #[tokio::test]
    async fn live_events_update_items() {
        let live = MockLiveService::new();
        let (mut svc, _rx, _) = prepared(&live);
        let alice = addr("alice@x.example");

        let actions = svc
            .handle_event(ContactEvent::EntryAdded(
                RosterEntry::new(alice.clone()).with_group("Work"),
            ))
            .unwrap();
        assert_eq!(
            actions,
            vec![
                AdapterAction::Inserted { index: 0 },
                AdapterAction::TagAdded("Work".into())
            ]
        );
        assert!(svc.is_dirty());

        let actions = svc
            .handle_event(ContactEvent::EntryChanged(
                RosterEntry::new(alice.clone())
                    .with_name("Alice")
                    .with_group("Friends"),
            ))
            .unwrap();
        assert_eq!(
            actions,
            vec![
                AdapterAction::Changed { index: 0 },
                AdapterAction::TagAdded("Friends".into()),
                AdapterAction::TagRemoved("Work".into()),
            ]
        );
        assert_eq!(svc.items().at(0).unwrap().label(), "Alice");

        let actions = svc
            .handle_event(ContactEvent::EntryRemoved(RosterEntry::new(alice)))
            .unwrap();
        assert_eq!(
            actions,
            vec![
                AdapterAction::TagRemoved("Friends".into()),
                AdapterAction::Removed { index: 0 }
            ]
        );
        assert!(svc.is_empty());
    }

    #[tokio::test]
    async fn duplicate_add_is_applied_as_change() {
        let live = MockLiveService::new();
        let (mut svc, _rx, _) = prepared(&live);
        let bob = addr("bob@x.example");

        svc.handle_event(ContactEvent::EntryAdded(RosterEntry::new(bob.clone())))
            .unwrap();
        let actions = svc
            .handle_event(ContactEvent::EntryAdded(
                RosterEntry::new(bob).with_group("Chess"),
            ))
            .unwrap();

        assert_eq!(
            actions,
            vec![
                AdapterAction::Changed { index: 0 },
                AdapterAction::TagAdded("Chess".into())
            ]
        );
        assert_eq!(svc.len(), 1);
    }

    #[tokio::test]
    async fn removing_unknown_entry_is_inconsistent() {
        let live = MockLiveService::new();
        let (mut svc, _rx, _) = prepared(&live);

        let result = svc.handle_event(ContactEvent::EntryRemoved(RosterEntry::new(addr(
            "ghost@x.example",
        ))));
        assert!(matches!(result, Err(RosterError::Inconsistent { .. })));
    }

    #[tokio::test]
    async fn group_vocabulary_is_forwarded() {
        let live = MockLiveService::new();
        let (mut svc, _rx, _) = prepared(&live);

        let actions = svc
            .handle_event(ContactEvent::GroupAdded("Family".into()))
            .unwrap();
        assert_eq!(actions, vec![AdapterAction::GroupAdded("Family".into())]);
        assert!(!svc.is_dirty());
    }

    #[tokio::test]
    async fn events_while_unprepared_are_dropped() {
        let mut svc = ContactService::new(&account(), writeman());
        let actions = svc
            .handle_event(ContactEvent::EntryAdded(RosterEntry::new(addr("a@x.example"))))
            .unwrap();

        assert!(actions.is_empty());
        assert!(svc.is_empty());
    }

    #[tokio::test]
    async fn subscription_routes_events_with_adapter_id() {
        let live = MockLiveService::new();
        let (svc, mut rx, _) = prepared(&live);

        live.emit_contact(ContactEvent::GroupAdded("Work".into()));
        let event = rx.recv().await.unwrap();
        assert_eq!(event.source, svc.id());
        assert!(matches!(event.event, LiveEvent::Contact(_)));
    }

    // ===========================================
    // Mutations
    // ===========================================

    #[tokio::test]
    async fn set_label_requires_prepared_adapter() {
        let store = MemoryCacheStore::new();
        cached(&store, &[("a@x.example", &[])]);
        let mut svc = ContactService::new(&account(), writeman());
        svc.load(&store).await.unwrap();

        let result = svc.set_label(&addr("a@x.example"), Some("A".into())).await;
        assert!(matches!(result, Err(RosterError::NotWritable { .. })));
        assert_eq!(svc.items().at(0).unwrap().label(), "a@x.example");
    }

    #[tokio::test]
    async fn set_label_forwards_without_local_change() {
        let live = MockLiveService::new();
        let (mut svc, mut rx, _) = prepared(&live);
        let alice = addr("alice@x.example");
        svc.handle_event(ContactEvent::EntryAdded(RosterEntry::new(alice.clone())))
            .unwrap();

        svc.set_label(&alice, Some("Alice".into())).await.unwrap();
        assert_eq!(
            live.set_entry_calls(),
            vec![(alice.clone(), EntryChange::rename(Some("Alice".into())))]
        );
        // Local state waits for the echoed notification.
        assert_eq!(svc.items().at(0).unwrap().label(), "alice@x.example");

        let echoed = rx.recv().await.unwrap();
        svc.handle_event(match echoed.event {
            LiveEvent::Contact(event) => event,
            other => panic!("expected contact event, got {:?}", other),
        })
        .unwrap();
        assert_eq!(svc.items().at(0).unwrap().label(), "Alice");
    }

    #[tokio::test]
    async fn live_failure_propagates() {
        let live = MockLiveService::new();
        let (mut svc, _rx, _) = prepared(&live);
        let alice = addr("alice@x.example");
        svc.handle_event(ContactEvent::EntryAdded(RosterEntry::new(alice.clone())))
            .unwrap();

        live.fail_next_set_entry(LiveError::Rejected("not-allowed".into()));
        let result = svc
            .update_tags(&alice, ["Work".to_string()].into(), BTreeSet::new())
            .await;
        assert!(matches!(result, Err(RosterError::Live(LiveError::Rejected(_)))));
        assert!(svc.items().at(0).unwrap().tags().is_empty());
    }

    #[tokio::test]
    async fn unknown_item_is_rejected() {
        let live = MockLiveService::new();
        let (svc, _rx, _) = prepared(&live);

        let result = svc.label_request(&addr("nobody@x.example"), None);
        assert!(matches!(result, Err(RosterError::UnknownItem { .. })));
    }

    #[tokio::test]
    async fn pending_mutation_survives_shutdown() {
        let live = MockLiveService::new();
        let (mut svc, _rx, conn) = prepared(&live);
        let alice = addr("alice@x.example");
        svc.handle_event(ContactEvent::EntryAdded(RosterEntry::new(alice.clone())))
            .unwrap();

        let pending = svc.label_request(&alice, Some("A".into())).unwrap();
        svc.shutdown(conn).unwrap();

        pending.send().await.unwrap();
        assert_eq!(live.set_entry_calls().len(), 1);
        assert_eq!(svc.items().at(0).unwrap().label(), "alice@x.example");
    }

    // ===========================================
    // Saving
    // ===========================================

    #[tokio::test]
    async fn save_writes_only_when_dirty() {
        let memory = MemoryCacheStore::new();
        let store: Arc<dyn CacheStore> = Arc::new(memory.clone());
        let live = MockLiveService::new();
        let (mut svc, _rx, _) = prepared(&live);

        assert!(svc.save(&store).is_none());

        svc.handle_event(ContactEvent::EntryAdded(
            RosterEntry::new(addr("a@x.example")).with_group("Work"),
        ))
        .unwrap();
        svc.save(&store).unwrap().await.unwrap();

        let records = memory.records(&CacheScope::account(&account()), RecordKind::Contact);
        assert_eq!(records.len(), 1);
        assert!(!svc.is_dirty());
        assert!(svc.save(&store).is_none());
        assert_eq!(memory.put_count(), 1);
    }

    #[tokio::test]
    async fn failed_save_still_clears_dirty_flag() {
        let memory = MemoryCacheStore::new();
        let store: Arc<dyn CacheStore> = Arc::new(memory.clone());
        let live = MockLiveService::new();
        let (mut svc, _rx, _) = prepared(&live);

        svc.handle_event(ContactEvent::EntryAdded(RosterEntry::new(addr("a@x.example"))))
            .unwrap();
        memory.fail_next_put("disk full");
        svc.save(&store).unwrap().await.unwrap();

        assert!(!svc.is_dirty());
        assert_eq!(memory.put_count(), 0);
    }

    #[tokio::test]
    async fn overlapping_saves_keep_the_newest_list() {
        let memory = MemoryCacheStore::new();
        let store: Arc<dyn CacheStore> = Arc::new(memory.clone());
        let live = MockLiveService::new();
        let (mut svc, _rx, _) = prepared(&live);

        // The first write is still in flight when the second one starts.
        memory.delay_next_put(Duration::from_millis(100));
        svc.handle_event(ContactEvent::EntryAdded(RosterEntry::new(addr("a@x.example"))))
            .unwrap();
        let first = svc.save(&store).unwrap();
        svc.handle_event(ContactEvent::EntryAdded(RosterEntry::new(addr("b@x.example"))))
            .unwrap();
        let second = svc.save(&store).unwrap();

        second.await.unwrap();
        first.await.unwrap();

        let records = memory.records(&CacheScope::account(&account()), RecordKind::Contact);
        assert_eq!(records.len(), 2);
        assert!(!svc.is_dirty());
    }

    #[tokio::test]
    async fn clear_discards_unsaved_changes() {
        let memory = MemoryCacheStore::new();
        cached(&memory, &[("a@x.example", &[])]);
        let store: Arc<dyn CacheStore> = Arc::new(memory.clone());
        let live = MockLiveService::new();
        let (mut svc, _rx, conn) = prepared(&live);

        svc.handle_event(ContactEvent::EntryAdded(RosterEntry::new(addr("b@x.example"))))
            .unwrap();
        assert!(svc.is_dirty());
        svc.shutdown(conn).unwrap();
        svc.clear().unwrap();
        assert!(!svc.is_dirty());

        svc.load(store.as_ref()).await.unwrap();
        assert_eq!(svc.len(), 1);
        assert!(svc.save(&store).is_none());
        assert_eq!(memory.put_count(), 0);
    }
}
