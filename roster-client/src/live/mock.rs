//! Mock live service for testing.
//!
//! Keeps a server-side contact list and bookmark list in memory. Edits made
//! through the client traits are applied and echoed to subscribers the way a
//! server push would be. Calls are captured for verification and failures
//! can be forced.

use super::{
    BookmarkClient, ContactClient, EntryChange, EventSink, LiveConnection, LiveError, SourceEvent,
    Subscription,
};
use async_trait::async_trait;
use roster_types::{
    AdapterId, Address, BookmarkEvent, Conference, ConnectionId, ContactEvent, LiveEvent,
    RosterEntry, RosterSnapshot,
};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Mock live service shared by any number of connections.
#[derive(Debug, Default, Clone)]
pub struct MockLiveService {
    inner: Arc<Mutex<MockLiveInner>>,
}

#[derive(Debug, Default)]
struct MockLiveInner {
    next_subscription: u64,
    contact_subscribers: Vec<Subscriber>,
    bookmark_subscribers: Vec<Subscriber>,
    roster: BTreeMap<Address, RosterEntry>,
    conferences: BTreeMap<Address, Conference>,
    imported: Vec<RosterSnapshot>,
    set_entry_calls: Vec<(Address, EntryChange)>,
    bookmark_updates: Vec<(Conference, Conference)>,
    fail_next_set_entry: Option<LiveError>,
    fail_next_update_bookmark: Option<LiveError>,
}

#[derive(Debug)]
struct Subscriber {
    id: u64,
    source: AdapterId,
    sink: EventSink,
}

#[derive(Debug, Clone, Copy)]
enum Channel {
    Contacts,
    Bookmarks,
}

impl MockLiveInner {
    fn subscribers(&mut self, channel: Channel) -> &mut Vec<Subscriber> {
        match channel {
            Channel::Contacts => &mut self.contact_subscribers,
            Channel::Bookmarks => &mut self.bookmark_subscribers,
        }
    }

    fn broadcast(&mut self, channel: Channel, event: LiveEvent) {
        // Subscribers whose receiver is gone are dropped.
        self.subscribers(channel).retain(|sub| {
            sub.sink
                .send(SourceEvent {
                    source: sub.source,
                    event: event.clone(),
                })
                .is_ok()
        });
    }

    fn apply_contact(&mut self, event: &ContactEvent) {
        match event {
            ContactEvent::EntryAdded(entry) | ContactEvent::EntryChanged(entry) => {
                self.roster.insert(entry.address.clone(), entry.clone());
            }
            ContactEvent::EntryRemoved(entry) => {
                self.roster.remove(&entry.address);
            }
            ContactEvent::GroupAdded(_) | ContactEvent::GroupRemoved(_) => {}
        }
    }

    fn apply_bookmark(&mut self, event: &BookmarkEvent) {
        match event {
            BookmarkEvent::Added(conference) => {
                self.conferences
                    .insert(conference.address.clone(), conference.clone());
            }
            BookmarkEvent::Removed(conference) => {
                self.conferences.remove(&conference.address);
            }
            BookmarkEvent::Changed { old, new } => {
                self.conferences.remove(&old.address);
                self.conferences.insert(new.address.clone(), new.clone());
            }
        }
    }
}

impl MockLiveService {
    /// Create a new mock service with empty lists.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockLiveInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn subscribe_channel(&self, channel: Channel, source: AdapterId, sink: EventSink) -> Subscription {
        let mut inner = self.lock();
        inner.next_subscription += 1;
        let id = inner.next_subscription;
        inner
            .subscribers(channel)
            .push(Subscriber { id, source, sink });

        let weak: Weak<Mutex<MockLiveInner>> = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                let mut inner = inner.lock().unwrap_or_else(PoisonError::into_inner);
                inner.subscribers(channel).retain(|sub| sub.id != id);
            }
        })
    }

    /// A new connection of `account` to this service.
    pub fn connection(&self, account: &Address) -> MockConnection {
        MockConnection {
            id: ConnectionId::next(),
            account: account.bare(),
            service: self.clone(),
        }
    }

    /// Apply a contact list change on the server side and push it.
    pub fn emit_contact(&self, event: ContactEvent) {
        let mut inner = self.lock();
        inner.apply_contact(&event);
        inner.broadcast(Channel::Contacts, LiveEvent::Contact(event));
    }

    /// Apply a bookmark change on the server side and push it.
    pub fn emit_bookmark(&self, event: BookmarkEvent) {
        let mut inner = self.lock();
        inner.apply_bookmark(&event);
        inner.broadcast(Channel::Bookmarks, LiveEvent::Bookmark(event));
    }

    /// Server-side contact list.
    pub fn entries(&self) -> Vec<RosterEntry> {
        self.lock().roster.values().cloned().collect()
    }

    /// Server-side entry for `address`.
    pub fn entry(&self, address: &Address) -> Option<RosterEntry> {
        self.lock().roster.get(address).cloned()
    }

    /// Server-side bookmarks.
    pub fn conferences(&self) -> Vec<Conference> {
        self.lock().conferences.values().cloned().collect()
    }

    /// Snapshots received through `import_snapshot`.
    pub fn imported_snapshots(&self) -> Vec<RosterSnapshot> {
        self.lock().imported.clone()
    }

    /// Captured `set_entry` calls.
    pub fn set_entry_calls(&self) -> Vec<(Address, EntryChange)> {
        self.lock().set_entry_calls.clone()
    }

    /// Captured `update_bookmark` calls.
    pub fn bookmark_updates(&self) -> Vec<(Conference, Conference)> {
        self.lock().bookmark_updates.clone()
    }

    /// Cause the next set_entry() to fail with the given error.
    pub fn fail_next_set_entry(&self, error: LiveError) {
        self.lock().fail_next_set_entry = Some(error);
    }

    /// Cause the next update_bookmark() to fail with the given error.
    pub fn fail_next_update_bookmark(&self, error: LiveError) {
        self.lock().fail_next_update_bookmark = Some(error);
    }

    /// Number of active contact list subscriptions.
    pub fn contact_subscribers(&self) -> usize {
        self.lock().contact_subscribers.len()
    }

    /// Number of active bookmark subscriptions.
    pub fn bookmark_subscribers(&self) -> usize {
        self.lock().bookmark_subscribers.len()
    }
}

#[async_trait]
impl ContactClient for MockLiveService {
    fn subscribe(&self, source: AdapterId, sink: EventSink) -> Subscription {
        self.subscribe_channel(Channel::Contacts, source, sink)
    }

    fn import_snapshot(&self, snapshot: RosterSnapshot) {
        let mut inner = self.lock();
        match snapshot.entries() {
            Ok(entries) => {
                for entry in entries {
                    inner.roster.insert(entry.address.clone(), entry);
                }
            }
            Err(e) => tracing::warn!("Mock service ignoring snapshot entries: {}", e),
        }
        inner.imported.push(snapshot);
    }

    async fn set_entry(&self, address: &Address, change: EntryChange) -> Result<(), LiveError> {
        let mut inner = self.lock();

        // Check for forced failure
        if let Some(error) = inner.fail_next_set_entry.take() {
            return Err(error);
        }
        inner.set_entry_calls.push((address.clone(), change.clone()));

        let existing = inner.roster.get(address).cloned();
        let mut entry = existing
            .clone()
            .unwrap_or_else(|| RosterEntry::new(address.clone()));
        if let Some(name) = change.name {
            entry.name = name;
        }
        for group in &change.remove_groups {
            entry.groups.remove(group);
        }
        entry.groups.extend(change.add_groups);

        let event = match existing {
            Some(_) => ContactEvent::EntryChanged(entry),
            None => ContactEvent::EntryAdded(entry),
        };
        inner.apply_contact(&event);
        inner.broadcast(Channel::Contacts, LiveEvent::Contact(event));
        Ok(())
    }
}

#[async_trait]
impl BookmarkClient for MockLiveService {
    fn subscribe(&self, source: AdapterId, sink: EventSink) -> Subscription {
        self.subscribe_channel(Channel::Bookmarks, source, sink)
    }

    async fn update_bookmark(&self, old: &Conference, new: &Conference) -> Result<(), LiveError> {
        let mut inner = self.lock();

        // Check for forced failure
        if let Some(error) = inner.fail_next_update_bookmark.take() {
            return Err(error);
        }
        inner.bookmark_updates.push((old.clone(), new.clone()));

        let event = if inner.conferences.contains_key(&old.address) {
            BookmarkEvent::Changed {
                old: old.clone(),
                new: new.clone(),
            }
        } else {
            BookmarkEvent::Added(new.clone())
        };
        inner.apply_bookmark(&event);
        inner.broadcast(Channel::Bookmarks, LiveEvent::Bookmark(event));
        Ok(())
    }
}

/// A connection of one account to a [`MockLiveService`].
#[derive(Debug, Clone)]
pub struct MockConnection {
    id: ConnectionId,
    account: Address,
    service: MockLiveService,
}

impl MockConnection {
    /// The service behind this connection.
    pub fn service(&self) -> &MockLiveService {
        &self.service
    }
}

impl LiveConnection for MockConnection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn account(&self) -> &Address {
        &self.account
    }

    fn contacts(&self) -> Arc<dyn ContactClient> {
        Arc::new(self.service.clone())
    }

    fn bookmarks(&self) -> Arc<dyn BookmarkClient> {
        Arc::new(self.service.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn addr(s: &str) -> Address {
        Address::parse(s).unwrap()
    }

    // ===========================================
    // Subscriptions
    // ===========================================

    #[tokio::test]
    async fn events_reach_subscribers_tagged_with_source() {
        let service = MockLiveService::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let source = AdapterId::next();
        let _sub = ContactClient::subscribe(&service, source, tx);

        service.emit_contact(ContactEvent::GroupAdded("Friends".into()));

        let received = rx.recv().await.unwrap();
        assert_eq!(received.source, source);
        assert_eq!(
            received.event,
            LiveEvent::Contact(ContactEvent::GroupAdded("Friends".into()))
        );
    }

    #[tokio::test]
    async fn dropping_subscription_stops_delivery() {
        let service = MockLiveService::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sub = BookmarkClient::subscribe(&service, AdapterId::next(), tx);
        assert_eq!(service.bookmark_subscribers(), 1);

        drop(sub);
        assert_eq!(service.bookmark_subscribers(), 0);

        service.emit_bookmark(BookmarkEvent::Added(Conference::new(addr("r@muc.example"))));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn closed_receivers_are_pruned() {
        let service = MockLiveService::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let _sub = ContactClient::subscribe(&service, AdapterId::next(), tx);
        drop(rx);

        service.emit_contact(ContactEvent::GroupRemoved("Old".into()));
        assert_eq!(service.contact_subscribers(), 0);
    }

    // ===========================================
    // Edits
    // ===========================================

    #[tokio::test]
    async fn set_entry_is_echoed_as_change() {
        let service = MockLiveService::new();
        let alice = addr("alice@example.org");
        service.emit_contact(ContactEvent::EntryAdded(
            RosterEntry::new(alice.clone()).with_group("Work"),
        ));

        let (tx, mut rx) = mpsc::unbounded_channel();
        let _sub = ContactClient::subscribe(&service, AdapterId::next(), tx);

        let mut change = EntryChange::rename(Some("Alice".into()));
        change.add_groups.insert("Friends".into());
        change.remove_groups.insert("Work".into());
        service.set_entry(&alice, change).await.unwrap();

        match rx.recv().await.unwrap().event {
            LiveEvent::Contact(ContactEvent::EntryChanged(entry)) => {
                assert_eq!(entry.name.as_deref(), Some("Alice"));
                assert!(entry.groups.contains("Friends"));
                assert!(!entry.groups.contains("Work"));
            }
            other => panic!("expected entry change, got {:?}", other),
        }
        assert_eq!(service.set_entry_calls().len(), 1);
    }

    #[tokio::test]
    async fn set_entry_for_unknown_address_adds_it() {
        let service = MockLiveService::new();
        let bob = addr("bob@example.org");

        service
            .set_entry(&bob, EntryChange::rename(Some("Bob".into())))
            .await
            .unwrap();
        assert_eq!(service.entry(&bob).unwrap().name.as_deref(), Some("Bob"));
    }

    #[tokio::test]
    async fn forced_failure_applies_once() {
        let service = MockLiveService::new();
        let bob = addr("bob@example.org");
        service.fail_next_set_entry(LiveError::Timeout);

        let result = service.set_entry(&bob, EntryChange::default()).await;
        assert_eq!(result, Err(LiveError::Timeout));
        assert!(service.entry(&bob).is_none());
        assert!(service.set_entry_calls().is_empty());

        assert!(service.set_entry(&bob, EntryChange::default()).await.is_ok());
    }

    #[tokio::test]
    async fn update_bookmark_replaces_conference() {
        let service = MockLiveService::new();
        let old = Conference::new(addr("room@muc.example"));
        service.emit_bookmark(BookmarkEvent::Added(old.clone()));

        let mut new = old.clone();
        new.name = Some("Lobby".into());
        service.update_bookmark(&old, &new).await.unwrap();

        assert_eq!(service.conferences(), vec![new.clone()]);
        assert_eq!(service.bookmark_updates(), vec![(old, new)]);
    }

    #[test]
    fn import_snapshot_seeds_roster_silently() {
        let service = MockLiveService::new();
        let json = r#"{"items": {"carol@example.org": {"subscription": "both"}}}"#;
        service.import_snapshot(RosterSnapshot::from_json(json).unwrap());

        assert_eq!(service.entries().len(), 1);
        assert_eq!(service.imported_snapshots().len(), 1);
    }

    #[test]
    fn connections_get_fresh_ids() {
        let service = MockLiveService::new();
        let account = addr("me@example.org/laptop");
        let a = service.connection(&account);
        let b = service.connection(&account);

        assert_ne!(a.id(), b.id());
        assert_eq!(a.account(), &addr("me@example.org"));
    }
}
