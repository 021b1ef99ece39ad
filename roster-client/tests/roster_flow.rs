//! End-to-end roster flow through the actor runtime.
//!
//! Two accounts on a mock live service, a JSON file cache on disk, and the
//! debounced write-back in between.

use rostersync_client::{
    runtime, CacheScope, CacheStore, JsonFileStore, LiveConnection, MockLiveService, RosterError,
    RosterEvent,
};
use roster_types::{
    Address, BookmarkEvent, CacheRecord, Conference, ContactEvent, ContactRecord, RecordKind,
    RosterEntry,
};
use roster_core::DelayConfig;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn addr(s: &str) -> Address {
    Address::parse(s).unwrap()
}

async fn seed(store: &JsonFileStore, account: &str, contacts: &[(&str, &[&str])]) {
    let records = contacts
        .iter()
        .map(|(address, tags)| {
            let mut record = ContactRecord::new(addr(address));
            record.tags = tags.iter().map(|t| t.to_string()).collect();
            CacheRecord::Contact(record)
        })
        .collect();
    store
        .put(&CacheScope::account(&addr(account)), RecordKind::Contact, records)
        .await
        .unwrap();
}

#[tokio::test]
async fn full_roster_lifecycle() {
    let dir = TempDir::new().unwrap();
    let store = JsonFileStore::new(dir.path());
    seed(
        &store,
        "alice@example.org",
        &[("a1@x.example", &["Work"]), ("a2@x.example", &[]), ("a3@x.example", &[])],
    )
    .await;
    seed(
        &store,
        "bob@example.org",
        &[("b1@x.example", &["Work"]), ("b2@x.example", &["Chess"])],
    )
    .await;

    let (roster, task) = runtime::spawn(
        Arc::new(store.clone()),
        DelayConfig::new(Duration::from_secs(3600), None),
    );
    let alice_live = MockLiveService::new();
    let bob_live = MockLiveService::new();
    let alice = alice_live.connection(&addr("alice@example.org/laptop"));
    let bob = bob_live.connection(&addr("bob@example.org"));

    roster.attach(Arc::new(alice.clone())).await.unwrap();
    roster.attach(Arc::new(bob.clone())).await.unwrap();

    // Cached contacts were pushed to the live services on attach.
    assert_eq!(alice_live.imported_snapshots()[0].len(), 3);
    assert_eq!(bob_live.imported_snapshots()[0].len(), 2);

    // Unified view in attach order.
    let items = roster.items().await.unwrap();
    assert_eq!(items.len(), 5);
    assert_eq!(items[4].address, addr("b2@x.example"));
    assert_eq!(items[4].account, addr("bob@example.org"));
    assert_eq!(roster.index(items[4].key()).await.unwrap(), Some(4));

    let tags = roster.tags().await.unwrap();
    assert!(tags.contains(&("Work".to_string(), 2)));
    assert!(tags.contains(&("Chess".to_string(), 1)));

    // Relabel and retag through the live service.
    let mut events = roster.subscribe().await.unwrap();
    roster
        .set_label(items[1].key(), Some("Anna".into()))
        .await
        .unwrap();
    roster
        .update_tags(
            items[3].key(),
            ["Chess".to_string()].into(),
            ["Work".to_string()].into(),
        )
        .await
        .unwrap();

    let items = roster.items().await.unwrap();
    assert_eq!(items[1].label, "Anna");
    assert_eq!(items[3].tags, BTreeSet::from(["Chess".to_string()]));
    assert_eq!(events.recv().await.unwrap(), RosterEvent::ItemChanged { index: 1 });
    assert_eq!(events.recv().await.unwrap(), RosterEvent::ItemChanged { index: 3 });

    // Bookmarks cannot be tagged, but can be relabelled.
    bob_live.emit_bookmark(BookmarkEvent::Added(Conference::new(addr("chess@rooms.example"))));
    let items = roster.items().await.unwrap();
    let room = items.last().unwrap().clone();
    assert_eq!(room.index, 5);
    assert!(matches!(
        roster
            .update_tags(room.key(), ["Work".to_string()].into(), Default::default())
            .await,
        Err(RosterError::Unsupported { .. })
    ));
    roster.set_label(room.key(), Some("Chess club".into())).await.unwrap();
    assert_eq!(roster.items().await.unwrap()[5].label, "Chess club");

    // Detaching alice persists her changes and removes her items.
    roster.detach(alice.id()).await.unwrap();
    assert_eq!(roster.items().await.unwrap().len(), 3);
    let cached = store
        .get_all(&CacheScope::account(&addr("alice@example.org")), RecordKind::Contact)
        .await
        .unwrap();
    let CacheRecord::Contact(anna) = &cached[1] else {
        panic!("expected contact record");
    };
    assert_eq!(anna.label.as_deref(), Some("Anna"));

    // After detach, alice's items are unknown.
    assert!(matches!(
        roster.set_label(items[0].key(), None).await,
        Err(RosterError::UnknownSource(_))
    ));

    roster.shutdown().await.unwrap();
    task.await.unwrap();

    let bookmarks = store
        .get_all(&CacheScope::account(&addr("bob@example.org")), RecordKind::Bookmark)
        .await
        .unwrap();
    assert_eq!(bookmarks.len(), 1);
    let cached = store
        .get_all(&CacheScope::account(&addr("bob@example.org")), RecordKind::Contact)
        .await
        .unwrap();
    let CacheRecord::Contact(b1) = &cached[0] else {
        panic!("expected contact record");
    };
    assert_eq!(b1.tags, BTreeSet::from(["Chess".to_string()]));
}

#[tokio::test(start_paused = true)]
async fn debounced_writeback_batches_a_burst() {
    let dir = TempDir::new().unwrap();
    let store = JsonFileStore::new(dir.path());
    let (roster, _task) = runtime::spawn(
        Arc::new(store.clone()),
        DelayConfig::new(Duration::from_millis(500), Some(Duration::from_secs(2))),
    );
    let live = MockLiveService::new();
    roster
        .attach(Arc::new(live.connection(&addr("me@example.org"))))
        .await
        .unwrap();

    for i in 0..5 {
        live.emit_contact(ContactEvent::EntryAdded(RosterEntry::new(addr(&format!(
            "c{}@x.example",
            i
        )))));
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    let scope = CacheScope::account(&addr("me@example.org"));
    assert!(store.get_all(&scope, RecordKind::Contact).await.unwrap().is_empty());

    tokio::time::sleep(Duration::from_secs(1)).await;
    // The write itself runs on the blocking pool.
    let mut saved = 0;
    for _ in 0..100 {
        saved = store.get_all(&scope, RecordKind::Contact).await.unwrap().len();
        if saved == 5 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(saved, 5);
}
