//! Roster item model.
//!
//! Two item variants live behind the [`RosterItem`] capability trait:
//! - [`ContactItem`] - a contact list entry, labelled and taggable
//! - [`BookmarkItem`] - a group chat bookmark, labelled, never tagged
//!
//! Items refer to their account by its bare address only. The adapter that
//! holds an item owns it; nothing else keeps a reference.

use roster_types::{
    Address, BookmarkRecord, CacheRecord, Conference, ContactRecord, RecordKind, RosterEntry,
    SnapshotEntry, Subscription,
};
use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt;

static NO_TAGS: BTreeSet<String> = BTreeSet::new();

/// The backend kinds an account is synchronized with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ServiceKind {
    /// Contact list.
    Contacts,
    /// Group chat bookmarks.
    Bookmarks,
}

impl ServiceKind {
    /// Every kind, in attach order.
    pub const ALL: [ServiceKind; 2] = [ServiceKind::Contacts, ServiceKind::Bookmarks];

    /// Record kind persisted for this service.
    pub fn record_kind(&self) -> RecordKind {
        match self {
            ServiceKind::Contacts => RecordKind::Contact,
            ServiceKind::Bookmarks => RecordKind::Bookmark,
        }
    }

    /// Short name for logs and the CLI.
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceKind::Contacts => "contacts",
            ServiceKind::Bookmarks => "bookmarks",
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capabilities shared by every roster item.
pub trait RosterItem {
    /// Address of the item.
    fn address(&self) -> &Address;

    /// Bare address of the owning account.
    fn account(&self) -> &Address;

    /// Backend kind the item comes from.
    fn kind(&self) -> ServiceKind;

    /// Label as stored, without fallback.
    fn raw_label(&self) -> Option<&str>;

    /// Display label, falling back to the address when unset or empty.
    fn label(&self) -> Cow<'_, str> {
        match self.raw_label() {
            Some(label) if !label.is_empty() => Cow::Borrowed(label),
            _ => Cow::Owned(self.address().to_string()),
        }
    }

    /// Tags carried by the item.
    fn tags(&self) -> &BTreeSet<String>;

    /// Persisted form.
    fn to_record(&self) -> CacheRecord;

    /// Whether tags can be edited.
    fn can_manage_tags(&self) -> bool;

    /// Whether the label can be edited.
    fn can_set_label(&self) -> bool;
}

/// Tags gained and lost by an in-place update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagDelta {
    /// Tags the item did not carry before.
    pub added: Vec<String>,
    /// Tags the item no longer carries.
    pub removed: Vec<String>,
}

impl TagDelta {
    /// Check if no tag changed.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// A contact list entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactItem {
    account: Address,
    address: Address,
    label: Option<String>,
    subscription: Subscription,
    approved: bool,
    ask: bool,
    tags: BTreeSet<String>,
}

impl ContactItem {
    /// Materialize a cached record.
    pub fn from_record(account: &Address, record: &ContactRecord) -> Self {
        Self {
            account: account.clone(),
            address: record.address.clone(),
            label: record.label.clone(),
            subscription: record.subscription.unwrap_or_default(),
            approved: record.approved,
            ask: record.ask,
            tags: record.tags.clone(),
        }
    }

    /// Wrap a live roster entry.
    pub fn wrap(account: &Address, entry: &RosterEntry) -> Self {
        Self {
            account: account.clone(),
            address: entry.address.clone(),
            label: entry.name.clone(),
            subscription: entry.subscription,
            approved: entry.approved,
            ask: entry.ask,
            tags: entry.groups.clone(),
        }
    }

    /// Apply a live roster entry in place. The address is kept.
    pub fn update(&mut self, entry: &RosterEntry) -> TagDelta {
        let delta = TagDelta {
            added: entry.groups.difference(&self.tags).cloned().collect(),
            removed: self.tags.difference(&entry.groups).cloned().collect(),
        };

        self.label = entry.name.clone();
        self.subscription = entry.subscription;
        self.approved = entry.approved;
        self.ask = entry.ask;
        self.tags = entry.groups.clone();

        delta
    }

    /// Entry for the roster snapshot pushed to the live service.
    pub fn to_snapshot_entry(&self) -> SnapshotEntry {
        SnapshotEntry {
            subscription: self.subscription,
            ask: self.ask,
            approved: self.approved,
            name: self.label.clone(),
            groups: self.tags.iter().cloned().collect(),
        }
    }

    /// Subscription state.
    pub fn subscription(&self) -> Subscription {
        self.subscription
    }

    /// Pre-approved subscription.
    pub fn approved(&self) -> bool {
        self.approved
    }

    /// Pending outgoing subscription request.
    pub fn ask(&self) -> bool {
        self.ask
    }
}

impl RosterItem for ContactItem {
    fn address(&self) -> &Address {
        &self.address
    }

    fn account(&self) -> &Address {
        &self.account
    }

    fn kind(&self) -> ServiceKind {
        ServiceKind::Contacts
    }

    fn raw_label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    fn to_record(&self) -> CacheRecord {
        CacheRecord::Contact(ContactRecord {
            address: self.address.clone(),
            label: self.label.clone(),
            subscription: Some(self.subscription),
            approved: self.approved,
            ask: self.ask,
            tags: self.tags.clone(),
        })
    }

    fn can_manage_tags(&self) -> bool {
        true
    }

    fn can_set_label(&self) -> bool {
        true
    }
}

/// A group chat bookmark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookmarkItem {
    account: Address,
    address: Address,
    label: Option<String>,
    nick: Option<String>,
    password: Option<String>,
    autojoin: bool,
}

impl BookmarkItem {
    /// Materialize a cached record.
    pub fn from_record(account: &Address, record: &BookmarkRecord) -> Self {
        Self {
            account: account.clone(),
            address: record.address.clone(),
            label: record.label.clone(),
            nick: record.nick.clone(),
            password: record.password.clone(),
            autojoin: record.autojoin,
        }
    }

    /// Wrap a live bookmark.
    pub fn wrap(account: &Address, conference: &Conference) -> Self {
        Self {
            account: account.clone(),
            address: conference.address.clone(),
            label: conference.name.clone(),
            nick: conference.nick.clone(),
            password: conference.password.clone(),
            autojoin: conference.autojoin,
        }
    }

    /// Apply a live bookmark in place. The address is kept.
    pub fn update(&mut self, conference: &Conference) {
        self.label = conference.name.clone();
        self.nick = conference.nick.clone();
        self.password = conference.password.clone();
        self.autojoin = conference.autojoin;
    }

    /// Live bookmark payload describing this item.
    pub fn to_conference(&self) -> Conference {
        Conference {
            address: self.address.clone(),
            name: self.label.clone(),
            nick: self.nick.clone(),
            password: self.password.clone(),
            autojoin: self.autojoin,
        }
    }

    /// Nickname to join with.
    ///
    /// Falls back to the account's localpart, which is what a join would use.
    pub fn nick(&self) -> Option<&str> {
        self.nick.as_deref().or_else(|| self.account.localpart())
    }

    /// Room password.
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Join automatically on connect.
    pub fn autojoin(&self) -> bool {
        self.autojoin
    }
}

impl RosterItem for BookmarkItem {
    fn address(&self) -> &Address {
        &self.address
    }

    fn account(&self) -> &Address {
        &self.account
    }

    fn kind(&self) -> ServiceKind {
        ServiceKind::Bookmarks
    }

    fn raw_label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    fn tags(&self) -> &BTreeSet<String> {
        &NO_TAGS
    }

    fn to_record(&self) -> CacheRecord {
        CacheRecord::Bookmark(BookmarkRecord {
            address: self.address.clone(),
            label: self.label.clone(),
            nick: self.nick.clone(),
            password: self.password.clone(),
            autojoin: self.autojoin,
        })
    }

    fn can_manage_tags(&self) -> bool {
        false
    }

    fn can_set_label(&self) -> bool {
        true
    }
}
