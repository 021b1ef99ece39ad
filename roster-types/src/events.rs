//! Live service notification payloads.

use std::collections::BTreeSet;

use crate::address::Address;
use crate::records::Subscription;

/// A contact list entry as reported by the live service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    /// Contact address.
    pub address: Address,
    /// Display name set on the server.
    pub name: Option<String>,
    /// Subscription state.
    pub subscription: Subscription,
    /// Pre-approved subscription.
    pub approved: bool,
    /// Pending outgoing subscription request.
    pub ask: bool,
    /// Roster groups.
    pub groups: BTreeSet<String>,
}

impl RosterEntry {
    /// An entry with no name, no groups and subscription `none`.
    pub fn new(address: Address) -> Self {
        Self {
            address,
            name: None,
            subscription: Subscription::None,
            approved: false,
            ask: false,
            groups: BTreeSet::new(),
        }
    }

    /// Set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Add a group.
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.groups.insert(group.into());
        self
    }

    /// Set the subscription state.
    pub fn with_subscription(mut self, subscription: Subscription) -> Self {
        self.subscription = subscription;
        self
    }
}

/// A group chat bookmark as reported by the live service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conference {
    /// Room address.
    pub address: Address,
    /// Display name.
    pub name: Option<String>,
    /// Nickname to join with.
    pub nick: Option<String>,
    /// Room password.
    pub password: Option<String>,
    /// Join automatically on connect.
    pub autojoin: bool,
}

impl Conference {
    /// A bookmark with only an address.
    pub fn new(address: Address) -> Self {
        Self {
            address,
            name: None,
            nick: None,
            password: None,
            autojoin: false,
        }
    }
}

/// A change to the contact list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactEvent {
    /// An entry was added.
    EntryAdded(RosterEntry),
    /// An entry was removed.
    EntryRemoved(RosterEntry),
    /// An entry changed.
    EntryChanged(RosterEntry),
    /// A group name came into use on the account.
    GroupAdded(String),
    /// A group name went out of use on the account.
    GroupRemoved(String),
}

/// A change to the bookmark list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookmarkEvent {
    /// A bookmark was added.
    Added(Conference),
    /// A bookmark was removed.
    Removed(Conference),
    /// A bookmark was replaced.
    Changed {
        /// Previous value.
        old: Conference,
        /// New value.
        new: Conference,
    },
}

/// Any notification from a live service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveEvent {
    /// Contact list change.
    Contact(ContactEvent),
    /// Bookmark list change.
    Bookmark(BookmarkEvent),
}

impl From<ContactEvent> for LiveEvent {
    fn from(event: ContactEvent) -> Self {
        LiveEvent::Contact(event)
    }
}

impl From<BookmarkEvent> for LiveEvent {
    fn from(event: BookmarkEvent) -> Self {
        LiveEvent::Bookmark(event)
    }
}
