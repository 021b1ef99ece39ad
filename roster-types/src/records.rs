//! Persisted roster item shapes.
//!
//! A cache holds, per account and record kind, the full list of records for
//! that account. Saving always replaces the whole list.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::address::Address;

/// Presence subscription state of a contact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subscription {
    /// Neither side sees the other's presence.
    #[default]
    None,
    /// We see the contact's presence.
    To,
    /// The contact sees our presence.
    From,
    /// Mutual.
    Both,
}

impl Subscription {
    /// Wire name of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            Subscription::None => "none",
            Subscription::To => "to",
            Subscription::From => "from",
            Subscription::Both => "both",
        }
    }
}

impl fmt::Display for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Subscription {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Subscription::None),
            "to" => Ok(Subscription::To),
            "from" => Ok(Subscription::From),
            "both" => Ok(Subscription::Both),
            other => Err(format!("unknown subscription state: {}", other)),
        }
    }
}

/// Which kind of record a cache list holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    /// Contact list entries.
    Contact,
    /// Group chat bookmarks.
    Bookmark,
}

impl RecordKind {
    /// Name used for storage paths and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Contact => "contact",
            RecordKind::Bookmark => "bookmark",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A cached contact list entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRecord {
    /// Contact address.
    pub address: Address,
    /// User-assigned display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Subscription state, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription: Option<Subscription>,
    /// Whether we pre-approved the contact's subscription request.
    #[serde(default)]
    pub approved: bool,
    /// Whether our own subscription request is pending.
    #[serde(default)]
    pub ask: bool,
    /// Tags (roster groups) carried by the contact.
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl ContactRecord {
    /// A record with only an address.
    pub fn new(address: Address) -> Self {
        Self {
            address,
            label: None,
            subscription: None,
            approved: false,
            ask: false,
            tags: BTreeSet::new(),
        }
    }
}

/// A cached group chat bookmark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookmarkRecord {
    /// Room address.
    pub address: Address,
    /// Display name of the bookmark.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Nickname to join with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nick: Option<String>,
    /// Room password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Join automatically on connect.
    #[serde(default)]
    pub autojoin: bool,
}

impl BookmarkRecord {
    /// A record with only an address.
    pub fn new(address: Address) -> Self {
        Self {
            address,
            label: None,
            nick: None,
            password: None,
            autojoin: false,
        }
    }
}

/// One persisted roster item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CacheRecord {
    /// A contact list entry.
    Contact(ContactRecord),
    /// A group chat bookmark.
    Bookmark(BookmarkRecord),
}

impl CacheRecord {
    /// Kind of the record.
    pub fn kind(&self) -> RecordKind {
        match self {
            CacheRecord::Contact(_) => RecordKind::Contact,
            CacheRecord::Bookmark(_) => RecordKind::Bookmark,
        }
    }

    /// Address of the item the record describes.
    pub fn address(&self) -> &Address {
        match self {
            CacheRecord::Contact(r) => &r.address,
            CacheRecord::Bookmark(r) => &r.address,
        }
    }
}
