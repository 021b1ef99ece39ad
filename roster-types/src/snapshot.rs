//! Roster snapshot document.
//!
//! A snapshot is the complete contact list of one account in JSON form:
//!
//! ```json
//! {
//!   "ver": null,
//!   "items": {
//!     "alice@example.org": {
//!       "subscription": "both",
//!       "name": "Alice",
//!       "groups": ["Friends"]
//!     }
//!   }
//! }
//! ```
//!
//! It is pushed to the live service when an adapter is prepared, and is the
//! import/export format of the CLI.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::address::Address;
use crate::error::SnapshotError;
use crate::events::RosterEntry;
use crate::records::Subscription;

/// A full contact list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterSnapshot {
    /// Roster version string, when the server supports versioning.
    #[serde(default)]
    pub ver: Option<String>,
    /// Entries keyed by address string.
    #[serde(default)]
    pub items: BTreeMap<String, SnapshotEntry>,
}

/// One contact in a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    /// Subscription state.
    #[serde(default)]
    pub subscription: Subscription,
    /// Pending outgoing subscription request.
    #[serde(default, skip_serializing_if = "is_false")]
    pub ask: bool,
    /// Pre-approved subscription.
    #[serde(default, skip_serializing_if = "is_false")]
    pub approved: bool,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Sorted group names.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl RosterSnapshot {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry for `address`. Groups are sorted.
    pub fn insert(&mut self, address: &Address, mut entry: SnapshotEntry) {
        entry.groups.sort();
        entry.groups.dedup();
        self.items.insert(address.to_string(), entry);
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the snapshot has no entries.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse from JSON.
    pub fn from_json(input: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(input)?)
    }

    /// Convert every entry to a [`RosterEntry`], in address order.
    ///
    /// Fails on the first key that is not a valid address.
    pub fn entries(&self) -> Result<Vec<RosterEntry>, SnapshotError> {
        self.items
            .iter()
            .map(|(key, entry)| {
                let address = Address::parse(key).map_err(|source| SnapshotError::Address {
                    key: key.clone(),
                    source,
                })?;
                Ok(RosterEntry {
                    address,
                    name: entry.name.clone(),
                    subscription: entry.subscription,
                    approved: entry.approved,
                    ask: entry.ask,
                    groups: entry.groups.iter().cloned().collect(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn omits_default_fields() {
        let mut snapshot = RosterSnapshot::new();
        snapshot.insert(
            &Address::parse("bob@example.org").unwrap(),
            SnapshotEntry::default(),
        );

        let value: serde_json::Value =
            serde_json::from_str(&snapshot.to_json().unwrap()).unwrap();
        let item = &value["items"]["bob@example.org"];
        assert_eq!(item["subscription"], "none");
        assert!(item.get("ask").is_none());
        assert!(item.get("approved").is_none());
        assert!(item.get("name").is_none());
        assert!(item.get("groups").is_none());
    }

    #[test]
    fn insert_sorts_groups() {
        let mut snapshot = RosterSnapshot::new();
        let entry = SnapshotEntry {
            groups: vec!["Work".into(), "Family".into(), "Work".into()],
            ..Default::default()
        };
        snapshot.insert(&Address::parse("c@example.org").unwrap(), entry);

        assert_eq!(
            snapshot.items["c@example.org"].groups,
            vec!["Family".to_string(), "Work".to_string()]
        );
    }

    #[test]
    fn entries_from_json() {
        let json = r#"{
            "ver": "42",
            "items": {
                "alice@example.org": {"subscription": "both", "name": "Alice", "groups": ["Friends"]},
                "bob@example.org": {"subscription": "to", "ask": true}
            }
        }"#;
        let snapshot = RosterSnapshot::from_json(json).unwrap();
        assert_eq!(snapshot.ver.as_deref(), Some("42"));

        let entries = snapshot.entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name.as_deref(), Some("Alice"));
        assert!(entries[0].groups.contains("Friends"));
        assert_eq!(entries[1].subscription, Subscription::To);
        assert!(entries[1].ask);
    }

    #[test]
    fn entries_reject_bad_key() {
        let json = r#"{"items": {"@broken": {"subscription": "none"}}}"#;
        let snapshot = RosterSnapshot::from_json(json).unwrap();

        match snapshot.entries() {
            Err(SnapshotError::Address { key, .. }) => assert_eq!(key, "@broken"),
            other => panic!("expected address error, got {:?}", other),
        }
    }
}
