//! Live protocol service abstraction.
//!
//! The protocol engine itself lives outside this crate. Adapters talk to it
//! through these traits:
//! - [`LiveConnection`] - one connected account, hands out service clients
//! - [`ContactClient`] - contact list notifications and edits
//! - [`BookmarkClient`] - bookmark notifications and edits
//!
//! Notifications are pushed into an [`EventSink`], tagged with the id of the
//! adapter that subscribed, and consumed by whoever owns the roster state.
//! Subscribing returns a [`Subscription`] guard; dropping it stops delivery.

mod mock;
mod subscription;

pub use mock::{MockConnection, MockLiveService};
pub use subscription::Subscription;

use async_trait::async_trait;
use roster_types::{AdapterId, Address, Conference, ConnectionId, LiveEvent, RosterSnapshot};
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

/// Live service errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LiveError {
    /// The server refused the request.
    #[error("rejected by server: {0}")]
    Rejected(String),

    /// No answer in time.
    #[error("request timed out")]
    Timeout,

    /// The connection went away before an answer arrived.
    #[error("connection lost")]
    Disconnected,
}

/// A live notification addressed to one adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEvent {
    /// Adapter that subscribed.
    pub source: AdapterId,
    /// The notification.
    pub event: LiveEvent,
}

/// Where live services deliver notifications.
pub type EventSink = mpsc::UnboundedSender<SourceEvent>;

/// A requested edit of one contact list entry.
///
/// Only the fields that are set are changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryChange {
    /// New display name; `Some(None)` removes it.
    pub name: Option<Option<String>>,
    /// Groups to join.
    pub add_groups: BTreeSet<String>,
    /// Groups to leave.
    pub remove_groups: BTreeSet<String>,
}

impl EntryChange {
    /// Change only the display name.
    pub fn rename(name: Option<String>) -> Self {
        Self {
            name: Some(name),
            ..Default::default()
        }
    }

    /// Change only the groups.
    pub fn regroup(add: BTreeSet<String>, remove: BTreeSet<String>) -> Self {
        Self {
            name: None,
            add_groups: add,
            remove_groups: remove,
        }
    }
}

/// Contact list side of a live connection.
#[async_trait]
pub trait ContactClient: Send + Sync {
    /// Deliver contact list notifications to `sink`, tagged with `source`.
    fn subscribe(&self, source: AdapterId, sink: EventSink) -> Subscription;

    /// Seed the service with the locally known contact list.
    fn import_snapshot(&self, snapshot: RosterSnapshot);

    /// Ask the server to change an entry.
    ///
    /// Returns once the server acknowledged. The local roster changes only
    /// when the resulting notification arrives.
    async fn set_entry(&self, address: &Address, change: EntryChange) -> Result<(), LiveError>;
}

/// Bookmark side of a live connection.
#[async_trait]
pub trait BookmarkClient: Send + Sync {
    /// Deliver bookmark notifications to `sink`, tagged with `source`.
    fn subscribe(&self, source: AdapterId, sink: EventSink) -> Subscription;

    /// Ask the server to replace `old` with `new`.
    async fn update_bookmark(&self, old: &Conference, new: &Conference) -> Result<(), LiveError>;
}

/// A connected account.
pub trait LiveConnection: Send + Sync {
    /// Identity of this connection.
    fn id(&self) -> ConnectionId;

    /// Bare address of the connected account.
    fn account(&self) -> &Address;

    /// Contact list service.
    fn contacts(&self) -> Arc<dyn ContactClient>;

    /// Bookmark service.
    fn bookmarks(&self) -> Arc<dyn BookmarkClient>;
}
