//! # roster-types
//!
//! Shared types for the rostersync roster engine.
//!
//! This crate provides the foundational types used across all rostersync crates:
//! - [`Address`] - protocol addresses (`local@domain/resource`)
//! - [`ConnectionId`], [`AdapterId`] - runtime identifiers
//! - [`CacheRecord`] - the persisted shape of roster items
//! - [`ContactEvent`], [`BookmarkEvent`] - live service notifications
//! - [`RosterSnapshot`] - the roster import/export document

#![warn(missing_docs)]
#![warn(clippy::all)]

mod address;
mod error;
mod events;
mod ids;
mod records;
mod snapshot;

pub use address::Address;
pub use error::{AddressError, SnapshotError};
pub use events::{BookmarkEvent, Conference, ContactEvent, LiveEvent, RosterEntry};
pub use ids::{AdapterId, ConnectionId};
pub use records::{BookmarkRecord, CacheRecord, ContactRecord, RecordKind, Subscription};
pub use snapshot::{RosterSnapshot, SnapshotEntry};
