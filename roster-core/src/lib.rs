//! # roster-core
//!
//! Pure logic for rostersync (no I/O, instant tests).
//!
//! This crate implements the state machines and bookkeeping of the roster
//! engine without any network, disk or timer I/O.
//!
//! ## Design Philosophy
//!
//! Every module here takes input and produces output without side effects:
//! the debounce schedule is fed instants instead of reading a clock, the
//! adapter lifecycle returns its next state instead of subscribing to
//! anything, the identity registry returns the notifications it would emit.
//!
//! The async driving (timers, live services, cache files) is performed by
//! `roster-client`, which interprets what these types decide.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod colour;
pub mod debounce;
pub mod identity;
pub mod item;
pub mod lifecycle;
pub mod tags;

pub use colour::Colour;
pub use debounce::{DebounceError, DebounceSchedule, DelayConfig, Schedule};
pub use identity::{Account, Identities, Identity, IdentityError, IdentityEvent, IdentityId};
pub use item::{BookmarkItem, ContactItem, RosterItem, ServiceKind, TagDelta};
pub use lifecycle::{AdapterState, LifecycleError, LifecycleEvent};
pub use tags::{TagChange, TagIndex};
