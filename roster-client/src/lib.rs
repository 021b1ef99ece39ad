//! # roster-client
//!
//! Async roster synchronization engine for rostersync.
//!
//! Reconciles the contact lists and group chat bookmarks reported by live
//! protocol connections with a local cache, and exposes the result as one
//! indexed roster with a reference-counted tag index.
//!
//! ## Features
//!
//! - **Service adapters**: one per (account, backend kind), bridging a live
//!   service and the cache under a strict lifecycle
//! - **Aggregation**: a unified view over all attached adapters with global
//!   indices and tag counts
//! - **Debounced persistence**: dirty adapters are written back in batches
//! - **Single-consumer runtime**: all roster state lives in one tokio task
//! - **Pluggable collaborators**: live services and cache stores are traits,
//!   with in-memory mocks for tests
//!
//! ## Example
//!
//! ```ignore
//! use roster_client::{runtime, JsonFileStore, MockLiveService};
//!
//! let store = Arc::new(JsonFileStore::new("/var/cache/roster"));
//! let (roster, _task) = runtime::spawn(store, DelayConfig::default());
//!
//! let live = MockLiveService::new();
//! roster.attach(Arc::new(live.connection(account))).await?;
//!
//! for item in roster.items().await? {
//!     println!("{} {}", item.index, item.label);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapter;
pub mod cache;
pub mod config;
pub mod debounce;
pub mod error;
pub mod live;
pub mod manager;
pub mod runtime;
pub mod writeback;

pub use adapter::{AdapterAction, BookmarkService, ContactService, PendingMutation, ServiceAdapter};
pub use cache::{CacheError, CacheScope, CacheStore, JsonFileStore, MemoryCacheStore};
pub use config::{ConfigError, RosterConfig};
pub use debounce::DelayedInvocation;
pub use error::RosterError;
pub use live::{
    BookmarkClient, ContactClient, EntryChange, EventSink, LiveConnection, LiveError,
    MockConnection, MockLiveService, SourceEvent, Subscription,
};
pub use manager::{ItemKey, ItemView, RosterEvent, RosterManager};
pub use runtime::RosterHandle;
pub use writeback::WriteManager;
