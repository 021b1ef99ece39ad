//! Top-level error type of the roster engine.

use roster_core::{LifecycleError, ServiceKind};
use roster_types::{AdapterId, Address, ConnectionId};
use thiserror::Error;

use crate::cache::CacheError;
use crate::live::LiveError;

/// Errors from roster adapters, the aggregator and the runtime.
///
/// Lifecycle, writability and lookup errors are caller contract violations
/// and are returned immediately. Live errors come from the remote side of a
/// mutation; local state is untouched when one is returned.
#[derive(Debug, Error)]
pub enum RosterError {
    /// Adapter lifecycle violated.
    #[error("lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    /// No live service is bound, so mutations cannot be forwarded.
    #[error("{kind} of {account} are not writable")]
    NotWritable {
        /// Owning account.
        account: Address,
        /// Backend kind.
        kind: ServiceKind,
    },

    /// The backend kind cannot perform the operation at all.
    #[error("{kind} do not support {operation}")]
    Unsupported {
        /// Backend kind.
        kind: ServiceKind,
        /// Rejected operation.
        operation: &'static str,
    },

    /// No item with that address in the adapter.
    #[error("no item {address} in {kind} of {account}")]
    UnknownItem {
        /// Owning account.
        account: Address,
        /// Backend kind.
        kind: ServiceKind,
        /// Requested item address.
        address: Address,
    },

    /// The live service referred to an item the adapter does not know.
    #[error("{kind} of {account} out of sync with live service: unknown item {address}")]
    Inconsistent {
        /// Owning account.
        account: Address,
        /// Backend kind.
        kind: ServiceKind,
        /// Address named by the live event.
        address: Address,
    },

    /// No adapter with that id is attached.
    #[error("unknown roster source: {0}")]
    UnknownSource(AdapterId),

    /// No attached connection with that id.
    #[error("unknown connection: {0}")]
    UnknownConnection(ConnectionId),

    /// The connection is attached already.
    #[error("connection {0} is already attached")]
    AlreadyAttached(ConnectionId),

    /// The live service failed the request.
    #[error("live service error: {0}")]
    Live(#[from] LiveError),

    /// The cache store failed.
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    /// The roster runtime task is gone.
    #[error("roster runtime stopped")]
    Stopped,
}
