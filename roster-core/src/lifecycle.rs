//! Roster service adapter lifecycle.
//!
//! ```text
//!   Unprepared{loaded} --Prepare(c)--> Prepared{c} --Shutdown(c)--> ShutDown
//!          ^                                                        |
//!          |                          Prepare(c')  <----------------+
//!          +------------------------- Clear  <----------------------+
//! ```
//!
//! Loading is only possible while Unprepared and not already loaded. Items
//! survive a shutdown, so a shut down adapter counts as loaded until cleared.

use roster_types::ConnectionId;
use thiserror::Error;

/// Lifecycle contract violations. These are caller bugs and never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// `load` was called again without an intervening `clear`.
    #[error("items already loaded; clear before loading again")]
    AlreadyLoaded,

    /// `load` was called while bound to a live connection.
    #[error("cannot load while prepared for {0}")]
    LoadWhilePrepared(ConnectionId),

    /// `prepare` was called while already bound.
    #[error("already prepared for {0}")]
    AlreadyPrepared(ConnectionId),

    /// `shutdown` was called while not bound.
    #[error("not prepared for any connection")]
    NotPrepared,

    /// `shutdown` named a different connection than the bound one.
    #[error("prepared for {bound}, not {requested}")]
    ConnectionMismatch {
        /// Connection the adapter is bound to.
        bound: ConnectionId,
        /// Connection named by the caller.
        requested: ConnectionId,
    },

    /// `clear` was called while bound to a live connection.
    #[error("cannot clear while prepared for {0}")]
    ClearWhilePrepared(ConnectionId),
}

/// Inputs to the lifecycle machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Cached items were loaded.
    Load,
    /// All items were dropped.
    Clear,
    /// Bound to a live connection.
    Prepare(ConnectionId),
    /// Unbound from a live connection.
    Shutdown(ConnectionId),
}

/// Lifecycle state of one adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterState {
    /// No live binding.
    Unprepared {
        /// Whether cached items were loaded.
        loaded: bool,
    },
    /// Bound to a live connection; live events drive all changes.
    Prepared {
        /// The bound connection.
        connection: ConnectionId,
    },
    /// Unbound after a live binding. Items are retained.
    ShutDown,
}

impl AdapterState {
    /// Initial state.
    pub fn new() -> Self {
        Self::Unprepared { loaded: false }
    }

    /// Apply an event, returning the next state or the violated rule.
    ///
    /// On error the caller keeps its current state.
    pub fn on_event(self, event: LifecycleEvent) -> Result<Self, LifecycleError> {
        match (self, event) {
            (Self::Unprepared { loaded: false }, LifecycleEvent::Load) => {
                Ok(Self::Unprepared { loaded: true })
            }
            (Self::Unprepared { loaded: true } | Self::ShutDown, LifecycleEvent::Load) => {
                Err(LifecycleError::AlreadyLoaded)
            }
            (Self::Prepared { connection }, LifecycleEvent::Load) => {
                Err(LifecycleError::LoadWhilePrepared(connection))
            }

            (Self::Unprepared { .. } | Self::ShutDown, LifecycleEvent::Clear) => {
                Ok(Self::Unprepared { loaded: false })
            }
            (Self::Prepared { connection }, LifecycleEvent::Clear) => {
                Err(LifecycleError::ClearWhilePrepared(connection))
            }

            (Self::Unprepared { .. } | Self::ShutDown, LifecycleEvent::Prepare(connection)) => {
                Ok(Self::Prepared { connection })
            }
            (Self::Prepared { connection }, LifecycleEvent::Prepare(_)) => {
                Err(LifecycleError::AlreadyPrepared(connection))
            }

            (Self::Prepared { connection }, LifecycleEvent::Shutdown(requested)) => {
                if connection == requested {
                    Ok(Self::ShutDown)
                } else {
                    Err(LifecycleError::ConnectionMismatch {
                        bound: connection,
                        requested,
                    })
                }
            }
            (Self::Unprepared { .. } | Self::ShutDown, LifecycleEvent::Shutdown(_)) => {
                Err(LifecycleError::NotPrepared)
            }
        }
    }

    /// Apply an event in place. The state is untouched on error.
    pub fn apply(&mut self, event: LifecycleEvent) -> Result<(), LifecycleError> {
        *self = self.on_event(event)?;
        Ok(())
    }

    /// True iff bound to a live connection.
    pub fn is_writable(&self) -> bool {
        matches!(self, Self::Prepared { .. })
    }

    /// The bound connection, if any.
    pub fn connection(&self) -> Option<ConnectionId> {
        match self {
            Self::Prepared { connection } => Some(*connection),
            _ => None,
        }
    }
}

impl Default for AdapterState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_unprepared_and_unloaded() {
        let state = AdapterState::new();
        assert_eq!(state, AdapterState::Unprepared { loaded: false });
        assert!(!state.is_writable());
    }

    #[test]
    fn second_load_fails_until_cleared() {
        let mut state = AdapterState::new();
        state.apply(LifecycleEvent::Load).unwrap();

        assert_eq!(
            state.apply(LifecycleEvent::Load),
            Err(LifecycleError::AlreadyLoaded)
        );
        assert_eq!(
            state.apply(LifecycleEvent::Load),
            Err(LifecycleError::AlreadyLoaded)
        );

        state.apply(LifecycleEvent::Clear).unwrap();
        assert!(state.apply(LifecycleEvent::Load).is_ok());
    }

    #[test]
    fn load_while_prepared_fails() {
        let conn = ConnectionId::next();
        let state = AdapterState::Prepared { connection: conn };
        assert_eq!(
            state.on_event(LifecycleEvent::Load),
            Err(LifecycleError::LoadWhilePrepared(conn))
        );
    }

    #[test]
    fn prepare_then_shutdown() {
        let conn = ConnectionId::next();
        let mut state = AdapterState::new();
        state.apply(LifecycleEvent::Load).unwrap();
        state.apply(LifecycleEvent::Prepare(conn)).unwrap();
        assert!(state.is_writable());
        assert_eq!(state.connection(), Some(conn));

        assert_eq!(
            state.apply(LifecycleEvent::Prepare(ConnectionId::next())),
            Err(LifecycleError::AlreadyPrepared(conn))
        );

        state.apply(LifecycleEvent::Shutdown(conn)).unwrap();
        assert_eq!(state, AdapterState::ShutDown);
        assert!(!state.is_writable());
    }

    #[test]
    fn shutdown_requires_matching_connection() {
        let bound = ConnectionId::next();
        let other = ConnectionId::next();
        let mut state = AdapterState::Prepared { connection: bound };

        assert_eq!(
            state.apply(LifecycleEvent::Shutdown(other)),
            Err(LifecycleError::ConnectionMismatch {
                bound,
                requested: other
            })
        );
        assert!(state.is_writable());
    }

    #[test]
    fn shutdown_while_not_prepared_fails() {
        let conn = ConnectionId::next();
        assert_eq!(
            AdapterState::new().on_event(LifecycleEvent::Shutdown(conn)),
            Err(LifecycleError::NotPrepared)
        );
        assert_eq!(
            AdapterState::ShutDown.on_event(LifecycleEvent::Shutdown(conn)),
            Err(LifecycleError::NotPrepared)
        );
    }

    #[test]
    fn shut_down_adapter_can_be_prepared_again() {
        let state = AdapterState::ShutDown;
        let conn = ConnectionId::next();
        assert_eq!(
            state.on_event(LifecycleEvent::Prepare(conn)),
            Ok(AdapterState::Prepared { connection: conn })
        );
        assert_eq!(
            state.on_event(LifecycleEvent::Load),
            Err(LifecycleError::AlreadyLoaded)
        );
    }

    #[test]
    fn clear_while_prepared_fails() {
        let conn = ConnectionId::next();
        let state = AdapterState::Prepared { connection: conn };
        assert_eq!(
            state.on_event(LifecycleEvent::Clear),
            Err(LifecycleError::ClearWhilePrepared(conn))
        );
    }
}
