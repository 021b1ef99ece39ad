//! Actor runtime for the roster.
//!
//! [`spawn`] moves a [`RosterManager`] into a tokio task that is the only
//! owner of roster state. Callers talk to it through a cloneable
//! [`RosterHandle`]; live notifications arrive on the manager's own channel
//! and are applied in between commands.
//!
//! Mutations are split in two: the actor builds the [`PendingMutation`]
//! and the handle awaits the live service, so the actor keeps applying
//! notifications while a request is in flight.

use roster_core::DelayConfig;
use roster_types::ConnectionId;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::adapter::PendingMutation;
use crate::cache::CacheStore;
use crate::error::RosterError;
use crate::live::{LiveConnection, SourceEvent};
use crate::manager::{ItemKey, ItemView, RosterEvent, RosterManager};
use crate::writeback::WriteManager;

type Reply<T> = oneshot::Sender<T>;
type Writes = Vec<JoinHandle<()>>;

enum Command {
    Attach {
        connection: Arc<dyn LiveConnection>,
        reply: Reply<Result<(), RosterError>>,
    },
    Detach {
        connection: ConnectionId,
        reply: Reply<Result<Writes, RosterError>>,
    },
    LabelRequest {
        key: ItemKey,
        label: Option<String>,
        reply: Reply<Result<PendingMutation, RosterError>>,
    },
    TagsRequest {
        key: ItemKey,
        add: BTreeSet<String>,
        remove: BTreeSet<String>,
        reply: Reply<Result<PendingMutation, RosterError>>,
    },
    Items {
        reply: Reply<Vec<ItemView>>,
    },
    Tags {
        reply: Reply<Vec<(String, usize)>>,
    },
    Index {
        key: ItemKey,
        reply: Reply<Option<usize>>,
    },
    Subscribe {
        reply: Reply<mpsc::UnboundedReceiver<RosterEvent>>,
    },
    Save {
        reply: Reply<Writes>,
    },
    Writeback,
    Shutdown {
        reply: Reply<Writes>,
    },
}

/// Start the roster actor.
///
/// Write-back requests are debounced with `delay` and then save every dirty
/// adapter. The actor stops on [`RosterHandle::shutdown`] or when every
/// handle is dropped, detaching all connections first.
pub fn spawn(store: Arc<dyn CacheStore>, delay: DelayConfig) -> (RosterHandle, JoinHandle<()>) {
    let (commands, rx) = mpsc::unbounded_channel();

    // Weak, so pending timers do not keep the actor alive.
    let writeback = commands.downgrade();
    let writeman = WriteManager::new(delay, move || {
        if let Some(commands) = writeback.upgrade() {
            let _ = commands.send(Command::Writeback);
        }
    });

    let (manager, events) = RosterManager::new(store, writeman);
    let task = tokio::spawn(run(manager, rx, events));
    (RosterHandle { commands }, task)
}

async fn run(
    mut manager: RosterManager,
    mut commands: mpsc::UnboundedReceiver<Command>,
    mut events: mpsc::UnboundedReceiver<SourceEvent>,
) {
    tracing::debug!("Roster actor started");
    loop {
        tokio::select! {
            // Queued notifications are applied before the next command.
            biased;

            Some(event) = events.recv() => {
                if let Err(e) = manager.dispatch(event) {
                    tracing::error!("Failed to apply live event: {}", e);
                }
            }
            command = commands.recv() => match command {
                Some(command) => {
                    if !handle(&mut manager, command).await {
                        break;
                    }
                }
                None => {
                    settle(manager.shutdown()).await;
                    break;
                }
            },
        }
    }
    tracing::debug!("Roster actor stopped");
}

/// Run one command. Returns false once the actor should stop.
async fn handle(manager: &mut RosterManager, command: Command) -> bool {
    match command {
        Command::Attach { connection, reply } => {
            let _ = reply.send(manager.attach(connection.as_ref()).await);
        }
        Command::Detach { connection, reply } => {
            let _ = reply.send(manager.detach(connection));
        }
        Command::LabelRequest { key, label, reply } => {
            let _ = reply.send(manager.label_request(&key, label));
        }
        Command::TagsRequest {
            key,
            add,
            remove,
            reply,
        } => {
            let _ = reply.send(manager.tags_request(&key, add, remove));
        }
        Command::Items { reply } => {
            let _ = reply.send(manager.iter().collect());
        }
        Command::Tags { reply } => {
            let tags = manager
                .tags()
                .iter()
                .map(|(tag, count)| (tag.to_string(), count))
                .collect();
            let _ = reply.send(tags);
        }
        Command::Index { key, reply } => {
            let _ = reply.send(manager.index(&key));
        }
        Command::Subscribe { reply } => {
            let _ = reply.send(manager.subscribe());
        }
        Command::Save { reply } => {
            let _ = reply.send(manager.save_all());
        }
        Command::Writeback => {
            let writes = manager.save_all();
            tracing::debug!("Writeback started {} cache writes", writes.len());
        }
        Command::Shutdown { reply } => {
            let _ = reply.send(manager.shutdown());
            return false;
        }
    }
    true
}

async fn settle(writes: Writes) {
    for write in writes {
        if let Err(e) = write.await {
            tracing::warn!("Cache write task failed: {}", e);
        }
    }
}

/// Handle to a running roster actor. Cheap to clone.
#[derive(Clone)]
pub struct RosterHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl RosterHandle {
    async fn request<T>(&self, make: impl FnOnce(Reply<T>) -> Command) -> Result<T, RosterError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(make(reply))
            .map_err(|_| RosterError::Stopped)?;
        rx.await.map_err(|_| RosterError::Stopped)
    }

    /// Attach a live connection. See [`RosterManager::attach`].
    pub async fn attach(&self, connection: Arc<dyn LiveConnection>) -> Result<(), RosterError> {
        self.request(|reply| Command::Attach { connection, reply })
            .await?
    }

    /// Detach a connection and wait for its final cache writes.
    pub async fn detach(&self, connection: ConnectionId) -> Result<(), RosterError> {
        let writes = self
            .request(|reply| Command::Detach { connection, reply })
            .await??;
        settle(writes).await;
        Ok(())
    }

    /// Relabel an item through its live service.
    ///
    /// Returns once the service acknowledged. The new label shows up when the
    /// service's notification has been applied.
    pub async fn set_label(&self, key: ItemKey, label: Option<String>) -> Result<(), RosterError> {
        let pending = self
            .request(|reply| Command::LabelRequest { key, label, reply })
            .await??;
        pending.send().await
    }

    /// Retag an item through its live service.
    pub async fn update_tags(
        &self,
        key: ItemKey,
        add: BTreeSet<String>,
        remove: BTreeSet<String>,
    ) -> Result<(), RosterError> {
        let pending = self
            .request(|reply| Command::TagsRequest {
                key,
                add,
                remove,
                reply,
            })
            .await??;
        pending.send().await
    }

    /// All items in global order.
    pub async fn items(&self) -> Result<Vec<ItemView>, RosterError> {
        self.request(|reply| Command::Items { reply }).await
    }

    /// Tags in use with their item counts.
    pub async fn tags(&self) -> Result<Vec<(String, usize)>, RosterError> {
        self.request(|reply| Command::Tags { reply }).await
    }

    /// Global index of an item.
    pub async fn index(&self, key: ItemKey) -> Result<Option<usize>, RosterError> {
        self.request(|reply| Command::Index { key, reply }).await
    }

    /// Subscribe to roster notifications.
    pub async fn subscribe(&self) -> Result<mpsc::UnboundedReceiver<RosterEvent>, RosterError> {
        self.request(|reply| Command::Subscribe { reply }).await
    }

    /// Save every dirty adapter now and wait for the writes.
    pub async fn save(&self) -> Result<(), RosterError> {
        let writes = self.request(|reply| Command::Save { reply }).await?;
        settle(writes).await;
        Ok(())
    }

    /// Detach everything, wait for the final writes and stop the actor.
    pub async fn shutdown(&self) -> Result<(), RosterError> {
        let writes = self.request(|reply| Command::Shutdown { reply }).await?;
        settle(writes).await;
        Ok(())
    }
}

impl std::fmt::Debug for RosterHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RosterHandle")
            .field("stopped", &self.commands.is_closed())
            .finish()
    }
}
