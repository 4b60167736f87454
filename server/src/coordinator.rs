//! Shared state of the server and the fan-out of state changes.
//!
//! The session registry and the set of open connections sit behind a single
//! lock. Every join, move, removal, snapshot and broadcast runs as one critical
//! section, so a participant's removal and its `player_left` notification are
//! never observed apart. Nothing in a critical section awaits: delivery is a
//! `try_send` into the destination's bounded outbound queue, so a stalled
//! destination can never hold up the others.

use log::{info, warn};
use shared::{Message, Player};
use std::collections::VecDeque;
use std::net::SocketAddr;
use tokio::sync::{mpsc, RwLock};

use crate::client_manager::{ClientManager, ConnectionId};
use crate::config::ServerConfig;
use crate::registry::SessionRegistry;

struct Shared {
    registry: SessionRegistry,
    clients: ClientManager,
}

impl Shared {
    /// Queues `message` for every joined connection except `exclude`.
    ///
    /// A destination whose queue rejects the message is removed on the spot and
    /// its departure is announced to whoever is left, which may prune further
    /// connections in turn. Returns every connection pruned along the way.
    fn broadcast(&mut self, message: Message, exclude: Option<ConnectionId>) -> Vec<ConnectionId> {
        let mut pruned = Vec::new();
        let mut pending = VecDeque::from([(message, exclude)]);

        while let Some((message, exclude)) = pending.pop_front() {
            for id in self.registry.connection_ids() {
                if Some(id) == exclude || !self.registry.contains(id) {
                    continue;
                }
                if let Err(e) = self.clients.send_to(id, message.clone()) {
                    warn!("Dropping {} after failed {} delivery: {}", id, message.kind(), e);
                    pruned.push(id);
                    if let Some(player) = self.remove(id) {
                        pending.push_back((Message::player_left(&player), None));
                    }
                }
            }
        }

        pruned
    }

    /// Queues a message for one connection, pruning it on failure
    fn send_private(&mut self, id: ConnectionId, message: Message) -> bool {
        match self.clients.send_to(id, message) {
            Ok(()) => true,
            Err(e) => {
                warn!("Dropping {} after failed private delivery: {}", id, e);
                if let Some(player) = self.remove(id) {
                    self.broadcast(Message::player_left(&player), None);
                }
                false
            }
        }
    }

    fn remove(&mut self, id: ConnectionId) -> Option<Player> {
        self.clients.remove_client(&id);
        let player = self.registry.remove(id)?;
        info!("[ - ] Player left {}", player.gametag);
        Some(player)
    }
}

/// Owner of all shared server state
///
/// Cloned into every connection handler behind an `Arc`.
pub struct Coordinator {
    shared: RwLock<Shared>,
}

impl Coordinator {
    pub fn new(config: &ServerConfig) -> Self {
        Self::with_registry(config, SessionRegistry::new())
    }

    pub fn with_registry(config: &ServerConfig, registry: SessionRegistry) -> Self {
        Self {
            shared: RwLock::new(Shared {
                registry,
                clients: ClientManager::new(config.queue_capacity),
            }),
        }
    }

    /// Tracks a freshly accepted connection
    ///
    /// The returned receiver is the connection's outbound queue.
    pub async fn connect(&self, addr: SocketAddr) -> (ConnectionId, mpsc::Receiver<Message>) {
        self.shared.write().await.clients.add_client(addr)
    }

    /// Joins a connection as a participant
    ///
    /// In one critical section: registers the participant, queues its
    /// `join_response`, announces it to everyone else, then queues the full
    /// `game_state` for it. Returns None if the connection is no longer open or
    /// was dropped while queuing its own messages.
    pub async fn join(&self, id: ConnectionId, gametag: &str) -> Option<Player> {
        let mut shared = self.shared.write().await;
        if !shared.clients.contains(&id) {
            return None;
        }

        let player = shared.registry.join(id, gametag);
        info!("[ + ] New player {} ({})", player.gametag, id);

        if !shared.send_private(id, Message::join_response(&player)) {
            return None;
        }
        shared.broadcast(Message::player_joined(&player), Some(id));

        let players = shared.registry.snapshot();
        if !shared.send_private(id, Message::GameState { players }) {
            return None;
        }
        Some(player)
    }

    /// Moves a joined participant and tells everyone else
    ///
    /// Returns false, without broadcasting, when the connection has not joined.
    pub async fn update_position(&self, id: ConnectionId, x_pos: f64, y_pos: f64) -> bool {
        let mut shared = self.shared.write().await;
        let gametag = match shared.registry.update_position(id, x_pos, y_pos) {
            Some(player) => player.gametag.clone(),
            None => return false,
        };

        shared.broadcast(
            Message::PlayerMoved {
                gametag,
                x_pos,
                y_pos,
            },
            Some(id),
        );
        true
    }

    /// Closes a connection's bookkeeping
    ///
    /// If it had joined, its participant is removed and `player_left` goes to
    /// everyone remaining. Safe to call more than once.
    pub async fn disconnect(&self, id: ConnectionId) -> Option<Player> {
        let mut shared = self.shared.write().await;
        let player = shared.remove(id)?;
        shared.broadcast(Message::player_left(&player), None);
        Some(player)
    }

    /// Queues `message` for every joined connection except `exclude`
    ///
    /// Returns the connections that were pruned because delivery failed.
    pub async fn broadcast(&self, message: Message, exclude: Option<ConnectionId>) -> Vec<ConnectionId> {
        self.shared.write().await.broadcast(message, exclude)
    }

    pub async fn snapshot(&self) -> Vec<Player> {
        self.shared.read().await.registry.snapshot()
    }

    pub async fn participant_count(&self) -> usize {
        self.shared.read().await.registry.len()
    }

    pub async fn connection_count(&self) -> usize {
        self.shared.read().await.clients.len()
    }

    pub async fn is_joined(&self, id: ConnectionId) -> bool {
        self.shared.read().await.registry.contains(id)
    }
}
