//! Live connection tracking for the multiplayer server
//!
//! This module handles the server-side bookkeeping of every open transport,
//! joined or not:
//! - Connection identity assignment
//! - The outbound queue each connection handler drains into its socket
//! - Non-blocking delivery into those queues
//!
//! A connection is tracked here from accept until close. Whether it has joined
//! is the registry's business, not this module's.

use log::info;
use shared::Message;
use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::time::Instant;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::error::DeliveryError;

/// Opaque handle for one live transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl From<u64> for ConnectionId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Represents an open connection and the queue feeding its socket
#[derive(Debug)]
pub struct Client {
    /// Identifier assigned by the server at accept time
    pub id: ConnectionId,
    /// Remote address, for logging
    pub addr: SocketAddr,
    /// When the connection was accepted
    pub connected_at: Instant,
    sender: mpsc::Sender<Message>,
}

impl Client {
    pub fn new(id: ConnectionId, addr: SocketAddr, sender: mpsc::Sender<Message>) -> Self {
        Self {
            id,
            addr,
            connected_at: Instant::now(),
            sender,
        }
    }

    /// Queues a message without waiting
    ///
    /// A full queue means the handler is not keeping up with its socket, which
    /// is treated the same as a dead one.
    pub fn deliver(&self, message: Message) -> Result<(), DeliveryError> {
        self.sender.try_send(message).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryError::QueueFull(self.id),
            TrySendError::Closed(_) => DeliveryError::QueueClosed(self.id),
        })
    }
}

/// Manages all open connections
///
/// Hands out connection identifiers and routes outbound messages to the right
/// handler queue. Capacity is bounded per queue, never in the number of
/// connections.
pub struct ClientManager {
    /// Open connections indexed by their identifier
    clients: HashMap<ConnectionId, Client>,
    /// Next identifier to hand out
    next_client_id: u64,
    /// Bound on each connection's outbound queue
    queue_capacity: usize,
}

/// Smallest outbound queue a connection gets. A join queues `join_response`
/// and `game_state` for the joiner before its handler can drain either.
pub const MIN_QUEUE_CAPACITY: usize = 2;

impl ClientManager {
    /// Creates an empty manager whose connections get queues of `queue_capacity` messages
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            clients: HashMap::new(),
            next_client_id: 1,
            queue_capacity: queue_capacity.max(MIN_QUEUE_CAPACITY),
        }
    }

    /// Registers a new connection
    ///
    /// Returns the assigned identifier and the receiving end of its outbound
    /// queue, which the connection handler owns.
    pub fn add_client(&mut self, addr: SocketAddr) -> (ConnectionId, mpsc::Receiver<Message>) {
        let id = ConnectionId(self.next_client_id);
        self.next_client_id += 1;

        let (sender, receiver) = mpsc::channel(self.queue_capacity);
        info!("Connection {} opened from {}", id, addr);
        self.clients.insert(id, Client::new(id, addr, sender));

        (id, receiver)
    }

    /// Forgets a connection
    ///
    /// Dropping the sender closes the handler's queue once it is drained.
    /// Returns false if the connection was already gone.
    pub fn remove_client(&mut self, id: &ConnectionId) -> bool {
        if let Some(client) = self.clients.remove(id) {
            info!(
                "Connection {} from {} closed after {:.1}s",
                client.id,
                client.addr,
                client.connected_at.elapsed().as_secs_f32()
            );
            true
        } else {
            false
        }
    }

    /// Queues a message for one connection
    pub fn send_to(&self, id: ConnectionId, message: Message) -> Result<(), DeliveryError> {
        self.clients
            .get(&id)
            .ok_or(DeliveryError::UnknownConnection(id))?
            .deliver(message)
    }

    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.clients.contains_key(id)
    }

    pub fn get(&self, id: &ConnectionId) -> Option<&Client> {
        self.clients.get(id)
    }

    /// Returns the number of open connections
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Returns true if no connections are open
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
