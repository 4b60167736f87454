//! Failure kinds seen by the server. None of them is fatal to the process: a
//! delivery failure prunes one connection, a disconnect reason ends one handler.

use std::io;
use thiserror::Error;

use crate::client_manager::ConnectionId;

/// Why a message could not be queued for a connection
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("outbound queue of connection {0} is full")]
    QueueFull(ConnectionId),
    #[error("outbound queue of connection {0} is closed")]
    QueueClosed(ConnectionId),
    #[error("connection {0} is not registered")]
    UnknownConnection(ConnectionId),
}

/// Why a connection handler stopped
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    #[error("peer closed the connection")]
    PeerClosed,
    #[error("read failed: {0}")]
    ReadFailed(io::ErrorKind),
    #[error("write failed: {0}")]
    WriteFailed(io::ErrorKind),
    #[error("write timed out")]
    WriteTimedOut,
    #[error("pruned after a failed delivery")]
    Pruned,
}

impl DisconnectReason {
    /// Whether the peer went away on its own rather than being dropped by us
    pub fn is_graceful(&self) -> bool {
        matches!(self, DisconnectReason::PeerClosed)
    }
}
