//! Per-connection handler
//!
//! One handler task runs per accepted transport. It reads and decodes inbound
//! lines, applies them through the [`Coordinator`], and writes whatever lands in
//! its outbound queue back to the socket. Reads and writes share one task, so a
//! slow socket only ever stalls its own connection.

use log::{debug, log, warn, Level};
use shared::codec::{self, DecodeError};
use shared::Message;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::client_manager::ConnectionId;
use crate::config::ServerConfig;
use crate::coordinator::Coordinator;
use crate::error::DisconnectReason;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Transport open, no join yet
    Connected,
    /// Registered as a participant
    Joined,
    /// Terminal
    Closed,
}

/// What a single inbound message did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Joined,
    Moved,
    Ignored,
}

pub struct ConnectionHandler {
    id: ConnectionId,
    addr: SocketAddr,
    coordinator: Arc<Coordinator>,
    outbound: mpsc::Receiver<Message>,
    state: ConnectionState,
    buffer: Vec<u8>,
    read_chunk: usize,
    write_timeout: Duration,
}

impl ConnectionHandler {
    /// Registers the connection with the coordinator and builds its handler
    pub async fn register(coordinator: Arc<Coordinator>, addr: SocketAddr, config: &ServerConfig) -> Self {
        let (id, outbound) = coordinator.connect(addr).await;
        Self {
            id,
            addr,
            coordinator,
            outbound,
            state: ConnectionState::Connected,
            buffer: Vec::new(),
            read_chunk: config.read_chunk.max(1),
            write_timeout: config.write_timeout,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Serves the transport until it closes or fails
    ///
    /// Always leaves the coordinator without an entry for this connection, with
    /// `player_left` announced if it had joined.
    pub async fn run<S>(mut self, stream: S) -> DisconnectReason
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let (mut reader, mut writer) = tokio::io::split(stream);
        let mut chunk = vec![0u8; self.read_chunk];

        let reason = loop {
            tokio::select! {
                read = reader.read(&mut chunk) => match read {
                    Ok(0) => break DisconnectReason::PeerClosed,
                    Ok(n) => {
                        self.buffer.extend_from_slice(&chunk[..n]);
                        self.process_buffer().await;
                    }
                    Err(e) => break DisconnectReason::ReadFailed(e.kind()),
                },
                outgoing = self.outbound.recv() => match outgoing {
                    Some(message) => {
                        if let Err(reason) = self.write_message(&mut writer, &message).await {
                            break reason;
                        }
                    }
                    None => break DisconnectReason::Pruned,
                },
            }
        };

        self.close(&reason).await;
        reason
    }

    /// Dispatches every complete line currently buffered
    async fn process_buffer(&mut self) {
        while let Some(decoded) = codec::decode_next(&mut self.buffer) {
            match decoded {
                Ok(message) => {
                    self.dispatch(message).await;
                }
                Err(e) => self.discard(e),
            }
        }
    }

    /// Applies one decoded message according to the connection state
    pub async fn dispatch(&mut self, message: Message) -> Dispatch {
        match (self.state, message) {
            (ConnectionState::Connected, Message::Join { gametag }) => {
                if self.coordinator.join(self.id, &gametag).await.is_some() {
                    self.state = ConnectionState::Joined;
                    Dispatch::Joined
                } else {
                    Dispatch::Ignored
                }
            }
            (ConnectionState::Joined, Message::PositionUpdate { x_pos, y_pos }) => {
                if self.coordinator.update_position(self.id, x_pos, y_pos).await {
                    Dispatch::Moved
                } else {
                    Dispatch::Ignored
                }
            }
            (state, message) => {
                debug!(
                    "Ignoring {} message from {} in state {:?}",
                    message.kind(),
                    self.id,
                    state
                );
                Dispatch::Ignored
            }
        }
    }

    fn discard(&self, error: DecodeError) {
        debug!("Discarding malformed line from {}: {}", self.id, error);
    }

    async fn write_message<W>(&self, writer: &mut W, message: &Message) -> Result<(), DisconnectReason>
    where
        W: AsyncWrite + Unpin,
    {
        let bytes = match codec::encode(message) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Skipping message for {}: {}", self.id, e);
                return Ok(());
            }
        };

        let write = async {
            writer.write_all(&bytes).await?;
            writer.flush().await
        };
        match timeout(self.write_timeout, write).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(DisconnectReason::WriteFailed(e.kind())),
            Err(_) => Err(DisconnectReason::WriteTimedOut),
        }
    }

    async fn close(&mut self, reason: &DisconnectReason) {
        self.state = ConnectionState::Closed;
        let departed = self.coordinator.disconnect(self.id).await;
        let level = if reason.is_graceful() { Level::Info } else { Level::Warn };
        match departed {
            Some(player) => log!(
                level,
                "Connection {} ({}) closed: {}; '{}' left",
                self.id,
                self.addr,
                reason,
                player.gametag
            ),
            None => log!(level, "Connection {} ({}) closed: {}", self.id, self.addr, reason),
        }
    }
}
