//! # Position Sync Server Library
//!
//! This library provides the authoritative server for a shared 2D space. Clients
//! connect over TCP, join under a display name, and report their own position;
//! the server keeps the canonical state of every participant and relays each
//! change to everyone else.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative State
//! The server assigns every participant its color and spawn point and holds the
//! last reported position of each. Newly joined clients receive a snapshot of
//! this state rather than a replay of history.
//!
//! ### Connection Lifecycle
//! Handles each connection from accept to close:
//! - Join handshake and participant registration
//! - Position updates relayed to every other participant
//! - Departure announcements on disconnect, error, or pruning
//!
//! ### Fault Containment
//! Garbage input, early disconnects and dead sockets never take down more than
//! the one connection they belong to. A malformed line is dropped, a failed
//! delivery prunes only its destination, and the accept loop keeps running.
//!
//! ## Architecture Design
//!
//! ### Task Per Connection
//! Every accepted transport gets its own tokio task that both reads the socket
//! and drains an outbound queue into it. Tasks never write to each other's
//! sockets directly.
//!
//! ### Single Lock Over Shared State
//! The session registry and the set of open connections live together behind
//! one lock in the [`coordinator::Coordinator`]. A join, move or removal and the
//! broadcast it causes happen in one critical section, so every participant
//! observes the changes of a given connection in the order they were sent.
//!
//! ### Non-blocking Fan-out
//! Broadcasting queues a message on each destination's bounded outbound queue
//! without waiting. A full or closed queue counts as a dead destination.
//!
//! ## Module Organization
//!
//! - `client_manager`: open connections and their outbound queues
//! - `registry`: joined participants and spawn/color assignment
//! - `coordinator`: the lock, the join/move/leave transitions and broadcasting
//! - `connection`: the per-connection handler and its state machine
//! - `network`: the accept loop
//! - `config`: runtime settings
//! - `error`: delivery and disconnect failure kinds
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::bind(ServerConfig::new("127.0.0.1", 12345)).await?;
//!
//!     // Accept until Ctrl+C; open connections are left to finish on their own
//!     server
//!         .run_until(async {
//!             let _ = tokio::signal::ctrl_c().await;
//!         })
//!         .await;
//!
//!     Ok(())
//! }
//! ```

pub mod client_manager;
pub mod config;
pub mod connection;
pub mod coordinator;
pub mod error;
pub mod network;
pub mod registry;
