//! Integration tests for the position sync server
//!
//! These tests run the real TCP server on an ephemeral port and drive it with
//! plain socket clients speaking the newline delimited JSON protocol.

use assert_approx_eq::assert_approx_eq;
use server::config::ServerConfig;
use server::coordinator::Coordinator;
use server::network::Server;
use shared::codec;
use shared::mirror::RemoteWorld;
use shared::{in_spawn_area, Message, PALETTE};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tokio_test::{assert_err, assert_ok};

/// Test client over a real socket
struct TestClient {
    stream: TcpStream,
    buffer: Vec<u8>,
}

impl TestClient {
    async fn connect(addr: SocketAddr) -> Self {
        Self {
            stream: TcpStream::connect(addr).await.expect("Failed to connect"),
            buffer: Vec::new(),
        }
    }

    async fn send(&mut self, message: &Message) {
        let bytes = codec::encode(message).unwrap();
        assert_ok!(self.stream.write_all(&bytes).await);
    }

    async fn send_raw(&mut self, bytes: &[u8]) {
        assert_ok!(self.stream.write_all(bytes).await);
    }

    async fn join(&mut self, gametag: &str) -> (Message, Vec<shared::Player>) {
        self.send(&Message::Join {
            gametag: gametag.to_string(),
        })
        .await;
        let response = self.recv().await;
        assert!(matches!(response, Message::JoinResponse { .. }), "got {:?}", response);
        match self.recv().await {
            Message::GameState { players } => (response, players),
            other => panic!("Expected game_state, got {:?}", other),
        }
    }

    async fn recv(&mut self) -> Message {
        loop {
            if let Some(decoded) = codec::decode_next(&mut self.buffer) {
                return decoded.expect("server sent a malformed line");
            }
            let mut chunk = [0u8; 4096];
            let n = timeout(Duration::from_secs(2), self.stream.read(&mut chunk))
                .await
                .expect("timed out waiting for server message")
                .expect("read failed");
            assert!(n > 0, "server closed the connection");
            self.buffer.extend_from_slice(&chunk[..n]);
        }
    }

    async fn expect_silence(&mut self) {
        assert!(codec::decode_next(&mut self.buffer).is_none());
        let mut chunk = [0u8; 1024];
        let read = timeout(Duration::from_millis(150), self.stream.read(&mut chunk)).await;
        assert_err!(read, "unexpected data from server");
    }
}

async fn start_server() -> (SocketAddr, Arc<Coordinator>) {
    let server = Server::bind(ServerConfig::new("127.0.0.1", 0))
        .await
        .expect("Failed to bind server");
    let addr = server.local_addr().unwrap();
    let coordinator = server.coordinator();
    tokio::spawn(server.run());
    (addr, coordinator)
}

async fn wait_for_participants(coordinator: &Coordinator, expected: usize) {
    for _ in 0..100 {
        if coordinator.participant_count().await == expected {
            return;
        }
        sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(coordinator.participant_count().await, expected);
}

/// SESSION LIFECYCLE TESTS
mod lifecycle_tests {
    use super::*;

    /// First client sees only itself; the second join is announced to the first
    #[tokio::test]
    async fn two_client_join_scenario() {
        let (addr, _coordinator) = start_server().await;

        let mut ana = TestClient::connect(addr).await;
        let (response, players) = ana.join("Ana").await;
        match &response {
            Message::JoinResponse { color, x_pos, y_pos } => {
                assert!(PALETTE.contains(color));
                assert!(in_spawn_area(*x_pos, *y_pos));
            }
            _ => unreachable!(),
        }
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].gametag, "Ana");
        ana.expect_silence().await;

        let (ana_x, ana_y) = match response {
            Message::JoinResponse { x_pos, y_pos, .. } => (x_pos, y_pos),
            _ => unreachable!(),
        };

        let mut bo = TestClient::connect(addr).await;
        let (_, players) = bo.join("Bo").await;
        assert_eq!(players.len(), 2);
        let seen_ana = players.iter().find(|p| p.gametag == "Ana").unwrap();
        assert_approx_eq!(seen_ana.x_pos, ana_x);
        assert_approx_eq!(seen_ana.y_pos, ana_y);

        match ana.recv().await {
            Message::PlayerJoined { gametag, .. } => assert_eq!(gametag, "Bo"),
            other => panic!("Expected player_joined, got {:?}", other),
        }
        ana.expect_silence().await;
        bo.expect_silence().await;
    }

    /// Moves reach everyone but the mover, in the order they were sent
    #[tokio::test]
    async fn position_updates_fan_out() {
        let (addr, _coordinator) = start_server().await;
        let mut ana = TestClient::connect(addr).await;
        let mut bo = TestClient::connect(addr).await;
        let mut cy = TestClient::connect(addr).await;
        ana.join("Ana").await;
        bo.join("Bo").await;
        cy.join("Cy").await;
        ana.recv().await;
        ana.recv().await;
        bo.recv().await;

        for step in 0..5 {
            ana.send(&Message::PositionUpdate {
                x_pos: 100.0 + step as f64,
                y_pos: 200.0,
            })
            .await;
        }

        for client in [&mut bo, &mut cy] {
            for step in 0..5 {
                assert_eq!(
                    client.recv().await,
                    Message::PlayerMoved {
                        gametag: "Ana".to_string(),
                        x_pos: 100.0 + step as f64,
                        y_pos: 200.0,
                    }
                );
            }
        }
        ana.expect_silence().await;
    }

    /// A joined client leaving is announced exactly once to each remaining participant
    #[tokio::test]
    async fn disconnect_announces_departure() {
        let (addr, coordinator) = start_server().await;
        let mut ana = TestClient::connect(addr).await;
        let mut bo = TestClient::connect(addr).await;
        ana.join("Ana").await;
        bo.join("Bo").await;
        ana.recv().await;

        drop(bo);
        assert_eq!(
            ana.recv().await,
            Message::PlayerLeft {
                gametag: "Bo".to_string()
            }
        );
        ana.expect_silence().await;
        wait_for_participants(&coordinator, 1).await;
    }

    /// Connections that never joined leave without any broadcast
    #[tokio::test]
    async fn unjoined_disconnect_is_silent() {
        let (addr, coordinator) = start_server().await;
        let mut ana = TestClient::connect(addr).await;
        ana.join("Ana").await;

        let lurker = TestClient::connect(addr).await;
        drop(lurker);

        ana.expect_silence().await;
        assert_eq!(coordinator.participant_count().await, 1);
    }

    /// Identical gametags are both accepted
    #[tokio::test]
    async fn duplicate_gametags_are_allowed() {
        let (addr, coordinator) = start_server().await;
        let mut first = TestClient::connect(addr).await;
        let mut second = TestClient::connect(addr).await;
        first.join("Twin").await;
        let (_, players) = second.join("Twin").await;

        assert_eq!(players.len(), 2);
        assert!(players.iter().all(|p| p.gametag == "Twin"));
        assert_eq!(coordinator.participant_count().await, 2);
    }
}

/// PROTOCOL ROBUSTNESS TESTS
mod robustness_tests {
    use super::*;

    /// Garbage never closes the connection or changes state
    #[tokio::test]
    async fn malformed_input_is_discarded() {
        let (addr, coordinator) = start_server().await;
        let mut ana = TestClient::connect(addr).await;

        ana.send_raw(b"not json at all\n").await;
        ana.send_raw(b"{\"gametag\":\"missing type\"}\n").await;
        ana.send_raw(b"{\"type\":\"dance\"}\n").await;
        ana.send_raw(b"\n\n   \n").await;
        ana.send(&Message::PositionUpdate { x_pos: 5.0, y_pos: 5.0 }).await;
        ana.expect_silence().await;
        assert_eq!(coordinator.participant_count().await, 0);

        let (_, players) = ana.join("Ana").await;
        assert_eq!(players.len(), 1);
    }

    /// Two messages in one write and one message over two writes both decode
    #[tokio::test]
    async fn framing_across_writes() {
        let (addr, _coordinator) = start_server().await;
        let mut ana = TestClient::connect(addr).await;
        let mut bo = TestClient::connect(addr).await;
        ana.join("Ana").await;
        bo.join("Bo").await;
        ana.recv().await;

        let mut batch = codec::encode(&Message::PositionUpdate { x_pos: 1.0, y_pos: 1.0 }).unwrap();
        batch.extend(codec::encode(&Message::PositionUpdate { x_pos: 2.0, y_pos: 2.0 }).unwrap());
        bo.send_raw(&batch).await;

        let split = codec::encode(&Message::PositionUpdate { x_pos: 3.0, y_pos: 3.0 }).unwrap();
        let (head, tail) = split.split_at(7);
        bo.send_raw(head).await;
        sleep(Duration::from_millis(20)).await;
        bo.send_raw(tail).await;

        for n in 1..=3 {
            assert_eq!(
                ana.recv().await,
                Message::PlayerMoved {
                    gametag: "Bo".to_string(),
                    x_pos: n as f64,
                    y_pos: n as f64,
                }
            );
        }
    }

    /// The server keeps accepting after clients vanish mid-message
    #[tokio::test]
    async fn abrupt_disconnects_do_not_stop_the_server() {
        let (addr, coordinator) = start_server().await;

        for n in 0..10 {
            let mut client = TestClient::connect(addr).await;
            client.join(&format!("p{}", n)).await;
            client.send_raw(b"{\"type\":\"position_up").await;
        }
        wait_for_participants(&coordinator, 0).await;

        let mut late = TestClient::connect(addr).await;
        let (_, players) = late.join("Late").await;
        assert_eq!(players.len(), 1);
    }
}

/// CLIENT MIRROR TESTS
mod mirror_tests {
    use super::*;

    /// A client's mirror converges with the server's authoritative snapshot
    #[tokio::test]
    async fn mirror_tracks_server_state() {
        let (addr, coordinator) = start_server().await;
        let mut ana = TestClient::connect(addr).await;
        let mut world = RemoteWorld::new();
        world.set_local_gametag("Ana");

        let (response, players) = ana.join("Ana").await;
        world.apply(&response);
        world.apply(&Message::GameState { players });

        let mut others = Vec::new();
        for gametag in ["Bo", "Cy", "Di"] {
            let mut client = TestClient::connect(addr).await;
            client.join(gametag).await;
            client
                .send(&Message::PositionUpdate { x_pos: 10.0, y_pos: 20.0 })
                .await;
            others.push(client);
        }
        drop(others.remove(1));

        // Bo, Cy and Di join and move, then Cy leaves
        for _ in 0..7 {
            let message = ana.recv().await;
            world.apply(&message);
        }

        let snapshot = coordinator.snapshot().await;
        assert_eq!(snapshot.len(), 3);
        assert_eq!(world.len(), 2);
        for player in snapshot.iter().filter(|p| p.gametag != "Ana") {
            assert_eq!(world.get(&player.gametag), Some(player));
        }
        assert!(world.get("Cy").is_none());
    }
}
