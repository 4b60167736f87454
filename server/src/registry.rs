use log::debug;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use shared::{Player, PALETTE, SPAWN_MAX_X, SPAWN_MAX_Y, SPAWN_MIN_X, SPAWN_MIN_Y};
use std::collections::HashMap;

use crate::client_manager::ConnectionId;

/// Authoritative state of every joined participant
///
/// Only joined connections have an entry. Callers hold the coordinator lock
/// around every operation; the registry itself does no synchronization.
#[derive(Debug)]
pub struct SessionRegistry {
    players: HashMap<ConnectionId, Player>,
    rng: StdRng,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    pub fn with_rng(rng: StdRng) -> Self {
        Self {
            players: HashMap::new(),
            rng,
        }
    }

    /// Registers a participant with a random palette color and spawn point
    ///
    /// Gametags are not required to be unique.
    pub fn join(&mut self, id: ConnectionId, gametag: impl Into<String>) -> Player {
        let color = *PALETTE.choose(&mut self.rng).unwrap_or(&PALETTE[0]);
        let x_pos = self.rng.gen_range(SPAWN_MIN_X as u32..=SPAWN_MAX_X as u32) as f64;
        let y_pos = self.rng.gen_range(SPAWN_MIN_Y as u32..=SPAWN_MAX_Y as u32) as f64;

        let player = Player::new(gametag, x_pos, y_pos, color);
        debug!(
            "Registered {} as '{}' at ({}, {})",
            id, player.gametag, player.x_pos, player.y_pos
        );
        self.players.insert(id, player.clone());
        player
    }

    /// Overwrites the position of a joined participant
    ///
    /// Returns the updated state, or None when the connection has not joined.
    pub fn update_position(&mut self, id: ConnectionId, x_pos: f64, y_pos: f64) -> Option<&Player> {
        let player = self.players.get_mut(&id)?;
        player.x_pos = x_pos;
        player.y_pos = y_pos;
        Some(player)
    }

    /// Removes a participant. None means the connection never joined or is already gone.
    pub fn remove(&mut self, id: ConnectionId) -> Option<Player> {
        self.players.remove(&id)
    }

    pub fn get(&self, id: ConnectionId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.players.contains_key(&id)
    }

    /// Copy of every participant. Order is unspecified.
    pub fn snapshot(&self) -> Vec<Player> {
        self.players.values().cloned().collect()
    }

    pub fn connection_ids(&self) -> Vec<ConnectionId> {
        self.players.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
