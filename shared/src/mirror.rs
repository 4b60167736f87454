//! Client side view of the shared world, rebuilt from server messages.
//!
//! Remote players are keyed by gametag since that is the only identity the
//! protocol carries. Two remote players with the same gametag collapse into a
//! single entry here even though the server tracks them separately.

use crate::{Color, Message, Player};
use std::collections::HashMap;

#[derive(Debug, Default, Clone)]
pub struct RemoteWorld {
    /// Our own color and spawn position, once the server has answered the join
    pub local: Option<Player>,
    players: HashMap<String, Player>,
}

impl RemoteWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the gametag used to tell our own entry apart in snapshots
    pub fn set_local_gametag(&mut self, gametag: impl Into<String>) {
        let gametag = gametag.into();
        match &mut self.local {
            Some(local) => local.gametag = gametag,
            None => self.local = Some(Player::new(gametag, 0.0, 0.0, Color::default())),
        }
    }

    /// Applies one server message. Returns false for messages that carry no world state.
    pub fn apply(&mut self, message: &Message) -> bool {
        match message {
            Message::JoinResponse {
                color,
                x_pos,
                y_pos,
            } => {
                let local = self.local.get_or_insert_with(Player::default);
                local.color = *color;
                local.x_pos = *x_pos;
                local.y_pos = *y_pos;
            }
            Message::GameState { players } => {
                let remote: HashMap<String, Player> = players
                    .iter()
                    .filter(|p| !self.is_local(&p.gametag))
                    .map(|p| (p.gametag.clone(), p.clone()))
                    .collect();
                self.players = remote;
            }
            Message::PlayerJoined {
                gametag,
                x_pos,
                y_pos,
                color,
            } => {
                self.players.insert(
                    gametag.clone(),
                    Player::new(gametag.clone(), *x_pos, *y_pos, *color),
                );
            }
            Message::PlayerMoved {
                gametag,
                x_pos,
                y_pos,
            } => {
                if let Some(player) = self.players.get_mut(gametag) {
                    player.x_pos = *x_pos;
                    player.y_pos = *y_pos;
                }
            }
            Message::PlayerLeft { gametag } => {
                self.players.remove(gametag);
            }
            _ => return false,
        }
        true
    }

    /// Records a locally integrated move, as sent in a `position_update`
    pub fn move_local(&mut self, x_pos: f64, y_pos: f64) -> Option<Message> {
        let local = self.local.as_mut()?;
        local.x_pos = x_pos;
        local.y_pos = y_pos;
        Some(Message::PositionUpdate { x_pos, y_pos })
    }

    pub fn get(&self, gametag: &str) -> Option<&Player> {
        self.players.get(gametag)
    }

    pub fn remote_players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    fn is_local(&self, gametag: &str) -> bool {
        self.local.as_ref().is_some_and(|local| local.gametag == gametag)
    }
}
