use serde::{Deserialize, Deserializer, Serialize};

pub mod codec;
pub mod mirror;

pub const DEFAULT_PORT: u16 = 12345;
pub const SPAWN_MIN_X: f64 = 50.0;
pub const SPAWN_MAX_X: f64 = 1030.0;
pub const SPAWN_MIN_Y: f64 = 50.0;
pub const SPAWN_MAX_Y: f64 = 670.0;
pub const DEFAULT_GAMETAG: &str = "Player";
pub const DEFAULT_COLOR: Color = Color(255, 0, 0);

/// Colors handed out at join time. Picked at random, so two players may share one.
pub const PALETTE: [Color; 10] = [
    Color(255, 0, 0),
    Color(0, 255, 0),
    Color(0, 0, 255),
    Color(255, 255, 0),
    Color(255, 0, 255),
    Color(0, 255, 255),
    Color(255, 165, 0),
    Color(128, 0, 128),
    Color(255, 192, 203),
    Color(0, 128, 0),
];

/// RGB triple, serialized as a three element array.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color(pub u8, pub u8, pub u8);

impl Default for Color {
    fn default() -> Self {
        DEFAULT_COLOR
    }
}

/// Wire messages. Each one is a JSON object whose `type` field selects the variant.
///
/// Missing fields fall back to defaults instead of failing the decode, and any
/// `type` this enum does not know decodes to [`Message::Unknown`].
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    Join {
        #[serde(default = "default_gametag", deserialize_with = "gametag_or_default")]
        gametag: String,
    },
    JoinResponse {
        #[serde(default)]
        color: Color,
        #[serde(default)]
        x_pos: f64,
        #[serde(default)]
        y_pos: f64,
    },
    GameState {
        #[serde(default)]
        players: Vec<Player>,
    },
    PlayerJoined {
        #[serde(default = "default_gametag", deserialize_with = "gametag_or_default")]
        gametag: String,
        #[serde(default)]
        x_pos: f64,
        #[serde(default)]
        y_pos: f64,
        #[serde(default)]
        color: Color,
    },
    PositionUpdate {
        #[serde(default)]
        x_pos: f64,
        #[serde(default)]
        y_pos: f64,
    },
    PlayerMoved {
        #[serde(default = "default_gametag", deserialize_with = "gametag_or_default")]
        gametag: String,
        #[serde(default)]
        x_pos: f64,
        #[serde(default)]
        y_pos: f64,
    },
    PlayerLeft {
        #[serde(default = "default_gametag", deserialize_with = "gametag_or_default")]
        gametag: String,
    },
    #[serde(other)]
    Unknown,
}

impl Message {
    pub fn player_joined(player: &Player) -> Self {
        Message::PlayerJoined {
            gametag: player.gametag.clone(),
            x_pos: player.x_pos,
            y_pos: player.y_pos,
            color: player.color,
        }
    }

    pub fn player_left(player: &Player) -> Self {
        Message::PlayerLeft {
            gametag: player.gametag.clone(),
        }
    }

    pub fn join_response(player: &Player) -> Self {
        Message::JoinResponse {
            color: player.color,
            x_pos: player.x_pos,
            y_pos: player.y_pos,
        }
    }

    /// Name of the `type` tag this message is sent with.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Join { .. } => "join",
            Message::JoinResponse { .. } => "join_response",
            Message::GameState { .. } => "game_state",
            Message::PlayerJoined { .. } => "player_joined",
            Message::PositionUpdate { .. } => "position_update",
            Message::PlayerMoved { .. } => "player_moved",
            Message::PlayerLeft { .. } => "player_left",
            Message::Unknown => "unknown",
        }
    }
}

fn default_gametag() -> String {
    DEFAULT_GAMETAG.to_string()
}

/// An explicit `null` gametag is treated like a missing one.
fn gametag_or_default<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(default_gametag))
}

/// One joined participant as the server tracks it and as it appears in `game_state`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Player {
    pub gametag: String,
    pub x_pos: f64,
    pub y_pos: f64,
    pub color: Color,
}

impl Player {
    pub fn new(gametag: impl Into<String>, x_pos: f64, y_pos: f64, color: Color) -> Self {
        Self {
            gametag: gametag.into(),
            x_pos,
            y_pos,
            color,
        }
    }

    pub fn position(&self) -> (f64, f64) {
        (self.x_pos, self.y_pos)
    }
}

impl Default for Player {
    fn default() -> Self {
        Self::new(DEFAULT_GAMETAG, 0.0, 0.0, DEFAULT_COLOR)
    }
}

/// Whether a position lies inside the rectangle new players spawn in.
pub fn in_spawn_area(x_pos: f64, y_pos: f64) -> bool {
    (SPAWN_MIN_X..=SPAWN_MAX_X).contains(&x_pos) && (SPAWN_MIN_Y..=SPAWN_MAX_Y).contains(&y_pos)
}
