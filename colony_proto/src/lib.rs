//! Wire vocabulary for the colony bot.
//!
//! The game server speaks a line-oriented text protocol. This crate turns
//! those lines into typed [`ServerMessage`] values, collects the one-off game
//! parameters into [`GameParameters`], and formats the [`Order`]s the engine
//! sends back. It has no knowledge of the turn engine itself.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod message_text;

pub use message_text::{parse_message_line, MessageParseError};

/// Owner tag the server uses for this agent's hills and ants.
pub const MY_OWNER: u32 = 0;

/// Game parameters announced once, before the `ready` signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKey {
    LoadTime,
    TurnTime,
    Rows,
    Cols,
    Turns,
    ViewRadius2,
    AttackRadius2,
    SpawnRadius2,
    PlayerSeed,
}

impl ParameterKey {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "loadtime" => Some(Self::LoadTime),
            "turntime" => Some(Self::TurnTime),
            "rows" => Some(Self::Rows),
            "cols" => Some(Self::Cols),
            "turns" => Some(Self::Turns),
            "viewradius2" => Some(Self::ViewRadius2),
            "attackradius2" => Some(Self::AttackRadius2),
            "spawnradius2" => Some(Self::SpawnRadius2),
            "player_seed" => Some(Self::PlayerSeed),
            _ => None,
        }
    }

    pub fn as_token(self) -> &'static str {
        match self {
            Self::LoadTime => "loadtime",
            Self::TurnTime => "turntime",
            Self::Rows => "rows",
            Self::Cols => "cols",
            Self::Turns => "turns",
            Self::ViewRadius2 => "viewradius2",
            Self::AttackRadius2 => "attackradius2",
            Self::SpawnRadius2 => "spawnradius2",
            Self::PlayerSeed => "player_seed",
        }
    }
}

/// One parsed line from the game server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    Parameter { key: ParameterKey, value: u64 },
    Ready,
    Turn { number: u64 },
    Go,
    End,
    Water { row: i32, col: i32 },
    Food { row: i32, col: i32 },
    Hill { row: i32, col: i32, owner: u32 },
    Ant { row: i32, col: i32, owner: u32 },
    Dead { row: i32, col: i32, owner: u32 },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParameterError {
    #[error("board dimensions must be positive (rows={rows}, cols={cols})")]
    EmptyBoard { rows: u64, cols: u64 },
    #[error("board dimension {value} exceeds the supported maximum {MAX_BOARD_DIMENSION}")]
    BoardTooLarge { value: u64 },
    #[error("squared radius {value} exceeds the supported maximum {MAX_RADIUS2}")]
    RadiusTooLarge { value: u64 },
}

/// Largest accepted board side. Unwrapped deltas stay below twice this, so
/// squared distances between cells fit in a `u32`.
pub const MAX_BOARD_DIMENSION: u64 = 1 << 14;
pub const MAX_RADIUS2: u64 = MAX_BOARD_DIMENSION * MAX_BOARD_DIMENSION;

/// Game-wide settings. Radii arrive squared; the linear accessors round the
/// square root down.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameParameters {
    pub load_time_ms: u64,
    pub turn_time_ms: u64,
    pub rows: u64,
    pub cols: u64,
    pub turns: u64,
    pub view_radius2: u64,
    pub attack_radius2: u64,
    pub spawn_radius2: u64,
    pub player_seed: u64,
}

impl Default for GameParameters {
    fn default() -> Self {
        Self {
            load_time_ms: 3_000,
            turn_time_ms: 1_000,
            rows: 0,
            cols: 0,
            turns: 1_000,
            view_radius2: 77,
            attack_radius2: 5,
            spawn_radius2: 1,
            player_seed: 0,
        }
    }
}

impl GameParameters {
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn apply(&mut self, key: ParameterKey, value: u64) {
        match key {
            ParameterKey::LoadTime => self.load_time_ms = value,
            ParameterKey::TurnTime => self.turn_time_ms = value,
            ParameterKey::Rows => self.rows = value,
            ParameterKey::Cols => self.cols = value,
            ParameterKey::Turns => self.turns = value,
            ParameterKey::ViewRadius2 => self.view_radius2 = value,
            ParameterKey::AttackRadius2 => self.attack_radius2 = value,
            ParameterKey::SpawnRadius2 => self.spawn_radius2 = value,
            ParameterKey::PlayerSeed => self.player_seed = value,
        }
    }

    /// Check the board is usable before the engine starts.
    pub fn validate(&self) -> Result<(), ParameterError> {
        if self.rows == 0 || self.cols == 0 {
            return Err(ParameterError::EmptyBoard {
                rows: self.rows,
                cols: self.cols,
            });
        }
        for value in [self.rows, self.cols] {
            if value > MAX_BOARD_DIMENSION {
                return Err(ParameterError::BoardTooLarge { value });
            }
        }
        for value in [self.view_radius2, self.attack_radius2, self.spawn_radius2] {
            if value > MAX_RADIUS2 {
                return Err(ParameterError::RadiusTooLarge { value });
            }
        }
        Ok(())
    }

    pub fn view_radius(&self) -> u64 {
        integer_sqrt(self.view_radius2)
    }

    pub fn attack_radius(&self) -> u64 {
        integer_sqrt(self.attack_radius2)
    }

    pub fn spawn_radius(&self) -> u64 {
        integer_sqrt(self.spawn_radius2)
    }
}

/// Largest `r` with `r * r <= value`.
pub fn integer_sqrt(value: u64) -> u64 {
    let mut root = (value as f64).sqrt() as u64;
    while root.saturating_mul(root) > value {
        root -= 1;
    }
    while (root + 1).saturating_mul(root + 1) <= value {
        root += 1;
    }
    root
}

/// Cardinal direction letter carried by an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Heading {
    North,
    East,
    South,
    West,
}

impl Heading {
    pub fn letter(self) -> char {
        match self {
            Self::North => 'N',
            Self::East => 'E',
            Self::South => 'S',
            Self::West => 'W',
        }
    }
}

/// Move order for the ant currently standing at (`row`, `col`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Order {
    pub row: i32,
    pub col: i32,
    pub heading: Heading,
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "o {} {} {}", self.row, self.col, self.heading.letter())
    }
}

/// Reply sent after the orders of a turn (and after `ready`).
pub const GO_REPLY: &str = "go";
