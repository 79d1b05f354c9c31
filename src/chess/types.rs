use serde::{Deserialize, Serialize};
use shakmaty::Color;
use std::fmt;

/// One parsed game: its players' mean rating and mainline SAN moves.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GameRecord {
    /// Mean of `WhiteElo` and `BlackElo`; a missing rating counts as 0.
    pub average_elo: f64,
    pub move_sequence: Vec<String>,

    /// Header conversion diagnostics, `None` for cleanly parsed games.
    pub parse_error: Option<String>,
}

impl GameRecord {
    pub fn new(average_elo: f64, move_sequence: Vec<String>) -> Self {
        Self {
            average_elo,
            move_sequence,
            parse_error: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    White,
    Black,
}

impl From<Color> for Side {
    fn from(color: Color) -> Self {
        match color {
            Color::White => Self::White,
            Color::Black => Self::Black,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::White => "White",
            Self::Black => "Black",
        })
    }
}

/// Structured view of one position reached in a game.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionSample {
    pub move_sequence: Vec<String>,
    pub side_to_move: Side,
    pub board_state: String,
    pub legal_moves: Vec<String>,
    /// Move played from this position, `None` at the end of the game.
    pub next_move: Option<String>,
}

/// Text pair persisted as one JSONL line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReadableSample {
    pub input: String,
    pub output: String,
}
