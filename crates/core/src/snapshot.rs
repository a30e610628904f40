use std::time::Duration;

use crate::types::{cell_code, Cell, MatchStatus, PieceKind, Rotation};
use crate::history::Tetromino;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActiveSnapshot {
    pub kind: PieceKind,
    pub rotation: Rotation,
    pub row: i16,
    pub col: i16,
}

impl From<Tetromino> for ActiveSnapshot {
    fn from(value: Tetromino) -> Self {
        Self {
            kind: value.kind,
            rotation: value.rotation,
            row: value.row,
            col: value.col,
        }
    }
}

/// Everything a presenter needs to draw one frame of a match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderState {
    /// Rows top to bottom, active piece included.
    pub grid: Vec<Vec<Cell>>,
    pub active: Option<ActiveSnapshot>,
    pub next: Option<PieceKind>,
    pub held: Option<PieceKind>,
    pub can_hold: bool,
    pub score: u32,
    pub level: u32,
    pub lines: u32,
    pub duration: Duration,
    pub status: MatchStatus,
    pub game_over: bool,
    /// Countdown before the gravity clock starts.
    pub starting_in: Option<Duration>,
}

impl RenderState {
    /// Grid as compact cell codes (0 empty, 1-7 tetromino kinds, 8 fill).
    pub fn board_codes(&self) -> Vec<Vec<u8>> {
        self.grid
            .iter()
            .map(|row| row.iter().map(|&c| cell_code(c)).collect())
            .collect()
    }

    pub fn playable(&self) -> bool {
        !self.game_over && self.status == MatchStatus::Running
    }
}
