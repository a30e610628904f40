//! Core types module - shared data structures and constants
//!
//! This module defines the fundamental types used throughout the workspace.
//! All types are pure data structures with no external dependencies, making them
//! usable in any context (core simulation, match engine, chat adapter protocol).
//!
//! # Board Dimensions
//!
//! The default playfield is 16 rows by 10 columns, indexed with row 0 at the
//! **bottom** and column 0 on the left.
//!
//! # Level and Gravity
//!
//! Level is derived from score by counting the entries of [`LEVEL_THRESHOLDS`]
//! that the score meets or exceeds. The gravity interval shortens as the level
//! rises:
//!
//! | Level | Score from | Interval |
//! |-------|-----------|----------|
//! | 1 | 0 | 1000ms |
//! | 2 | 40 | 800ms |
//! | 3 | 300 | 650ms |
//! | 4 | 800 | 500ms |
//! | 5 | 1500 | 400ms |
//! | 6 | 2500 | 320ms |
//! | 7 | 4000 | 250ms |
//! | 8 | 6000 | 200ms |
//! | 9 | 9000 | 160ms |
//! | 10 | 13000 | 120ms |
//!
//! # Examples
//!
//! ```
//! use chat_tetris_types::{Control, GameMode, PieceKind, Rotation, GRID_HEIGHT, GRID_WIDTH};
//!
//! let piece = PieceKind::from_str("t").unwrap();
//! assert_eq!(piece, PieceKind::T);
//!
//! assert_eq!(Rotation::West.rotate_cw(), Rotation::North);
//! assert_eq!(Control::from_str("btn_left"), Some(Control::Left));
//! assert_eq!(GameMode::from_str("1p"), Some(GameMode::SinglePlayer));
//!
//! assert_eq!(GRID_WIDTH, 10);
//! assert_eq!(GRID_HEIGHT, 16);
//! ```

/// Board width in cells (10 columns)
pub const GRID_WIDTH: u8 = 10;

/// Board height in cells (16 rows)
pub const GRID_HEIGHT: u8 = 16;

/// Smallest board edge the simulation accepts (an I piece must fit).
pub const MIN_GRID_EDGE: u8 = 4;

/// Largest supported board height.
pub const MAX_GRID_HEIGHT: u8 = 64;

/// Largest supported board width.
pub const MAX_GRID_WIDTH: u8 = 32;

/// The queue is topped up with a fresh bag once fewer than this many pieces remain.
pub const QUEUE_REFILL_THRESHOLD: usize = 3;

/// Line clear reward table, indexed by simultaneous clears (0-4).
///
/// Points are multiplied by the level captured before the drop that caused the clear.
pub const LINE_SCORES: [u32; 5] = [0, 40, 100, 300, 1200];

/// Points per row skipped by a hard drop, multiplied by level.
pub const HARD_DROP_ROW_BONUS: u32 = 1;

/// Ascending score thresholds; level is the number of entries the score has reached.
pub const LEVEL_THRESHOLDS: [u32; 10] = [0, 40, 300, 800, 1500, 2500, 4000, 6000, 9000, 13000];

/// Gravity interval per level in milliseconds (index 0 = level 1, last entry repeats).
pub const GRAVITY_INTERVALS_MS: [u32; 10] = [1000, 800, 650, 500, 400, 320, 250, 200, 160, 120];

/// Default delay before a two-player match starts its gravity clock.
pub const DEFAULT_TWO_PLAYER_START_DELAY_MS: u64 = 5000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_tables_line_up() {
        assert_eq!(LEVEL_THRESHOLDS.len(), GRAVITY_INTERVALS_MS.len());
        assert!(LEVEL_THRESHOLDS.windows(2).all(|w| w[0] < w[1]));
        assert!(GRAVITY_INTERVALS_MS.windows(2).all(|w| w[0] >= w[1]));
        assert_eq!(LEVEL_THRESHOLDS[0], 0);
    }

    #[test]
    fn control_parsing_accepts_button_ids() {
        for control in Control::ALL {
            assert_eq!(Control::from_str(control.as_str()), Some(control));
            let button = format!("btn_{}", control.as_str());
            assert_eq!(Control::from_str(&button), Some(control));
        }
        assert_eq!(Control::from_str("btn_jump"), None);
    }
}

/// The seven tetromino piece kinds
///
/// - **I**: straight bar (4x4 matrix)
/// - **O**: 2x2 square
/// - **T**, **S**, **Z**, **J**, **L**: 3x3 matrices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PieceKind {
    I,
    J,
    L,
    O,
    S,
    T,
    Z,
}

impl PieceKind {
    /// All kinds in canonical order (the unshuffled bag).
    pub const ALL: [PieceKind; 7] = [
        PieceKind::I,
        PieceKind::J,
        PieceKind::L,
        PieceKind::O,
        PieceKind::S,
        PieceKind::T,
        PieceKind::Z,
    ];

    /// Parse piece kind from string (case-insensitive)
    ///
    /// # Examples
    ///
    /// ```
    /// use chat_tetris_types::PieceKind;
    ///
    /// assert_eq!(PieceKind::from_str("i"), Some(PieceKind::I));
    /// assert_eq!(PieceKind::from_str("O"), Some(PieceKind::O));
    /// assert_eq!(PieceKind::from_str("unknown"), None);
    /// ```
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "i" => Some(PieceKind::I),
            "j" => Some(PieceKind::J),
            "l" => Some(PieceKind::L),
            "o" => Some(PieceKind::O),
            "s" => Some(PieceKind::S),
            "t" => Some(PieceKind::T),
            "z" => Some(PieceKind::Z),
            _ => None,
        }
    }

    /// Uppercase letter used in logs and the wire protocol.
    pub fn as_str(&self) -> &'static str {
        match self {
            PieceKind::I => "I",
            PieceKind::J => "J",
            PieceKind::L => "L",
            PieceKind::O => "O",
            PieceKind::S => "S",
            PieceKind::T => "T",
            PieceKind::Z => "Z",
        }
    }
}

/// Rotation state as clockwise quarter turns from the canonical orientation.
///
/// The rotation cycle goes: North → East → South → West → North
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rotation {
    North,
    East,
    South,
    West,
}

impl Rotation {
    /// Rotate clockwise (90°)
    ///
    /// # Examples
    ///
    /// ```
    /// use chat_tetris_types::Rotation;
    ///
    /// assert_eq!(Rotation::North.rotate_cw(), Rotation::East);
    /// assert_eq!(Rotation::West.rotate_cw(), Rotation::North);
    /// ```
    pub fn rotate_cw(&self) -> Self {
        match self {
            Rotation::North => Rotation::East,
            Rotation::East => Rotation::South,
            Rotation::South => Rotation::West,
            Rotation::West => Rotation::North,
        }
    }

    /// Number of clockwise quarter turns (0-3).
    pub fn quarter_turns(&self) -> u8 {
        match self {
            Rotation::North => 0,
            Rotation::East => 1,
            Rotation::South => 2,
            Rotation::West => 3,
        }
    }

    /// Build from a quarter-turn count, wrapping modulo 4.
    pub fn from_quarter_turns(turns: u8) -> Self {
        match turns % 4 {
            0 => Rotation::North,
            1 => Rotation::East,
            2 => Rotation::South,
            _ => Rotation::West,
        }
    }
}

/// Content of a settled block on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Block {
    /// Part of a locked tetromino.
    Tetromino(PieceKind),
    /// Part of a garbage row sent by an opponent.
    Fill,
}

impl Block {
    /// Compact code used by snapshots: 1-7 for I J L O S T Z, 8 for fill.
    pub fn code(&self) -> u8 {
        match self {
            Block::Tetromino(kind) => match kind {
                PieceKind::I => 1,
                PieceKind::J => 2,
                PieceKind::L => 3,
                PieceKind::O => 4,
                PieceKind::S => 5,
                PieceKind::T => 6,
                PieceKind::Z => 7,
            },
            Block::Fill => 8,
        }
    }
}

/// A cell on the game board
///
/// - `None`: Empty cell
/// - `Some(Block)`: Occupied by a tetromino block or garbage fill
pub type Cell = Option<Block>;

/// Encode a cell for snapshots (0 = empty).
pub fn cell_code(cell: Cell) -> u8 {
    cell.map(|b| b.code()).unwrap_or(0)
}

/// Horizontal move direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Left,
    Right,
}

impl Direction {
    pub fn column_delta(&self) -> i8 {
        match self {
            Direction::Left => -1,
            Direction::Right => 1,
        }
    }
}

/// Inbound control signals (chat buttons).
///
/// `Down` is the hard drop button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    Left,
    Right,
    Down,
    Rotate,
    Hold,
    Stop,
}

impl Control {
    pub const ALL: [Control; 6] = [
        Control::Left,
        Control::Right,
        Control::Down,
        Control::Rotate,
        Control::Hold,
        Control::Stop,
    ];

    /// Parse a control from its name or its button id (`btn_left`, ...).
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        let lower = s.to_ascii_lowercase();
        let name = lower.strip_prefix("btn_").unwrap_or(&lower);
        match name {
            "left" => Some(Control::Left),
            "right" => Some(Control::Right),
            "down" | "drop" => Some(Control::Down),
            "rotate" => Some(Control::Rotate),
            "hold" => Some(Control::Hold),
            "stop" => Some(Control::Stop),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Control::Left => "left",
            Control::Right => "right",
            Control::Down => "down",
            Control::Rotate => "rotate",
            Control::Hold => "hold",
            Control::Stop => "stop",
        }
    }
}

/// Who may press the buttons of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GameMode {
    /// Anyone in the channel can control the pieces.
    #[default]
    Open,
    /// Only the user who started the match.
    SinglePlayer,
    /// One of two paired matches exchanging garbage rows.
    TwoPlayer,
}

impl GameMode {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "" | "open" => Some(GameMode::Open),
            "1p" => Some(GameMode::SinglePlayer),
            "2p" => Some(GameMode::TwoPlayer),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GameMode::Open => "open",
            GameMode::SinglePlayer => "1p",
            GameMode::TwoPlayer => "2p",
        }
    }

    /// Whether inputs from users other than the controlling user are honored.
    pub fn is_open(&self) -> bool {
        matches!(self, GameMode::Open)
    }
}

/// Lifecycle phase of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchStatus {
    NotStarted,
    Running,
    Ended,
}

/// Why a match ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndReason {
    /// The next piece could not be placed at its spawn position.
    ToppedOut,
    /// An explicit stop request.
    Stopped,
}

impl EndReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndReason::ToppedOut => "topped_out",
            EndReason::Stopped => "stopped",
        }
    }
}

/// Core-side event emitted after a piece locks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LockEvent {
    /// Genuine line clears produced by this lock (0-4).
    pub lines_cleared: u8,
    /// Points awarded for the clears.
    pub line_clear_score: u32,
    /// Hard drop bonus awarded for the action that caused the lock.
    pub drop_bonus: u32,
    /// Level captured before the action, used as the multiplier.
    pub level: u32,
}
