//! Core game logic - pure, deterministic, and testable
//!
//! This crate contains all the game rules and match state. It has no
//! dependencies on timers, networking, or I/O:
//!
//! - **Deterministic**: Same seed produces an identical match
//! - **Replayable**: The board is rebuilt from an append-only piece history
//! - **Clock-free**: The caller drives gravity by calling [`GameState::tick`]
//!
//! # Module Structure
//!
//! - [`board`]: Cell grid with collision checks, line removal and garbage rows
//! - [`game_state`]: One match: active piece, hold, queue, scoring and status
//! - [`history`]: Append-only piece log and the cached settled board
//! - [`shapes`]: Text-encoded tetromino matrices and clockwise rotation
//! - [`rng`]: Seeded LCG and the bag-refilled piece queue
//! - [`scoring`]: Line clear points, drop bonus, levels and gravity intervals
//! - [`snapshot`]: Presenter-facing render state
//!
//! # Game Rules
//!
//! - **Bag Randomizer**: Whenever fewer than three pieces are queued, a shuffled bag of seven is appended
//! - **Strict Rotation**: Clockwise only, rejected when the rotated matrix collides
//! - **Hard Drop**: The down control drops and locks; the next piece spawns on the next tick
//! - **Hold**: Store one piece for later use (once per lock)
//! - **Garbage**: Rows of fill blocks with a per-match gap column, pushed in from below
//!
//! # Example
//!
//! ```
//! use chat_tetris_core::GameState;
//! use chat_tetris_types::Control;
//!
//! let mut game = GameState::new(12345);
//! game.start();
//!
//! game.apply_control(Control::Right);
//! game.apply_control(Control::Rotate);
//! game.apply_control(Control::Down);
//!
//! // Hard drop awards one point per row at level 1.
//! assert!(game.score() > 0);
//! ```

pub mod board;
pub mod game_state;
pub mod history;
pub mod rng;
pub mod scoring;
pub mod shapes;
pub mod snapshot;

pub use chat_tetris_types as types;

// Re-export commonly used types for convenience
pub use board::{Board, BoardSize};
pub use game_state::{GameState, TickOutcome};
pub use history::{History, Piece, Tetromino};
pub use rng::{PieceQueue, SimpleRng};
pub use scoring::{calculate_drop_bonus, calculate_line_score, gravity_interval_ms, level_for_score};
pub use shapes::{shape, Shape};
pub use snapshot::{ActiveSnapshot, RenderState};
