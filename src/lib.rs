//! Chat Tetris (workspace facade crate).
//!
//! Re-exports `chat_tetris::{core,engine,adapter,types}` while the
//! implementation lives in dedicated crates under `crates/`.

pub use chat_tetris_adapter as adapter;
pub use chat_tetris_core as core;
pub use chat_tetris_engine as engine;
pub use chat_tetris_types as types;
