//! Adapter module - chat front end via TCP socket with JSON protocol
//!
//! A chat bot (or any other client) connects over TCP and relays button
//! presses and slash commands as line-delimited JSON. The adapter starts
//! matches through the engine [`Registry`](crate::engine::Registry), checks
//! who may press which buttons, and streams every rendered frame back.
//!
//! # Protocol Overview
//!
//! 1. **Connection**: Client connects to TCP socket (default: 127.0.0.1:7777)
//! 2. **Handshake**: Client sends `hello` naming the chat user it acts for, server responds with `welcome`
//! 3. **Matches**: `start` opens an open or single-player match; `offer` and `accept` pair two users
//! 4. **Controls**: `control` presses a button on a match, answered by `ack` or `error`
//! 5. **Streaming**: Server pushes `snapshot` after every state change and `ended` once per match
//!
//! In open mode anyone may press the buttons. In single- and two-player mode
//! only the user who owns the match may. In a two-player pair the first match
//! to end loses; its `ended` message names the winner.
//!
//! # Environment Variables
//!
//! - `TETRIS_HOST`: Bind address (default: "127.0.0.1")
//! - `TETRIS_PORT`: Port number (default: 7777)
//! - `TETRIS_START_DELAY_MS`: Two-player countdown (default: 5000)
//! - `TETRIS_BOARD_HEIGHT` / `TETRIS_BOARD_WIDTH`: Board size (default: 16 x 10)
//! - `TETRIS_DISABLED`: Set to "1" or "true" to disable the server entirely
//!
//! # Example Protocol Flow
//!
//! ```text
//! Client -> Server: {"type":"hello","seq":1,"client":{"name":"bot","version":"1.0.0"},"user":"U1"}
//! Server -> Client: {"type":"welcome","seq":1,"ts":1700000000000,"protocol_version":"1.0.0","client_id":1,"game_id":"chat-tetris"}
//! Client -> Server: {"type":"start","seq":2,"channel":"C1","mode":"1p"}
//! Server -> Client: {"type":"started","seq":2,"ts":1700000000001,"match_id":1,"channel":"C1","user":"U1","mode":"1p"}
//! Server -> Client: {"type":"snapshot","seq":1,"ts":1700000000001,"match_id":1,"session":"C1:1","board":[[0,0,...]],...}
//! Client -> Server: {"type":"control","seq":3,"match_id":1,"action":"btn_rotate"}
//! Server -> Client: {"type":"ack","seq":3,"ts":1700000000002,"status":"ok"}
//! ```

pub mod protocol;
pub mod relay;
pub mod server;

pub use chat_tetris_core as core;
pub use chat_tetris_engine as engine;
pub use chat_tetris_types as types;

// Re-export protocol types for convenience
pub use protocol::*;
pub use relay::{OutboundMessage, Relay};
pub use server::{run_server, ServerConfig, ServerState};
