//! Match runtime - gravity clock, pairing and presenter plumbing
//!
//! Every match runs as its own tokio task that owns a
//! [`GameState`](crate::core::GameState) and drives its gravity timer. The
//! [`Registry`] starts matches, routes control signals to them, and carries
//! garbage rows between paired two-player matches.
//!
//! Rendering and result bookkeeping are delegated to two collaborators:
//!
//! - [`Presenter`]: opens one session per match and receives a
//!   [`RenderState`](crate::core::RenderState) after every state change
//! - [`MatchLifecycle`]: told exactly once when a match ends
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use chat_tetris_engine::{
//!     MatchConfig, MatchEnded, MatchId, MatchLifecycle, Presenter, PresenterError, Registry,
//!     SessionContext, SessionId,
//! };
//! use chat_tetris_core::RenderState;
//! use chat_tetris_types::Control;
//!
//! struct Log;
//!
//! impl Presenter for Log {
//!     fn create_session(&self, ctx: &SessionContext) -> Result<SessionId, PresenterError> {
//!         Ok(SessionId(ctx.match_id.to_string()))
//!     }
//!     fn snapshot(&self, id: MatchId, _: &SessionId, s: &RenderState) -> Result<(), PresenterError> {
//!         println!("match {} score {}", id, s.score);
//!         Ok(())
//!     }
//! }
//!
//! impl MatchLifecycle for Log {
//!     fn on_ended(&self, ended: &MatchEnded) {
//!         println!("match {} ended with {}", ended.match_id, ended.final_score);
//!     }
//! }
//!
//! # async fn run() -> Result<(), chat_tetris_engine::EngineError> {
//! let log = Arc::new(Log);
//! let registry = Registry::new(log.clone(), log);
//! let handle = registry.start_match(MatchConfig::new("general", "alice")).await?;
//! registry.control(handle.id(), Control::Rotate).await?;
//! registry.control(handle.id(), Control::Stop).await?;
//! let ended = handle.finished().await?;
//! # let _ = ended;
//! # Ok(())
//! # }
//! ```

mod actor;
pub mod config;
pub mod error;
pub mod presenter;
pub mod registry;

pub use chat_tetris_core as core;
pub use chat_tetris_types as types;

pub use config::{MatchConfig, MatchId, Opponent};
pub use error::{EngineError, PresenterError};
pub use presenter::{MatchEnded, MatchLifecycle, Presenter, SessionContext, SessionId};
pub use registry::{MatchHandle, Registry};
