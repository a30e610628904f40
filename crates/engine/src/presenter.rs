//! Presenter and lifecycle collaborators
//!
//! The engine never formats anything itself. It hands a [`RenderState`] to a
//! [`Presenter`] after every state change and reports the end of each match to
//! a [`MatchLifecycle`] exactly once. Both are called from the match task
//! after the state change is applied, so they must not block.

use std::fmt;
use std::time::Duration;

use crate::config::{MatchId, Opponent};
use crate::core::RenderState;
use crate::error::PresenterError;
use crate::types::{EndReason, GameMode};

/// Presenter-owned handle for the surface a match is drawn on (a chat message, a client stream).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(pub String);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who and where a match is being played.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub match_id: MatchId,
    pub channel: String,
    /// The controlling user.
    pub user: String,
    pub mode: GameMode,
    pub opponent: Option<Opponent>,
}

impl SessionContext {
    /// Whether `user` may send controls to this match.
    pub fn allows(&self, user: &str) -> bool {
        self.mode.is_open() || self.user == user
    }
}

/// Final report of a match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchEnded {
    pub match_id: MatchId,
    pub final_score: u32,
    pub controlling_user: String,
    pub mode: GameMode,
    pub opponent: Option<Opponent>,
    pub reason: EndReason,
    pub lines: u32,
    /// Time spent with gravity running.
    pub duration: Duration,
}

pub trait Presenter: Send + Sync + 'static {
    /// Called once per match, before its first snapshot.
    fn create_session(&self, ctx: &SessionContext) -> Result<SessionId, PresenterError>;

    /// Called after every state change. Errors are logged and otherwise ignored.
    fn snapshot(
        &self,
        match_id: MatchId,
        session: &SessionId,
        state: &RenderState,
    ) -> Result<(), PresenterError>;
}

pub trait MatchLifecycle: Send + Sync + 'static {
    fn on_ended(&self, ended: &MatchEnded);
}
