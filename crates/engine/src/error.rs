use crate::config::MatchId;
use crate::presenter::SessionId;

/// Errors at the registry boundary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// No running match has this id (never started, or already ended).
    #[error("match {0} not found")]
    MatchNotFound(MatchId),

    #[error("unsupported board size {height}x{width}")]
    InvalidBoardSize { height: u8, width: u8 },

    /// The presenter could not open a session for a new match.
    #[error("presenter error: {0}")]
    Presenter(#[from] PresenterError),

    /// The match task panicked or was cancelled.
    #[error("match task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Errors reported by a [`Presenter`](crate::Presenter).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PresenterError {
    #[error("presenter unavailable: {0}")]
    Unavailable(String),

    #[error("session {0} is closed")]
    SessionClosed(SessionId),
}
