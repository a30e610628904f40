//! Engine-to-socket relay.
//!
//! Implements the engine's presenter and lifecycle hooks by turning every
//! render state and match result into a protocol message for the server's
//! outbound dispatcher. Never blocks the match task.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tokio::sync::mpsc;
use tracing::info;

use crate::core::RenderState;
use crate::engine::{
    MatchEnded, MatchId, MatchLifecycle, Presenter, PresenterError, SessionContext, SessionId,
};
use crate::protocol::{build_snapshot, create_ended, ServerMessage};
use crate::types::GameMode;

/// Outbound message to be delivered by the server.
#[derive(Debug, Clone)]
pub enum OutboundMessage {
    ToClient { client_id: u64, msg: ServerMessage },
    /// Every handshaken client that asked for snapshots.
    Broadcast { msg: ServerMessage },
}

pub struct Relay {
    out_tx: mpsc::UnboundedSender<OutboundMessage>,
    seq: AtomicU64,
    /// Two-player matches whose opponent already lost.
    decided: Mutex<HashSet<MatchId>>,
}

impl Relay {
    pub fn new(out_tx: mpsc::UnboundedSender<OutboundMessage>) -> Self {
        Self {
            out_tx,
            seq: AtomicU64::new(1),
            decided: Mutex::new(HashSet::new()),
        }
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    /// First player of a pair to finish loses. Returns the winner, once per pair.
    fn resolve_winner(&self, ended: &MatchEnded) -> Option<String> {
        if ended.mode != GameMode::TwoPlayer {
            return None;
        }
        let opponent = ended.opponent.as_ref()?;
        let mut decided = self.decided.lock().unwrap_or_else(|e| e.into_inner());
        if decided.remove(&ended.match_id) {
            return None;
        }
        decided.insert(opponent.match_id);
        Some(opponent.user.clone())
    }
}

impl Presenter for Relay {
    fn create_session(&self, ctx: &SessionContext) -> Result<SessionId, PresenterError> {
        if self.out_tx.is_closed() {
            return Err(PresenterError::Unavailable("server is shutting down".into()));
        }
        Ok(SessionId(format!("{}:{}", ctx.channel, ctx.match_id)))
    }

    fn snapshot(
        &self,
        match_id: MatchId,
        session: &SessionId,
        state: &RenderState,
    ) -> Result<(), PresenterError> {
        let msg = build_snapshot(self.next_seq(), match_id, &session.0, state);
        self.out_tx
            .send(OutboundMessage::Broadcast { msg })
            .map_err(|_| PresenterError::SessionClosed(session.clone()))
    }
}

impl MatchLifecycle for Relay {
    fn on_ended(&self, ended: &MatchEnded) {
        let winner = self.resolve_winner(ended);
        if let Some(winner) = winner.as_deref() {
            info!(
                "Two-player match {} decided: {} beat {}",
                ended.match_id, winner, ended.controlling_user
            );
        }

        let msg = create_ended(
            self.next_seq(),
            ended.match_id,
            &ended.controlling_user,
            ended.mode,
            ended.final_score,
            ended.lines,
            ended.duration.as_millis() as u64,
            ended.reason,
            ended.opponent.as_ref().map(|o| o.user.as_str()),
            winner.as_deref(),
        );
        let _ = self.out_tx.send(OutboundMessage::Broadcast { msg });
    }
}
