//! Per-match task
//!
//! One task owns one [`GameState`]. Controls, garbage deliveries, inspect
//! requests and gravity ticks are all handled on that task in arrival order,
//! so the state needs no locking. The task ends when the match ends; the
//! final game-over snapshot is the last one it emits.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::{MatchConfig, MatchId};
use crate::core::{GameState, RenderState};
use crate::presenter::{MatchEnded, MatchLifecycle, Presenter, SessionContext, SessionId};
use crate::registry::Registry;
use crate::types::{Control, EndReason};

/// Inbound message for a match task.
#[derive(Debug)]
pub(crate) enum MatchCommand {
    Control(Control),
    /// Garbage rows sent by the paired opponent.
    Garbage(u8),
    Inspect(oneshot::Sender<RenderState>),
}

pub(crate) struct MatchActor {
    id: MatchId,
    context: SessionContext,
    session: SessionId,
    game: GameState,
    start_delay: Duration,
    presenter: Arc<dyn Presenter>,
    lifecycle: Arc<dyn MatchLifecycle>,
    registry: Registry,
    rx: mpsc::UnboundedReceiver<MatchCommand>,
    /// Set when gravity starts.
    started_at: Option<Instant>,
}

impl MatchActor {
    pub(crate) fn new(
        context: SessionContext,
        session: SessionId,
        config: &MatchConfig,
        presenter: Arc<dyn Presenter>,
        lifecycle: Arc<dyn MatchLifecycle>,
        registry: Registry,
        rx: mpsc::UnboundedReceiver<MatchCommand>,
    ) -> Self {
        let id = context.match_id;
        let mut game = GameState::with_size(config.size, config.resolve_seed(id));
        game.preload(config.preset.iter().copied());

        Self {
            id,
            context,
            session,
            game,
            start_delay: config.start_delay,
            presenter,
            lifecycle,
            registry,
            rx,
            started_at: None,
        }
    }

    pub(crate) fn id(&self) -> MatchId {
        self.id
    }

    fn elapsed(&self) -> Duration {
        self.started_at.map(|t| t.elapsed()).unwrap_or_default()
    }

    fn render(&self, starting_in: Option<Duration>) -> RenderState {
        let mut state = self.game.snapshot(self.elapsed());
        state.starting_in = starting_in;
        state
    }

    fn emit(&self, starting_in: Option<Duration>) {
        let state = self.render(starting_in);
        if let Err(err) = self.presenter.snapshot(self.id, &self.session, &state) {
            warn!("Match {} snapshot delivery failed: {}", self.id, err);
        }
    }

    pub(crate) async fn run(mut self) -> MatchEnded {
        info!(
            "Match {} created in {} for {} ({})",
            self.id,
            self.context.channel,
            self.context.user,
            self.context.mode.as_str()
        );

        if !self.start_delay.is_zero() {
            self.count_down().await;
        }

        if !self.game.game_over() {
            self.game.start();
            self.started_at = Some(Instant::now());
            self.emit(None);
            if !self.game.game_over() {
                self.play().await;
            }
        }

        self.finish().await
    }

    /// Hold gravity back until the start delay has passed.
    ///
    /// The first piece is dealt up front so countdown frames show it.
    async fn count_down(&mut self) {
        let deadline = Instant::now() + self.start_delay;
        self.game.deal();
        self.emit(Some(self.start_delay));

        let sleep = time::sleep_until(deadline);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = &mut sleep => return,
                cmd = self.rx.recv() => {
                    let Some(cmd) = cmd else {
                        self.game.stop();
                        return;
                    };
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if self.handle(cmd, Some(remaining)).await {
                        self.emit(Some(remaining));
                    }
                    if self.game.game_over() {
                        return;
                    }
                }
            }
        }
    }

    /// Gravity loop. Returns once the match has ended.
    async fn play(&mut self) {
        let mut period = Duration::from_millis(self.game.gravity_interval_ms() as u64);
        let mut gravity = time::interval_at(Instant::now() + period, period);
        gravity.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let changed = tokio::select! {
                _ = gravity.tick() => {
                    self.game.tick();
                    self.route_garbage().await;
                    true
                }
                cmd = self.rx.recv() => match cmd {
                    Some(cmd) => self.handle(cmd, None).await,
                    None => self.game.stop(),
                },
            };

            if let Some(level) = self.game.take_level_change() {
                period = Duration::from_millis(self.game.gravity_interval_ms() as u64);
                gravity = time::interval_at(Instant::now() + period, period);
                gravity.set_missed_tick_behavior(MissedTickBehavior::Delay);
                info!("Match {} reached level {} ({:?} per row)", self.id, level, period);
            }

            if changed {
                self.emit(None);
            }
            if self.game.game_over() {
                return;
            }
        }
    }

    /// Apply one command. Returns whether the state changed.
    async fn handle(&mut self, cmd: MatchCommand, starting_in: Option<Duration>) -> bool {
        match cmd {
            MatchCommand::Control(control) => {
                let changed = self.game.apply_control(control);
                debug!("Match {} control {} -> {}", self.id, control.as_str(), changed);
                self.route_garbage().await;
                changed
            }
            MatchCommand::Garbage(rows) => {
                let applied = self.game.receive_garbage(rows);
                if applied {
                    debug!("Match {} received {} garbage rows", self.id, rows);
                } else {
                    debug!("Match {} dropped {} garbage rows", self.id, rows);
                }
                applied
            }
            MatchCommand::Inspect(reply) => {
                let _ = reply.send(self.render(starting_in));
                false
            }
        }
    }

    /// Forward cleared lines from the last lock to the paired opponent.
    async fn route_garbage(&mut self) {
        let Some(event) = self.game.take_last_event() else {
            return;
        };
        if event.lines_cleared == 0 {
            return;
        }
        let Some(opponent) = self.context.opponent.as_ref() else {
            return;
        };

        if self
            .registry
            .send_garbage(opponent.match_id, event.lines_cleared)
            .await
        {
            // Queued only: the opponent may still end before it gets to them.
            debug!(
                "Match {} queued {} garbage rows for match {}",
                self.id, event.lines_cleared, opponent.match_id
            );
        } else {
            debug!(
                "Match {} dropped {} garbage rows, match {} is gone",
                self.id, event.lines_cleared, opponent.match_id
            );
        }
    }

    async fn finish(mut self) -> MatchEnded {
        self.registry.unregister(self.id).await;

        self.rx.close();
        while let Ok(cmd) = self.rx.try_recv() {
            if let MatchCommand::Garbage(rows) = cmd {
                debug!("Match {} ended, dropped {} queued garbage rows", self.id, rows);
            }
        }

        let ended = MatchEnded {
            match_id: self.id,
            final_score: self.game.score(),
            controlling_user: self.context.user.clone(),
            mode: self.context.mode,
            opponent: self.context.opponent.clone(),
            reason: self.game.end_reason().unwrap_or(EndReason::Stopped),
            lines: self.game.lines(),
            duration: self.elapsed(),
        };

        info!(
            "Match {} ended ({}) for {} with score {}",
            self.id,
            ended.reason.as_str(),
            ended.controlling_user,
            ended.final_score
        );
        self.lifecycle.on_ended(&ended);
        ended
    }
}
