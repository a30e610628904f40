//! Match registry
//!
//! Keeps a command sender for every running match, keyed by [`MatchId`].
//! Controls from the input surface and garbage between paired matches are
//! routed through it. A match removes itself when it ends, so anything sent
//! to an ended match afterwards is reported as not found (or dropped, for
//! garbage).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, RwLock};
use tokio::task::JoinHandle;

use crate::actor::{MatchActor, MatchCommand};
use crate::config::{MatchConfig, MatchId, Opponent};
use crate::core::RenderState;
use crate::error::EngineError;
use crate::presenter::{MatchEnded, MatchLifecycle, Presenter, SessionContext};
use crate::types::{Control, GameMode};

struct MatchEntry {
    tx: mpsc::UnboundedSender<MatchCommand>,
    context: SessionContext,
}

struct RegistryInner {
    presenter: Arc<dyn Presenter>,
    lifecycle: Arc<dyn MatchLifecycle>,
    matches: RwLock<HashMap<MatchId, MatchEntry>>,
    next_id: AtomicU64,
}

/// Shared handle to the set of running matches.
#[derive(Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

/// Handle returned when a match is started.
#[derive(Debug)]
pub struct MatchHandle {
    id: MatchId,
    task: JoinHandle<MatchEnded>,
}

impl MatchHandle {
    pub fn id(&self) -> MatchId {
        self.id
    }

    /// Wait for the match to end.
    pub async fn finished(self) -> Result<MatchEnded, EngineError> {
        Ok(self.task.await?)
    }
}

impl Registry {
    pub fn new(presenter: Arc<dyn Presenter>, lifecycle: Arc<dyn MatchLifecycle>) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                presenter,
                lifecycle,
                matches: RwLock::new(HashMap::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    fn allocate_id(&self) -> MatchId {
        MatchId(self.inner.next_id.fetch_add(1, Ordering::Relaxed))
    }

    fn check_size(config: &MatchConfig) -> Result<(), EngineError> {
        if config.size.is_valid() {
            Ok(())
        } else {
            Err(EngineError::InvalidBoardSize {
                height: config.size.height,
                width: config.size.width,
            })
        }
    }

    /// Start a single match (open or single-player).
    pub async fn start_match(&self, config: MatchConfig) -> Result<MatchHandle, EngineError> {
        Self::check_size(&config)?;
        let id = self.allocate_id();
        let context = SessionContext {
            match_id: id,
            channel: config.channel.clone(),
            user: config.user.clone(),
            mode: config.mode,
            opponent: None,
        };
        let mut started = self.launch(vec![(context, config)]).await?;
        started.pop().ok_or(EngineError::MatchNotFound(id))
    }

    /// Start two matches paired against each other.
    ///
    /// Both run in two-player mode, clear lines into each other's boards and
    /// begin after their configured start delays.
    pub async fn start_pair(
        &self,
        first: MatchConfig,
        second: MatchConfig,
    ) -> Result<(MatchHandle, MatchHandle), EngineError> {
        Self::check_size(&first)?;
        Self::check_size(&second)?;

        let first_id = self.allocate_id();
        let second_id = self.allocate_id();
        let first_context = SessionContext {
            match_id: first_id,
            channel: first.channel.clone(),
            user: first.user.clone(),
            mode: GameMode::TwoPlayer,
            opponent: Some(Opponent {
                match_id: second_id,
                user: second.user.clone(),
            }),
        };
        let second_context = SessionContext {
            match_id: second_id,
            channel: second.channel.clone(),
            user: second.user.clone(),
            mode: GameMode::TwoPlayer,
            opponent: Some(Opponent {
                match_id: first_id,
                user: first.user.clone(),
            }),
        };

        let mut started = self
            .launch(vec![(first_context, first), (second_context, second)])
            .await?
            .into_iter();
        match (started.next(), started.next()) {
            (Some(a), Some(b)) => Ok((a, b)),
            _ => Err(EngineError::MatchNotFound(first_id)),
        }
    }

    /// Open presenter sessions, register every match, then spawn their tasks.
    ///
    /// Registration completes before any task runs so paired matches can
    /// always find each other.
    async fn launch(
        &self,
        matches: Vec<(SessionContext, MatchConfig)>,
    ) -> Result<Vec<MatchHandle>, EngineError> {
        let mut sessions = Vec::with_capacity(matches.len());
        for (context, _) in &matches {
            sessions.push(self.inner.presenter.create_session(context)?);
        }

        let mut actors = Vec::with_capacity(matches.len());
        {
            let mut registered = self.inner.matches.write().await;
            for ((context, config), session) in matches.into_iter().zip(sessions) {
                let (tx, rx) = mpsc::unbounded_channel();
                registered.insert(
                    context.match_id,
                    MatchEntry {
                        tx,
                        context: context.clone(),
                    },
                );
                actors.push(MatchActor::new(
                    context,
                    session,
                    &config,
                    Arc::clone(&self.inner.presenter),
                    Arc::clone(&self.inner.lifecycle),
                    self.clone(),
                    rx,
                ));
            }
        }

        Ok(actors
            .into_iter()
            .map(|actor| {
                let id = actor.id();
                MatchHandle {
                    id,
                    task: tokio::spawn(actor.run()),
                }
            })
            .collect())
    }

    async fn send(&self, id: MatchId, cmd: MatchCommand) -> Result<(), EngineError> {
        let matches = self.inner.matches.read().await;
        let entry = matches.get(&id).ok_or(EngineError::MatchNotFound(id))?;
        entry
            .tx
            .send(cmd)
            .map_err(|_| EngineError::MatchNotFound(id))
    }

    /// Deliver a control signal to a running match.
    pub async fn control(&self, id: MatchId, control: Control) -> Result<(), EngineError> {
        self.send(id, MatchCommand::Control(control)).await
    }

    /// Current render state of a running match.
    pub async fn inspect(&self, id: MatchId) -> Result<RenderState, EngineError> {
        let (reply, rx) = oneshot::channel();
        self.send(id, MatchCommand::Inspect(reply)).await?;
        rx.await.map_err(|_| EngineError::MatchNotFound(id))
    }

    /// Who controls a running match, and how.
    pub async fn context(&self, id: MatchId) -> Result<SessionContext, EngineError> {
        let matches = self.inner.matches.read().await;
        matches
            .get(&id)
            .map(|entry| entry.context.clone())
            .ok_or(EngineError::MatchNotFound(id))
    }

    pub async fn is_running(&self, id: MatchId) -> bool {
        self.inner.matches.read().await.contains_key(&id)
    }

    /// Number of matches that have not ended yet.
    pub async fn len(&self) -> usize {
        self.inner.matches.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Stop every running match.
    pub async fn stop_all(&self) {
        let matches = self.inner.matches.read().await;
        for entry in matches.values() {
            let _ = entry.tx.send(MatchCommand::Control(Control::Stop));
        }
    }

    /// Queue garbage rows for a match. Returns false if it has already ended.
    pub(crate) async fn send_garbage(&self, id: MatchId, rows: u8) -> bool {
        self.send(id, MatchCommand::Garbage(rows)).await.is_ok()
    }

    pub(crate) async fn unregister(&self, id: MatchId) {
        self.inner.matches.write().await.remove(&id);
    }
}
