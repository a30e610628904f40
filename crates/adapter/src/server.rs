//! TCP server for the chat adapter
//!
//! Handles incoming connections and manages client lifecycle.
//! Uses tokio for async networking.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot, RwLock};
use tracing::{debug, info, warn};

use crate::core::BoardSize;
use crate::engine::{EngineError, MatchConfig, MatchId, Registry};
use crate::protocol::*;
use crate::relay::{OutboundMessage, Relay};
use crate::types::{GameMode, DEFAULT_TWO_PLAYER_START_DELAY_MS, GRID_HEIGHT, GRID_WIDTH};

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Countdown before paired two-player matches start.
    pub start_delay: Duration,
    /// Board size for new matches.
    pub board: BoardSize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7777,
            start_delay: Duration::from_millis(DEFAULT_TWO_PLAYER_START_DELAY_MS),
            board: BoardSize::default(),
        }
    }
}

impl ServerConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        use std::env;

        fn parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
            env::var(key).ok().and_then(|s| s.trim().parse().ok())
        }

        let host = env::var("TETRIS_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = parsed("TETRIS_PORT").unwrap_or(7777);
        let start_delay = Duration::from_millis(
            parsed("TETRIS_START_DELAY_MS").unwrap_or(DEFAULT_TWO_PLAYER_START_DELAY_MS),
        );
        let board = BoardSize::new(
            parsed("TETRIS_BOARD_HEIGHT").unwrap_or(GRID_HEIGHT),
            parsed("TETRIS_BOARD_WIDTH").unwrap_or(GRID_WIDTH),
        );

        Self {
            host,
            port,
            start_delay,
            board,
        }
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid bind address {}:{}", self.host, self.port))
    }

    /// Check if the server is disabled via environment
    pub fn is_disabled() -> bool {
        std::env::var("TETRIS_DISABLED")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }
}

/// Handle to a connected client
pub struct ClientHandle {
    pub id: u64,
    pub addr: SocketAddr,
    /// Chat user named in hello; None until the handshake.
    pub user: Option<String>,
    pub stream_snapshots: bool,
    pub last_seq: Option<u64>,
    pub tx: mpsc::UnboundedSender<ServerMessage>,
}

/// Open two-player challenge.
#[derive(Debug, Clone)]
struct Offer {
    seq: u64,
    client_id: u64,
    user: String,
    channel: String,
}

/// Shared server state
pub struct ServerState {
    config: ServerConfig,
    registry: Registry,
    out_tx: mpsc::UnboundedSender<OutboundMessage>,
    clients: RwLock<Vec<ClientHandle>>,
    offers: RwLock<HashMap<u64, Offer>>,
    next_offer: AtomicU64,
}

impl ServerState {
    fn new(
        config: ServerConfig,
        registry: Registry,
        out_tx: mpsc::UnboundedSender<OutboundMessage>,
    ) -> Self {
        Self {
            config,
            registry,
            out_tx,
            clients: RwLock::new(Vec::new()),
            offers: RwLock::new(HashMap::new()),
            next_offer: AtomicU64::new(1),
        }
    }

    async fn user_of(&self, client_id: u64) -> Option<String> {
        let clients = self.clients.read().await;
        clients
            .iter()
            .find(|c| c.id == client_id)
            .and_then(|c| c.user.clone())
    }

    /// Enforce strictly increasing seq per client.
    async fn check_and_update_seq(&self, client_id: u64, seq: u64) -> bool {
        let mut clients = self.clients.write().await;
        let Some(client) = clients.iter_mut().find(|c| c.id == client_id) else {
            return true;
        };
        match client.last_seq {
            Some(prev) if seq <= prev => false,
            _ => {
                client.last_seq = Some(seq);
                true
            }
        }
    }
}

/// Start the TCP server
///
/// Sends the bound address on `ready_tx` once listening. Runs until the
/// listener fails.
pub async fn run_server(
    config: ServerConfig,
    ready_tx: Option<oneshot::Sender<SocketAddr>>,
) -> anyhow::Result<()> {
    if ServerConfig::is_disabled() {
        info!("Server disabled via TETRIS_DISABLED");
        return Ok(());
    }

    let addr = config.socket_addr()?;
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    let bound = listener.local_addr()?;
    info!("TCP server listening on {}", bound);
    if let Some(tx) = ready_tx {
        let _ = tx.send(bound);
    }

    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<OutboundMessage>();
    let relay = Arc::new(Relay::new(out_tx.clone()));
    let registry = Registry::new(relay.clone(), relay);
    let state = Arc::new(ServerState::new(config, registry, out_tx));

    // Outbound dispatcher.
    {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                let clients = state.clients.read().await;
                match msg {
                    OutboundMessage::ToClient { client_id, msg } => {
                        if let Some(c) = clients.iter().find(|c| c.id == client_id) {
                            let _ = c.tx.send(msg);
                        }
                    }
                    OutboundMessage::Broadcast { msg } => {
                        for c in clients.iter() {
                            if c.user.is_some() && c.stream_snapshots {
                                let _ = c.tx.send(msg.clone());
                            }
                        }
                    }
                }
            }
        });
    }

    // Accept incoming connections
    let mut client_id_counter = 0u64;
    loop {
        let (socket, addr) = listener.accept().await?;
        client_id_counter += 1;
        let client_id = client_id_counter;

        info!("Client {} connected from {}", client_id, addr);

        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = handle_client(socket, addr, client_id, Arc::clone(&state)).await {
                warn!("Client {} error: {}", client_id, e);
            }
            info!("Client {} disconnected", client_id);
        });
    }
}

/// Handle a single client connection
async fn handle_client(
    socket: TcpStream,
    addr: SocketAddr,
    client_id: u64,
    state: Arc<ServerState>,
) -> anyhow::Result<()> {
    let (reader, mut writer) = tokio::io::split(socket);
    let mut reader = BufReader::new(reader);

    // Channel to send messages to this client
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    {
        let mut clients = state.clients.write().await;
        clients.push(ClientHandle {
            id: client_id,
            addr,
            user: None,
            stream_snapshots: false,
            last_seq: None,
            tx: tx.clone(),
        });
    }

    // Spawn task to write messages to client
    let write_task = tokio::spawn(async move {
        let mut buf: Vec<u8> = Vec::with_capacity(4096);
        while let Some(msg) = rx.recv().await {
            buf.clear();
            if serde_json::to_writer(&mut buf, &msg).is_err() {
                continue;
            }
            buf.push(b'\n');
            if writer.write_all(&buf).await.is_err() {
                break;
            }
            if writer.flush().await.is_err() {
                break;
            }
        }
    });

    // Handle incoming messages
    let mut line = String::new();
    let mut result: anyhow::Result<()> = Ok(());
    loop {
        line.clear();
        let bytes_read = match reader.read_line(&mut line).await {
            Ok(n) => n,
            Err(e) => {
                result = Err(e.into());
                break;
            }
        };
        if bytes_read == 0 {
            // Client disconnected
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let reply = match parse_message(trimmed) {
            Ok(parsed) => handle_message(&state, client_id, parsed).await,
            Err(e) => create_error(
                extract_seq(trimmed),
                ErrorCode::InvalidMessage,
                &format!("JSON parse error: {}", e),
            ),
        };
        let _ = tx.send(reply);
    }

    // Unregister before the writer drains so the dispatcher drops its sender too.
    // Read errors end up here as well; this is the only cleanup path.
    cleanup_client(&state, client_id).await;
    drop(tx);
    let _ = write_task.await;

    result
}

/// Remove a client and any offers it still has open.
async fn cleanup_client(state: &ServerState, client_id: u64) {
    state.clients.write().await.retain(|c| c.id != client_id);
    state
        .offers
        .write()
        .await
        .retain(|_, offer| offer.client_id != client_id);
}

/// Seq of any inbound message.
fn seq_of(msg: &ParsedMessage) -> u64 {
    match msg {
        ParsedMessage::Hello(m) => m.seq,
        ParsedMessage::Start(m) => m.seq,
        ParsedMessage::Offer(m) => m.seq,
        ParsedMessage::Accept(m) => m.seq,
        ParsedMessage::Control(m) => m.seq,
        ParsedMessage::Unknown(m) => m.seq,
    }
}

/// Process one inbound message and produce the reply for its sender.
async fn handle_message(state: &ServerState, client_id: u64, msg: ParsedMessage) -> ServerMessage {
    let seq = seq_of(&msg);
    let user = state.user_of(client_id).await;

    if user.is_some() && !state.check_and_update_seq(client_id, seq).await {
        return create_error(seq, ErrorCode::InvalidSeq, "seq must be strictly increasing");
    }

    if let ParsedMessage::Hello(hello) = msg {
        return handle_hello(state, client_id, hello).await;
    }

    let Some(user) = user else {
        return create_error(seq, ErrorCode::HandshakeRequired, "Send hello first");
    };

    match msg {
        ParsedMessage::Start(start) => handle_start(state, &user, start).await,
        ParsedMessage::Offer(offer) => {
            let offer_id = state.next_offer.fetch_add(1, Ordering::Relaxed);
            state.offers.write().await.insert(
                offer_id,
                Offer {
                    seq: offer.seq,
                    client_id,
                    user: user.clone(),
                    channel: offer.channel.clone(),
                },
            );
            info!("User {} offered two-player match {} in {}", user, offer_id, offer.channel);
            create_offered(offer.seq, offer_id, &offer.channel, &user)
        }
        ParsedMessage::Accept(accept) => handle_accept(state, &user, accept).await,
        ParsedMessage::Control(control) => handle_control(state, &user, control).await,
        ParsedMessage::Unknown(_) => create_error(seq, ErrorCode::InvalidMessage, "Unknown message type"),
        ParsedMessage::Hello(_) => create_error(seq, ErrorCode::InvalidMessage, "Unexpected hello"),
    }
}

async fn handle_hello(state: &ServerState, client_id: u64, hello: HelloMessage) -> ServerMessage {
    {
        let mut clients = state.clients.write().await;
        if let Some(client) = clients.iter_mut().find(|c| c.id == client_id) {
            client.user = Some(hello.user.clone());
            client.stream_snapshots = hello.stream_snapshots;
            client.last_seq = Some(hello.seq);
        }
    }
    debug!(
        "Client {} ({} {}) acts for {}",
        client_id, hello.client.name, hello.client.version, hello.user
    );
    create_welcome(hello.seq, client_id)
}

async fn handle_start(state: &ServerState, user: &str, start: StartMessage) -> ServerMessage {
    let mode = GameMode::from(start.mode);
    let config = MatchConfig::new(start.channel.clone(), user)
        .with_mode(mode)
        .with_size(state.config.board);

    match state.registry.start_match(config).await {
        Ok(handle) => create_started(start.seq, handle.id(), &start.channel, user, mode, None),
        Err(err) => engine_error(start.seq, &err),
    }
}

async fn handle_accept(state: &ServerState, user: &str, accept: AcceptMessage) -> ServerMessage {
    let offer = {
        let mut offers = state.offers.write().await;
        match offers.remove(&accept.offer_id) {
            None => {
                return create_error(
                    accept.seq,
                    ErrorCode::OfferNotFound,
                    &format!("No open offer {}", accept.offer_id),
                )
            }
            Some(offer) if offer.user == user => {
                offers.insert(accept.offer_id, offer);
                return create_error(
                    accept.seq,
                    ErrorCode::NotAllowed,
                    "You can't accept your own offer",
                );
            }
            Some(offer) => offer,
        }
    };

    let config = |player: &str| {
        MatchConfig::new(offer.channel.clone(), player)
            .with_start_delay(state.config.start_delay)
            .with_size(state.config.board)
    };

    match state.registry.start_pair(config(&offer.user), config(user)).await {
        Ok((theirs, ours)) => {
            info!(
                "Two-player match: {} (match {}) vs {} (match {})",
                offer.user,
                theirs.id(),
                user,
                ours.id()
            );
            let _ = state.out_tx.send(OutboundMessage::ToClient {
                client_id: offer.client_id,
                msg: create_started(
                    offer.seq,
                    theirs.id(),
                    &offer.channel,
                    &offer.user,
                    GameMode::TwoPlayer,
                    Some(user),
                ),
            });
            create_started(
                accept.seq,
                ours.id(),
                &offer.channel,
                user,
                GameMode::TwoPlayer,
                Some(&offer.user),
            )
        }
        Err(err) => engine_error(accept.seq, &err),
    }
}

async fn handle_control(state: &ServerState, user: &str, control: ControlMessage) -> ServerMessage {
    let id = MatchId(control.match_id);
    let context = match state.registry.context(id).await {
        Ok(context) => context,
        Err(err) => return engine_error(control.seq, &err),
    };

    if !context.allows(user) {
        return create_error(
            control.seq,
            ErrorCode::NotAllowed,
            &format!("Only {} can control match {}", context.user, id),
        );
    }

    match state.registry.control(id, control.action.0).await {
        Ok(()) => create_ack(control.seq),
        Err(err) => engine_error(control.seq, &err),
    }
}

/// Map a registry error onto a protocol error.
fn engine_error(seq: u64, err: &EngineError) -> ServerMessage {
    let code = match err {
        EngineError::MatchNotFound(_) => ErrorCode::GameNotFound,
        EngineError::InvalidBoardSize { .. } => ErrorCode::InvalidMessage,
        EngineError::Presenter(_) | EngineError::Task(_) => ErrorCode::Internal,
    };
    create_error(seq, code, &err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.socket_addr().unwrap().port(), 7777);
        assert_eq!(config.start_delay, Duration::from_secs(5));
        assert_eq!(config.board, BoardSize::new(16, 10));
    }

    #[test]
    fn test_invalid_host_is_an_error() {
        let config = ServerConfig {
            host: "not a host".into(),
            ..ServerConfig::default()
        };
        assert!(config.socket_addr().is_err());
    }

    #[test]
    fn test_engine_error_codes() {
        let msg = engine_error(3, &EngineError::MatchNotFound(MatchId(9)));
        let ServerMessage::Error(err) = msg else {
            panic!("Expected error");
        };
        assert_eq!(err.code, ErrorCode::GameNotFound);
        assert_eq!(err.seq, 3);
        assert!(err.message.contains('9'));
    }
}
