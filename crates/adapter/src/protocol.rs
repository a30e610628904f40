//! Protocol module - JSON message types for the chat adapter
//!
//! Line-delimited JSON. Every message has: type, seq (sequence number),
//! ts (timestamp in ms, optional from clients).

use serde::{Deserialize, Serialize};

use crate::core::{ActiveSnapshot, RenderState};
use crate::engine::MatchId;
use crate::types::{Control, EndReason, GameMode, PieceKind};

pub const PROTOCOL_VERSION: &str = "1.0.0";

// ============== Client -> Server Messages ==============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    pub name: String,
    pub version: String,
}

/// Client hello message (first message on a connection)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloMessage {
    pub seq: u64,
    #[serde(default)]
    pub ts: u64,
    pub client: ClientInfo,
    /// Chat user this connection acts for.
    pub user: String,
    #[serde(default = "default_true")]
    pub stream_snapshots: bool,
}

fn default_true() -> bool {
    true
}

/// Modes a client may start directly. Two-player matches go through offer/accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StartMode {
    #[default]
    #[serde(rename = "open")]
    Open,
    #[serde(rename = "1p")]
    SinglePlayer,
}

impl From<StartMode> for GameMode {
    fn from(value: StartMode) -> Self {
        match value {
            StartMode::Open => GameMode::Open,
            StartMode::SinglePlayer => GameMode::SinglePlayer,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartMessage {
    pub seq: u64,
    #[serde(default)]
    pub ts: u64,
    pub channel: String,
    #[serde(default)]
    pub mode: StartMode,
}

/// Two-player challenge posted to a channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfferMessage {
    pub seq: u64,
    #[serde(default)]
    pub ts: u64,
    pub channel: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptMessage {
    pub seq: u64,
    #[serde(default)]
    pub ts: u64,
    pub offer_id: u64,
}

/// Button press, accepted as `left` or the chat button id `btn_left`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActionName(pub Control);

impl<'de> Deserialize<'de> for ActionName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Control::from_str(&s)
            .map(ActionName)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown action: {}", s)))
    }
}

impl Serialize for ActionName {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.0.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlMessage {
    pub seq: u64,
    #[serde(default)]
    pub ts: u64,
    pub match_id: u64,
    pub action: ActionName,
}

// ============== Server -> Client Messages ==============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    #[serde(rename = "handshake_required")]
    HandshakeRequired,
    #[serde(rename = "invalid_message")]
    InvalidMessage,
    #[serde(rename = "invalid_seq")]
    InvalidSeq,
    #[serde(rename = "game_not_found")]
    GameNotFound,
    #[serde(rename = "not_allowed")]
    NotAllowed,
    #[serde(rename = "offer_not_found")]
    OfferNotFound,
    #[serde(rename = "internal")]
    Internal,
}

/// Welcome message (response to hello)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WelcomeMessage {
    pub seq: u64,
    pub ts: u64,
    pub protocol_version: String,
    pub client_id: u64,
    pub game_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartedMessage {
    pub seq: u64,
    pub ts: u64,
    pub match_id: u64,
    pub channel: String,
    pub user: String,
    pub mode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opponent: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfferedMessage {
    pub seq: u64,
    pub ts: u64,
    pub offer_id: u64,
    pub channel: String,
    pub user: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AckStatus {
    #[serde(rename = "ok")]
    Ok,
}

/// Acknowledgment for a control
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckMessage {
    pub seq: u64,
    pub ts: u64,
    pub status: AckStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub seq: u64,
    pub ts: u64,
    pub code: ErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PieceKindLower {
    #[serde(rename = "i")]
    I,
    #[serde(rename = "o")]
    O,
    #[serde(rename = "t")]
    T,
    #[serde(rename = "s")]
    S,
    #[serde(rename = "z")]
    Z,
    #[serde(rename = "j")]
    J,
    #[serde(rename = "l")]
    L,
}

impl From<PieceKind> for PieceKindLower {
    fn from(value: PieceKind) -> Self {
        match value {
            PieceKind::I => Self::I,
            PieceKind::O => Self::O,
            PieceKind::T => Self::T,
            PieceKind::S => Self::S,
            PieceKind::Z => Self::Z,
            PieceKind::J => Self::J,
            PieceKind::L => Self::L,
        }
    }
}

/// Quarter turns clockwise from spawn orientation (0-3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivePieceSnapshot {
    pub kind: PieceKindLower,
    pub rotation: u8,
    pub row: i16,
    pub col: i16,
}

impl From<ActiveSnapshot> for ActivePieceSnapshot {
    fn from(value: ActiveSnapshot) -> Self {
        Self {
            kind: value.kind.into(),
            rotation: value.rotation.quarter_turns(),
            row: value.row,
            col: value.col,
        }
    }
}

/// One rendered frame of a match (sent to streaming clients)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMessage {
    pub seq: u64,
    pub ts: u64,
    pub match_id: u64,
    pub session: String,
    /// Rows top to bottom: 0 empty, 1-7 I J L O S T Z, 8 garbage fill.
    pub board: Vec<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<ActivePieceSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<PieceKindLower>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hold: Option<PieceKindLower>,
    pub can_hold: bool,
    pub score: u32,
    pub level: u32,
    pub lines: u32,
    pub duration_ms: u64,
    pub playable: bool,
    pub game_over: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starting_in_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndedMessage {
    pub seq: u64,
    pub ts: u64,
    pub match_id: u64,
    pub user: String,
    pub mode: String,
    pub score: u32,
    pub lines: u32,
    pub duration_ms: u64,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opponent: Option<String>,
    /// Set on the first of a two-player pair to end: its opponent wins.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<String>,
}

/// Any message the server writes to a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "welcome")]
    Welcome(WelcomeMessage),
    #[serde(rename = "started")]
    Started(StartedMessage),
    #[serde(rename = "offered")]
    Offered(OfferedMessage),
    #[serde(rename = "ack")]
    Ack(AckMessage),
    #[serde(rename = "error")]
    Error(ErrorMessage),
    #[serde(rename = "snapshot")]
    Snapshot(SnapshotMessage),
    #[serde(rename = "ended")]
    Ended(EndedMessage),
}

// ============== Message Parsing ==============

/// Parsed incoming message
#[derive(Debug, Clone)]
pub enum ParsedMessage {
    Hello(HelloMessage),
    Start(StartMessage),
    Offer(OfferMessage),
    Accept(AcceptMessage),
    Control(ControlMessage),
    Unknown(UnknownMessage),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownMessage {
    pub seq: u64,
}

/// Parse a JSON message from a string
pub fn parse_message(json: &str) -> Result<ParsedMessage, serde_json::Error> {
    #[derive(Debug, Deserialize)]
    #[serde(tag = "type")]
    enum InboundMessage {
        #[serde(rename = "hello")]
        Hello(HelloMessage),
        #[serde(rename = "start")]
        Start(StartMessage),
        #[serde(rename = "offer")]
        Offer(OfferMessage),
        #[serde(rename = "accept")]
        Accept(AcceptMessage),
        #[serde(rename = "control")]
        Control(ControlMessage),
    }

    const KNOWN: [&str; 5] = ["hello", "start", "offer", "accept", "control"];

    match serde_json::from_str::<InboundMessage>(json) {
        Ok(InboundMessage::Hello(m)) => Ok(ParsedMessage::Hello(m)),
        Ok(InboundMessage::Start(m)) => Ok(ParsedMessage::Start(m)),
        Ok(InboundMessage::Offer(m)) => Ok(ParsedMessage::Offer(m)),
        Ok(InboundMessage::Accept(m)) => Ok(ParsedMessage::Accept(m)),
        Ok(InboundMessage::Control(m)) => Ok(ParsedMessage::Control(m)),
        Err(e) => {
            // Unknown message type is not a hard parse error for the protocol.
            #[derive(Debug, Deserialize)]
            struct Envelope {
                #[serde(rename = "type")]
                msg_type: Option<String>,
                seq: Option<u64>,
            }
            let envelope = serde_json::from_str::<Envelope>(json)?;
            match envelope.msg_type {
                Some(t) if KNOWN.contains(&t.as_str()) => Err(e),
                _ => Ok(ParsedMessage::Unknown(UnknownMessage {
                    seq: envelope.seq.unwrap_or(0),
                })),
            }
        }
    }
}

/// Best-effort `seq` of a line that failed to parse, for the error reply.
pub fn extract_seq(json: &str) -> u64 {
    serde_json::from_str::<serde_json::Value>(json)
        .ok()
        .and_then(|v| v.get("seq").and_then(|s| s.as_u64()))
        .unwrap_or(0)
}

// ============== Utility Functions ==============

pub fn create_welcome(seq: u64, client_id: u64) -> ServerMessage {
    ServerMessage::Welcome(WelcomeMessage {
        seq,
        ts: current_timestamp_ms(),
        protocol_version: PROTOCOL_VERSION.to_string(),
        client_id,
        game_id: "chat-tetris".to_string(),
    })
}

pub fn create_started(
    seq: u64,
    match_id: MatchId,
    channel: &str,
    user: &str,
    mode: GameMode,
    opponent: Option<&str>,
) -> ServerMessage {
    ServerMessage::Started(StartedMessage {
        seq,
        ts: current_timestamp_ms(),
        match_id: match_id.0,
        channel: channel.to_string(),
        user: user.to_string(),
        mode: mode.as_str().to_string(),
        opponent: opponent.map(str::to_string),
    })
}

pub fn create_offered(seq: u64, offer_id: u64, channel: &str, user: &str) -> ServerMessage {
    ServerMessage::Offered(OfferedMessage {
        seq,
        ts: current_timestamp_ms(),
        offer_id,
        channel: channel.to_string(),
        user: user.to_string(),
    })
}

pub fn create_ack(seq: u64) -> ServerMessage {
    ServerMessage::Ack(AckMessage {
        seq,
        ts: current_timestamp_ms(),
        status: AckStatus::Ok,
    })
}

pub fn create_error(seq: u64, code: ErrorCode, message: &str) -> ServerMessage {
    ServerMessage::Error(ErrorMessage {
        seq,
        ts: current_timestamp_ms(),
        code,
        message: message.to_string(),
    })
}

/// Build a snapshot message from an engine render state.
pub fn build_snapshot(seq: u64, match_id: MatchId, session: &str, state: &RenderState) -> ServerMessage {
    ServerMessage::Snapshot(SnapshotMessage {
        seq,
        ts: current_timestamp_ms(),
        match_id: match_id.0,
        session: session.to_string(),
        board: state.board_codes(),
        active: state.active.map(ActivePieceSnapshot::from),
        next: state.next.map(PieceKindLower::from),
        hold: state.held.map(PieceKindLower::from),
        can_hold: state.can_hold,
        score: state.score,
        level: state.level,
        lines: state.lines,
        duration_ms: state.duration.as_millis() as u64,
        playable: state.playable(),
        game_over: state.game_over,
        starting_in_ms: state.starting_in.map(|d| d.as_millis() as u64),
    })
}

#[allow(clippy::too_many_arguments)]
pub fn create_ended(
    seq: u64,
    match_id: MatchId,
    user: &str,
    mode: GameMode,
    score: u32,
    lines: u32,
    duration_ms: u64,
    reason: EndReason,
    opponent: Option<&str>,
    winner: Option<&str>,
) -> ServerMessage {
    ServerMessage::Ended(EndedMessage {
        seq,
        ts: current_timestamp_ms(),
        match_id: match_id.0,
        user: user.to_string(),
        mode: mode.as_str().to_string(),
        score,
        lines,
        duration_ms,
        reason: reason.as_str().to_string(),
        opponent: opponent.map(str::to_string),
        winner: winner.map(str::to_string),
    })
}

/// Get current timestamp in milliseconds
fn current_timestamp_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
