//! Core protocol types for checkroom's wire format.
//!
//! Everything a client sends is a [`ClientIntent`]; everything the server
//! pushes back is a [`ServerEvent`]. Both are "named events": on the wire
//! a frame is one JSON object whose `event` field names the intent or
//! event and whose `data` field carries its fields, e.g.
//!
//! ```text
//! {"event": "move", "data": {"sessionId": "ab12cd", "from": "e2", "to": "e4"}}
//! {"event": "turn-notice"}
//! ```
//!
//! Event names are kebab-case and field names camelCase so that browser
//! clients can consume the messages without any translation layer.

use std::fmt;

use checkroom_transport::ConnectionId;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A short, opaque session identifier (for example `"ab12cd"`).
///
/// It is both the lookup key in the session store and the key clients use
/// to address a game. Serialized as a bare string.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Wraps an existing identifier string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrows the identifier as a `&str`.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Color / GameResult
// ---------------------------------------------------------------------------

/// One of the two sides.
///
/// Slot assignment is positional: slot 0 is white, slot 1 is black. The
/// [`Color::from_slot`] / [`Color::slot`] pair is the one place that
/// mapping lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    White,
    Black,
}

impl Color {
    /// The side that is not `self`.
    pub fn opposite(self) -> Self {
        match self {
            Self::White => Self::Black,
            Self::Black => Self::White,
        }
    }

    /// Maps a player slot index to a color. Only 0 and 1 are slots.
    pub fn from_slot(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::White),
            1 => Some(Self::Black),
            _ => None,
        }
    }

    /// The slot index this color occupies.
    pub fn slot(self) -> usize {
        match self {
            Self::White => 0,
            Self::Black => 1,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::White => f.write_str("white"),
            Self::Black => f.write_str("black"),
        }
    }
}

/// How a finished session ended. An unfinished session has no result
/// (`Option<GameResult>::None`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameResult {
    Draw,
    White,
    Black,
}

impl GameResult {
    /// The result in which `color` won.
    pub fn win_for(color: Color) -> Self {
        match color {
            Color::White => Self::White,
            Color::Black => Self::Black,
        }
    }
}

// ---------------------------------------------------------------------------
// Move descriptor and board snapshots
// ---------------------------------------------------------------------------

/// Description of one applied (or candidate) move, as produced by the
/// rules engine.
///
/// `flags` uses the conventional one-letter codes: `n` normal, `b` pawn
/// double push, `e` en passant, `c` capture, `p` promotion, `k` king-side
/// castle, `q` queen-side castle. A capturing promotion is `cp`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveDescriptor {
    pub color: Color,
    pub from: String,
    pub to: String,
    /// Lowercase piece letter (`p`, `n`, `b`, `r`, `q`, `k`).
    pub piece: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captured: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion: Option<String>,
    pub flags: String,
    pub san: String,
}

/// The board as seen by a client that asked for a resync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardSnapshot {
    pub fen: String,
    pub turn: Color,
    pub is_check: bool,
    pub is_checkmate: bool,
    pub is_draw: bool,
}

/// Broadcast to the whole session after a move is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveApplied {
    pub from: String,
    pub to: String,
    pub fen: String,
    pub turn: Color,
    pub is_check: bool,
    pub is_checkmate: bool,
    pub is_draw: bool,
    #[serde(rename = "move")]
    pub mv: MoveDescriptor,
}

/// Sent to a client whose reconnection claim was accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconnectedState {
    pub session_id: SessionId,
    pub color: Color,
    /// The slot's fresh reconnection token (the old one is retired).
    pub reconnect_token: String,
    #[serde(flatten)]
    pub board: BoardSnapshot,
    pub finished: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<GameResult>,
}

// ---------------------------------------------------------------------------
// Client -> server
// ---------------------------------------------------------------------------

/// A named intent raised by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ClientIntent {
    /// Open a new session; the caller becomes white.
    CreateSession,

    /// Take the black slot of an existing session.
    JoinSession { session_id: SessionId },

    /// Move a piece. Promotion is always to a queen.
    Move {
        session_id: SessionId,
        from: String,
        to: String,
    },

    /// Liveness ping for the caller's slot.
    Heartbeat { session_id: SessionId },

    /// Take over a slot after a transport-level reconnect.
    ///
    /// `previous_connection_id` is the identifier the client had before it
    /// dropped; `token` is the secret it was issued when it took the
    /// slot. Which of the two is honoured depends on the server's
    /// reconnect mode.
    Reconnect {
        session_id: SessionId,
        #[serde(default)]
        previous_connection_id: Option<ConnectionId>,
        #[serde(default)]
        token: Option<String>,
    },

    OfferDraw { session_id: SessionId },

    AcceptDraw { session_id: SessionId },

    Resign { session_id: SessionId },

    /// Ask for the current board; the answer goes to the caller only.
    SyncRequest { session_id: SessionId },

    /// Ask which moves the piece on `square` can make.
    LegalMoves {
        session_id: SessionId,
        square: String,
    },
}

impl ClientIntent {
    /// The kebab-case event name, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateSession => "create-session",
            Self::JoinSession { .. } => "join-session",
            Self::Move { .. } => "move",
            Self::Heartbeat { .. } => "heartbeat",
            Self::Reconnect { .. } => "reconnect",
            Self::OfferDraw { .. } => "offer-draw",
            Self::AcceptDraw { .. } => "accept-draw",
            Self::Resign { .. } => "resign",
            Self::SyncRequest { .. } => "sync-request",
            Self::LegalMoves { .. } => "legal-moves",
        }
    }
}

// ---------------------------------------------------------------------------
// Server -> client
// ---------------------------------------------------------------------------

/// Machine-readable reason attached to every `error` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCode {
    /// The frame could not be decoded as an intent.
    BadRequest,
    SessionNotFound,
    SessionFull,
    NotYourTurn,
    NotAPlayer,
    InvalidMove,
    GameOver,
    AlreadyInSession,
    InvalidToken,
}

/// A named event pushed by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    /// First frame on every connection: the identifier the client must
    /// present if it later needs to reconnect.
    Connected { connection_id: ConnectionId },

    SessionCreated {
        session_id: SessionId,
        color: Color,
        reconnect_token: String,
    },

    SessionJoined {
        session_id: SessionId,
        color: Color,
        reconnect_token: String,
    },

    /// Broadcast once both slots are filled.
    GameStart { fen: String, turn: Color },

    MoveApplied(MoveApplied),

    /// Sent only to the player who is now on move.
    TurnNotice,

    Reconnected(ReconnectedState),

    OpponentReconnected,

    OpponentDisconnected,

    DrawOffered,

    DrawAccepted,

    Resigned { winner: Color },

    StateSynced(BoardSnapshot),

    LegalMoves {
        square: String,
        moves: Vec<MoveDescriptor>,
    },

    Error { code: ErrorCode, message: String },
}

// =========================================================================
// Tests
// =========================================================================
