//! Error types for the session layer.

use checkroom_protocol::{ErrorCode, SessionId};
use checkroom_rules::RulesError;

/// Why an intent against a session was refused.
///
/// Every variant is local and non-fatal: the requester gets an error
/// event, the session is left as it was, and nobody else hears about it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// No live session has this identifier (never existed, or reaped).
    #[error("session {0} not found")]
    NotFound(SessionId),

    /// Both slots are already taken.
    #[error("session {0} is full")]
    Full(SessionId),

    /// The caller holds a slot, but it is the other color's move.
    #[error("not your turn")]
    NotYourTurn,

    /// The caller holds no slot in the session, or claimed one it never had.
    #[error("not a player in this session")]
    NotAPlayer,

    /// The rules engine refused the move.
    #[error("invalid move {from}{to}")]
    InvalidMove {
        from: String,
        to: String,
        source: RulesError,
    },

    /// The game has a result; nothing may change it any more.
    #[error("game is over")]
    GameOver,

    /// The caller already holds a slot in this session.
    #[error("already in this session")]
    AlreadyInSession,

    /// A reconnection token was required, or given, and did not match.
    #[error("invalid reconnection token")]
    InvalidToken,

    /// A square name that is not on the board.
    #[error("invalid square {0:?}")]
    InvalidSquare(String),

    /// Any other refusal from the rules engine outside of a move.
    #[error(transparent)]
    Rules(RulesError),
}

impl SessionError {
    /// The wire code reported to the client.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound(_) => ErrorCode::SessionNotFound,
            Self::Full(_) => ErrorCode::SessionFull,
            Self::NotYourTurn => ErrorCode::NotYourTurn,
            Self::NotAPlayer => ErrorCode::NotAPlayer,
            Self::InvalidMove { .. } => ErrorCode::InvalidMove,
            Self::GameOver => ErrorCode::GameOver,
            Self::AlreadyInSession => ErrorCode::AlreadyInSession,
            Self::InvalidToken => ErrorCode::InvalidToken,
            Self::InvalidSquare(_) | Self::Rules(_) => ErrorCode::BadRequest,
        }
    }
}
