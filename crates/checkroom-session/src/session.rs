//! The session entity: one two-player game and everyone seated at it.
//!
//! A session tracks:
//! - WHICH board it plays on (an owned [`RulesEngine`])
//! - WHO holds each slot (`players`, slot 0 white, slot 1 black)
//! - WHETHER those players are currently connected (`player_info`)
//! - WHEN anything last happened (`last_activity`, read by the reaper)

use std::collections::HashMap;
use std::time::Instant;

use checkroom_protocol::{
    BoardSnapshot, Color, ConnectionId, GameResult, MoveApplied, MoveDescriptor,
    SessionId,
};
use checkroom_rules::{ChessBoard, Promotion, RulesEngine, RulesError};
use rand::Rng;

use crate::{SessionError, authority};

// ---------------------------------------------------------------------------
// PlayerInfo
// ---------------------------------------------------------------------------

/// Per-slot liveness metadata, keyed by the connection currently holding
/// the slot.
#[derive(Debug, Clone)]
pub struct PlayerInfo {
    /// Mirrors the slot position. Informational only: color resolution
    /// always goes through [`Session::color_of`].
    pub color: Color,

    /// `false` between a transport drop and the next reconnect or
    /// heartbeat.
    pub connected: bool,

    pub last_seen: Instant,

    /// The secret that lets a client reclaim this slot from a new
    /// connection. A 32-character hex string, rotated on every reconnect.
    pub reconnect_token: String,
}

impl PlayerInfo {
    pub(crate) fn new(color: Color, now: Instant) -> Self {
        Self {
            color,
            connected: true,
            last_seen: now,
            reconnect_token: generate_token(),
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One in-progress or concluded game.
///
/// `turn` is the authoritative side to move. It is kept in step with the
/// board's own turn indicator but is what every other component reads.
#[derive(Debug)]
pub struct Session<E = ChessBoard> {
    id: SessionId,
    board: E,
    turn: Color,
    pub(crate) players: Vec<ConnectionId>,
    pub(crate) player_info: HashMap<ConnectionId, PlayerInfo>,
    finished: bool,
    result: Option<GameResult>,
    last_activity: Instant,
}

impl<E: RulesEngine> Session<E> {
    /// A fresh game with `creator` seated as white.
    pub(crate) fn new(id: SessionId, creator: ConnectionId, now: Instant) -> Self {
        let mut player_info = HashMap::new();
        player_info.insert(creator, PlayerInfo::new(Color::White, now));
        Self {
            id,
            board: E::new_game(),
            turn: Color::White,
            players: vec![creator],
            player_info,
            finished: false,
            result: None,
            last_activity: now,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn board(&self) -> &E {
        &self.board
    }

    pub fn turn(&self) -> Color {
        self.turn
    }

    /// Connections in slot order.
    pub fn players(&self) -> &[ConnectionId] {
        &self.players
    }

    pub fn player_info(&self, conn: ConnectionId) -> Option<&PlayerInfo> {
        self.player_info.get(&conn)
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn result(&self) -> Option<GameResult> {
        self.result
    }

    pub fn last_activity(&self) -> Instant {
        self.last_activity
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= 2
    }

    // -- Slot <-> color ---------------------------------------------------
    //
    // The mapping is positional. These two accessors are the only code
    // that knows it.

    /// The color of the slot `conn` holds, if any.
    pub fn color_of(&self, conn: ConnectionId) -> Option<Color> {
        self.players
            .iter()
            .position(|c| *c == conn)
            .and_then(Color::from_slot)
    }

    /// The connection currently holding `color`'s slot.
    pub fn connection_for(&self, color: Color) -> Option<ConnectionId> {
        self.players.get(color.slot()).copied()
    }

    /// The connection in the slot opposite `conn`'s. `None` when `conn`
    /// is not seated or nobody has joined yet.
    pub fn opponent_of(&self, conn: ConnectionId) -> Option<ConnectionId> {
        self.color_of(conn)
            .and_then(|color| self.connection_for(color.opposite()))
    }

    /// Every seated connection whose transport is up.
    pub fn connected_players(&self) -> Vec<ConnectionId> {
        self.players
            .iter()
            .copied()
            .filter(|c| self.player_info.get(c).is_some_and(|info| info.connected))
            .collect()
    }

    pub(crate) fn touch(&mut self, now: Instant) {
        self.last_activity = now;
    }

    // -- Membership -------------------------------------------------------

    /// Seats `conn` as black.
    ///
    /// Returns the color and the slot's reconnection token.
    pub fn join(
        &mut self,
        conn: ConnectionId,
        now: Instant,
    ) -> Result<(Color, String), SessionError> {
        if self.players.contains(&conn) {
            return Err(SessionError::AlreadyInSession);
        }
        if self.is_full() {
            return Err(SessionError::Full(self.id.clone()));
        }

        let color = Color::from_slot(self.players.len())
            .ok_or_else(|| SessionError::Full(self.id.clone()))?;
        self.players.push(conn);
        let info = PlayerInfo::new(color, now);
        let token = info.reconnect_token.clone();
        self.player_info.insert(conn, info);
        self.touch(now);

        tracing::info!(session_id = %self.id, %conn, color = ?color, "player joined");
        Ok((color, token))
    }

    /// Refreshes `conn`'s liveness and the session's activity stamp.
    pub fn heartbeat(
        &mut self,
        conn: ConnectionId,
        now: Instant,
    ) -> Result<(), SessionError> {
        authority::seat(self, conn)?;
        if let Some(info) = self.player_info.get_mut(&conn) {
            info.connected = true;
            info.last_seen = now;
        }
        self.touch(now);
        Ok(())
    }

    /// Records a transport drop for `conn`. The slot is kept.
    ///
    /// Returns the opponent's connection so it can be told, or `None` if
    /// `conn` is not seated here or has no opponent.
    pub fn mark_disconnected(
        &mut self,
        conn: ConnectionId,
        now: Instant,
    ) -> Option<ConnectionId> {
        let info = self.player_info.get_mut(&conn)?;
        info.connected = false;
        info.last_seen = now;
        self.opponent_of(conn)
    }

    // -- Game actions -----------------------------------------------------

    /// Applies a move for the side to move, always promoting to a queen.
    ///
    /// The caller is expected to have passed the turn gate
    /// ([`authority::authorize`]). On failure nothing changes.
    pub fn apply_move(
        &mut self,
        from: &str,
        to: &str,
        now: Instant,
    ) -> Result<MoveApplied, SessionError> {
        let mover = self.turn;
        let mv = self
            .board
            .apply_move(from, to, Some(Promotion::Queen))
            .map_err(|source| SessionError::InvalidMove {
                from: from.to_string(),
                to: to.to_string(),
                source,
            })?;

        self.turn = mover.opposite();
        self.touch(now);

        let is_check = self.board.is_check();
        let is_checkmate = self.board.is_checkmate();
        let is_draw = self.board.is_draw();
        if is_checkmate {
            self.finish(GameResult::win_for(mover));
        } else if is_draw {
            self.finish(GameResult::Draw);
        }

        Ok(MoveApplied {
            from: from.to_string(),
            to: to.to_string(),
            fen: self.board.fen(),
            turn: self.turn,
            is_check,
            is_checkmate,
            is_draw,
            mv,
        })
    }

    /// Validates a draw offer from `conn` and returns the opponent to
    /// notify, if one is seated.
    pub fn offer_draw(
        &mut self,
        conn: ConnectionId,
        now: Instant,
    ) -> Result<Option<ConnectionId>, SessionError> {
        authority::seat_in_play(self, conn)?;
        let opponent = self.opponent_of(conn);
        if opponent.is_some() {
            self.touch(now);
        }
        Ok(opponent)
    }

    /// Ends the game as a draw. No outstanding offer is required.
    pub fn accept_draw(
        &mut self,
        conn: ConnectionId,
        now: Instant,
    ) -> Result<(), SessionError> {
        authority::seat_in_play(self, conn)?;
        self.touch(now);
        self.finish(GameResult::Draw);
        Ok(())
    }

    /// Ends the game with `conn`'s opponent as winner. Returns the winner.
    pub fn resign(
        &mut self,
        conn: ConnectionId,
        now: Instant,
    ) -> Result<Color, SessionError> {
        let color = authority::seat_in_play(self, conn)?;
        let winner = color.opposite();
        self.touch(now);
        self.finish(GameResult::win_for(winner));
        Ok(winner)
    }

    fn finish(&mut self, result: GameResult) {
        self.finished = true;
        self.result = Some(result);
        tracing::info!(session_id = %self.id, ?result, "game finished");
    }

    /// Legal moves for the piece on `square`, for a seated player.
    pub fn legal_moves(
        &self,
        conn: ConnectionId,
        square: &str,
    ) -> Result<Vec<MoveDescriptor>, SessionError> {
        authority::seat(self, conn)?;
        self.board.moves_from(square).map_err(query_error)
    }

    /// The board as reported to a resyncing client.
    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            fen: self.board.fen(),
            turn: self.turn,
            is_check: self.board.is_check(),
            is_checkmate: self.board.is_checkmate(),
            is_draw: self.board.is_draw(),
        }
    }
}

/// Maps a rules refusal to a board query onto the session error reported.
fn query_error(e: RulesError) -> SessionError {
    match e {
        RulesError::InvalidSquare(sq) => SessionError::InvalidSquare(sq),
        other => SessionError::Rules(other),
    }
}

/// Generates a random 32-character hex string (128 bits of entropy).
pub(crate) fn generate_token() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

// =========================================================================
// Tests
// =========================================================================
