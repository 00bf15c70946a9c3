//! Reconnection broker: hands a slot over to a new connection.
//!
//! Connection ids are transport-level and change every time a client's
//! socket drops. The broker lets the client prove it owned a slot and
//! moves that slot, with its liveness record, onto the new connection.
//!
//! ```text
//!   players: [conn-3, conn-4]          players: [conn-9, conn-4]
//!   player_info: {conn-3: W, conn-4: B} ──→ player_info: {conn-9: W, conn-4: B}
//! ```

use std::time::Instant;

use checkroom_protocol::{Color, ConnectionId};
use checkroom_rules::RulesEngine;

use crate::session::{PlayerInfo, generate_token};
use crate::{Session, SessionError};

/// Which proof of ownership the broker accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReconnectMode {
    /// The previous connection id is enough. A reconnection token is
    /// accepted as an alternative when no id matches.
    #[default]
    Lenient,

    /// Only the slot's reconnection token is accepted.
    Strict,
}

/// What a client presents to reclaim a slot.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReconnectClaim<'a> {
    pub previous: Option<ConnectionId>,
    pub token: Option<&'a str>,
}

/// The outcome of an accepted claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconnection {
    pub color: Color,
    /// The connection that held the slot until now.
    pub previous: ConnectionId,
    /// The slot's new token. The old one no longer works.
    pub token: String,
    /// The opposing slot's current connection, if anyone has joined.
    pub opponent: Option<ConnectionId>,
}

#[derive(Debug, Clone, Default)]
pub struct ReconnectionBroker {
    mode: ReconnectMode,
}

impl ReconnectionBroker {
    pub fn new(mode: ReconnectMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> ReconnectMode {
        self.mode
    }

    /// Transfers the claimed slot to `new_conn`.
    ///
    /// On rejection the session is left exactly as it was.
    ///
    /// # Errors
    /// - [`SessionError::NotAPlayer`]: the claimed connection never held a
    ///   slot here (lenient mode, no token given)
    /// - [`SessionError::InvalidToken`]: a required or offered token does
    ///   not match any slot
    /// - [`SessionError::AlreadyInSession`]: `new_conn` already holds the
    ///   other slot
    pub fn reconnect<E: RulesEngine>(
        &self,
        session: &mut Session<E>,
        new_conn: ConnectionId,
        claim: ReconnectClaim<'_>,
        now: Instant,
    ) -> Result<Reconnection, SessionError> {
        let color = self.resolve(session, claim)?;
        if session.color_of(new_conn).is_some_and(|c| c != color) {
            return Err(SessionError::AlreadyInSession);
        }

        let slot = color.slot();
        let previous = session.players[slot];
        session.players[slot] = new_conn;

        let mut info = session
            .player_info
            .remove(&previous)
            .unwrap_or_else(|| PlayerInfo::new(color, now));
        info.connected = true;
        info.last_seen = now;
        info.reconnect_token = generate_token();
        let token = info.reconnect_token.clone();
        session.player_info.insert(new_conn, info);
        session.touch(now);

        tracing::info!(
            session_id = %session.id(),
            %previous,
            %new_conn,
            color = ?color,
            "slot reclaimed"
        );

        Ok(Reconnection {
            color,
            previous,
            token,
            opponent: session.connection_for(color.opposite()),
        })
    }

    fn resolve<E: RulesEngine>(
        &self,
        session: &Session<E>,
        claim: ReconnectClaim<'_>,
    ) -> Result<Color, SessionError> {
        if self.mode == ReconnectMode::Lenient {
            if let Some(color) = claim.previous.and_then(|prev| session.color_of(prev)) {
                return Ok(color);
            }
            if claim.token.is_none() {
                return Err(SessionError::NotAPlayer);
            }
        }

        let token = claim.token.ok_or(SessionError::InvalidToken)?;
        session
            .players
            .iter()
            .find(|conn| {
                session
                    .player_info
                    .get(conn)
                    .is_some_and(|info| info.reconnect_token == token)
            })
            .and_then(|conn| session.color_of(*conn))
            .ok_or(SessionError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use checkroom_protocol::SessionId;

    use super::*;

    fn conn(id: u64) -> ConnectionId {
        ConnectionId::new(id)
    }

    fn seated() -> (Session, Instant) {
        let now = Instant::now();
        let mut s = Session::new(SessionId::new("ab12cd"), conn(1), now);
        s.join(conn(2), now).unwrap();
        (s, now)
    }

    fn by_id(prev: u64) -> ReconnectClaim<'static> {
        ReconnectClaim {
            previous: Some(conn(prev)),
            token: None,
        }
    }

    fn token_of(s: &Session, c: u64) -> String {
        s.player_info(conn(c)).unwrap().reconnect_token.clone()
    }

    // =====================================================================
    // Lenient mode
    // =====================================================================

    #[test]
    fn test_reconnect_lenient_previous_id_takes_over_slot() {
        let (mut s, now) = seated();
        s.apply_move("e2", "e4", now).unwrap();
        s.mark_disconnected(conn(1), now);
        let fen = s.board().fen();
        let old_token = token_of(&s, 1);
        let later = now + Duration::from_secs(10);

        let rc = ReconnectionBroker::default()
            .reconnect(&mut s, conn(7), by_id(1), later)
            .unwrap();

        assert_eq!(rc.color, Color::White);
        assert_eq!(rc.previous, conn(1));
        assert_eq!(rc.opponent, Some(conn(2)));
        assert_ne!(rc.token, old_token);

        assert_eq!(s.players(), &[conn(7), conn(2)]);
        assert_eq!(s.color_of(conn(7)), Some(Color::White));
        assert!(s.player_info(conn(1)).is_none(), "entry moved, not copied");
        let info = s.player_info(conn(7)).unwrap();
        assert!(info.connected);
        assert_eq!(info.last_seen, later);
        assert_eq!(info.reconnect_token, rc.token);

        assert_eq!(s.board().fen(), fen);
        assert_eq!(s.turn(), Color::Black);
    }

    #[test]
    fn test_reconnect_lenient_unknown_id_not_a_player() {
        let (mut s, now) = seated();
        let result = ReconnectionBroker::default().reconnect(&mut s, conn(7), by_id(99), now);

        assert_eq!(result, Err(SessionError::NotAPlayer));
        assert_eq!(s.players(), &[conn(1), conn(2)]);
        assert!(s.player_info(conn(7)).is_none());
    }

    #[test]
    fn test_reconnect_lenient_accepts_token_instead() {
        let (mut s, now) = seated();
        let token = token_of(&s, 2);
        let claim = ReconnectClaim {
            previous: None,
            token: Some(&token),
        };

        let rc = ReconnectionBroker::default()
            .reconnect(&mut s, conn(8), claim, now)
            .unwrap();

        assert_eq!(rc.color, Color::Black);
        assert_eq!(rc.opponent, Some(conn(1)));
    }

    #[test]
    fn test_reconnect_lenient_wrong_token_invalid() {
        let (mut s, now) = seated();
        let claim = ReconnectClaim {
            previous: Some(conn(99)),
            token: Some("deadbeef"),
        };
        let result = ReconnectionBroker::default().reconnect(&mut s, conn(8), claim, now);
        assert_eq!(result, Err(SessionError::InvalidToken));
    }

    #[test]
    fn test_reconnect_single_player_session_has_no_opponent() {
        let now = Instant::now();
        let mut s: Session = Session::new(SessionId::new("ab12cd"), conn(1), now);

        let rc = ReconnectionBroker::default()
            .reconnect(&mut s, conn(4), by_id(1), now)
            .unwrap();

        assert_eq!(rc.opponent, None);
        assert_eq!(s.players(), &[conn(4)]);
    }

    #[test]
    fn test_reconnect_into_other_slot_while_seated_rejected() {
        let (mut s, now) = seated();
        let result = ReconnectionBroker::default().reconnect(&mut s, conn(2), by_id(1), now);
        assert_eq!(result, Err(SessionError::AlreadyInSession));
        assert_eq!(s.players(), &[conn(1), conn(2)]);
    }

    #[test]
    fn test_reconnect_preserves_finished_result() {
        let (mut s, now) = seated();
        s.resign(conn(2), now).unwrap();

        ReconnectionBroker::default()
            .reconnect(&mut s, conn(6), by_id(2), now)
            .unwrap();

        assert!(s.is_finished());
        assert_eq!(s.color_of(conn(6)), Some(Color::Black));
    }

    // =====================================================================
    // Strict mode
    // =====================================================================

    #[test]
    fn test_reconnect_strict_requires_token() {
        let (mut s, now) = seated();
        let broker = ReconnectionBroker::new(ReconnectMode::Strict);

        let result = broker.reconnect(&mut s, conn(7), by_id(1), now);

        assert_eq!(result, Err(SessionError::InvalidToken));
        assert_eq!(s.players(), &[conn(1), conn(2)]);
    }

    #[test]
    fn test_reconnect_strict_token_rotates() {
        let (mut s, now) = seated();
        let broker = ReconnectionBroker::new(ReconnectMode::Strict);
        let token = token_of(&s, 1);
        let claim = ReconnectClaim {
            previous: None,
            token: Some(&token),
        };

        let rc = broker.reconnect(&mut s, conn(7), claim, now).unwrap();
        assert_eq!(rc.color, Color::White);

        // The retired token no longer opens the slot.
        let replay = broker.reconnect(&mut s, conn(9), claim, now);
        assert_eq!(replay, Err(SessionError::InvalidToken));
        assert_eq!(s.players(), &[conn(7), conn(2)]);
    }
}
