//! The turn gate: decides whether a request may even reach the board.
//!
//! Board legality is the rules engine's business. This module only
//! answers "is this connection seated, is the game still running, and
//! is it their move?".

use checkroom_protocol::{Color, ConnectionId};
use checkroom_rules::RulesEngine;

use crate::{Session, SessionError};

/// Resolves `conn` to the color whose slot it holds.
pub fn seat<E: RulesEngine>(
    session: &Session<E>,
    conn: ConnectionId,
) -> Result<Color, SessionError> {
    session.color_of(conn).ok_or(SessionError::NotAPlayer)
}

/// Like [`seat`], but also refuses once the game has a result.
pub fn seat_in_play<E: RulesEngine>(
    session: &Session<E>,
    conn: ConnectionId,
) -> Result<Color, SessionError> {
    let color = seat(session, conn)?;
    if session.is_finished() {
        return Err(SessionError::GameOver);
    }
    Ok(color)
}

/// Authorizes a move: `conn` must be seated, the game unfinished, and
/// its color the one on move.
pub fn authorize<E: RulesEngine>(
    session: &Session<E>,
    conn: ConnectionId,
) -> Result<Color, SessionError> {
    let color = seat_in_play(session, conn)?;
    if color != session.turn() {
        return Err(SessionError::NotYourTurn);
    }
    Ok(color)
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use checkroom_protocol::SessionId;

    use super::*;

    fn conn(id: u64) -> ConnectionId {
        ConnectionId::new(id)
    }

    fn seated() -> Session {
        let now = Instant::now();
        let mut s = Session::new(SessionId::new("ab12cd"), conn(1), now);
        s.join(conn(2), now).unwrap();
        s
    }

    #[test]
    fn test_authorize_player_on_move_gets_color() {
        let s = seated();
        assert_eq!(authorize(&s, conn(1)), Ok(Color::White));
    }

    #[test]
    fn test_authorize_player_off_move_not_your_turn() {
        let s = seated();
        assert_eq!(authorize(&s, conn(2)), Err(SessionError::NotYourTurn));
    }

    #[test]
    fn test_authorize_follows_turn_flip() {
        let mut s = seated();
        s.apply_move("e2", "e4", Instant::now()).unwrap();
        assert_eq!(authorize(&s, conn(1)), Err(SessionError::NotYourTurn));
        assert_eq!(authorize(&s, conn(2)), Ok(Color::Black));
    }

    #[test]
    fn test_authorize_outsider_not_a_player() {
        let s = seated();
        assert_eq!(authorize(&s, conn(7)), Err(SessionError::NotAPlayer));
    }

    #[test]
    fn test_authorize_finished_game_is_over() {
        let mut s = seated();
        s.resign(conn(2), Instant::now()).unwrap();
        assert_eq!(authorize(&s, conn(1)), Err(SessionError::GameOver));
        // Outsiders are still told they are outsiders.
        assert_eq!(authorize(&s, conn(7)), Err(SessionError::NotAPlayer));
        // Seat resolution itself ignores the result.
        assert_eq!(seat(&s, conn(2)), Ok(Color::Black));
    }
}
