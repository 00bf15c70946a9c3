//! The chess rules engine, seen from the session layer as a black box.
//!
//! The session core never generates moves or decides game outcomes
//! itself. It owns one [`RulesEngine`] per session and asks it:
//!
//! - "apply this move" ([`RulesEngine::apply_move`])
//! - "is the side to move in check / mated / drawn?"
//! - "what does the position look like?" ([`RulesEngine::fen`])
//! - "where can the piece on this square go?" ([`RulesEngine::moves_from`])
//!
//! [`ChessBoard`] is the implementation backed by the `chess` crate.

mod board;
mod error;
mod san;

pub use board::ChessBoard;
pub use error::RulesError;

use checkroom_protocol::{Color, MoveDescriptor};

/// The piece a pawn turns into on the last rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Promotion {
    #[default]
    Queen,
    Rook,
    Bishop,
    Knight,
}

/// A game-logic oracle holding exactly one board.
///
/// Stateless per call apart from that board, which only
/// [`apply_move`](Self::apply_move) and [`load`](Self::load) mutate.
pub trait RulesEngine: Send + 'static {
    /// A board in the standard starting position.
    fn new_game() -> Self
    where
        Self: Sized;

    /// Plays `from` → `to` for the side to move.
    ///
    /// `promotion` is only consulted when the move is a promotion; `None`
    /// means queen. On error the board is left untouched.
    fn apply_move(
        &mut self,
        from: &str,
        to: &str,
        promotion: Option<Promotion>,
    ) -> Result<MoveDescriptor, RulesError>;

    fn is_check(&self) -> bool;

    fn is_checkmate(&self) -> bool;

    /// Stalemate, insufficient material, the 50-move rule, or threefold
    /// repetition.
    fn is_draw(&self) -> bool;

    /// The position as a six-field FEN string.
    fn fen(&self) -> String;

    /// Replaces the position with the one described by `fen`.
    fn load(&mut self, fen: &str) -> Result<(), RulesError>;

    /// Every legal move of the piece standing on `square`. Empty when the
    /// square is empty or holds a piece of the side not on move.
    fn moves_from(&self, square: &str) -> Result<Vec<MoveDescriptor>, RulesError>;

    /// The side the board says is to move.
    fn turn(&self) -> Color;
}
