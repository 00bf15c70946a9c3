//! Error types for the rules layer.

/// Errors the rules engine reports back to the session layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RulesError {
    /// The string is not an algebraic square such as `e4`.
    #[error("invalid square {0:?}")]
    InvalidSquare(String),

    /// The squares parse, but no legal move goes from `from` to `to` for
    /// the side to move.
    #[error("illegal move {from}{to}")]
    IllegalMove { from: String, to: String },

    /// `load` was handed a FEN string the board cannot represent.
    #[error("invalid FEN {0:?}")]
    InvalidFen(String),
}
