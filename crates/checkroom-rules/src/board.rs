use std::collections::HashMap;
use std::str::FromStr;

use chess::{Board, BoardStatus, ChessMove, MoveGen, Piece, Rank, Square};

use checkroom_protocol::{Color, MoveDescriptor};

use crate::san::{describe, side_color};
use crate::{Promotion, RulesEngine, RulesError};

/// Halfmoves without a capture or pawn move after which the game is drawn.
const FIFTY_MOVE_HALFMOVES: u32 = 100;

/// [`RulesEngine`] backed by the `chess` crate's bitboard [`Board`].
///
/// `Board` only knows the position itself, so the move clocks and the
/// repetition history that FEN output and draw detection need are kept
/// alongside it.
#[derive(Debug, Clone)]
pub struct ChessBoard {
    board: Board,
    halfmove_clock: u32,
    fullmove_number: u32,
    /// Occurrences of each position since the last irreversible move.
    repetitions: HashMap<u64, u32>,
}

impl ChessBoard {
    fn with_position(board: Board, halfmove_clock: u32, fullmove_number: u32) -> Self {
        let mut repetitions = HashMap::new();
        repetitions.insert(board.get_hash(), 1);
        Self {
            board,
            halfmove_clock,
            fullmove_number,
            repetitions,
        }
    }

    fn resolve(
        &self,
        from: &str,
        to: &str,
        promotion: Option<Promotion>,
    ) -> Result<ChessMove, RulesError> {
        let src = parse_square(from)?;
        let dst = parse_square(to)?;

        let last_rank = match self.board.side_to_move() {
            chess::Color::White => Rank::Eighth,
            chess::Color::Black => Rank::First,
        };
        let promote = match self.board.piece_on(src) {
            Some(Piece::Pawn) if dst.get_rank() == last_rank => {
                Some(promotion_piece(promotion.unwrap_or_default()))
            }
            _ => None,
        };

        let mv = ChessMove::new(src, dst, promote);
        if !self.board.legal(mv) {
            return Err(RulesError::IllegalMove {
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        Ok(mv)
    }

    fn insufficient_material(&self) -> bool {
        let board = &self.board;
        let total = board.combined().popcnt();
        if total == 2 {
            return true;
        }

        let bishops = *board.pieces(Piece::Bishop);
        let minors = (*board.pieces(Piece::Knight) | bishops).popcnt();
        if total == 3 && minors == 1 {
            return true;
        }

        // Kings plus bishops that all stand on one square color.
        if total == bishops.popcnt() + 2 {
            let light = bishops.filter(|sq| is_light(*sq)).count() as u32;
            return light == 0 || light == bishops.popcnt();
        }
        false
    }

    fn repetition_count(&self) -> u32 {
        self.repetitions
            .get(&self.board.get_hash())
            .copied()
            .unwrap_or(0)
    }
}

impl Default for ChessBoard {
    fn default() -> Self {
        Self::with_position(Board::default(), 0, 1)
    }
}

impl RulesEngine for ChessBoard {
    fn new_game() -> Self {
        Self::default()
    }

    fn apply_move(
        &mut self,
        from: &str,
        to: &str,
        promotion: Option<Promotion>,
    ) -> Result<MoveDescriptor, RulesError> {
        let mv = self.resolve(from, to, promotion)?;
        let descriptor = describe(&self.board, mv);

        let mover = self.board.side_to_move();
        let irreversible =
            descriptor.piece == "p" || descriptor.captured.is_some();
        self.board = self.board.make_move_new(mv);

        if irreversible {
            self.halfmove_clock = 0;
            // Nothing before a pawn move or capture can recur.
            self.repetitions.clear();
        } else {
            self.halfmove_clock += 1;
        }
        if mover == chess::Color::Black {
            self.fullmove_number += 1;
        }
        *self.repetitions.entry(self.board.get_hash()).or_insert(0) += 1;

        Ok(descriptor)
    }

    fn is_check(&self) -> bool {
        self.board.checkers().popcnt() > 0
    }

    fn is_checkmate(&self) -> bool {
        self.board.status() == BoardStatus::Checkmate
    }

    fn is_draw(&self) -> bool {
        self.board.status() == BoardStatus::Stalemate
            || self.insufficient_material()
            || self.halfmove_clock >= FIFTY_MOVE_HALFMOVES
            || self.repetition_count() >= 3
    }

    fn fen(&self) -> String {
        // The crate prints the square of the pawn that can be taken en
        // passant and "0 1" for the clocks, so only placement, side and
        // castling rights are taken from it.
        let full = self.board.to_string();
        let position: Vec<&str> = full.split_whitespace().take(3).collect();
        format!(
            "{} {} {} {}",
            position.join(" "),
            en_passant_target(&self.board),
            self.halfmove_clock,
            self.fullmove_number
        )
    }

    fn load(&mut self, fen: &str) -> Result<(), RulesError> {
        let invalid = || RulesError::InvalidFen(fen.to_string());

        let board = Board::from_str(fen).map_err(|_| invalid())?;
        let fields: Vec<&str> = fen.split_whitespace().collect();
        let halfmove = match fields.get(4) {
            Some(field) => field.parse::<u32>().map_err(|_| invalid())?,
            None => 0,
        };
        let fullmove = match fields.get(5) {
            Some(field) => field.parse::<u32>().map_err(|_| invalid())?.max(1),
            None => 1,
        };

        *self = Self::with_position(board, halfmove, fullmove);
        Ok(())
    }

    fn moves_from(&self, square: &str) -> Result<Vec<MoveDescriptor>, RulesError> {
        let src = parse_square(square)?;
        Ok(MoveGen::new_legal(&self.board)
            .filter(|mv| mv.get_source() == src)
            .map(|mv| describe(&self.board, mv))
            .collect())
    }

    fn turn(&self) -> Color {
        side_color(self.board.side_to_move())
    }
}

fn parse_square(s: &str) -> Result<Square, RulesError> {
    if s.len() != 2 {
        return Err(RulesError::InvalidSquare(s.to_string()));
    }
    Square::from_str(s).map_err(|_| RulesError::InvalidSquare(s.to_string()))
}

fn promotion_piece(promotion: Promotion) -> Piece {
    match promotion {
        Promotion::Queen => Piece::Queen,
        Promotion::Rook => Piece::Rook,
        Promotion::Bishop => Piece::Bishop,
        Promotion::Knight => Piece::Knight,
    }
}

/// The square a pawn capturing en passant lands on, or `-`.
fn en_passant_target(board: &Board) -> String {
    match board.en_passant() {
        Some(pawn) => {
            let rank = match board.side_to_move() {
                chess::Color::White => Rank::Sixth,
                chess::Color::Black => Rank::Third,
            };
            Square::make_square(rank, pawn.get_file()).to_string()
        }
        None => "-".to_string(),
    }
}

fn is_light(square: Square) -> bool {
    (square.get_rank().to_index() + square.get_file().to_index()) % 2 == 1
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const START_FEN: &str =
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    fn play(board: &mut ChessBoard, moves: &[(&str, &str)]) {
        for (from, to) in moves {
            board
                .apply_move(from, to, None)
                .unwrap_or_else(|e| panic!("{from}{to} should be legal: {e}"));
        }
    }

    fn loaded(fen: &str) -> ChessBoard {
        let mut board = ChessBoard::new_game();
        board.load(fen).expect("fen should load");
        board
    }

    // =====================================================================
    // Basics
    // =====================================================================

    #[test]
    fn test_new_game_is_standard_start() {
        let board = ChessBoard::new_game();
        assert_eq!(board.fen(), START_FEN);
        assert_eq!(board.turn(), Color::White);
        assert!(!board.is_check());
        assert!(!board.is_draw());
    }

    #[test]
    fn test_apply_move_pawn_double_push() {
        let mut board = ChessBoard::new_game();
        let mv = board.apply_move("e2", "e4", None).unwrap();

        assert_eq!(mv.color, Color::White);
        assert_eq!(mv.piece, "p");
        assert_eq!(mv.flags, "b");
        assert_eq!(mv.san, "e4");
        assert_eq!(board.turn(), Color::Black);
        assert!(
            board
                .fen()
                .starts_with("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b")
        );
    }

    #[test]
    fn test_apply_move_illegal_leaves_board_unchanged() {
        let mut board = ChessBoard::new_game();
        let err = board.apply_move("e2", "e5", None).unwrap_err();

        assert_eq!(
            err,
            RulesError::IllegalMove {
                from: "e2".into(),
                to: "e5".into()
            }
        );
        assert_eq!(board.fen(), START_FEN);
    }

    #[test]
    fn test_apply_move_wrong_side_is_illegal() {
        let mut board = ChessBoard::new_game();
        assert!(matches!(
            board.apply_move("e7", "e5", None),
            Err(RulesError::IllegalMove { .. })
        ));
    }

    #[test]
    fn test_apply_move_bad_square_rejected() {
        let mut board = ChessBoard::new_game();
        assert_eq!(
            board.apply_move("z9", "e4", None).unwrap_err(),
            RulesError::InvalidSquare("z9".into())
        );
        assert!(matches!(
            board.apply_move("e2", "e44", None),
            Err(RulesError::InvalidSquare(_))
        ));
    }

    #[test]
    fn test_fen_tracks_move_clocks() {
        let mut board = ChessBoard::new_game();
        play(&mut board, &[("e2", "e4"), ("e7", "e5")]);
        assert!(board.fen().ends_with(" 0 2"));

        play(&mut board, &[("g1", "f3")]);
        assert!(board.fen().ends_with(" 1 2"));
    }

    // =====================================================================
    // Game end
    // =====================================================================

    #[test]
    fn test_fools_mate_is_checkmate() {
        let mut board = ChessBoard::new_game();
        play(&mut board, &[("f2", "f3"), ("e7", "e5"), ("g2", "g4")]);
        let mv = board.apply_move("d8", "h4", None).unwrap();

        assert_eq!(mv.san, "Qh4#");
        assert!(board.is_check());
        assert!(board.is_checkmate());
        assert!(!board.is_draw());
        assert_eq!(board.turn(), Color::White);
    }

    #[test]
    fn test_stalemate_is_draw_not_mate() {
        let board = loaded("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1");
        assert!(board.is_draw());
        assert!(!board.is_checkmate());
        assert!(!board.is_check());
    }

    #[test]
    fn test_insufficient_material_draws() {
        assert!(loaded("8/8/8/8/8/8/8/K6k w - - 0 1").is_draw());
        assert!(loaded("8/8/8/8/8/8/8/KN5k w - - 0 1").is_draw());
        // Bishops on c1 and f8 both stand on dark squares.
        assert!(loaded("5b2/8/8/8/8/8/8/K1B4k w - - 0 1").is_draw());
        assert!(!loaded("8/8/8/8/8/8/R7/K6k w - - 0 1").is_draw());
    }

    #[test]
    fn test_fifty_move_rule_draws() {
        let mut board = loaded("8/8/8/8/8/8/R7/K6k w - - 99 80");
        assert!(!board.is_draw());

        play(&mut board, &[("a2", "a3")]);
        assert!(board.is_draw());
        assert!(board.fen().ends_with(" 100 80"));
    }

    #[test]
    fn test_threefold_repetition_draws() {
        let shuffle = [("g1", "f3"), ("g8", "f6"), ("f3", "g1"), ("f6", "g8")];
        let mut board = ChessBoard::new_game();

        play(&mut board, &shuffle);
        assert!(!board.is_draw(), "start position seen only twice");

        play(&mut board, &shuffle);
        assert!(board.is_draw());
    }

    // =====================================================================
    // Special moves
    // =====================================================================

    #[test]
    fn test_promotion_defaults_to_queen() {
        let mut board = loaded("8/P7/8/8/8/8/8/k6K w - - 0 1");
        let mv = board.apply_move("a7", "a8", None).unwrap();

        assert_eq!(mv.promotion.as_deref(), Some("q"));
        assert_eq!(mv.flags, "p");
        assert_eq!(mv.san, "a8=Q+");
        assert!(board.is_check());
    }

    #[test]
    fn test_promotion_honours_requested_piece() {
        let mut board = loaded("8/P7/8/8/8/8/8/k6K w - - 0 1");
        let mv = board
            .apply_move("a7", "a8", Some(Promotion::Knight))
            .unwrap();
        assert_eq!(mv.promotion.as_deref(), Some("n"));
        assert_eq!(mv.san, "a8=N");
    }

    #[test]
    fn test_castling_both_sides() {
        let fen = "r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1";

        let mut board = loaded(fen);
        let mv = board.apply_move("e1", "g1", None).unwrap();
        assert_eq!(mv.flags, "k");
        assert_eq!(mv.san, "O-O");

        let mut board = loaded(fen);
        let mv = board.apply_move("e1", "c1", None).unwrap();
        assert_eq!(mv.flags, "q");
        assert_eq!(mv.san, "O-O-O");
    }

    #[test]
    fn test_en_passant_capture() {
        let mut board = loaded("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 1");
        let mv = board.apply_move("e5", "d6", None).unwrap();

        assert_eq!(mv.flags, "e");
        assert_eq!(mv.captured.as_deref(), Some("p"));
        assert_eq!(mv.san, "exd6");
    }

    #[test]
    fn test_fen_en_passant_target_is_behind_pawn() {
        let mut board = ChessBoard::new_game();
        play(&mut board, &[("e2", "e4"), ("h7", "h6"), ("e4", "e5"), ("d7", "d5")]);
        let fen = board.fen();
        assert_eq!(fen, "rnbqkbnr/ppp1ppp1/7p/3pP3/8/8/PPPP1PPP/RNBQKBNR w KQkq d6 0 3");

        let mut reloaded = ChessBoard::new_game();
        reloaded.load(&fen).unwrap();
        assert_eq!(reloaded.fen(), fen);
        assert_eq!(reloaded.apply_move("e5", "d6", None).unwrap().flags, "e");
    }

    #[test]
    fn test_fen_en_passant_target_for_black() {
        let mut board = loaded("4k3/8/8/8/3p4/8/4P3/4K3 w - - 0 1");
        play(&mut board, &[("e2", "e4")]);
        assert_eq!(board.fen(), "4k3/8/8/8/3pP3/8/8/4K3 b - e3 0 1");
    }

    #[test]
    fn test_san_disambiguates_by_file() {
        let mut board = loaded("4k3/8/8/8/8/8/8/1N3N1K w - - 0 1");
        let mv = board.apply_move("b1", "d2", None).unwrap();
        assert_eq!(mv.san, "Nbd2");
    }

    // =====================================================================
    // Queries
    // =====================================================================

    #[test]
    fn test_moves_from_lists_piece_moves() {
        let board = ChessBoard::new_game();
        let mut targets: Vec<String> = board
            .moves_from("e2")
            .unwrap()
            .into_iter()
            .map(|m| m.to)
            .collect();
        targets.sort();
        assert_eq!(targets, vec!["e3", "e4"]);
    }

    #[test]
    fn test_moves_from_opponent_piece_is_empty() {
        let board = ChessBoard::new_game();
        assert!(board.moves_from("e7").unwrap().is_empty());
        assert!(board.moves_from("e4").unwrap().is_empty());
    }

    #[test]
    fn test_moves_from_bad_square_errors() {
        let board = ChessBoard::new_game();
        assert!(matches!(
            board.moves_from("zz"),
            Err(RulesError::InvalidSquare(_))
        ));
    }

    #[test]
    fn test_load_rejects_garbage() {
        let mut board = ChessBoard::new_game();
        assert!(matches!(
            board.load("not a fen"),
            Err(RulesError::InvalidFen(_))
        ));
        assert_eq!(board.fen(), START_FEN);
    }
}
