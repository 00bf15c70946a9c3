//! Move description: piece letters, flags and Standard Algebraic Notation.

use chess::{Board, BoardStatus, ChessMove, MoveGen, Piece, Square};

use checkroom_protocol::{Color, MoveDescriptor};

/// Lowercase piece letter as used in FEN and move descriptors.
pub(crate) fn piece_letter(piece: Piece) -> char {
    match piece {
        Piece::Pawn => 'p',
        Piece::Knight => 'n',
        Piece::Bishop => 'b',
        Piece::Rook => 'r',
        Piece::Queen => 'q',
        Piece::King => 'k',
    }
}

pub(crate) fn side_color(side: chess::Color) -> Color {
    match side {
        chess::Color::White => Color::White,
        chess::Color::Black => Color::Black,
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Castle {
    KingSide,
    QueenSide,
}

/// Describes `mv` as played from `board`. The move must be legal there.
pub(crate) fn describe(board: &Board, mv: ChessMove) -> MoveDescriptor {
    let src = mv.get_source();
    let dst = mv.get_dest();
    let piece = board.piece_on(src).unwrap_or(Piece::Pawn);

    let en_passant = piece == Piece::Pawn
        && src.get_file() != dst.get_file()
        && board.piece_on(dst).is_none();
    let captured = if en_passant {
        Some(Piece::Pawn)
    } else {
        board.piece_on(dst)
    };

    let castle = if piece == Piece::King
        && src.get_file().to_index().abs_diff(dst.get_file().to_index()) == 2
    {
        if dst.get_file().to_index() > src.get_file().to_index() {
            Some(Castle::KingSide)
        } else {
            Some(Castle::QueenSide)
        }
    } else {
        None
    };

    let mut flags = String::new();
    match castle {
        Some(Castle::KingSide) => flags.push('k'),
        Some(Castle::QueenSide) => flags.push('q'),
        None => {
            if en_passant {
                flags.push('e');
            } else if captured.is_some() {
                flags.push('c');
            }
            if mv.get_promotion().is_some() {
                flags.push('p');
            }
            if piece == Piece::Pawn
                && src.get_rank().to_index().abs_diff(dst.get_rank().to_index())
                    == 2
            {
                flags.push('b');
            }
            if flags.is_empty() {
                flags.push('n');
            }
        }
    }

    MoveDescriptor {
        color: side_color(board.side_to_move()),
        from: src.to_string(),
        to: dst.to_string(),
        piece: piece_letter(piece).to_string(),
        captured: captured.map(|p| piece_letter(p).to_string()),
        promotion: mv.get_promotion().map(|p| piece_letter(p).to_string()),
        flags,
        san: san(board, mv, piece, captured.is_some(), castle),
    }
}

fn san(
    board: &Board,
    mv: ChessMove,
    piece: Piece,
    capture: bool,
    castle: Option<Castle>,
) -> String {
    let src = mv.get_source();
    let dst = mv.get_dest();

    let mut out = match castle {
        Some(Castle::KingSide) => "O-O".to_string(),
        Some(Castle::QueenSide) => "O-O-O".to_string(),
        None => {
            let mut s = String::new();
            if piece == Piece::Pawn {
                if capture {
                    s.push(file_char(src));
                }
            } else {
                s.push(piece_letter(piece).to_ascii_uppercase());
                s.push_str(&disambiguation(board, mv, piece));
            }
            if capture {
                s.push('x');
            }
            s.push_str(&dst.to_string());
            if let Some(promoted) = mv.get_promotion() {
                s.push('=');
                s.push(piece_letter(promoted).to_ascii_uppercase());
            }
            s
        }
    };

    let after = board.make_move_new(mv);
    if after.status() == BoardStatus::Checkmate {
        out.push('#');
    } else if after.checkers().popcnt() > 0 {
        out.push('+');
    }
    out
}

/// The file, rank, or full square needed to tell `mv` apart from another
/// piece of the same kind that can reach the same square.
fn disambiguation(board: &Board, mv: ChessMove, piece: Piece) -> String {
    let src = mv.get_source();
    let rivals: Vec<Square> = MoveGen::new_legal(board)
        .filter(|m| {
            m.get_dest() == mv.get_dest()
                && m.get_source() != src
                && board.piece_on(m.get_source()) == Some(piece)
        })
        .map(|m| m.get_source())
        .collect();

    if rivals.is_empty() {
        return String::new();
    }
    let shares_file = rivals.iter().any(|s| s.get_file() == src.get_file());
    let shares_rank = rivals.iter().any(|s| s.get_rank() == src.get_rank());

    if !shares_file {
        file_char(src).to_string()
    } else if !shares_rank {
        rank_char(src).to_string()
    } else {
        src.to_string()
    }
}

fn file_char(square: Square) -> char {
    (b'a' + square.get_file().to_index() as u8) as char
}

fn rank_char(square: Square) -> char {
    (b'1' + square.get_rank().to_index() as u8) as char
}
