// The board mirror — one participant's authoritative local view of piece
// positions.
//
// A `BoardMirror` is a value: applying a move produces a fresh mirror and
// leaves the old one untouched. The sync client replaces its mirror
// wholesale with whatever the rules oracle's `apply` returns, so mirror
// history and oracle state cannot drift apart. Nothing outside this module
// writes a square directly.
//
// The pixel geometry helpers at the bottom map between board squares and
// the 680x680 rendering surface (85 px cells, rank 8 at the top, y axis
// pointing down). They are the trivial arithmetic half of input handling;
// everything visual stays behind the `Renderer` trait in `sync.rs`.

use std::collections::BTreeMap;

use gambit_protocol::codec::{BOARD_PX, CELL_PX};
use gambit_protocol::types::{Move, MoveSequence, Promotion, Square};

/// The two sides of the board.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    White,
    Black,
}

impl Side {
    pub fn opponent(self) -> Self {
        match self {
            Self::White => Self::Black,
            Self::Black => Self::White,
        }
    }
}

/// Kinds of pieces on the board.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PieceKind {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

/// A piece: what it is and whose it is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Piece {
    pub kind: PieceKind,
    pub side: Side,
}

/// One participant's local copy of the board.
///
/// Invariant: at most one piece per square (guaranteed by the map), and
/// every reachable mirror is the result of applying oracle-accepted moves
/// to the starting position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoardMirror {
    squares: BTreeMap<Square, Piece>,
    last_move: Option<Move>,
    ply: MoveSequence,
}

/// Back-rank piece order, file a through h.
const BACK_RANK: [PieceKind; 8] = [
    PieceKind::Rook,
    PieceKind::Knight,
    PieceKind::Bishop,
    PieceKind::Queen,
    PieceKind::King,
    PieceKind::Bishop,
    PieceKind::Knight,
    PieceKind::Rook,
];

impl BoardMirror {
    /// The standard starting position, white to move.
    pub fn starting_position() -> Self {
        let mut squares = BTreeMap::new();
        for (file, &kind) in BACK_RANK.iter().enumerate() {
            let file = file as u8;
            // Indices are constants below 8; construction cannot fail.
            let at = |rank| Square::from_indices(file, rank).unwrap();
            squares.insert(at(0), Piece { kind, side: Side::White });
            squares.insert(
                at(1),
                Piece {
                    kind: PieceKind::Pawn,
                    side: Side::White,
                },
            );
            squares.insert(
                at(6),
                Piece {
                    kind: PieceKind::Pawn,
                    side: Side::Black,
                },
            );
            squares.insert(at(7), Piece { kind, side: Side::Black });
        }
        Self {
            squares,
            last_move: None,
            ply: MoveSequence(0),
        }
    }

    /// Piece on a square, if any.
    pub fn piece_at(&self, square: Square) -> Option<Piece> {
        self.squares.get(&square).copied()
    }

    /// The side whose turn it is, derived from ply parity.
    pub fn side_to_move(&self) -> Side {
        if self.ply.0 % 2 == 0 {
            Side::White
        } else {
            Side::Black
        }
    }

    /// Number of plies applied since the starting position.
    pub fn ply(&self) -> MoveSequence {
        self.ply
    }

    /// The most recently applied move, if any.
    pub fn last_move(&self) -> Option<Move> {
        self.last_move
    }

    /// Mechanical move application: relocate the origin piece, replacing
    /// whatever stood on the destination, and advance the ply counter.
    /// Returns `None` when the origin square is empty.
    ///
    /// This is the building block rules oracles use from `apply`. It
    /// handles capture-by-replacement and promotion piece swaps; compound
    /// effects (the rook hop in castling, en-passant removal) are the
    /// oracle's responsibility.
    pub fn with_move_applied(&self, mv: Move) -> Option<Self> {
        let mut next = self.clone();
        let mut piece = next.squares.remove(&mv.from)?;
        if let Some(promotion) = mv.promotion {
            piece.kind = match promotion {
                Promotion::Knight => PieceKind::Knight,
                Promotion::Bishop => PieceKind::Bishop,
                Promotion::Rook => PieceKind::Rook,
                Promotion::Queen => PieceKind::Queen,
            };
        }
        next.squares.insert(mv.to, piece);
        next.last_move = Some(mv);
        next.ply = next.ply.next();
        Some(next)
    }
}

// ---------------------------------------------------------------------------
// Pixel geometry
// ---------------------------------------------------------------------------

/// The square under a pixel on the 680x680 board surface, or `None` when
/// the pixel is off the board. Rank 8 is at the top; y grows downward.
pub fn square_at_pixel(x: u16, y: u16) -> Option<Square> {
    if x >= BOARD_PX || y >= BOARD_PX {
        return None;
    }
    let file = (x / CELL_PX) as u8;
    let rank = 7 - (y / CELL_PX) as u8;
    Square::from_indices(file, rank)
}

/// Top-left pixel of a square's cell — the coordinate pair carried on the
/// wire for the destination of a local move.
pub fn cell_origin(square: Square) -> (u16, u16) {
    let x = u16::from(square.file()) * CELL_PX;
    let y = (7 - u16::from(square.rank())) * CELL_PX;
    (x, y)
}
