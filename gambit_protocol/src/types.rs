// Core types for the board-sync protocol.
//
// `SessionId` and `MoveSequence` are the relay-facing identifiers; `Square`,
// `Promotion`, and `Move` describe a single ply of the board game. All of
// these are shared between the relay (`gambit_relay`) and the sync client
// (`gambit_sync`); the relay only ever compares and forwards them, it never
// interprets board semantics.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Relay-assigned session identifier. Opaque to clients — the only supported
/// operation is equality comparison (used for self-echo filtering). Unique
/// per connection for the lifetime of the relay process.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Count of plies applied to a board mirror. Attached to every relayed move
/// so receivers can reject stale or duplicate messages deterministically.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MoveSequence(pub u64);

impl MoveSequence {
    /// The sequence following this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for MoveSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A board square, `a1` through `h8`. Stored as zero-based file and rank
/// indices; the checked constructors are the only way to build one, so a
/// `Square` value is always on the board.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Square {
    file: u8,
    rank: u8,
}

/// Error for square strings outside `[a-h][1-8]`.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("invalid square {0:?}")]
pub struct InvalidSquare(pub String);

impl Square {
    /// Build a square from zero-based file (0 = `a`) and rank (0 = rank 1)
    /// indices. Returns `None` if either index is off the board.
    pub fn from_indices(file: u8, rank: u8) -> Option<Self> {
        (file < 8 && rank < 8).then_some(Self { file, rank })
    }

    /// Build a square from its two ASCII bytes, e.g. `(b'e', b'2')`.
    pub fn from_bytes(file: u8, rank: u8) -> Option<Self> {
        if (b'a'..=b'h').contains(&file) && (b'1'..=b'8').contains(&rank) {
            Some(Self {
                file: file - b'a',
                rank: rank - b'1',
            })
        } else {
            None
        }
    }

    /// Zero-based file index (0 = file `a`).
    pub fn file(self) -> u8 {
        self.file
    }

    /// Zero-based rank index (0 = rank 1).
    pub fn rank(self) -> u8 {
        self.rank
    }
}

impl FromStr for Square {
    type Err = InvalidSquare;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.as_bytes() {
            [file, rank] => {
                Self::from_bytes(*file, *rank).ok_or_else(|| InvalidSquare(s.to_string()))
            }
            _ => Err(InvalidSquare(s.to_string())),
        }
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", (b'a' + self.file) as char, self.rank + 1)
    }
}

/// Piece a pawn promotes to on reaching the far rank. Kings and pawns are
/// not promotion targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Promotion {
    Knight,
    Bishop,
    Rook,
    Queen,
}

impl Promotion {
    /// Lowercase algebraic suffix letter (`n`, `b`, `r`, `q`).
    pub fn letter(self) -> char {
        match self {
            Self::Knight => 'n',
            Self::Bishop => 'b',
            Self::Rook => 'r',
            Self::Queen => 'q',
        }
    }
}

/// One ply: origin square, destination square, and an optional promotion
/// piece. Promotion is only ever produced by the rules oracle for local
/// moves — the wire codec has no promotion slot (see `codec`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Move {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<Promotion>,
}

impl Move {
    /// A plain origin-to-destination move with no promotion.
    pub fn new(from: Square, to: Square) -> Self {
        Self {
            from,
            to,
            promotion: None,
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(p) = self.promotion {
            write!(f, "{}", p.letter())?;
        }
        Ok(())
    }
}
