// Fixed-width move codec.
//
// A played move crosses the relay as exactly ten ASCII characters: four
// characters of algebraic notation (origin square then destination square)
// followed by two 3-digit zero-padded base-10 integers, the destination's
// pixel coordinates on the 680x680 board surface (85 px per cell). Example:
// `e2e4170255` — pawn from e2 to e4, destination drawn at pixel (170, 255).
//
// The pixel fields are rendering metadata carried for the display layer;
// they are not part of the game-logic payload and are deliberately NOT
// cross-checked against the destination square.
//
// There is no promotion slot. Encoding a promotion move fails — adding one
// would widen the payload and is a breaking wire-format change that every
// connected client must take simultaneously.

use thiserror::Error;

use crate::types::{Move, Square};

/// Side length of one board cell, in pixels.
pub const CELL_PX: u16 = 85;

/// Side length of the rendered board surface, in pixels (8 cells).
pub const BOARD_PX: u16 = CELL_PX * 8;

/// Exact length of an encoded move payload.
pub const ENCODED_LEN: usize = 10;

/// Largest value a 3-digit coordinate field can carry.
pub const COORD_MAX: u16 = 999;

/// A received payload that does not match the fixed layout. The message
/// carrying it is discarded; the board mirror is never touched.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MalformedPayload {
    /// Payload is not exactly [`ENCODED_LEN`] bytes.
    #[error("move payload must be {ENCODED_LEN} characters, got {0}")]
    Length(usize),
    /// The first four characters are not two valid squares.
    #[error("invalid square pair in move payload: {0:?}")]
    Squares(String),
    /// A coordinate field contains a non-digit character.
    #[error("coordinate field is not three ASCII digits: {0:?}")]
    Coordinate(String),
}

/// A move that cannot be represented in the fixed layout.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// Promotion moves have no wire representation in this layout.
    #[error("promotion move {0} cannot be encoded")]
    Promotion(Move),
    /// Coordinate does not fit in three digits.
    #[error("pixel coordinate {0} exceeds {COORD_MAX}")]
    CoordinateTooLarge(u16),
}

/// Encode a move plus the destination's pixel coordinates into the
/// ten-character payload.
pub fn encode(mv: Move, dest_x: u16, dest_y: u16) -> Result<String, EncodeError> {
    if mv.promotion.is_some() {
        return Err(EncodeError::Promotion(mv));
    }
    for coord in [dest_x, dest_y] {
        if coord > COORD_MAX {
            return Err(EncodeError::CoordinateTooLarge(coord));
        }
    }
    Ok(format!("{}{}{dest_x:03}{dest_y:03}", mv.from, mv.to))
}

/// Decode a ten-character payload into a move and the destination's pixel
/// coordinates. Decoded moves never carry a promotion.
pub fn decode(payload: &str) -> Result<(Move, u16, u16), MalformedPayload> {
    let bytes = payload.as_bytes();
    if bytes.len() != ENCODED_LEN {
        return Err(MalformedPayload::Length(bytes.len()));
    }

    let from = Square::from_bytes(bytes[0], bytes[1]);
    let to = Square::from_bytes(bytes[2], bytes[3]);
    let (Some(from), Some(to)) = (from, to) else {
        return Err(MalformedPayload::Squares(payload.to_string()));
    };

    let dest_x = coordinate(&bytes[4..7], payload)?;
    let dest_y = coordinate(&bytes[7..10], payload)?;

    Ok((Move::new(from, to), dest_x, dest_y))
}

/// Parse one 3-digit zero-padded coordinate field.
fn coordinate(digits: &[u8], payload: &str) -> Result<u16, MalformedPayload> {
    let mut value: u16 = 0;
    for d in digits {
        if !d.is_ascii_digit() {
            return Err(MalformedPayload::Coordinate(payload.to_string()));
        }
        value = value * 10 + u16::from(d - b'0');
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Promotion;

    fn mv(s: &str) -> Move {
        Move::new(s[0..2].parse().unwrap(), s[2..4].parse().unwrap())
    }

    #[test]
    fn encodes_the_documented_example() {
        assert_eq!(encode(mv("e2e4"), 170, 255).unwrap(), "e2e4170255");
    }

    #[test]
    fn zero_pads_short_coordinates() {
        assert_eq!(encode(mv("a1h8"), 0, 85).unwrap(), "a1h8000085");
    }

    #[test]
    fn round_trips_every_cell_origin() {
        // Every square paired with every on-board cell-origin coordinate.
        for file in 0..8u8 {
            for rank in 0..8u8 {
                let from = Square::from_indices(file, rank).unwrap();
                let to = Square::from_indices(7 - file, 7 - rank).unwrap();
                let m = Move::new(from, to);
                let (x, y) = (u16::from(file) * CELL_PX, u16::from(rank) * CELL_PX);
                let payload = encode(m, x, y).unwrap();
                assert_eq!(payload.len(), ENCODED_LEN);
                assert_eq!(decode(&payload).unwrap(), (m, x, y));
            }
        }
    }

    #[test]
    fn round_trips_boundary_coordinates() {
        for (x, y) in [(0, 0), (999, 999), (1, 999), (679, 680)] {
            let payload = encode(mv("b1c3"), x, y).unwrap();
            assert_eq!(decode(&payload).unwrap(), (mv("b1c3"), x, y));
        }
    }

    #[test]
    fn rejects_wrong_length() {
        for bad in ["", "e2e4", "e2e417025", "e2e41702555"] {
            assert_eq!(
                decode(bad),
                Err(MalformedPayload::Length(bad.len())),
                "{bad:?}"
            );
        }
    }

    #[test]
    fn rejects_invalid_squares() {
        for bad in ["i2e4170255", "e9e4170255", "e2x4170255", "2ee4170255"] {
            assert!(
                matches!(decode(bad), Err(MalformedPayload::Squares(_))),
                "{bad:?}"
            );
        }
    }

    #[test]
    fn rejects_non_digit_coordinates() {
        for bad in ["e2e4x70255", "e2e41702x5", "e2e4 70255", "e2e4170-55"] {
            assert!(
                matches!(decode(bad), Err(MalformedPayload::Coordinate(_))),
                "{bad:?}"
            );
        }
    }

    #[test]
    fn rejects_multibyte_payloads() {
        // 10 characters but more than 10 bytes — length check sees bytes.
        assert!(decode("e2e417025é").is_err());
    }

    #[test]
    fn encode_rejects_promotion_moves() {
        let promo = Move {
            promotion: Some(Promotion::Queen),
            ..mv("e7e8")
        };
        assert_eq!(encode(promo, 0, 0), Err(EncodeError::Promotion(promo)));
    }

    #[test]
    fn encode_rejects_oversized_coordinates() {
        assert_eq!(
            encode(mv("e2e4"), 1000, 0),
            Err(EncodeError::CoordinateTooLarge(1000))
        );
    }

    #[test]
    fn decoded_moves_never_promote() {
        let (m, _, _) = decode("e7e8000000").unwrap();
        assert_eq!(m.promotion, None);
    }
}
