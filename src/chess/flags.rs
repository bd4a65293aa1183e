//! Small packed state records: pawn [`Flags`], [`CastleFlags`] and
//! [`EnPassant`].

use bitflags::bitflags;

use super::core::{Code, Color, Square, Type};

bitflags! {
    /// Four mutually independent booleans cached on a pawn.
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct Flags: u8 {
        /// An enemy piece (or an en-passant target) stands on the square
        /// diagonally forward toward the a-file.
        const CAN_TAKE_QUEEN_SIDE = 0b0000_1000;
        /// The square one step forward is empty.
        const IS_NOT_BLOCKED = 0b0001_0000;
        /// Analogous to `CAN_TAKE_QUEEN_SIDE`, toward the h-file.
        const CAN_TAKE_KING_SIDE = 0b0010_0000;
        /// The pawn is on its initial rank, `IS_NOT_BLOCKED`, and the
        /// square two steps forward is also empty.
        const CAN_MOVE_TWO_SQUARES = 0b0100_0000;
    }
}

bitflags! {
    /// Eight bits tracking per-color castling-relevant "moved" state plus a
    /// cached "in check" bit for each color.
    ///
    /// The all-ones-ish default (everything "moved", both sides "in check")
    /// mirrors the reference implementation's `clear()` value: castling is
    /// denied and nobody is in check until pieces are actually placed and
    /// `place()` clears the relevant bits.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct CastleFlags: u8 {
        const WHITE_ROOK_QUEEN_SIDE_MOVED = 0b0000_0001;
        const WHITE_ROOK_KING_SIDE_MOVED  = 0b0000_0010;
        const WHITE_KING_MOVED            = 0b0000_0100;
        const BLACK_ROOK_QUEEN_SIDE_MOVED = 0b0000_1000;
        const BLACK_ROOK_KING_SIDE_MOVED  = 0b0001_0000;
        const BLACK_KING_MOVED            = 0b0010_0000;
        const BLACK_IN_CHECK              = 0b0100_0000;
        const WHITE_IN_CHECK              = 0b1000_0000;
    }
}

impl Default for CastleFlags {
    fn default() -> Self {
        Self::WHITE_ROOK_QUEEN_SIDE_MOVED
            | Self::WHITE_ROOK_KING_SIDE_MOVED
            | Self::WHITE_KING_MOVED
            | Self::BLACK_ROOK_QUEEN_SIDE_MOVED
            | Self::BLACK_ROOK_KING_SIDE_MOVED
            | Self::BLACK_KING_MOVED
            | Self::BLACK_IN_CHECK
            | Self::WHITE_IN_CHECK
    }
}

impl CastleFlags {
    #[must_use]
    pub fn clear() -> Self {
        Self::default()
    }

    fn rook_queen_side_moved(color: Color) -> Self {
        if color.is_white() {
            Self::WHITE_ROOK_QUEEN_SIDE_MOVED
        } else {
            Self::BLACK_ROOK_QUEEN_SIDE_MOVED
        }
    }

    fn rook_king_side_moved(color: Color) -> Self {
        if color.is_white() {
            Self::WHITE_ROOK_KING_SIDE_MOVED
        } else {
            Self::BLACK_ROOK_KING_SIDE_MOVED
        }
    }

    fn king_moved(color: Color) -> Self {
        if color.is_white() {
            Self::WHITE_KING_MOVED
        } else {
            Self::BLACK_KING_MOVED
        }
    }

    fn in_check_bit(color: Color) -> Self {
        if color.is_white() {
            Self::WHITE_IN_CHECK
        } else {
            Self::BLACK_IN_CHECK
        }
    }

    fn queen_side_rook_home(color: Color) -> Square {
        if color.is_white() {
            Square::try_from("a1").unwrap()
        } else {
            Square::try_from("a8").unwrap()
        }
    }

    fn king_side_rook_home(color: Color) -> Square {
        if color.is_white() {
            Square::try_from("h1").unwrap()
        } else {
            Square::try_from("h8").unwrap()
        }
    }

    fn king_home(color: Color) -> Square {
        if color.is_white() {
            Square::try_from("e1").unwrap()
        } else {
            Square::try_from("e8").unwrap()
        }
    }

    /// Called when `piece` leaves `from`: lights the corresponding "moved"
    /// bit for a rook leaving its starting square, or unconditionally for a
    /// king (matching the reference implementation, which does not check
    /// that the king was on its home square).
    pub fn piece_moved_from(&mut self, piece: Code, from: Square) {
        if piece.is_a(Type::ROOK) {
            if from == Self::queen_side_rook_home(piece.color()) {
                *self |= Self::rook_queen_side_moved(piece.color());
            } else if from == Self::king_side_rook_home(piece.color()) {
                *self |= Self::rook_king_side_moved(piece.color());
            }
        } else if piece.is_a(Type::KING) {
            *self |= Self::king_moved(piece.color());
        }
    }

    /// Called when `piece` arrives on `to`: clears the corresponding
    /// "moved" bit when a rook or king is placed back on its starting
    /// square, re-enabling castling on that side.
    pub fn piece_placed_at(&mut self, piece: Code, to: Square) {
        if piece.is_a(Type::ROOK) {
            if to == Self::queen_side_rook_home(piece.color()) {
                self.remove(Self::rook_queen_side_moved(piece.color()));
            } else if to == Self::king_side_rook_home(piece.color()) {
                self.remove(Self::rook_king_side_moved(piece.color()));
            }
        } else if piece.is_a(Type::KING) && to == Self::king_home(piece.color()) {
            self.remove(Self::king_moved(piece.color()));
        }
    }

    /// Restricted, as the specification directs, to the six
    /// `(code, starting square)` pairs that name a king or rook on its
    /// home square; every other input returns `false`, matching the
    /// reference implementation's fallback.
    #[must_use]
    pub fn has_moved(&self, code: Code, index: Square) -> bool {
        if code == Code::WHITE_ROOK && index == Self::queen_side_rook_home(Color::WHITE) {
            self.contains(Self::WHITE_ROOK_QUEEN_SIDE_MOVED)
        } else if code == Code::WHITE_KING && index == Self::king_home(Color::WHITE) {
            self.contains(Self::WHITE_KING_MOVED)
        } else if code == Code::WHITE_ROOK && index == Self::king_side_rook_home(Color::WHITE) {
            self.contains(Self::WHITE_ROOK_KING_SIDE_MOVED)
        } else if code == Code::BLACK_ROOK && index == Self::queen_side_rook_home(Color::BLACK) {
            self.contains(Self::BLACK_ROOK_QUEEN_SIDE_MOVED)
        } else if code == Code::BLACK_KING && index == Self::king_home(Color::BLACK) {
            self.contains(Self::BLACK_KING_MOVED)
        } else if code == Code::BLACK_ROOK && index == Self::king_side_rook_home(Color::BLACK) {
            self.contains(Self::BLACK_ROOK_KING_SIDE_MOVED)
        } else {
            false
        }
    }

    #[must_use]
    pub fn can_castle_queen_side(&self, color: Color) -> bool {
        !self.contains(Self::rook_queen_side_moved(color)) && !self.contains(Self::king_moved(color))
    }

    #[must_use]
    pub fn can_castle_king_side(&self, color: Color) -> bool {
        !self.contains(Self::rook_king_side_moved(color)) && !self.contains(Self::king_moved(color))
    }

    #[must_use]
    pub fn in_check(&self, color: Color) -> bool {
        self.contains(Self::in_check_bit(color))
    }

    pub fn set_check(&mut self, color: Color, in_check: bool) {
        self.set(Self::in_check_bit(color), in_check);
    }
}

/// The passed square of a two-square pawn advance, plus the "does not
/// exist" and "horizontally pinned" states.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct EnPassant(u8);

impl EnPassant {
    const PINNED_BIT: u8 = 0x80;
    const INDEX_MASK: u8 = 0x7f;
    const NONE: u8 = 64;

    #[must_use]
    pub const fn none() -> Self {
        Self(Self::NONE)
    }

    #[must_use]
    pub const fn new(passed_square: Square) -> Self {
        Self(passed_square.as_u8() & Self::INDEX_MASK)
    }

    #[must_use]
    pub const fn exists(self) -> bool {
        (self.0 & Self::INDEX_MASK) != Self::NONE
    }

    /// The passed (skipped) square.
    #[must_use]
    pub const fn index(self) -> Square {
        Square::new(self.0 & Self::INDEX_MASK)
    }

    /// The square the pawn that can be captured en passant currently
    /// occupies: `passed ^ 8`.
    #[must_use]
    pub const fn pawn_index(self) -> Square {
        Square::new((self.0 & Self::INDEX_MASK) ^ 8)
    }

    /// The square that pawn advanced from: `passed ^ 24`.
    #[must_use]
    pub const fn from_index(self) -> Square {
        Square::new((self.0 & Self::INDEX_MASK) ^ 24)
    }

    #[must_use]
    pub const fn pinned(self) -> bool {
        self.0 & Self::PINNED_BIT != 0
    }

    pub fn set_pinned(&mut self) {
        self.0 |= Self::PINNED_BIT;
    }

    pub fn reset_pinned(&mut self) {
        self.0 &= !Self::PINNED_BIT;
    }
}

impl Default for EnPassant {
    fn default() -> Self {
        Self::none()
    }
}
