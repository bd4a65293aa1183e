//! Packed piece primitives: [`Color`], [`Type`], [`Code`] and [`Square`].
//!
//! These mirror the bit-packed representations of the reference chessboard
//! engine this crate descends from: every value here is a thin wrapper
//! around a small integer whose bit layout is part of the contract (it is
//! used directly as a table index throughout `position.rs` and
//! `geometry.rs`), not an implementation detail hidden behind the type.

use std::fmt;

use anyhow::{bail, Context};

/// One bit: the side a piece belongs to, or whose turn it is to move.
///
/// `black` is the zero value, `white` is one; this matches the reference
/// encoding and is relied upon by [`Color::forward_offset`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Color(u8);

impl Color {
    pub const BLACK: Self = Self(0);
    pub const WHITE: Self = Self(1);

    /// Returns `0` for black, `1` for white.
    #[must_use]
    pub const fn index(self) -> u8 {
        self.0
    }

    #[must_use]
    pub const fn is_white(self) -> bool {
        self.0 != 0
    }

    #[must_use]
    pub const fn is_black(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn opposite(self) -> Self {
        Self(1 - self.0)
    }

    pub fn toggle(&mut self) {
        *self = self.opposite();
    }

    /// The signed rank delta a pawn of this color advances by: `-8` for
    /// black, `+8` for white. Embeds the `(color << 1) - 8` formula from the
    /// original packed representation, treating `index()` as the 0/1
    /// embedding (scaled here to a one-square step rather than a
    /// byte-offset, since `Square` steps in units of one row already cover
    /// the `*8` factor at the call site).
    #[must_use]
    pub const fn forward_offset(self) -> i8 {
        ((self.0 as i8) << 1) - 1
    }
}

impl TryFrom<char> for Color {
    type Error = anyhow::Error;

    fn try_from(value: char) -> anyhow::Result<Self> {
        match value {
            'w' => Ok(Self::WHITE),
            'b' => Ok(Self::BLACK),
            other => bail!("expected 'w' or 'b', got {other:?}"),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.is_white() { "w" } else { "b" })
    }
}

/// Three-bit piece-type enumeration. The concrete values are a contract:
/// bit 2 (value 4) marks sliders, bit 0 marks bishop-movers (bishop,
/// queen), bit 1 marks rook-movers (rook, queen).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Type(u8);

impl Type {
    pub const NOTHING: Self = Self(0);
    pub const PAWN: Self = Self(1);
    pub const KNIGHT: Self = Self(2);
    pub const KING: Self = Self(3);
    pub const BISHOP: Self = Self(5);
    pub const ROOK: Self = Self(6);
    pub const QUEEN: Self = Self(7);

    const SLIDER_BIT: u8 = 4;
    const BISHOP_MOVER_BIT: u8 = 1;
    const ROOK_MOVER_BIT: u8 = 2;

    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self.0
    }

    #[must_use]
    pub const fn is_slider(self) -> bool {
        self.0 & Self::SLIDER_BIT != 0
    }

    #[must_use]
    pub const fn is_bishop_mover(self) -> bool {
        self.0 & Self::BISHOP_MOVER_BIT != 0
    }

    #[must_use]
    pub const fn is_rook_mover(self) -> bool {
        self.0 & Self::ROOK_MOVER_BIT != 0
    }

    #[must_use]
    pub const fn is_nothing(self) -> bool {
        self.0 == 0
    }
}

impl TryFrom<u8> for Type {
    type Error = anyhow::Error;

    fn try_from(value: u8) -> anyhow::Result<Self> {
        match value {
            0 | 1 | 2 | 3 | 5 | 6 | 7 => Ok(Self(value)),
            other => bail!("{other} is not a valid Type encoding"),
        }
    }
}

/// Color ⊕ type packed into a single byte, `0000_CTTT`. `0` and `8` (the
/// empty-type encoding under either color bit) both denote "no piece".
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct Code(u8);

impl Code {
    pub const NOTHING: Self = Self(0);

    pub const BLACK_PAWN: Self = Self::new(Color::BLACK, Type::PAWN);
    pub const WHITE_PAWN: Self = Self::new(Color::WHITE, Type::PAWN);
    pub const BLACK_KNIGHT: Self = Self::new(Color::BLACK, Type::KNIGHT);
    pub const WHITE_KNIGHT: Self = Self::new(Color::WHITE, Type::KNIGHT);
    pub const BLACK_KING: Self = Self::new(Color::BLACK, Type::KING);
    pub const WHITE_KING: Self = Self::new(Color::WHITE, Type::KING);
    pub const BLACK_BISHOP: Self = Self::new(Color::BLACK, Type::BISHOP);
    pub const WHITE_BISHOP: Self = Self::new(Color::WHITE, Type::BISHOP);
    pub const BLACK_ROOK: Self = Self::new(Color::BLACK, Type::ROOK);
    pub const WHITE_ROOK: Self = Self::new(Color::WHITE, Type::ROOK);
    pub const BLACK_QUEEN: Self = Self::new(Color::BLACK, Type::QUEEN);
    pub const WHITE_QUEEN: Self = Self::new(Color::WHITE, Type::QUEEN);

    #[must_use]
    pub const fn new(color: Color, kind: Type) -> Self {
        Self((color.index() << 3) | kind.as_u8())
    }

    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }

    #[must_use]
    pub const fn is_nothing(self) -> bool {
        self.0 & 0b0111 == 0
    }

    #[must_use]
    pub const fn color(self) -> Color {
        if self.0 & 0b1000 != 0 {
            Color::WHITE
        } else {
            Color::BLACK
        }
    }

    /// The piece type. Returns [`Type::NOTHING`] for an empty square; the
    /// reference implementation leaves this undefined on an empty code, but
    /// since `Type::NOTHING` is itself a valid, named `Type` value here
    /// there is no unsafe corner to cut.
    #[must_use]
    pub const fn kind(self) -> Type {
        match self.0 & 0b0111 {
            0 => Type::NOTHING,
            1 => Type::PAWN,
            2 => Type::KNIGHT,
            3 => Type::KING,
            5 => Type::BISHOP,
            6 => Type::ROOK,
            7 => Type::QUEEN,
            _ => Type::NOTHING,
        }
    }

    #[must_use]
    pub const fn is_a(self, kind: Type) -> bool {
        self.0 & 0b0111 == kind.0
    }

    #[must_use]
    pub const fn is(self, color: Color) -> bool {
        self.color().0 == color.0
    }

    #[must_use]
    pub const fn is_slider(self) -> bool {
        self.kind().is_slider()
    }

    #[must_use]
    pub const fn is_rook_mover(self) -> bool {
        self.kind().is_rook_mover()
    }

    #[must_use]
    pub const fn is_bishop_mover(self) -> bool {
        self.kind().is_bishop_mover()
    }

    #[must_use]
    pub const fn toggle_color(self) -> Self {
        Self(self.0 ^ 0b1000)
    }

    /// `Some(symbol)` following standard algebraic notation letters
    /// (uppercase for white), `None` for an empty square.
    #[must_use]
    pub fn algebraic_symbol(self) -> Option<char> {
        let letter = match self.kind() {
            Type::NOTHING => return None,
            Type::PAWN => 'p',
            Type::KNIGHT => 'n',
            Type::KING => 'k',
            Type::BISHOP => 'b',
            Type::ROOK => 'r',
            Type::QUEEN => 'q',
        };
        Some(if self.is(Color::WHITE) {
            letter.to_ascii_uppercase()
        } else {
            letter
        })
    }

    /// The GUI widget's 4-bit piece encoding: `0` empty, then pawn, rook,
    /// knight, bishop, queen, king in pairs of (black, white) from `2` to
    /// `13`. Every [`Code`] has exactly one widget encoding.
    #[must_use]
    pub fn to_widget(self) -> u8 {
        let base = match self.kind() {
            Type::NOTHING => return 0,
            Type::PAWN => 2,
            Type::ROOK => 4,
            Type::KNIGHT => 6,
            Type::BISHOP => 8,
            Type::QUEEN => 10,
            Type::KING => 12,
            _ => 0,
        };
        base + u8::from(self.is(Color::WHITE))
    }

    /// The inverse of [`Self::to_widget`]. Rejects `1` (never assigned,
    /// reserved by the widget encoding alongside the twelve real pieces and
    /// `0`) and any value above `13`.
    pub fn from_widget(value: u8) -> anyhow::Result<Self> {
        let color = if value % 2 == 0 {
            Color::BLACK
        } else {
            Color::WHITE
        };
        let kind = match value {
            0 => return Ok(Self::NOTHING),
            2 | 3 => Type::PAWN,
            4 | 5 => Type::ROOK,
            6 | 7 => Type::KNIGHT,
            8 | 9 => Type::BISHOP,
            10 | 11 => Type::QUEEN,
            12 | 13 => Type::KING,
            other => bail!("{other} is not a valid widget piece code"),
        };
        Ok(Self::new(color, kind))
    }
}

impl TryFrom<char> for Code {
    type Error = anyhow::Error;

    fn try_from(symbol: char) -> anyhow::Result<Self> {
        let color = if symbol.is_ascii_uppercase() {
            Color::WHITE
        } else {
            Color::BLACK
        };
        let kind = match symbol.to_ascii_lowercase() {
            'p' => Type::PAWN,
            'n' => Type::KNIGHT,
            'k' => Type::KING,
            'b' => Type::BISHOP,
            'r' => Type::ROOK,
            'q' => Type::QUEEN,
            other => bail!("{other:?} is not a valid piece symbol"),
        };
        Ok(Self::new(color, kind))
    }
}

/// Square identifier in `0..64`, plus the two out-of-band sentinels used by
/// the bit-scan operations: [`Square::PRE_BEGIN`] (`255`) and
/// [`Square::END`] (`64`).
///
/// `a1` is `0`, `h1` is `7`, `a8` is `56`, `h8` is `63`: row = `index / 8`,
/// column = `index % 8`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Square(u8);

impl Square {
    pub const END: Self = Self(64);
    pub const PRE_BEGIN: Self = Self(255);

    #[must_use]
    pub const fn new(index: u8) -> Self {
        debug_assert!(index < 64);
        Self(index)
    }

    #[must_use]
    pub const fn from_file_rank(file: u8, rank: u8) -> Self {
        debug_assert!(file < 8 && rank < 8);
        Self(rank * 8 + file)
    }

    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self.0
    }

    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }

    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 < 64
    }

    #[must_use]
    pub const fn row(self) -> u8 {
        self.0 >> 3
    }

    #[must_use]
    pub const fn col(self) -> u8 {
        self.0 & 7
    }

    #[must_use]
    pub const fn rank(self) -> u8 {
        self.row()
    }

    #[must_use]
    pub const fn file(self) -> u8 {
        self.col()
    }

    /// Adds a signed step to the square's underlying index. Only valid when
    /// the caller knows the result lies on the board or is one of the two
    /// sentinels; callers that need board-edge awareness consult the
    /// geometry tables instead, which never produce an off-board ray.
    #[must_use]
    pub const fn offset(self, delta: i8) -> Self {
        Self((self.0 as i16 + delta as i16) as u8)
    }

    /// Advances past the current square, then returns the least-significant
    /// set bit of `mask` at or after the new position, or [`Square::END`] if
    /// none remains. Well-defined when called on [`Square::PRE_BEGIN`].
    #[must_use]
    pub fn next_bit_in(self, mask: u64) -> Self {
        let next = self.0.wrapping_add(1);
        if next >= 64 {
            return Self::END;
        }
        let shifted = mask >> next;
        if shifted == 0 {
            Self::END
        } else {
            Self(next + shifted.trailing_zeros() as u8)
        }
    }

    /// Symmetric high-bit scan: retreats from the current square and
    /// returns the most-significant set bit of `mask` before (or at) the new
    /// position, or [`Square::PRE_BEGIN`] if none remains. Well-defined when
    /// called on [`Square::END`]; undefined when called on `0`.
    #[must_use]
    pub fn prev_bit_in(self, mask: u64) -> Self {
        if self.0 == 0 {
            debug_assert!(false, "prev_bit_in is undefined at square 0");
            return Self::PRE_BEGIN;
        }
        let upper_bound = if self.0 > 64 { 63 } else { self.0 - 1 };
        let shifted = mask << (63 - upper_bound);
        if shifted == 0 {
            Self::PRE_BEGIN
        } else {
            Self(upper_bound - shifted.leading_zeros() as u8)
        }
    }
}

impl TryFrom<&str> for Square {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> anyhow::Result<Self> {
        let mut chars = value.chars();
        let file = chars
            .next()
            .with_context(|| format!("{value:?} is not a square"))?;
        let rank = chars
            .next()
            .with_context(|| format!("{value:?} is not a square"))?;
        if chars.next().is_some() {
            bail!("{value:?} is not a square");
        }
        if !('a'..='h').contains(&file) || !('1'..='8').contains(&rank) {
            bail!("{value:?} is not a square");
        }
        let file = file as u8 - b'a';
        let rank = rank as u8 - b'1';
        Ok(Self::from_file_rank(file, rank))
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_valid() {
            return write!(f, "<invalid square {}>", self.0);
        }
        let file = (b'a' + self.col()) as char;
        let rank = (b'1' + self.row()) as char;
        write!(f, "{file}{rank}")
    }
}
