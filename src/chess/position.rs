//! [`Position`]: the mutable board state and the legal-move oracle built on
//! top of it. Everything else in this crate exists to serve this module:
//! [`Position::place`] is the single mutation funnel that every other
//! mutating operation (`execute`, FEN loading, initial setup, color swap, and
//! en-passant bookkeeping) composes.

use std::fmt;

use anyhow::{bail, Context};

use super::bitboard::BitBoard;
use super::core::{Code, Color, Square, Type};
use super::countboard::CountBoard;
use super::flags::{CastleFlags, EnPassant, Flags};
use super::geometry::{self, Direction};
use super::piece::Piece;

/// A single legal (or candidate) move: source, destination, and an optional
/// promotion type, set iff a pawn reaches the back rank.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Move {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<Type>,
}

impl Move {
    #[must_use]
    pub const fn new(from: Square, to: Square) -> Self {
        Self {
            from,
            to,
            promotion: None,
        }
    }

    #[must_use]
    pub const fn promoting(from: Square, to: Square, promotion: Type) -> Self {
        Self {
            from,
            to,
            promotion: Some(promotion),
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(promotion) = self.promotion {
            if let Some(symbol) = Code::new(Color::BLACK, promotion).algebraic_symbol() {
                write!(f, "{symbol}")?;
            }
        }
        Ok(())
    }
}

/// A chess position: board contents plus every derived index needed to
/// answer legal-move queries without rescanning the board.
///
/// Field-level invariants (see `DESIGN.md` and §3/§8 of the design spec):
/// `by_code`/`by_color`/`board` always agree; `defended[c].count(s)` is the
/// number of color-`c` pieces attacking `s`; `attackers[c]`/`pinning[c]` are
/// recomputed from scratch by every [`Self::place`] call rather than patched
/// incrementally (a deliberate simplification — see `DESIGN.md`).
#[derive(Clone, Copy)]
pub struct Position {
    by_code: [BitBoard; 16],
    by_color: [BitBoard; 2],
    board: [Piece; 64],
    attackers: [BitBoard; 2],
    pinning: [BitBoard; 2],
    defended: [CountBoard; 2],
    king_battery: [u8; 2],
    halfmove_clock: u32,
    fullmove_number: u32,
    to_move: Color,
    castle: CastleFlags,
    en_passant: EnPassant,
    double_check: bool,
}

impl Default for Position {
    fn default() -> Self {
        Self::empty()
    }
}

impl Position {
    /// An empty board: no pieces, white to move, no castling rights.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            by_code: [BitBoard::EMPTY; 16],
            by_color: [BitBoard::EMPTY; 2],
            board: [Piece::empty(); 64],
            attackers: [BitBoard::EMPTY; 2],
            pinning: [BitBoard::EMPTY; 2],
            defended: [CountBoard::new(); 2],
            king_battery: [0; 2],
            halfmove_clock: 0,
            fullmove_number: 1,
            to_move: Color::WHITE,
            castle: CastleFlags::clear(),
            en_passant: EnPassant::none(),
            double_check: false,
        }
    }

    /// Resets to an empty board, discarding every derived index. Mirrors
    /// `ChessPosition::clear` in the reference implementation.
    pub fn clear(&mut self) {
        *self = Self::empty();
    }

    /// The standard starting position.
    #[must_use]
    pub fn initial_position() -> Self {
        Self::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1")
            .expect("the initial position FEN is well-formed")
    }

    // --- small accessors -------------------------------------------------

    #[must_use]
    pub fn to_move(&self) -> Color {
        self.to_move
    }

    #[must_use]
    pub fn castle_rights(&self) -> CastleFlags {
        self.castle
    }

    #[must_use]
    pub fn en_passant(&self) -> EnPassant {
        self.en_passant
    }

    #[must_use]
    pub fn halfmove_clock(&self) -> u32 {
        self.halfmove_clock
    }

    #[must_use]
    pub fn fullmove_number(&self) -> u32 {
        self.fullmove_number
    }

    #[must_use]
    pub fn piece_at(&self, index: Square) -> Piece {
        self.board[index.as_usize()]
    }

    #[must_use]
    pub fn pieces_of_code(&self, code: Code) -> BitBoard {
        self.by_code[code.as_usize()]
    }

    #[must_use]
    pub fn pieces_of_color(&self, color: Color) -> BitBoard {
        self.by_color[color.index() as usize]
    }

    #[must_use]
    pub fn occupied(&self) -> BitBoard {
        self.by_color[0] | self.by_color[1]
    }

    #[must_use]
    pub fn king_square(&self, color: Color) -> Option<Square> {
        let bits = self.by_code[Code::new(color, Type::KING).as_usize()];
        if bits.is_empty() {
            None
        } else {
            Some(bits.first())
        }
    }

    #[must_use]
    pub fn defended_count(&self, color: Color, square: Square) -> u8 {
        self.defended[color.index() as usize].count_at(square)
    }

    #[must_use]
    pub fn attackers(&self, color: Color) -> BitBoard {
        self.attackers[color.index() as usize]
    }

    #[must_use]
    pub fn pinning(&self, color: Color) -> BitBoard {
        self.pinning[color.index() as usize]
    }

    #[must_use]
    pub fn king_battery_attack_count(&self, color: Color) -> u8 {
        self.king_battery[color.index() as usize]
    }

    #[must_use]
    pub fn in_check(&self, color: Color) -> bool {
        self.castle.in_check(color)
    }

    /// Meaningful only for [`Self::to_move`] and only while it is in check.
    #[must_use]
    pub fn double_check(&self) -> bool {
        self.double_check
    }

    fn rook_movers_of(&self, color: Color) -> BitBoard {
        self.by_code[Code::new(color, Type::ROOK).as_usize()]
            | self.by_code[Code::new(color, Type::QUEEN).as_usize()]
    }

    fn bishop_movers_of(&self, color: Color) -> BitBoard {
        self.by_code[Code::new(color, Type::BISHOP).as_usize()]
            | self.by_code[Code::new(color, Type::QUEEN).as_usize()]
    }

    fn movers_of_class(&self, color: Color, mover_type: Type) -> BitBoard {
        if mover_type.is_rook_mover() {
            self.rook_movers_of(color)
        } else {
            self.bishop_movers_of(color)
        }
    }

    // --- defendables (§4.5) ------------------------------------------------

    /// Squares `code` at `index` attacks or defends, plus whether it does so
    /// by seeing the enemy king through another own same-mover-class slider
    /// (a "battery").
    #[must_use]
    pub fn defendables(&self, code: Code, index: Square) -> (BitBoard, bool) {
        match code.kind() {
            Type::NOTHING => (BitBoard::EMPTY, false),
            Type::PAWN => (self.pawn_defendables(code.color(), index), false),
            Type::KNIGHT | Type::KING => (geometry::candidates(code.kind(), index), false),
            _ => self.slider_defendables(code, index),
        }
    }

    fn pawn_defendables(&self, color: Color, index: Square) -> BitBoard {
        let bits = BitBoard::from_square(index).bits();
        let mut result = if color.is_white() {
            BitBoard::from_bits((bits << 7) | (bits << 9))
        } else {
            BitBoard::from_bits((bits >> 7) | (bits >> 9))
        };
        match index.col() {
            0 => result = result.minus(BitBoard::FILE_H),
            7 => result = result.minus(BitBoard::FILE_A),
            _ => {}
        }
        result
    }

    fn slider_defendables(&self, code: Code, index: Square) -> (BitBoard, bool) {
        let color = code.color();
        let all_pieces = self.occupied();
        let mut result = BitBoard::EMPTY;
        for direction in Direction::ALL {
            if !direction.matches(code.kind()) {
                continue;
            }
            let same_class_own = self.movers_of_class(color, direction.mover_type());
            let blockers = all_pieces.minus(same_class_own);
            let mut current = index;
            while let Some(next) = geometry::step(direction, current) {
                result.set(next);
                if blockers.test(next) {
                    break;
                }
                current = next;
            }
        }

        let mut battery = false;
        if let Some(king) = self.king_square(color.opposite()) {
            if result.test(king) {
                if let Some(direction) = geometry::direction_from_to(index, king) {
                    if direction.matches(code.kind()) {
                        let line = geometry::ray(king, direction.opposite()).intersection(result);
                        let other_attackers = self
                            .movers_of_class(color, direction.mover_type())
                            .minus(BitBoard::from_square(index));
                        battery = !line.intersection(other_attackers).is_empty();
                    }
                }
            }
        }
        (result, battery)
    }

    // --- blocked-defendables (§4.5) ----------------------------------------

    fn nearest_in_direction(origin: Square, direction: Direction, mask: BitBoard) -> Square {
        if direction.offset() > 0 {
            origin.next_bit_in(mask.bits())
        } else {
            origin.prev_bit_in(mask.bits())
        }
    }

    /// Placing or removing a piece at `index` can unblock (`add == true`) or
    /// block (`add == false`) up to eight sliders, one per ray away from
    /// `index`. For each affected ray this walks outward through any chain
    /// of further same-mover-class own sliders ("batteries"), updating
    /// `defended` and `king_battery_attack_count` for each.
    fn update_blocked_defendables(&mut self, code: Code, index: Square, add: bool) {
        let all_pieces = self.occupied();
        for direction in Direction::ALL {
            let mover_type = direction.mover_type();
            let mut candidate_movers =
                self.rook_movers_of(Color::WHITE) | self.rook_movers_of(Color::BLACK);
            if mover_type == Type::BISHOP {
                candidate_movers =
                    self.bishop_movers_of(Color::WHITE) | self.bishop_movers_of(Color::BLACK);
            }
            if code.is_slider() && direction.matches(code.kind()) {
                candidate_movers = candidate_movers.minus(self.movers_of_class(code.color(), mover_type));
            }
            let line = geometry::ray(index, direction).intersection(all_pieces);
            let blocked = Self::nearest_in_direction(index, direction, line);
            if !blocked.is_valid() || !candidate_movers.test(blocked) {
                continue;
            }
            let blocked_color = self.board[blocked.as_usize()].code.color();
            let same_color_movers = self.movers_of_class(blocked_color, mover_type);
            let opposite = direction.opposite();
            let opposite_line = geometry::ray(index, opposite);
            let non_see_through = all_pieces.minus(same_color_movers).intersection(opposite_line);
            let nearest_blocker = Self::nearest_in_direction(index, opposite, non_see_through);
            let mut changed = opposite_line;
            if nearest_blocker.is_valid() {
                changed = changed.minus(geometry::ray(nearest_blocker, opposite));
            }
            if changed.is_empty() {
                continue;
            }

            let enemy_king = self.king_square(blocked_color.opposite());
            let reaches_enemy_king = enemy_king.is_some_and(|k| changed.test(k));

            let on_ray = geometry::ray(index, direction).intersection(all_pieces);
            let mut cursor = blocked;
            let mut is_first = true;
            loop {
                let color_index = blocked_color.index() as usize;
                if add {
                    self.defended[color_index].add(changed);
                } else {
                    self.defended[color_index].sub(changed);
                }
                if reaches_enemy_king && !is_first {
                    if add {
                        self.king_battery[color_index] += 1;
                    } else {
                        self.king_battery[color_index] -= 1;
                    }
                }
                let next = Self::nearest_in_direction(cursor, direction, on_ray);
                if !next.is_valid() || !same_color_movers.test(next) {
                    break;
                }
                cursor = next;
                is_first = false;
            }
        }
    }

    // --- pin recomputation (§4.4 step 5) ------------------------------------

    /// Fully recomputes `attackers`/`pinning` for both colors from their
    /// declarative definitions (§3, points 2-3), rather than patching them
    /// incrementally through the six-case decision table the reference
    /// implementation uses. See `DESIGN.md` for why.
    fn recompute_attackers_and_pinning(&mut self) {
        self.en_passant.reset_pinned();
        for &color in &[Color::BLACK, Color::WHITE] {
            let color_index = color.index() as usize;
            self.attackers[color_index] = BitBoard::EMPTY;
            self.pinning[color_index] = BitBoard::EMPTY;
            let Some(king) = self.king_square(color) else {
                continue;
            };
            let enemy = color.opposite();
            for direction in Direction::ALL {
                let enemy_sliders = self
                    .movers_of_class(enemy, direction.mover_type())
                    .intersection(geometry::ray(king, direction));
                let mut cursor = Square::PRE_BEGIN;
                loop {
                    cursor = Self::nearest_in_direction(cursor, direction, enemy_sliders);
                    if !cursor.is_valid() {
                        break;
                    }
                    self.attackers[color_index] |= geometry::squares_from_to(cursor, king);
                }
                self.update_pinning_ray(color, king, direction);
            }
        }
    }

    /// Walks one ray away from `king`, looking for a pinned own piece
    /// followed by an aligned enemy slider. Special-cases the horizontal
    /// en-passant pin (§4.4, last paragraph).
    fn update_pinning_ray(&mut self, color: Color, king: Square, direction: Direction) {
        let mut first: Option<Square> = None;
        let mut taking_en_passant_not_allowed = false;
        let mut current = king;
        loop {
            let Some(next) = geometry::step(direction, current) else {
                break;
            };
            current = next;
            let occupant = self.board[current.as_usize()].code;
            if occupant.is_nothing() {
                continue;
            }
            match first {
                None => {
                    if occupant.color() == color {
                        first = Some(current);
                    } else if direction.is_horizontal()
                        && self.en_passant.exists()
                        && self.en_passant.pawn_index() == current
                        && occupant.is_a(Type::PAWN)
                    {
                        // The first piece met is the en-passant victim pawn:
                        // keep scanning to see if capturing it en passant
                        // would expose the king.
                        taking_en_passant_not_allowed = true;
                        first = Some(current);
                    } else {
                        break;
                    }
                }
                Some(_first_square) => {
                    if occupant.color() != color && direction.matches(occupant.kind()) {
                        if taking_en_passant_not_allowed {
                            if color == self.to_move {
                                self.en_passant.set_pinned();
                            }
                        } else {
                            self.pinning[color.index() as usize] |=
                                geometry::squares_from_to(current, king);
                        }
                    }
                    break;
                }
            }
        }
    }

    fn recompute_check_state(&mut self) {
        for &color in &[Color::BLACK, Color::WHITE] {
            let enemy = color.opposite();
            let in_check = self
                .king_square(color)
                .is_some_and(|k| self.defended_count(enemy, k) > 0);
            self.castle.set_check(color, in_check);
        }
        let enemy = self.to_move.opposite();
        self.double_check = self.castle.in_check(self.to_move)
            && self.king_square(self.to_move).is_some_and(|king| {
                let count = i16::from(self.defended_count(enemy, king));
                let battery = i16::from(self.king_battery[enemy.index() as usize]);
                count - battery > 1
            });
    }

    // --- pawn flags ----------------------------------------------------------

    fn recompute_pawn_flags(&mut self, index: Square) {
        let piece = self.board[index.as_usize()];
        if !piece.code.is_a(Type::PAWN) {
            return;
        }
        let color = piece.code.color();
        let forward: i8 = color.forward_offset() * 8;
        let forward1 = index.offset(forward);
        let mut flags = Flags::empty();
        if forward1.is_valid() && self.board[forward1.as_usize()].code.is_nothing() {
            flags |= Flags::IS_NOT_BLOCKED;
            let start_rank = if color.is_white() { 1 } else { 6 };
            if index.row() == start_rank {
                let forward2 = forward1.offset(forward);
                if forward2.is_valid() && self.board[forward2.as_usize()].code.is_nothing() {
                    flags |= Flags::CAN_MOVE_TWO_SQUARES;
                }
            }
        }
        if index.col() > 0 {
            let target = forward1.offset(-1);
            if self.is_enemy_or_ep_target(color, target) {
                flags |= Flags::CAN_TAKE_QUEEN_SIDE;
            }
        }
        if index.col() < 7 {
            let target = forward1.offset(1);
            if self.is_enemy_or_ep_target(color, target) {
                flags |= Flags::CAN_TAKE_KING_SIDE;
            }
        }
        self.board[index.as_usize()].flags = flags;
    }

    fn is_enemy_or_ep_target(&self, color: Color, target: Square) -> bool {
        if !target.is_valid() {
            return false;
        }
        if self.en_passant.exists() && self.en_passant.index() == target {
            return true;
        }
        let occupant = self.board[target.as_usize()].code;
        !occupant.is_nothing() && occupant.color() != color
    }

    /// Re-derives the blocked/take-side flags of the (up to three) pawns
    /// adjacent to `index` on the row behind them, called whenever `index`
    /// changes occupancy.
    fn touch_neighbouring_pawns(&mut self, index: Square) {
        for &color in &[Color::BLACK, Color::WHITE] {
            let back: i8 = -color.forward_offset() * 8;
            let origin = index.offset(back);
            if !origin.is_valid() || origin.row() >= 8 {
                continue;
            }
            for delta in [-1i8, 0, 1] {
                let col = origin.col() as i8 + delta;
                if !(0..8).contains(&col) {
                    continue;
                }
                let candidate = Square::from_file_rank(col as u8, origin.row());
                if self.board[candidate.as_usize()].code == Code::new(color, Type::PAWN) {
                    self.recompute_pawn_flags(candidate);
                }
            }
        }
    }

    // --- placement (§4.4) ----------------------------------------------------

    /// Replaces the occupant of `index` with `code`, updating every derived
    /// index in one pass. Returns `false` (without mutating anything) when
    /// the placement is rejected: a pawn on rank 1/8, or a second king of a
    /// color already on the board. Placing the same code that is already on
    /// `index` is a deliberate no-op that preserves en-passant state.
    pub fn place(&mut self, code: Code, index: Square) -> bool {
        if code.is_a(Type::PAWN) && (index.row() == 0 || index.row() == 7) {
            return false;
        }
        let old = self.board[index.as_usize()].code;
        if old == code {
            return true;
        }
        if code.is_a(Type::KING) && !self.by_code[code.as_usize()].is_empty() {
            return false;
        }

        if !old.is_nothing() {
            self.by_code[old.as_usize()].reset(index);
            self.by_color[old.color().index() as usize].reset(index);
            self.castle.piece_moved_from(old, index);
            if self.en_passant.exists() && self.en_passant.pawn_index() == index {
                self.en_passant = EnPassant::none();
            }
            if old.is_a(Type::KING) {
                let color_index = old.color().index() as usize;
                self.attackers[color_index] = BitBoard::EMPTY;
                self.pinning[color_index] = BitBoard::EMPTY;
                self.en_passant.reset_pinned();
                self.king_battery[old.color().opposite().index() as usize] = 0;
            }
            let (old_targets, old_battery) = self.defendables(old, index);
            self.defended[old.color().index() as usize].sub(old_targets);
            if old_battery {
                self.king_battery[old.color().index() as usize] =
                    self.king_battery[old.color().index() as usize].saturating_sub(1);
            }
            self.update_blocked_defendables(old, index, true);
        }

        self.board[index.as_usize()] = Piece::new(code);

        if !code.is_nothing() {
            self.by_code[code.as_usize()].set(index);
            self.by_color[code.color().index() as usize].set(index);
            self.castle.piece_placed_at(code, index);
            if self.en_passant.exists() && self.en_passant.pawn_index() == index {
                self.en_passant = EnPassant::none();
            }
            self.update_blocked_defendables(code, index, false);
            let (targets, battery) = self.defendables(code, index);
            self.defended[code.color().index() as usize].add(targets);
            if battery {
                self.king_battery[code.color().index() as usize] += 1;
            }
        }

        self.touch_neighbouring_pawns(index);
        self.recompute_pawn_flags(index);
        self.recompute_attackers_and_pinning();
        self.recompute_check_state();
        true
    }

    /// Records that the side to move passes without making a move: clears
    /// en-passant, toggles `to_move`, and advances the clocks exactly as
    /// [`Self::execute`] would for a non-pawn, non-capturing move. Returns
    /// `true` if the half-move clock reaches the 50-move-rule threshold.
    pub fn skip_move(&mut self) -> bool {
        self.en_passant = EnPassant::none();
        self.recompute_attackers_and_pinning();
        self.to_move.toggle();
        if self.to_move.is_white() {
            self.fullmove_number += 1;
        }
        self.halfmove_clock += 1;
        self.recompute_check_state();
        self.halfmove_clock >= 100
    }

    /// Mirrors the board across colors in place: every piece's color is
    /// flipped and its square reflected to the opposite rank, the side to
    /// move is toggled, and the full-move number resets to `1` (an
    /// involution up to that reset, per §8).
    pub fn swap_colors(&mut self) {
        let mut pieces: Vec<(Code, Square)> = Vec::new();
        for index in 0..64u8 {
            let square = Square::new(index);
            let code = self.board[square.as_usize()].code;
            if !code.is_nothing() {
                pieces.push((code, square));
            }
        }
        let castle = self.castle;
        let en_passant = self.en_passant;
        self.clear();
        for (code, square) in pieces {
            let mirrored_square = Square::from_file_rank(square.col(), 7 - square.row());
            self.place(code.toggle_color(), mirrored_square);
        }
        if en_passant.exists() {
            let mirrored =
                Square::from_file_rank(en_passant.index().col(), 7 - en_passant.index().row());
            self.en_passant = EnPassant::new(mirrored);
        }
        self.castle = CastleFlags::clear();
        let white_had_rights =
            castle.can_castle_queen_side(Color::WHITE) || castle.can_castle_king_side(Color::WHITE);
        let black_had_rights =
            castle.can_castle_queen_side(Color::BLACK) || castle.can_castle_king_side(Color::BLACK);
        if white_had_rights {
            self.castle
                .piece_placed_at(Code::BLACK_KING, Square::try_from("e8").unwrap());
        }
        if castle.can_castle_queen_side(Color::WHITE) {
            self.castle
                .piece_placed_at(Code::BLACK_ROOK, Square::try_from("a8").unwrap());
        }
        if castle.can_castle_king_side(Color::WHITE) {
            self.castle
                .piece_placed_at(Code::BLACK_ROOK, Square::try_from("h8").unwrap());
        }
        if black_had_rights {
            self.castle
                .piece_placed_at(Code::WHITE_KING, Square::try_from("e1").unwrap());
        }
        if castle.can_castle_queen_side(Color::BLACK) {
            self.castle
                .piece_placed_at(Code::WHITE_ROOK, Square::try_from("a1").unwrap());
        }
        if castle.can_castle_king_side(Color::BLACK) {
            self.castle
                .piece_placed_at(Code::WHITE_ROOK, Square::try_from("h1").unwrap());
        }
        self.to_move = self.to_move.opposite();
        self.fullmove_number = 1;
        self.halfmove_clock = 0;
        self.recompute_attackers_and_pinning();
        self.recompute_check_state();
    }

    // --- legal-move generation (§4.6) -----------------------------------------

    fn reachables(&self, code: Code, index: Square) -> BitBoard {
        let color = code.color();
        match code.kind() {
            Type::NOTHING => BitBoard::EMPTY,
            Type::PAWN => self.pawn_reachables(color, index),
            Type::KNIGHT => {
                geometry::candidates(Type::KNIGHT, index).minus(self.pieces_of_color(color))
            }
            Type::KING => self.king_reachables(color, index),
            _ => {
                let (defendables, _) = self.slider_defendables(code, index);
                defendables.minus(self.pieces_of_color(color))
            }
        }
    }

    fn pawn_reachables(&self, color: Color, index: Square) -> BitBoard {
        let piece = self.board[index.as_usize()];
        let forward: i8 = color.forward_offset() * 8;
        let mut result = BitBoard::EMPTY;
        if piece.flags.contains(Flags::IS_NOT_BLOCKED) {
            result.set(index.offset(forward));
            if piece.flags.contains(Flags::CAN_MOVE_TWO_SQUARES) {
                result.set(index.offset(forward * 2));
            }
        }
        if piece.flags.contains(Flags::CAN_TAKE_QUEEN_SIDE) && index.col() > 0 {
            result.set(index.offset(forward - 1));
        }
        if piece.flags.contains(Flags::CAN_TAKE_KING_SIDE) && index.col() < 7 {
            result.set(index.offset(forward + 1));
        }
        result
    }

    fn king_reachables(&self, color: Color, index: Square) -> BitBoard {
        let mut result = geometry::candidates(Type::KING, index).minus(self.pieces_of_color(color));
        if self.castle.in_check(color) {
            return result;
        }
        let enemy = color.opposite();
        let home = index;
        if self.castle.can_castle_king_side(color) {
            let f = home.offset(1);
            let g = home.offset(2);
            let h = home.offset(3);
            if self.board[f.as_usize()].code.is_nothing()
                && self.board[g.as_usize()].code.is_nothing()
                && self.board[h.as_usize()].code == Code::new(color, Type::ROOK)
                && self.defended_count(enemy, home) == 0
                && self.defended_count(enemy, f) == 0
                && self.defended_count(enemy, g) == 0
            {
                result.set(g);
            }
        }
        if self.castle.can_castle_queen_side(color) {
            let d = home.offset(-1);
            let c = home.offset(-2);
            let b = home.offset(-3);
            let a = home.offset(-4);
            if self.board[d.as_usize()].code.is_nothing()
                && self.board[c.as_usize()].code.is_nothing()
                && self.board[b.as_usize()].code.is_nothing()
                && self.board[a.as_usize()].code == Code::new(color, Type::ROOK)
                && self.defended_count(enemy, home) == 0
                && self.defended_count(enemy, d) == 0
                && self.defended_count(enemy, c) == 0
            {
                result.set(c);
            }
        }
        result
    }

    /// The legal destination squares for the piece standing on `index`.
    /// Empty if `index` is unoccupied.
    #[must_use]
    pub fn moves(&self, index: Square) -> BitBoard {
        let code = self.board[index.as_usize()].code;
        if code.is_nothing() {
            return BitBoard::EMPTY;
        }
        let color = code.color();
        let mut result = self.reachables(code, index);

        if color == self.to_move && self.castle.in_check(color) {
            let enemy = color.opposite();
            if self.double_check {
                if !code.is_a(Type::KING) {
                    return BitBoard::EMPTY;
                }
                if let Some(king) = self.king_square(color) {
                    result = result.minus(self.king_check_exclusion(king, enemy));
                }
            } else {
                let Some(king) = self.king_square(color) else {
                    return BitBoard::EMPTY;
                };
                if code.is_a(Type::KING) {
                    result = result.minus(self.king_check_exclusion(king, enemy));
                } else if let Some(attacker_squares) = self.single_attacker_squares(king, enemy) {
                    result &= attacker_squares;
                }
            }
        }

        if self.pinning[color.index() as usize].test(index) {
            if let Some(king) = self.king_square(color) {
                if let Some(direction) = geometry::direction_from_to(king, index) {
                    if code.is_a(Type::PAWN) {
                        result &= geometry::ray(king, direction);
                    } else {
                        result &= geometry::ray(king, direction)
                            .union(geometry::ray(index, direction.opposite()));
                    }
                }
            }
        }

        if self.en_passant.exists() && self.en_passant.pinned() && code.is_a(Type::PAWN) {
            result.reset(self.en_passant.index());
        }

        if code.is_a(Type::KING) {
            let enemy = color.opposite();
            let mut safe = BitBoard::EMPTY;
            let mut cursor = Square::PRE_BEGIN;
            loop {
                cursor = cursor.next_bit_in(result.bits());
                if cursor == Square::END {
                    break;
                }
                if self.defended_count(enemy, cursor) == 0 {
                    safe.set(cursor);
                }
            }
            result = safe;
        }

        result
    }

    /// For a single (non-double) check: the ray from the checking piece to
    /// the king, inclusive of the attacker, for sliders; the single attacker
    /// square for knights and pawns.
    fn single_attacker_squares(&self, king: Square, attacker_color: Color) -> Option<BitBoard> {
        if let Some((attacker, Some(_))) = self.single_attacker_with_direction(king, attacker_color) {
            return Some(geometry::squares_from_to(attacker, king));
        }
        let knight_attacker = geometry::candidates(Type::KNIGHT, king)
            .intersection(self.by_code[Code::new(attacker_color, Type::KNIGHT).as_usize()]);
        if !knight_attacker.is_empty() {
            return Some(knight_attacker);
        }
        let pawn_attacker = self
            .pawn_defendables(attacker_color.opposite(), king)
            .intersection(self.by_code[Code::new(attacker_color, Type::PAWN).as_usize()]);
        if !pawn_attacker.is_empty() {
            return Some(pawn_attacker);
        }
        None
    }

    fn single_attacker_with_direction(
        &self,
        king: Square,
        attacker_color: Color,
    ) -> Option<(Square, Option<Direction>)> {
        for direction in Direction::ALL {
            let sliders = self
                .movers_of_class(attacker_color, direction.mover_type())
                .intersection(geometry::ray(king, direction));
            let occupied_on_ray = self.occupied().intersection(geometry::ray(king, direction));
            let nearest = Self::nearest_in_direction(king, direction, occupied_on_ray);
            if nearest.is_valid() && sliders.test(nearest) {
                return Some((nearest, Some(direction)));
            }
        }
        None
    }

    /// Squares the king may not step to while in check: the attacker squares
    /// plus, for every slider giving check, the square one step beyond the
    /// king along that slider's ray (the king's own square blocks the
    /// defended-count x-ray, so stepping there would still be exactly as
    /// attacked as the king's current square). Walks every direction rather
    /// than stopping at the first slider found, since double check can have
    /// two simultaneous slider checkers.
    fn king_check_exclusion(&self, king: Square, attacker_color: Color) -> BitBoard {
        let mut excluded = BitBoard::EMPTY;
        for direction in Direction::ALL {
            let sliders = self
                .movers_of_class(attacker_color, direction.mover_type())
                .intersection(geometry::ray(king, direction));
            let occupied_on_ray = self.occupied().intersection(geometry::ray(king, direction));
            let nearest = Self::nearest_in_direction(king, direction, occupied_on_ray);
            if nearest.is_valid() && sliders.test(nearest) {
                excluded |= geometry::squares_from_to(nearest, king);
                if let Some(beyond) = geometry::step(direction.opposite(), king) {
                    excluded.set(beyond);
                }
            }
        }
        excluded
    }

    /// `from`/`to` in range, `from` holds a piece of [`Self::to_move`],
    /// promotion is set iff reaching the back rank and is one of
    /// queen/rook/bishop/knight, and `to` is a member of `moves(from)`.
    #[must_use]
    pub fn legal(&self, mv: Move) -> bool {
        if !mv.from.is_valid() || !mv.to.is_valid() {
            return false;
        }
        let piece = self.board[mv.from.as_usize()].code;
        if piece.is_nothing() || piece.color() != self.to_move {
            return false;
        }
        let reaches_back_rank = piece.is_a(Type::PAWN) && (mv.to.row() == 0 || mv.to.row() == 7);
        match mv.promotion {
            Some(kind) => {
                if !reaches_back_rank
                    || !matches!(kind, Type::QUEEN | Type::ROOK | Type::BISHOP | Type::KNIGHT)
                {
                    return false;
                }
            }
            None => {
                if reaches_back_rank {
                    return false;
                }
            }
        }
        self.moves(mv.from).test(mv.to)
    }

    /// Executes `mv`, assumed legal. Returns `true` if the half-move clock
    /// reaches the 50-move-rule threshold of 100.
    pub fn execute(&mut self, mv: Move) -> bool {
        let piece = self.board[mv.from.as_usize()].code;
        let color = piece.color();
        let is_pawn = piece.is_a(Type::PAWN);
        let is_capture = !self.board[mv.to.as_usize()].code.is_nothing();

        let en_passant_capture = is_pawn
            && self.en_passant.exists()
            && self.en_passant.index() == mv.to
            && mv.from.col() != mv.to.col();
        if en_passant_capture {
            self.place(Code::NOTHING, self.en_passant.pawn_index());
        }

        let row_delta = i16::from(mv.to.as_u8()) - i16::from(mv.from.as_u8());
        let is_two_square_advance = is_pawn && mv.from.col() == mv.to.col() && row_delta.abs() == 16;

        let new_code = match mv.promotion {
            Some(kind) => Code::new(color, kind),
            None => piece,
        };

        self.place(Code::NOTHING, mv.from);
        self.place(new_code, mv.to);

        let is_castling =
            piece.is_a(Type::KING) && (i16::from(mv.to.col()) - i16::from(mv.from.col())).abs() == 2;
        if is_castling {
            let king_side = mv.to.col() > mv.from.col();
            let rank = mv.from.row();
            let (rook_from_col, rook_to_col) = if king_side { (7, 5) } else { (0, 3) };
            let rook_from = Square::from_file_rank(rook_from_col, rank);
            let rook_to = Square::from_file_rank(rook_to_col, rank);
            let rook = self.board[rook_from.as_usize()].code;
            self.place(Code::NOTHING, rook_from);
            self.place(rook, rook_to);
        }

        self.en_passant = EnPassant::none();
        if is_two_square_advance {
            let passed = Square::new((mv.from.as_u8() + mv.to.as_u8()) / 2);
            self.en_passant = EnPassant::new(passed);
        }

        self.recompute_attackers_and_pinning();
        self.to_move.toggle();
        if self.to_move.is_white() {
            self.fullmove_number += 1;
        }
        self.recompute_check_state();

        if is_pawn || is_capture {
            self.halfmove_clock = 0;
        } else {
            self.halfmove_clock += 1;
        }
        self.halfmove_clock >= 100
    }

    // --- FEN (§6.1) ------------------------------------------------------------

    /// Parses a position from Forsyth-Edwards Notation. Any structural
    /// deviation fails the whole load; the caller should load into a
    /// temporary and copy only on success.
    pub fn from_fen(fen: &str) -> anyhow::Result<Self> {
        let mut fields = fen.split_whitespace();
        let placement = fields
            .next()
            .context("FEN is missing the piece placement field")?;
        let active_color = fields.next().context("FEN is missing the active color field")?;
        let castling = fields.next().context("FEN is missing the castling field")?;
        let en_passant_field = fields
            .next()
            .context("FEN is missing the en-passant field")?;
        let halfmove = fields
            .next()
            .context("FEN is missing the half-move clock field")?;
        let fullmove = fields
            .next()
            .context("FEN is missing the full-move number field")?;
        if fields.next().is_some() {
            bail!("FEN has more than six fields");
        }

        let mut position = Self::empty();
        let ranks: Vec<&str> = placement.split('/').collect();
        if ranks.len() != 8 {
            bail!("FEN piece placement must have 8 ranks, got {}", ranks.len());
        }
        for (rank_from_top, row) in ranks.iter().enumerate() {
            let rank = 7 - rank_from_top as u8;
            let mut col = 0u8;
            for symbol in row.chars() {
                if let Some(run) = symbol.to_digit(10) {
                    if !(1..=8).contains(&run) {
                        bail!("invalid empty-square run {run} in FEN rank {row:?}");
                    }
                    col += run as u8;
                } else {
                    let code = Code::try_from(symbol)
                        .with_context(|| format!("invalid piece symbol {symbol:?} in FEN"))?;
                    if col >= 8 {
                        bail!("FEN rank {row:?} overflows 8 columns");
                    }
                    let square = Square::from_file_rank(col, rank);
                    if !position.place(code, square) {
                        bail!("FEN placement of {symbol:?} at {square} was rejected");
                    }
                    col += 1;
                }
            }
            if col != 8 {
                bail!("FEN rank {row:?} does not sum to 8 columns, got {col}");
            }
        }
        if position.king_square(Color::WHITE).is_none() {
            bail!("FEN does not place a white king");
        }
        if position.king_square(Color::BLACK).is_none() {
            bail!("FEN does not place a black king");
        }

        if active_color.chars().count() != 1 {
            bail!("FEN active color field must be a single character");
        }
        position.to_move = Color::try_from(active_color.chars().next().unwrap())?;

        position.castle = CastleFlags::clear();
        if castling != "-" {
            for flag in castling.chars() {
                match flag {
                    'K' => position
                        .castle
                        .piece_placed_at(Code::WHITE_ROOK, Square::try_from("h1")?),
                    'Q' => position
                        .castle
                        .piece_placed_at(Code::WHITE_ROOK, Square::try_from("a1")?),
                    'k' => position
                        .castle
                        .piece_placed_at(Code::BLACK_ROOK, Square::try_from("h8")?),
                    'q' => position
                        .castle
                        .piece_placed_at(Code::BLACK_ROOK, Square::try_from("a8")?),
                    other => bail!("invalid castling flag {other:?} in FEN"),
                }
            }
        }

        if en_passant_field != "-" {
            let target = Square::try_from(en_passant_field)?;
            let expected_rank = if position.to_move.is_white() { 5 } else { 2 };
            if target.row() != expected_rank {
                bail!("en-passant target {en_passant_field:?} is not on the expected rank");
            }
            position.en_passant = EnPassant::new(target);
        }

        position.halfmove_clock = halfmove
            .parse()
            .with_context(|| format!("invalid half-move clock {halfmove:?}"))?;
        position.fullmove_number = fullmove
            .parse()
            .with_context(|| format!("invalid full-move number {fullmove:?}"))?;
        if position.fullmove_number == 0 {
            bail!("full-move number must be positive");
        }

        position.recompute_attackers_and_pinning();
        position.recompute_check_state();
        Ok(position)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rank in (0..8u8).rev() {
            let mut empty_run = 0u8;
            for col in 0..8u8 {
                let square = Square::from_file_rank(col, rank);
                let code = self.board[square.as_usize()].code;
                match code.algebraic_symbol() {
                    None => empty_run += 1,
                    Some(symbol) => {
                        if empty_run > 0 {
                            write!(f, "{empty_run}")?;
                            empty_run = 0;
                        }
                        write!(f, "{symbol}")?;
                    }
                }
            }
            if empty_run > 0 {
                write!(f, "{empty_run}")?;
            }
            if rank > 0 {
                write!(f, "/")?;
            }
        }
        write!(f, " {}", self.to_move)?;

        write!(f, " ")?;
        let mut any_castle = false;
        for (flag, rook_home) in [
            (self.castle.can_castle_king_side(Color::WHITE), 'K'),
            (self.castle.can_castle_queen_side(Color::WHITE), 'Q'),
            (self.castle.can_castle_king_side(Color::BLACK), 'k'),
            (self.castle.can_castle_queen_side(Color::BLACK), 'q'),
        ] {
            if flag {
                write!(f, "{rook_home}")?;
                any_castle = true;
            }
        }
        if !any_castle {
            write!(f, "-")?;
        }

        write!(f, " ")?;
        if self.en_passant.exists() {
            write!(f, "{}", self.en_passant.index())?;
        } else {
            write!(f, "-")?;
        }

        write!(f, " {} {}", self.halfmove_clock, self.fullmove_number)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn sq(s: &str) -> Square {
        Square::try_from(s).unwrap()
    }

    #[test]
    fn initial_position_round_trips_through_fen() {
        let position = Position::initial_position();
        assert_eq!(
            position.to_string(),
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"
        );
    }

    #[test]
    fn initial_position_has_twenty_legal_moves_for_white() {
        let position = Position::initial_position();
        let mut total = 0usize;
        let mut cursor = Square::PRE_BEGIN;
        let pieces = position.pieces_of_color(Color::WHITE);
        loop {
            cursor = cursor.next_bit_in(pieces.bits());
            if cursor == Square::END {
                break;
            }
            total += position.moves(cursor).count() as usize;
        }
        assert_eq!(total, 20);
    }

    #[test]
    fn place_rejects_pawn_on_back_rank() {
        let mut position = Position::empty();
        assert!(!position.place(Code::WHITE_PAWN, sq("e8")));
    }

    #[test]
    fn place_rejects_second_king_of_same_color() {
        let mut position = Position::empty();
        assert!(position.place(Code::WHITE_KING, sq("e1")));
        assert!(!position.place(Code::WHITE_KING, sq("e4")));
    }

    #[test]
    fn placing_same_code_is_a_no_op_preserving_en_passant() {
        let mut position =
            Position::from_fen("rnbqkbnr/pp1ppppp/8/2p5/8/8/PPPPPPPP/RNBQKBNR w KQkq c6 0 2")
                .unwrap();
        let before = position.en_passant();
        assert!(position.place(Code::BLACK_PAWN, sq("c5")));
        assert_eq!(position.en_passant(), before);
    }

    #[test]
    fn execute_e4_updates_fen_and_en_passant() {
        let mut position = Position::initial_position();
        assert!(position.legal(Move::new(sq("e2"), sq("e4"))));
        position.execute(Move::new(sq("e2"), sq("e4")));
        assert!(position.to_string().ends_with("e3 0 1"));

        assert!(position.legal(Move::new(sq("c7"), sq("c5"))));
        position.execute(Move::new(sq("c7"), sq("c5")));
        assert!(position.to_string().ends_with("c6 0 2"));

        position.execute(Move::new(sq("g1"), sq("f3")));
        assert_eq!(position.halfmove_clock(), 1);
        assert!(!position.en_passant().exists());
    }

    #[test]
    fn check_restricts_black_to_king_moves_and_blocks() {
        let position = Position::from_fen("6K1/8/4N3/8/3q4/8/4p3/R4k2 b - - 0 1").unwrap();
        assert!(position.in_check(Color::BLACK));
        assert!(!position.double_check());
        assert!(position.moves(sq("d4")).count() > 0);
    }

    #[test]
    fn en_passant_pin_along_fifth_rank_forbids_the_capture() {
        let position =
            Position::from_fen("7r/r6p/1p2p3/pPp1Pp1k/R1Pp1PpP/1P1P2P1/2KBB1R1/8 b - h3 0 2")
                .unwrap();
        assert!(!position.moves(sq("g4")).test(sq("h3")));
    }

    #[test]
    fn pinned_bishop_restricts_white_moves_in_check() {
        let position = Position::from_fen("k7/8/2P5/b7/8/8/1P5q/R3K3 b Q - 0 1").unwrap();
        assert!(position.in_check(Color::BLACK));
    }

    #[test]
    #[should_panic(expected = "unwrap")]
    fn from_fen_fails_without_a_white_king() {
        Position::from_fen("8/8/8/8/8/8/8/4k3 w - - 0 1").unwrap();
    }

    #[test]
    #[should_panic(expected = "unwrap")]
    fn from_fen_fails_without_a_black_king() {
        Position::from_fen("4K3/8/8/8/8/8/8/8 w - - 0 1").unwrap();
    }

    #[test]
    fn swap_colors_mirrors_castling_rights_including_the_king() {
        let mut position = Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQ - 0 1").unwrap();
        position.swap_colors();
        assert!(position.castle_rights().can_castle_king_side(Color::BLACK));
        assert!(position.castle_rights().can_castle_queen_side(Color::BLACK));
        assert!(!position.castle_rights().can_castle_king_side(Color::WHITE));
        assert!(!position.castle_rights().can_castle_queen_side(Color::WHITE));
        assert_eq!(position.to_move(), Color::BLACK);
    }

    #[test]
    fn swap_colors_is_an_involution_up_to_move_counters() {
        let mut position =
            Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        let before = position.to_string();
        position.swap_colors();
        position.swap_colors();
        assert_eq!(position.to_string(), before);
    }

    #[test]
    fn skip_move_toggles_side_and_clears_en_passant() {
        let mut position = Position::initial_position();
        position.execute(Move::new(sq("e2"), sq("e4")));
        assert!(position.en_passant().exists());
        let halfmove_before = position.halfmove_clock();
        position.skip_move();
        assert_eq!(position.to_move(), Color::WHITE);
        assert!(!position.en_passant().exists());
        assert_eq!(position.halfmove_clock(), halfmove_before + 1);
    }

    #[test]
    fn double_check_excludes_the_square_behind_the_king_on_every_checking_ray() {
        // White king e4 is in check from both a rook on the open e-file and
        // a bishop on the a8-h1 diagonal: a double check with two
        // simultaneous sliders. The king must not be offered e3 (behind it
        // on the rook's ray) or f3 (behind it on the bishop's ray), even
        // though the king's own square blocks the defended-count filter
        // from seeing either square as attacked.
        let position = Position::from_fen("b3r2k/8/8/8/4K3/8/8/8 w - - 0 1").unwrap();
        assert!(position.in_check(Color::WHITE));
        assert!(position.double_check());
        let king = position.king_square(Color::WHITE).unwrap();
        let moves = position.moves(king);
        assert!(!moves.test(sq("e3")));
        assert!(!moves.test(sq("f3")));
        assert!(moves.test(sq("d3")));
        assert!(moves.test(sq("d4")));
        assert!(moves.test(sq("f4")));
        assert!(moves.test(sq("f5")));
    }
}
