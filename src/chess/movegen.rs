//! Read-only iteration over a [`Position`]: [`PieceIterator`] walks a
//! bit-board of squares of interest, [`MoveIterator`] walks the legal
//! destinations of a single square, expanding promotions.

use arrayvec::ArrayVec;

use super::bitboard::BitBoard;
use super::core::{Square, Type};
use super::piece::Piece;
use super::position::{Move, Position};

/// The four promotion types a pawn reaching the back rank may become,
/// queen first: the order forward iteration emits them in (reversed for
/// backward iteration).
const PROMOTIONS: [Type; 4] = [Type::QUEEN, Type::ROOK, Type::BISHOP, Type::KNIGHT];

/// No chess position has ever been found with more legal moves than this;
/// generous enough to never truncate in practice, tight enough to stay a
/// stack allocation.
const MAX_LEGAL_MOVES: usize = 256;

/// Collects every legal move for the side to move into a fixed-capacity,
/// heap-free buffer by chaining a [`MoveIterator`] per own piece.
#[must_use]
pub fn legal_moves(position: &Position) -> ArrayVec<Move, MAX_LEGAL_MOVES> {
    let mut moves = ArrayVec::new();
    for (square, _) in PieceIterator::new(position, position.pieces_of_color(position.to_move())) {
        for mv in MoveIterator::new(position, square) {
            if moves.try_push(mv).is_err() {
                break;
            }
        }
    }
    moves
}

/// Walks the set bits of a bit-board from either end, dereferencing each to
/// the [`Piece`] standing there. Read-only: it never mutates the position it
/// borrows.
#[derive(Clone)]
pub struct PieceIterator<'a> {
    position: &'a Position,
    remaining: BitBoard,
}

impl<'a> PieceIterator<'a> {
    #[must_use]
    pub const fn new(position: &'a Position, squares: BitBoard) -> Self {
        Self {
            position,
            remaining: squares,
        }
    }
}

impl Iterator for PieceIterator<'_> {
    type Item = (Square, Piece);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining.is_empty() {
            return None;
        }
        let square = self.remaining.first();
        self.remaining.reset(square);
        Some((square, self.position.piece_at(square)))
    }
}

impl DoubleEndedIterator for PieceIterator<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining.is_empty() {
            return None;
        }
        let square = self.remaining.last();
        self.remaining.reset(square);
        Some((square, self.position.piece_at(square)))
    }
}

/// Walks the legal destinations of the piece on `from`, computed once up
/// front via [`Position::moves`]. A pawn move landing on rank 1 or 8 expands
/// into four [`Move`]s, one per promotion type.
#[derive(Clone)]
pub struct MoveIterator<'a> {
    from: Square,
    promotes: bool,
    remaining: BitBoard,
    front: Option<(Square, usize)>,
    back: Option<(Square, usize)>,
    _position: std::marker::PhantomData<&'a Position>,
}

impl<'a> MoveIterator<'a> {
    #[must_use]
    pub fn new(position: &'a Position, from: Square) -> Self {
        let piece = position.piece_at(from);
        let color = piece.code.color();
        let promotes = piece.code.is_a(Type::PAWN)
            && ((color.is_white() && from.row() == 6) || (color.is_black() && from.row() == 1));
        Self {
            from,
            promotes,
            remaining: position.moves(from),
            front: None,
            back: None,
            _position: std::marker::PhantomData,
        }
    }
}

impl Iterator for MoveIterator<'_> {
    type Item = Move;

    fn next(&mut self) -> Option<Move> {
        loop {
            if let Some((square, index)) = self.front {
                if !self.promotes {
                    self.front = None;
                    return Some(Move::new(self.from, square));
                }
                if index < PROMOTIONS.len() {
                    self.front = Some((square, index + 1));
                    return Some(Move::promoting(self.from, square, PROMOTIONS[index]));
                }
                self.front = None;
                continue;
            }
            if self.remaining.is_empty() {
                return None;
            }
            let square = self.remaining.first();
            self.remaining.reset(square);
            self.front = Some((square, 0));
        }
    }
}

impl DoubleEndedIterator for MoveIterator<'_> {
    fn next_back(&mut self) -> Option<Move> {
        loop {
            if let Some((square, index)) = self.back {
                if !self.promotes {
                    self.back = None;
                    return Some(Move::new(self.from, square));
                }
                if index > 0 {
                    let kind = PROMOTIONS[index - 1];
                    self.back = (index > 1).then_some((square, index - 1));
                    return Some(Move::promoting(self.from, square, kind));
                }
                self.back = None;
                continue;
            }
            if self.remaining.is_empty() {
                return None;
            }
            let square = self.remaining.last();
            self.remaining.reset(square);
            self.back = Some((square, PROMOTIONS.len()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chess::core::Color;

    #[test]
    fn legal_moves_from_initial_position_counts_twenty() {
        let position = Position::initial_position();
        assert_eq!(legal_moves(&position).len(), 20);
    }

    #[test]
    fn piece_iterator_walks_every_set_square_once() {
        let position = Position::initial_position();
        let white = position.pieces_of_color(Color::WHITE);
        let visited: Vec<Square> = PieceIterator::new(&position, white)
            .map(|(square, _)| square)
            .collect();
        assert_eq!(visited.len(), 16);
    }

    #[test]
    fn piece_iterator_forward_and_backward_agree_on_count() {
        let position = Position::initial_position();
        let occupied = position.occupied();
        let forward = PieceIterator::new(&position, occupied).count();
        let backward = PieceIterator::new(&position, occupied).rev().count();
        assert_eq!(forward, backward);
        assert_eq!(forward, 32);
    }

    #[test]
    fn move_iterator_expands_promotions_into_four_moves() {
        let position =
            Position::from_fen("8/4P2k/8/8/8/8/7K/8 w - - 0 1").expect("valid test FEN");
        let e7 = Square::try_from("e7").unwrap();
        let promotions: Vec<Type> = MoveIterator::new(&position, e7)
            .filter_map(|mv| mv.promotion)
            .collect();
        assert_eq!(
            promotions,
            vec![Type::QUEEN, Type::ROOK, Type::BISHOP, Type::KNIGHT]
        );
    }

    #[test]
    fn move_iterator_backward_reverses_promotion_order() {
        let position =
            Position::from_fen("8/4P2k/8/8/8/8/7K/8 w - - 0 1").expect("valid test FEN");
        let e7 = Square::try_from("e7").unwrap();
        let promotions: Vec<Type> = MoveIterator::new(&position, e7)
            .rev()
            .filter_map(|mv| mv.promotion)
            .collect();
        assert_eq!(
            promotions,
            vec![Type::KNIGHT, Type::BISHOP, Type::ROOK, Type::QUEEN]
        );
    }

    #[test]
    fn move_iterator_on_non_promoting_pawn_yields_plain_moves() {
        let position = Position::initial_position();
        let e2 = Square::try_from("e2").unwrap();
        let moves: Vec<Move> = MoveIterator::new(&position, e2).collect();
        assert_eq!(moves.len(), 2);
        assert!(moves.iter().all(|mv| mv.promotion.is_none()));
    }
}
