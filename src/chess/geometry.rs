//! Direction and geometry tables: compile-time-shaped but lazily
//! initialized once behind [`OnceLock`], then read without recomputation
//! for the remainder of the process — this is the only process-wide global
//! state in the crate (§5/§9 of the design notes).

use std::sync::OnceLock;

use super::bitboard::BitBoard;
use super::core::{Square, Type};

/// One of the eight compass directions a slider can move along.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Direction {
    SouthWest,
    South,
    SouthEast,
    West,
    East,
    NorthWest,
    North,
    NorthEast,
}

impl Direction {
    pub const ALL: [Self; 8] = [
        Self::SouthWest,
        Self::South,
        Self::SouthEast,
        Self::West,
        Self::East,
        Self::NorthWest,
        Self::North,
        Self::NorthEast,
    ];

    /// Signed index delta per single step in this direction.
    #[must_use]
    pub const fn offset(self) -> i8 {
        match self {
            Self::SouthWest => -9,
            Self::South => -8,
            Self::SouthEast => -7,
            Self::West => -1,
            Self::East => 1,
            Self::NorthWest => 7,
            Self::North => 8,
            Self::NorthEast => 9,
        }
    }

    /// Horizontal distance in squares covered per step: `1` for east/west
    /// and both diagonals, `8` for north/south.
    #[must_use]
    pub const fn shift(self) -> u8 {
        match self {
            Self::South | Self::North => 8,
            _ => 1,
        }
    }

    #[must_use]
    pub const fn is_horizontal(self) -> bool {
        matches!(self, Self::West | Self::East)
    }

    /// The `Type` bits a piece needs to be able to move along this
    /// direction: rook-bits for the four orthogonals, bishop-bits for the
    /// four diagonals.
    #[must_use]
    pub const fn mover_type(self) -> Type {
        match self {
            Self::South | Self::West | Self::East | Self::North => Type::ROOK,
            Self::SouthWest | Self::SouthEast | Self::NorthWest | Self::NorthEast => Type::BISHOP,
        }
    }

    #[must_use]
    pub const fn matches(self, mover: Type) -> bool {
        if self.mover_type().is_rook_mover() {
            mover.is_rook_mover()
        } else {
            mover.is_bishop_mover()
        }
    }

    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::SouthWest => Self::NorthEast,
            Self::South => Self::North,
            Self::SouthEast => Self::NorthWest,
            Self::West => Self::East,
            Self::East => Self::West,
            Self::NorthWest => Self::SouthEast,
            Self::North => Self::South,
            Self::NorthEast => Self::SouthWest,
        }
    }

    const fn index(self) -> usize {
        match self {
            Self::SouthWest => 0,
            Self::South => 1,
            Self::SouthEast => 2,
            Self::West => 3,
            Self::East => 4,
            Self::NorthWest => 5,
            Self::North => 6,
            Self::NorthEast => 7,
        }
    }

    /// Steps from `square` one square in this direction, returning `None`
    /// when that would leave the board (including wrapping across a rank
    /// edge for the horizontal/diagonal directions).
    #[must_use]
    fn step(self, square: Square) -> Option<Square> {
        let (row, col) = (square.row() as i8, square.col() as i8);
        let (dr, dc) = match self {
            Self::SouthWest => (-1, -1),
            Self::South => (-1, 0),
            Self::SouthEast => (-1, 1),
            Self::West => (0, -1),
            Self::East => (0, 1),
            Self::NorthWest => (1, -1),
            Self::North => (1, 0),
            Self::NorthEast => (1, 1),
        };
        let (nr, nc) = (row + dr, col + dc);
        if !(0..8).contains(&nr) || !(0..8).contains(&nc) {
            return None;
        }
        Some(Square::from_file_rank(nc as u8, nr as u8))
    }
}

type RayTable = [[BitBoard; 8]; 64];
type SegmentTable = Vec<BitBoard>;
type CandidateTable = [[BitBoard; 64]; 5];
type DirectionTable = Vec<Option<Direction>>;

static RAYS: OnceLock<RayTable> = OnceLock::new();
static SEGMENTS: OnceLock<SegmentTable> = OnceLock::new();
static CANDIDATES: OnceLock<CandidateTable> = OnceLock::new();
static DIRECTION_FROM_TO: OnceLock<DirectionTable> = OnceLock::new();

fn build_rays() -> RayTable {
    let mut table = [[BitBoard::EMPTY; 8]; 64];
    for index in 0..64u8 {
        let origin = Square::new(index);
        for direction in Direction::ALL {
            let mut bits = BitBoard::EMPTY;
            let mut current = origin;
            while let Some(next) = direction.step(current) {
                bits.set(next);
                current = next;
            }
            table[index as usize][direction.index()] = bits;
        }
    }
    table
}

fn build_segments() -> SegmentTable {
    let mut table = vec![BitBoard::EMPTY; 64 * 64];
    for from in 0..64u8 {
        let origin = Square::new(from);
        for direction in Direction::ALL {
            // [from, to): `from` itself is always included, `to` never is.
            let mut bits = BitBoard::EMPTY;
            bits.set(origin);
            let mut current = origin;
            while let Some(next) = direction.step(current) {
                table[from as usize * 64 + next.as_usize()] = bits;
                bits.set(next);
                current = next;
            }
        }
    }
    table
}

fn candidate_row(slot: usize, rays: &RayTable) -> [BitBoard; 64] {
    let mut row = [BitBoard::EMPTY; 64];
    for index in 0..64usize {
        row[index] = match slot {
            0 => knight_candidates(Square::new(index as u8)),
            1 => king_candidates(Square::new(index as u8)),
            2 => slider_candidates(index, rays, true, false),
            3 => slider_candidates(index, rays, false, true),
            4 => slider_candidates(index, rays, true, true),
            _ => unreachable!(),
        };
    }
    row
}

fn slider_candidates(index: usize, rays: &RayTable, bishop: bool, rook: bool) -> BitBoard {
    let mut bits = BitBoard::EMPTY;
    for direction in Direction::ALL {
        let on_diagonal = !direction.is_horizontal() && direction.mover_type().is_bishop_mover();
        let wanted = (bishop && on_diagonal) || (rook && !on_diagonal);
        if wanted {
            bits |= rays[index][direction.index()];
        }
    }
    bits
}

fn knight_candidates(square: Square) -> BitBoard {
    let (row, col) = (square.row() as i8, square.col() as i8);
    let mut bits = BitBoard::EMPTY;
    for (dr, dc) in [
        (1, 2),
        (2, 1),
        (2, -1),
        (1, -2),
        (-1, -2),
        (-2, -1),
        (-2, 1),
        (-1, 2),
    ] {
        let (nr, nc) = (row + dr, col + dc);
        if (0..8).contains(&nr) && (0..8).contains(&nc) {
            bits.set(Square::from_file_rank(nc as u8, nr as u8));
        }
    }
    bits
}

fn king_candidates(square: Square) -> BitBoard {
    let mut bits = BitBoard::EMPTY;
    for direction in Direction::ALL {
        if let Some(next) = direction.step(square) {
            bits.set(next);
        }
    }
    bits
}

fn build_candidates(rays: &RayTable) -> CandidateTable {
    [
        candidate_row(0, rays),
        candidate_row(1, rays),
        candidate_row(2, rays),
        candidate_row(3, rays),
        candidate_row(4, rays),
    ]
}

fn build_direction_from_to() -> DirectionTable {
    let mut table = vec![None; 64 * 64];
    for from in 0..64u8 {
        let origin = Square::new(from);
        for direction in Direction::ALL {
            let mut current = origin;
            while let Some(next) = direction.step(current) {
                table[from as usize * 64 + next.as_usize()] = Some(direction);
                current = next;
            }
        }
    }
    table
}

fn rays() -> &'static RayTable {
    RAYS.get_or_init(build_rays)
}

/// `ray[square][direction]`: all squares strictly beyond `square` in
/// `direction`, not wrapping across a rank edge.
#[must_use]
pub fn ray(square: Square, direction: Direction) -> BitBoard {
    rays()[square.as_usize()][direction.index()]
}

/// A single board-edge-aware step from `square` in `direction`, or `None`
/// if that would leave the board.
#[must_use]
pub fn step(direction: Direction, square: Square) -> Option<Square> {
    direction.step(square)
}

/// `squares_from_to[from, to]`: the half-open segment `[from, to)` when
/// `from` and `to` lie on one of the eight rays, empty otherwise. Symmetric:
/// `squares_from_to(a, b)` and `squares_from_to(b, a)` are each other's
/// reverse segment along the shared ray.
#[must_use]
pub fn squares_from_to(from: Square, to: Square) -> BitBoard {
    SEGMENTS.get_or_init(build_segments)[from.as_usize() * 64 + to.as_usize()]
}

/// `candidates[type, square]`: squares reachable assuming an empty board
/// (sliders) or the full leaper pattern (knight, king). No pawn entry.
#[must_use]
pub fn candidates(kind: Type, square: Square) -> BitBoard {
    let rays = rays();
    let table = CANDIDATES.get_or_init(|| build_candidates(rays));
    let slot = if kind == Type::KNIGHT {
        0
    } else if kind == Type::KING {
        1
    } else if kind == Type::BISHOP {
        2
    } else if kind == Type::ROOK {
        3
    } else {
        4
    };
    table[slot][square.as_usize()]
}

/// `direction_from_to[from, to]`: the unique direction if `from` and `to`
/// are collinear, `None` otherwise.
#[must_use]
pub fn direction_from_to(from: Square, to: Square) -> Option<Direction> {
    DIRECTION_FROM_TO.get_or_init(build_direction_from_to)[from.as_usize() * 64 + to.as_usize()]
}
