//! Chess rules: a position oracle that maintains legal-move-generation
//! state incrementally. No search, no evaluation, no opening book — see
//! `DESIGN.md` for what this crate deliberately does not do.

pub mod bitboard;
pub mod core;
pub mod countboard;
pub mod flags;
pub mod geometry;
pub mod movegen;
pub mod piece;
pub mod position;

pub use core::{Code, Color, Square, Type};
pub use movegen::{legal_moves, MoveIterator, PieceIterator};
pub use position::{Move, Position};
