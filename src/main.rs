//! Thin debugging aid: loads a FEN given on the command line and prints the
//! resulting board plus its legal move count. Not a product surface — the
//! crate's value is the library in [`pabi::chess`]; this binary exists only
//! so a FEN can be eyeballed without writing a test.

use pabi::chess::core::Square;
use pabi::chess::position::Position;

fn main() -> anyhow::Result<()> {
    let fen = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    let fen = if fen.is_empty() {
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1".to_string()
    } else {
        fen
    };
    let position = Position::from_fen(&fen)?;
    println!("{position}");

    let mut total_moves = 0usize;
    let mut cursor = Square::PRE_BEGIN;
    let side = position.pieces_of_color(position.to_move());
    loop {
        cursor = cursor.next_bit_in(side.bits());
        if cursor == Square::END {
            break;
        }
        total_moves += position.moves(cursor).count() as usize;
    }
    println!("legal moves for {}: {total_moves}", position.to_move());
    if position.in_check(position.to_move()) {
        println!(
            "{} is in check{}",
            position.to_move(),
            if position.double_check() {
                " (double check)"
            } else {
                ""
            }
        );
    }
    Ok(())
}
