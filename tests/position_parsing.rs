//! FEN import/export (spec §6.1): six fields, canonical re-serialization,
//! and the structural failures that must abort loading.

use pabi::chess::Position;
use pretty_assertions::assert_eq;

fn check_round_trips(fen: &str) {
    let position = Position::from_fen(fen).unwrap_or_else(|e| panic!("{fen:?} should parse: {e}"));
    assert_eq!(position.to_string(), fen);
}

#[test]
fn initial_position_round_trips() {
    check_round_trips("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1");
}

#[test]
fn arbitrary_legal_positions_round_trip() {
    for fen in [
        "rq2k2r/p1pbn1p1/2n1p3/1p3pB1/PbP1pPp1/N2P4/1P1NB2P/1R1Q1RK1 b kq f3 0 14",
        "7r/r6p/1p2p3/pPp1Pp1k/R1Pp1PpP/1P1P2P1/2KBB1R1/8 b - h3 0 2",
        "6K1/8/4N3/8/3q4/8/4p3/R4k2 b - - 0 1",
        "k7/8/2P5/b7/8/8/1P5q/R3K3 b Q - 0 1",
        "8/8/8/8/8/8/4k3/R3K2R w KQ - 0 1",
        "r3k2r/8/8/8/8/8/8/R3K2R w - - 12 34",
    ] {
        check_round_trips(fen);
    }
}

#[test]
fn castling_field_is_canonicalized_to_kqkq_order() {
    let position = Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w qkQK - 0 1").unwrap();
    assert!(position.to_string().contains(" KQkq "));
}

#[test]
fn empty_castling_field_round_trips_as_dash() {
    check_round_trips("4k3/8/8/8/8/8/8/4K3 w - - 0 1");
}

#[test]
fn rejects_a_rank_that_does_not_sum_to_eight_columns() {
    assert!(Position::from_fen("pppppp/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1").is_err());
}

#[test]
fn rejects_a_rank_that_overflows_eight_columns() {
    assert!(Position::from_fen("9/8/8/8/8/8/8/RNBQKBNR w KQkq - 0 1").is_err());
}

#[test]
fn rejects_fewer_than_eight_ranks() {
    assert!(Position::from_fen("8/8/8/8/8/8/8 w - - 0 1").is_err());
}

#[test]
fn rejects_an_invalid_piece_symbol() {
    assert!(Position::from_fen("rnbqkbnx/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1").is_err());
}

#[test]
fn rejects_missing_white_king() {
    assert!(Position::from_fen("8/8/8/8/8/8/8/4k3 w - - 0 1").is_err());
}

#[test]
fn rejects_missing_black_king() {
    assert!(Position::from_fen("4K3/8/8/8/8/8/8/8 w - - 0 1").is_err());
}

#[test]
fn rejects_a_pawn_on_the_back_rank() {
    assert!(Position::from_fen("Pnbqkbnr/pppppppp/8/8/8/8/PPPPPPP1/RNBQKBNR w KQkq - 0 1").is_err());
}

#[test]
fn rejects_a_missing_field() {
    assert!(Position::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq -").is_err());
}

#[test]
fn rejects_a_trailing_seventh_field() {
    assert!(
        Position::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1 extra")
            .is_err()
    );
}

#[test]
fn rejects_an_en_passant_target_on_the_wrong_rank_for_the_side_to_move() {
    // White to move implies any en-passant target must be on rank 6 (a
    // black pawn having just advanced two squares), not rank 3.
    assert!(
        Position::from_fen("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR w KQkq e3 0 1").is_err()
    );
}

#[test]
fn accepts_a_well_formed_en_passant_target() {
    let position =
        Position::from_fen("rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq e6 0 2")
            .unwrap();
    assert!(position.en_passant().exists());
}

#[test]
fn rejects_zero_fullmove_number() {
    assert!(
        Position::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 0").is_err()
    );
}

#[test]
fn clear_resets_to_an_empty_board_but_keeps_side_to_move() {
    let mut position = Position::initial_position();
    position.clear();
    assert_eq!(position.occupied(), pabi::chess::bitboard::BitBoard::EMPTY);
    assert_eq!(position.halfmove_clock(), 0);
    assert_eq!(position.fullmove_number(), 1);
}
