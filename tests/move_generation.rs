//! The concrete end-to-end scenarios of spec §8, plus a handful of perft-style
//! cross-checks against `shakmaty` as an independent legal-move-count oracle.

use pabi::chess::core::{Color, Square, Type};
use pabi::chess::{legal_moves, Move, Position};
use pretty_assertions::assert_eq;
use shakmaty::{CastlingMode, Position as ShakmatyPosition};

fn sq(s: &str) -> Square {
    Square::try_from(s).unwrap()
}

#[test]
fn scenario_1_initial_position_has_twenty_legal_moves() {
    let position = Position::initial_position();
    assert_eq!(
        position.to_string(),
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"
    );
    assert_eq!(legal_moves(&position).len(), 20);
}

#[test]
fn scenario_2_en_passant_is_legal_unless_the_pawn_is_horizontally_pinned() {
    let position =
        Position::from_fen("rq2k2r/p1pbn1p1/2n1p3/1p3pB1/PbP1pPp1/N2P4/1P1NB2P/1R1Q1RK1 b kq f3 0 14")
            .unwrap();
    assert!(position.moves(sq("g4")).test(sq("f3")));
}

#[test]
fn scenario_3_horizontally_pinned_en_passant_pawn_cannot_capture() {
    let position =
        Position::from_fen("7r/r6p/1p2p3/pPp1Pp1k/R1Pp1PpP/1P1P2P1/2KBB1R1/8 b - h3 0 2").unwrap();
    assert!(!position.moves(sq("g4")).test(sq("h3")));
}

#[test]
fn scenario_4_single_check_restricts_to_king_moves_and_blocks_or_captures() {
    // The white rook on a1 checks the black king on f1 along the open
    // first rank; the other white pieces (king g8, knight e6) are not
    // involved, so this is a single check, not a double check.
    let position = Position::from_fen("6K1/8/4N3/8/3q4/8/4p3/R4k2 b - - 0 1").unwrap();
    assert!(position.in_check(Color::BLACK));
    assert!(!position.double_check());
    let king = position.king_square(Color::BLACK).unwrap();
    let attacker = sq("a1");
    let block_or_capture = pabi::chess::geometry::squares_from_to(attacker, king);
    let moves = legal_moves(&position);
    assert!(!moves.is_empty());
    for mv in &moves {
        let piece = position.piece_at(mv.from);
        assert!(piece.code.is_a(Type::KING) || block_or_capture.test(mv.to));
    }
}

#[test]
fn scenario_5_pinned_pawn_restricted_to_the_pin_ray() {
    let position = Position::from_fen("k7/8/2P5/b7/8/8/1P5q/R3K3 b Q - 0 1").unwrap();
    assert!(position.in_check(Color::WHITE));
    // The b2 pawn is pinned diagonally by the bishop on a5 against the king
    // on e1: it has no legal moves at all (it cannot move along its own
    // file and stay on the pin ray).
    assert!(position.moves(sq("b2")).is_empty());
}

#[test]
fn scenario_6_execute_e4_then_c5_then_nf3_updates_fen_and_clears_en_passant() {
    let mut position = Position::initial_position();
    assert!(position.legal(Move::new(sq("e2"), sq("e4"))));
    position.execute(Move::new(sq("e2"), sq("e4")));
    assert!(position.to_string().ends_with("e3 0 1"));

    assert!(position.legal(Move::new(sq("c7"), sq("c5"))));
    position.execute(Move::new(sq("c7"), sq("c5")));
    assert!(position.to_string().ends_with("c6 0 2"));

    assert!(position.legal(Move::new(sq("g1"), sq("f3"))));
    position.execute(Move::new(sq("g1"), sq("f3")));
    assert_eq!(position.halfmove_clock(), 1);
    assert!(!position.en_passant().exists());
}

/// Cross-checks the legal move *count* against `shakmaty` for a handful of
/// fixed, structurally different positions (a perft(1)-style sanity check,
/// not a full perft).
#[test]
fn legal_move_counts_agree_with_shakmaty_at_depth_one() {
    for fen in [
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
        "r1bqkbnr/pppp1ppp/2n5/1B2p3/4P3/5N2/PPPP1PPP/RNBQK2R b KQkq - 3 3",
        "rq2k2r/p1pbn1p1/2n1p3/1p3pB1/PbP1pPp1/N2P4/1P1NB2P/1R1Q1RK1 b kq f3 0 14",
        "k7/8/2P5/b7/8/8/1P5q/R3K3 b Q - 0 1",
    ] {
        let position = Position::from_fen(fen).expect("fixed FEN is valid");
        let shakmaty_setup: shakmaty::fen::Fen = fen.parse().expect("fixed FEN is valid");
        let shakmaty_position = shakmaty_setup
            .position(CastlingMode::Standard)
            .expect("fixed FEN is a legal shakmaty position");
        assert_eq!(
            legal_moves(&position).len(),
            shakmaty_position.legal_moves().len(),
            "move count mismatch for {fen:?}"
        );
    }
}

#[test]
fn castling_is_available_when_squares_between_king_and_rook_are_empty_and_unattacked() {
    let position = Position::from_fen("8/8/8/8/8/8/8/R3K2R w KQ - 0 1").unwrap();
    let moves = legal_moves(&position);
    assert!(moves.iter().any(|mv| mv.from == sq("e1") && mv.to == sq("g1")));
    assert!(moves.iter().any(|mv| mv.from == sq("e1") && mv.to == sq("c1")));
}

#[test]
fn castling_through_an_attacked_square_is_illegal() {
    // A rook on e8 covers e1..e-file, including the king's own square, so
    // white is in check and cannot castle at all.
    let position = Position::from_fen("4r3/8/8/8/8/8/8/R3K2R w KQ - 0 1").unwrap();
    let moves = legal_moves(&position);
    assert!(!moves.iter().any(|mv| mv.from == sq("e1") && mv.to == sq("g1")));
    assert!(!moves.iter().any(|mv| mv.from == sq("e1") && mv.to == sq("c1")));
}

#[test]
fn double_check_allows_only_king_moves() {
    // Black rook on e8 checks along the open e-file; black knight on d3
    // simultaneously forks the king from d3 to e1. Neither can be blocked
    // or captured by the same move, so only the king may move.
    let position = Position::from_fen("3kr3/8/8/8/8/3n4/8/4K3 w - - 0 1").unwrap();
    assert!(position.in_check(Color::WHITE));
    assert!(position.double_check());
    let moves = legal_moves(&position);
    assert!(!moves.is_empty());
    assert!(moves.iter().all(|mv| mv.from == sq("e1")));
}

#[test]
fn promotion_expands_into_four_candidate_moves() {
    let position = Position::from_fen("8/4P2k/8/8/8/8/7K/8 w - - 0 1").unwrap();
    let promotions: Vec<Move> = legal_moves(&position)
        .into_iter()
        .filter(|mv| mv.promotion.is_some())
        .collect();
    assert_eq!(promotions.len(), 4);
}
