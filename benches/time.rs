//! Criterion benchmarks measure time of the clearly separated pieces of
//! code: placement, legal-move generation, and FEN parsing, the hot paths
//! of the position oracle.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use pabi::chess::{legal_moves, Position};
use shakmaty::{CastlingMode, Chess, Position as ShakmatyPosition};

/// A handful of structurally different positions: the start, a quiet
/// middlegame, an endgame, and a position with a double check on the board.
const POSITIONS: [&str; 4] = [
    "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
    "r1bqkbnr/pppp1ppp/2n5/1B2p3/4P3/5N2/PPPP1PPP/RNBQK2R b KQkq - 3 3",
    "8/8/4k3/8/8/4K3/4P3/8 w - - 0 1",
    "rq2k2r/p1pbn1p1/2n1p3/1p3pB1/PbP1pPp1/N2P4/1P1NB2P/1R1Q1RK1 b kq f3 0 14",
];

fn parse_positions(fens: &[&str]) {
    for fen in fens {
        criterion::black_box(Position::from_fen(fen).expect("benchmark FEN is valid"));
    }
}

fn parse(c: &mut Criterion) {
    c.bench_with_input(
        BenchmarkId::new("from_fen", format!("{} positions", POSITIONS.len())),
        &POSITIONS,
        |b, fens| b.iter(|| parse_positions(fens)),
    );
}

criterion_group! {
    name = position_parsing;
    config = Criterion::default().sample_size(100);
    targets = parse
}

fn movegen_bench(c: &mut Criterion) {
    let positions: Vec<Position> = POSITIONS
        .iter()
        .map(|fen| Position::from_fen(fen).expect("benchmark FEN is valid"))
        .collect();
    let mut group = c.benchmark_group("Move generation");
    group.bench_with_input(
        BenchmarkId::new("pabi", format!("{} positions", positions.len())),
        &positions,
        |b, positions| {
            b.iter(|| {
                for position in positions {
                    criterion::black_box(legal_moves(position));
                }
            });
        },
    );
    // A reasonable, stable reference point. Pabi's `legal_moves` does more
    // work per call (it also maintains attack/pin/defender indices), so
    // beating this isn't the goal, but regressing far past it is a signal.
    let shakmaty_positions: Vec<Chess> = POSITIONS
        .iter()
        .map(|fen| {
            let setup: shakmaty::fen::Fen = fen.parse().expect("benchmark FEN is valid");
            setup
                .position(CastlingMode::Standard)
                .expect("benchmark FEN is a legal shakmaty position")
        })
        .collect();
    group.bench_with_input(
        BenchmarkId::new(
            "reference implementation: shakmaty",
            format!("{} positions", shakmaty_positions.len()),
        ),
        &shakmaty_positions,
        |b, positions| {
            b.iter(|| {
                for position in positions {
                    criterion::black_box(position.legal_moves());
                }
            });
        },
    );
    group.finish();
}

criterion_group! {
    name = movegen;
    config = Criterion::default().sample_size(100);
    targets = movegen_bench
}

criterion_main!(position_parsing, movegen);
