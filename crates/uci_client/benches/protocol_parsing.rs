//! Protocol Parsing Benchmarks
//!
//! Engine output arrives at several hundred lines per second during a search,
//! so line classification sits on the hot path of the session actor.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use uci_client::protocol::EngineLine;
use uci_client::UciMove;

const INFO_LINE: &str = "info depth 18 seldepth 27 multipv 1 score cp 31 nodes 2417693 nps 1208846 hashfull 812 tbhits 0 time 2000 pv e2e4 e7e5 g1f3 b8c6 f1b5 a7a6 b5a4 g8f6";

fn bench_parse_info(c: &mut Criterion) {
    c.bench_function("parse_info_line", |b| {
        b.iter(|| black_box(EngineLine::parse(black_box(INFO_LINE))))
    });
}

fn bench_parse_bestmove(c: &mut Criterion) {
    c.bench_function("parse_bestmove_line", |b| {
        b.iter(|| black_box(EngineLine::parse(black_box("bestmove e7e8q ponder d7d8"))))
    });
}

fn bench_parse_uci_move(c: &mut Criterion) {
    c.bench_function("parse_uci_move", |b| {
        b.iter(|| black_box(black_box("g1f3").parse::<UciMove>()))
    });
}

criterion_group!(benches, bench_parse_info, bench_parse_bestmove, bench_parse_uci_move);
criterion_main!(benches);
