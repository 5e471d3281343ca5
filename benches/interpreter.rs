use std::fs;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use mython::{interpreter, lexer, parser};

const FIB_PROGRAM: &str = "tests/programs/bench_fib/program.my";

fn bench_pipeline(c: &mut Criterion) {
    let source = fs::read_to_string(FIB_PROGRAM).expect("read bench program");

    c.bench_function("tokenize_fib", |b| {
        b.iter(|| {
            let tokens = lexer::tokenize(black_box(&source)).expect("tokenize");
            black_box(tokens);
        })
    });

    c.bench_function("parse_fib", |b| {
        b.iter(|| {
            let program = parser::parse(black_box(&source)).expect("parse");
            black_box(program);
        })
    });

    c.bench_function("full_pipeline_fib", |b| {
        b.iter(|| {
            let mut sink = Vec::new();
            interpreter::run(black_box(&source), &mut sink).expect("run");
            black_box(sink);
        })
    });
}

criterion_group!(benches, bench_pipeline);
criterion_main!(benches);
