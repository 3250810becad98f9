//! Benchmarks for world generation and the AI turn loop.

#![allow(missing_docs)]

use std::hint::black_box;

use chrono::Utc;
use criterion::{Criterion, criterion_group, criterion_main};

use skirmish::ai::{AiPolicy, run_ai_turn};
use skirmish::game::{Match, Side};
use skirmish::grid::GridSize;
use skirmish::recipes::RecipeCatalog;
use skirmish::rng::Mulberry32;
use skirmish::worldgen::generate;

fn bench_generate_default(c: &mut Criterion) {
    c.bench_function("generate_16x16", |b| {
        b.iter(|| {
            let world = generate(black_box("bench"), GridSize::new(16, 16), black_box(1200));
            black_box(world)
        });
    });
}

fn bench_generate_large(c: &mut Criterion) {
    c.bench_function("generate_32x32", |b| {
        b.iter(|| {
            let world = generate(black_box("bench"), GridSize::new(32, 32), black_box(1500));
            black_box(world)
        });
    });
}

fn bench_ai_turn(c: &mut Criterion) {
    let world = generate("bench", GridSize::new(16, 16), 1200).expect("valid grid");
    let template = Match::from_world(
        "m-bench".to_string(),
        world,
        "bench".to_string(),
        GridSize::new(16, 16),
        1200,
        Side::Ai,
        Some("u-bench".to_string()),
        None,
        Utc::now(),
    );
    let policy = AiPolicy::global_default();
    let catalog = RecipeCatalog::builtin();

    c.bench_function("ai_turn", |b| {
        b.iter(|| {
            let mut working = template.clone();
            let mut rng = Mulberry32::new(42);
            let outcome = run_ai_turn(&mut working, &policy, catalog, &mut rng);
            black_box(outcome)
        });
    });
}

criterion_group!(
    benches,
    bench_generate_default,
    bench_generate_large,
    bench_ai_turn
);
criterion_main!(benches);
