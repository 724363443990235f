use colony_core::{
    Cell, Deadline, DeciderKind, EngineConfig, SensorReport, TurnEngine,
};
use colony_proto::GameParameters;
use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};

/// A board with a loose lattice of our ants, scattered food and a few walls.
fn report(size: i32) -> SensorReport {
    let mut report = SensorReport::new();
    for row in 0..size {
        for col in 0..size {
            let cell = Cell::new(row, col);
            match (row * 31 + col * 17) % 23 {
                0 => report.ants.push((cell, 0)),
                1 => report.food.push(cell),
                2 => report.water.push(cell),
                3 => report.ants.push((cell, 1)),
                _ => {}
            }
        }
    }
    report.hills.push((Cell::new(size / 2, size / 2), 0));
    report
}

fn bench_turn(c: &mut Criterion) {
    let mut group = c.benchmark_group("turn");

    for size in [16i32, 32, 48, 64] {
        group.bench_with_input(BenchmarkId::new("board", size), &size, |b, &size| {
            let sensors = report(size);
            b.iter_batched(
                || {
                    let params = GameParameters {
                        rows: size as u64,
                        cols: size as u64,
                        ..GameParameters::default()
                    };
                    TurnEngine::start(params, EngineConfig::builtin(), DeciderKind::Hedge)
                        .expect("benchmark parameters are valid")
                },
                |mut engine| {
                    engine.run_turn_until(&sensors, Deadline::never());
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

criterion_group!(turn_benches, bench_turn);
criterion_main!(turn_benches);
