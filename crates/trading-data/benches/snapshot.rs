//! Benchmarks for snapshot construction.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use trading_core::types::Bar;
use trading_data::{build_snapshot, SnapshotConfig};

fn generate_bars(size: usize) -> Vec<Bar> {
    (0..size)
        .map(|i| {
            let close = 1.1 + (i as f64 * 0.1).sin() * 0.01;
            Bar::new(i as i64 * 60_000, close, close + 0.0004, close - 0.0004, close, 100.0)
        })
        .collect()
}

fn benchmark_snapshot(c: &mut Criterion) {
    let config = SnapshotConfig::default();
    let mut group = c.benchmark_group("Snapshot");

    for size in [130, 1000, 10000].iter() {
        let bars = generate_bars(*size);
        group.bench_with_input(BenchmarkId::new("build", size), &bars, |b, bars| {
            b.iter(|| build_snapshot("EURUSD", black_box(bars), 0.0001, &config))
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_snapshot);
criterion_main!(benches);
