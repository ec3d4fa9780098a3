//! Benchmarks for indicator implementations.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use trading_core::traits::Indicator;
use trading_indicators::{Adx, BollingerBands, Ema, Macd, Rsi};

fn generate_test_data(size: usize) -> Vec<f64> {
    (0..size)
        .map(|i| 1.1 + (i as f64 * 0.1).sin() * 0.01)
        .collect()
}

fn benchmark_ema(c: &mut Criterion) {
    let mut group = c.benchmark_group("EMA");

    for size in [1000, 10000, 100000].iter() {
        let data = generate_test_data(*size);
        group.bench_with_input(BenchmarkId::new("standard", size), &data, |b, data| {
            let ema = Ema::new(20);
            b.iter(|| ema.calculate(black_box(data)))
        });
    }

    group.finish();
}

fn benchmark_rsi(c: &mut Criterion) {
    let mut group = c.benchmark_group("RSI");

    for size in [1000, 10000, 100000].iter() {
        let data = generate_test_data(*size);
        group.bench_with_input(BenchmarkId::new("fast", size), &data, |b, data| {
            let rsi = Rsi::new(2);
            b.iter(|| rsi.calculate(black_box(data)))
        });
    }

    group.finish();
}

fn benchmark_macd_bollinger(c: &mut Criterion) {
    let data = generate_test_data(10000);
    let macd = Macd::default();
    let bb = BollingerBands::default();

    c.bench_function("MACD 10000", |b| b.iter(|| macd.calculate(black_box(&data))));
    c.bench_function("Bollinger 10000", |b| b.iter(|| bb.calculate(black_box(&data))));
}

fn benchmark_adx(c: &mut Criterion) {
    let close = generate_test_data(10000);
    let high: Vec<f64> = close.iter().map(|c| c + 0.0005).collect();
    let low: Vec<f64> = close.iter().map(|c| c - 0.0005).collect();
    let adx = Adx::default();

    c.bench_function("ADX 10000", |b| {
        b.iter(|| adx.calculate_ohlc(black_box(&high), black_box(&low), black_box(&close)))
    });
}

criterion_group!(benches, benchmark_ema, benchmark_rsi, benchmark_macd_bollinger, benchmark_adx);
criterion_main!(benches);
