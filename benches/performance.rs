//! Performance benchmarks for grid-strategies
//!
//! Run with: `cargo bench`
//! View results: `open target/criterion/report/index.html`

use chrono::{Duration, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use grid_strategies::adapters::SimHost;
use grid_strategies::grid::{classify, Crossing};
use grid_strategies::indicators::clamped_atr;
use grid_strategies::strategies::grid::{GridStrategy, GridStrategyConfig};
use grid_strategies::strategies::Strategy;
use grid_strategies::{Candle, Config, Symbol};

fn make_candles(count: usize) -> Vec<Candle> {
    let start = Utc::now() - Duration::days(count as i64);
    (0..count)
        .map(|i| {
            // Deterministic oscillation around 26.0
            let phase = (i as f64 * 0.7).sin();
            let close = 26.0 + phase;
            Candle {
                datetime: start + Duration::days(i as i64),
                open: close - 0.05,
                high: close + 0.15,
                low: close - 0.15,
                close,
                volume: 1_000_000.0,
            }
        })
        .collect()
}

fn benchmark_crossing_sweep(c: &mut Criterion) {
    let levels: Vec<f64> = (0..40).map(|i| 24.0 + i as f64 * 0.1).collect();
    c.bench_function("crossing_sweep_40_levels", |b| {
        b.iter(|| {
            let mut fired = 0u32;
            for &level in &levels {
                if classify(black_box(26.05), black_box(25.65), level) != Crossing::None {
                    fired += 1;
                }
            }
            fired
        })
    });
}

fn benchmark_clamped_atr(c: &mut Criterion) {
    let candles = make_candles(250);
    let high: Vec<f64> = candles.iter().map(|c| c.high).collect();
    let low: Vec<f64> = candles.iter().map(|c| c.low).collect();
    let close: Vec<f64> = candles.iter().map(|c| c.close).collect();

    c.bench_function("clamped_atr_250_bars", |b| {
        b.iter(|| clamped_atr(black_box(&high), black_box(&low), black_box(&close), 14))
    });
}

fn benchmark_full_replay(c: &mut Criterion) {
    let mut config = Config::default();
    config.engine.cooldown_secs = 0;
    let grid_config = GridStrategyConfig::default();
    let candles = make_candles(250);

    c.bench_function("grid_replay_250_bars", |b| {
        b.iter(|| {
            let mut strategy = GridStrategy::new(&config, grid_config.clone()).unwrap();
            let mut host = SimHost::new(Symbol::new("600900.SH"), candles.clone(), 100_000.0);
            for _ in 0..29 {
                host.advance();
            }
            strategy.init(&mut host).unwrap();
            loop {
                let _ = strategy.on_bar(&mut host).unwrap();
                if !host.advance() {
                    break;
                }
            }
            black_box(strategy.grid().unwrap().total_shares())
        })
    });
}

criterion_group!(
    benches,
    benchmark_crossing_sweep,
    benchmark_clamped_atr,
    benchmark_full_replay
);
criterion_main!(benches);
