//! Integration tests for the grid-strategies system
//!
//! These drive full strategies through the simulated host and verify the
//! end-to-end behavior: sizing, exits, risk triggers, grid regeneration,
//! and the host-facing invariants.

use chrono::{Duration, Utc};

use grid_strategies::adapters::SimHost;
use grid_strategies::grid::round_to_tick;
use grid_strategies::strategies::grid::{GridStrategy, GridStrategyConfig};
use grid_strategies::strategies::ma_trend::{MaTrendConfig, MaTrendStrategy};
use grid_strategies::strategies::{available_strategies, create_strategy, Strategy};
use grid_strategies::trend::TrendFilter;
use grid_strategies::{Candle, Config, Side, Symbol};

// =============================================================================
// Test Utilities
// =============================================================================

/// Build a candle series from closes, with a small fixed bar range
fn candles(closes: &[f64]) -> Vec<Candle> {
    let start = Utc::now() - Duration::days(closes.len() as i64);
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| Candle {
            datetime: start + Duration::days(i as i64),
            open: c,
            high: c + 0.05,
            low: c - 0.05,
            close: c,
            volume: 1_000_000.0,
        })
        .collect()
}

/// Base config: no cooldown, simple fees, lot size 100
fn base_config() -> Config {
    let mut config = Config::default();
    config.engine.cooldown_secs = 0;
    config.fees.slippage = 0.003;
    config.fees.commission_rate = 0.0;
    config.fees.stamp_tax_rate = 0.0;
    config
}

/// Grid pinned to a 0.5 step so level geometry is predictable
fn pinned_grid_config() -> GridStrategyConfig {
    GridStrategyConfig {
        per_grid_ratio: 0.08,
        min_profit_pct: 0.01,
        default_atr: 1.0,
        min_step: 0.5,
        max_step: 0.5,
        levels_per_side: 4,
        expand_buffer: 0,
        step_rebuild_pct: 10.0,
        ..GridStrategyConfig::default()
    }
}

/// Host over 20 flat bars at `base` followed by `tail`, positioned on the
/// last flat bar so `init` centers the grid on `base`
fn host_with_tail(base: f64, tail: &[f64], cash: f64) -> SimHost {
    let mut closes = vec![base; 20];
    closes.extend_from_slice(tail);
    let mut host = SimHost::new(Symbol::new("600900.SH"), candles(&closes), cash);
    for _ in 0..19 {
        host.advance();
    }
    host
}

fn run_all(strat: &mut GridStrategy, host: &mut SimHost) -> Vec<grid_strategies::CycleReport> {
    let mut reports = Vec::new();
    loop {
        reports.push(strat.on_bar(host).unwrap());
        if !host.advance() {
            break;
        }
    }
    reports
}

// =============================================================================
// Grid Engine Scenarios
// =============================================================================

#[test]
fn test_buy_then_profitable_exit_roundtrip() {
    // Grid 8.0..12.0 around 10.0. One down-cross buys one level; the rise
    // back through it exits the full lot with positive realized profit.
    let config = base_config();
    let mut strat = GridStrategy::new(&config, pinned_grid_config()).unwrap();
    let mut host = host_with_tail(10.0, &[9.8, 9.4, 9.3, 9.8], 100_000.0);

    strat.init(&mut host).unwrap();
    let reports = run_all(&mut strat, &mut host);

    let buys: Vec<_> = reports
        .iter()
        .flat_map(|r| &r.trades)
        .filter(|t| t.side == Side::Buy)
        .collect();
    let sells: Vec<_> = reports
        .iter()
        .flat_map(|r| &r.trades)
        .filter(|t| t.side == Side::Sell)
        .collect();

    // 10.0 -> 9.8 crosses the center level; 9.8 -> 9.4 crosses 9.5;
    // 9.3 stays inside a cell; 9.8 crosses back up through 9.5 only
    assert_eq!(buys.len(), 2);
    assert_eq!(sells.len(), 1);

    // The exit empties the 9.5 level in full
    let lot_at_95 = buys.iter().find(|t| {
        t.level.map(|l| (l - 9.5).abs() < 1e-9).unwrap_or(false)
    });
    assert_eq!(sells[0].quantity, lot_at_95.unwrap().quantity);

    // Sizing: floor(min(assets * ratio, cash) / exec / lot) * lot
    let limit = round_to_tick(9.4 * 1.003, 0.01);
    let expected = ((100_000.0 * 0.08 / limit) as u64) / 100 * 100;
    assert_eq!(lot_at_95.unwrap().quantity, expected);

    // Profit gate held: 9.8 / (9.4 * 1.003) - 1 ≈ 3.9% >= 1%
    assert!(reports.last().unwrap().realized_profit > 0.0);

    // The center-level lot is still open; aggregates agree everywhere
    let open = strat.grid().unwrap().total_shares();
    assert_eq!(open, buys[0].quantity);
    assert_eq!(host.position_qty(), open);
}

#[test]
fn test_multi_level_cross_processed_ascending() {
    // One violent bar through three levels: 9.5, 9.0, 8.5. Buys must come
    // out deterministically in ascending price order.
    let config = base_config();
    let mut strat = GridStrategy::new(&config, pinned_grid_config()).unwrap();
    let mut host = host_with_tail(10.0, &[8.4], 1_000_000.0);

    strat.init(&mut host).unwrap();
    strat.on_bar(&mut host).unwrap(); // baseline at 10.0
    host.advance();
    let report = strat.on_bar(&mut host).unwrap();

    // 10.0 -> 8.4 crosses 8.5, 9.0, 9.5, and the 10.0 center level
    let levels: Vec<f64> = report.trades.iter().filter_map(|t| t.level).collect();
    assert_eq!(levels.len(), 4);
    assert!(levels.windows(2).all(|w| w[0] < w[1]));
    assert!((levels[0] - 8.5).abs() < 1e-9);
    assert!((levels[3] - 10.0).abs() < 1e-9);

    // Aggregate position equals the sum over levels
    let total: u64 = report.trades.iter().map(|t| t.quantity).sum();
    assert_eq!(strat.grid().unwrap().total_shares(), total);
    assert_eq!(host.position_qty(), total);
}

#[test]
fn test_drawdown_forces_liquidation_and_suspends_buys() {
    // Buy a large lot near the top, then collapse equity past -5%. The
    // controller must dump every occupied level that cycle, profit gate or
    // not, and refuse to buy afterwards.
    let config = base_config();
    let mut grid = pinned_grid_config();
    grid.per_grid_ratio = 0.3;
    let mut strat = GridStrategy::new(&config, grid).unwrap();
    let mut host = host_with_tail(10.0, &[9.4, 8.0, 7.4], 100_000.0);

    strat.init(&mut host).unwrap();
    strat.on_bar(&mut host).unwrap(); // baseline at 10.0

    host.advance();
    let report = strat.on_bar(&mut host).unwrap(); // buys at 9.5 and 10.0
    assert_eq!(report.trades.len(), 2);
    let bought: u64 = report.trades.iter().map(|t| t.quantity).sum();
    assert!(bought >= 4000);

    host.advance(); // 8.0: equity well below -5% from the 100k peak
    let report = strat.on_bar(&mut host).unwrap();
    assert!(report.forced_liquidation);
    let sells: Vec<_> = report
        .trades
        .iter()
        .filter(|t| t.side == Side::Sell)
        .collect();
    assert_eq!(sells.len(), 2);
    assert_eq!(sells.iter().map(|t| t.quantity).sum::<u64>(), bought);
    assert!(sells.iter().all(|t| t.realized_profit < 0.0));
    assert_eq!(host.position_qty(), 0);
    assert_eq!(strat.grid().unwrap().total_shares(), 0);

    // 7.4 crosses more levels down, but buying stays suspended
    host.advance();
    let report = strat.on_bar(&mut host).unwrap();
    assert!(report
        .trades
        .iter()
        .all(|t| t.side != Side::Buy));
}

#[test]
fn test_exposure_cap_suspends_buys_without_selling() {
    let config = {
        let mut c = base_config();
        c.risk.max_risk_ratio = 0.05;
        c
    };
    let mut strat = GridStrategy::new(&config, pinned_grid_config()).unwrap();
    let mut host = host_with_tail(10.0, &[9.4, 8.9], 100_000.0);

    strat.init(&mut host).unwrap();
    strat.on_bar(&mut host).unwrap(); // baseline

    host.advance();
    let first = strat.on_bar(&mut host).unwrap(); // exposure 0 -> buy allowed
    assert_eq!(first.trades.len(), 1);

    host.advance();
    let second = strat.on_bar(&mut host).unwrap(); // ~7.5% exposure > 5% cap
    assert!(second.trades.is_empty());
    // Cap suppresses buys only: the held lot is untouched
    assert_eq!(
        strat.grid().unwrap().total_shares(),
        first.trades[0].quantity
    );
}

#[test]
fn test_insufficient_history_initializes_with_default_atr() {
    let config = base_config();
    let mut grid = pinned_grid_config();
    grid.min_step = 0.1;
    grid.max_step = 1.0;
    grid.default_atr = 0.6; // step = 0.6 * 0.5 = 0.3
    let mut strat = GridStrategy::new(&config, grid).unwrap();

    // Two bars: far fewer than atr_period + 1
    let mut host = SimHost::new(Symbol::new("600900.SH"), candles(&[26.0, 26.1]), 50_000.0);

    strat.init(&mut host).unwrap();
    let store = strat.grid().unwrap();
    assert!(store.len() >= 2);
    assert!(store.invariants_hold());
    // Centered on the first close with the default-derived step
    assert!((store.lower_bound() - (26.0 - 4.0 * 0.3)).abs() < 1e-6);
    assert!((store.upper_bound() - (26.0 + 4.0 * 0.3)).abs() < 1e-6);
}

#[test]
fn test_trend_filter_blocks_buys_in_downtrend() {
    // Identical falling path, with and without the trend gate
    let falling: Vec<f64> = (0..20).map(|i| 12.0 - 0.1 * i as f64).collect();
    let mut tail = falling.clone();
    tail.push(9.4); // down-cross below the last grid center

    let run = |trend: Option<TrendFilter>| -> usize {
        let config = base_config();
        let mut grid = pinned_grid_config();
        grid.trend_filter = trend;
        let mut strat = GridStrategy::new(&config, grid).unwrap();
        let mut host = SimHost::new(Symbol::new("600900.SH"), candles(&tail), 100_000.0);
        for _ in 0..(falling.len() - 1) {
            host.advance();
        }
        strat.init(&mut host).unwrap();
        strat.on_bar(&mut host).unwrap(); // baseline
        host.advance();
        let report = strat.on_bar(&mut host).unwrap();
        report
            .trades
            .iter()
            .filter(|t| t.side == Side::Buy)
            .count()
    };

    let gated = run(Some(TrendFilter {
        fast_period: 3,
        slow_period: 5,
        long_ema_period: 8,
        long_margin: 0.01,
        require_rising_slope: true,
    }));
    let ungated = run(None);

    assert_eq!(gated, 0, "trend gate must suppress entries in a downtrend");
    assert!(ungated > 0, "without the gate the same cross buys");
}

#[test]
fn test_regeneration_near_edge_carries_open_lots() {
    let config = base_config();
    let mut grid = pinned_grid_config();
    grid.expand_buffer = 2; // rebuild when within 1.0 of an edge
    let mut strat = GridStrategy::new(&config, grid).unwrap();
    let mut host = host_with_tail(10.0, &[9.4, 8.7], 100_000.0);

    strat.init(&mut host).unwrap();
    let original_lower = strat.grid().unwrap().lower_bound();
    strat.on_bar(&mut host).unwrap(); // baseline

    host.advance();
    let report = strat.on_bar(&mut host).unwrap(); // buy at 9.5
    let bought = report.trades[0].quantity;

    host.advance(); // 8.7 is within 2 steps of the 8.0 edge: regenerate
    strat.on_bar(&mut host).unwrap();

    let store = strat.grid().unwrap();
    assert!(store.lower_bound() < original_lower, "grid did not re-center");
    // The open lot survived regeneration with its binding intact
    assert!(store.total_shares() >= bought);
    let idx = store.find(9.5).expect("carried level lost");
    assert_eq!(store.slots()[idx].shares, bought);
    assert!(store.invariants_hold());
}

#[test]
fn test_trend_reversal_exit_respects_profit_gate() {
    // Gate open through a shallow dip (buy), then the fast MA crosses under
    // the slow MA while price still clears the profit gate: the flip exits
    // the lot without a level crossing, and it is not a forced liquidation.
    let config = base_config();
    let mut grid = pinned_grid_config();
    grid.sell_on_trend_flip = true;
    grid.trend_filter = Some(TrendFilter {
        fast_period: 2,
        slow_period: 5,
        long_ema_period: 4,
        long_margin: -1.0, // baseline condition disabled for the scenario
        require_rising_slope: false,
    });
    let mut strat = GridStrategy::new(&config, grid).unwrap();

    // 20 rising bars 10.0 -> 11.9, shallow dip to 11.6, drift to 11.8
    let mut closes: Vec<f64> = (0..20).map(|i| 10.0 + 0.1 * i as f64).collect();
    closes.extend_from_slice(&[11.6, 11.8]);
    let mut host = SimHost::new(Symbol::new("600900.SH"), candles(&closes), 100_000.0);
    for _ in 0..19 {
        host.advance();
    }

    strat.init(&mut host).unwrap(); // grid centered on 11.9
    strat.on_bar(&mut host).unwrap(); // baseline, gate open

    host.advance();
    let report = strat.on_bar(&mut host).unwrap(); // dip buys the 11.9 level
    assert_eq!(report.trades.len(), 1);
    assert_eq!(report.trades[0].side, Side::Buy);
    let bought = report.trades[0].quantity;

    host.advance();
    let report = strat.on_bar(&mut host).unwrap(); // fast MA < slow MA now
    let sells: Vec<_> = report
        .trades
        .iter()
        .filter(|t| t.side == Side::Sell)
        .collect();
    assert_eq!(sells.len(), 1);
    assert_eq!(sells[0].quantity, bought);
    assert!(!report.forced_liquidation);
    assert!(report.realized_profit > 0.0);
    assert_eq!(strat.grid().unwrap().total_shares(), 0);
}

// =============================================================================
// MA Trend Scenarios
// =============================================================================

#[test]
fn test_ma_trend_full_cycle() {
    let config = base_config();
    let ma = MaTrendConfig {
        ma_period: 5,
        max_batches: 2,
        risk_ratio: 0.8,
        ..MaTrendConfig::default()
    };
    let mut strat = MaTrendStrategy::new(&config, ma).unwrap();

    // Warmup flat, breakout entry, then a take-profit spike
    let closes = vec![10.0, 10.0, 10.0, 10.0, 10.0, 10.6, 12.2];
    let mut host = SimHost::new(Symbol::new("600900.SH"), candles(&closes), 100_000.0);
    strat.init(&mut host).unwrap();
    for _ in 0..5 {
        host.advance();
    }

    let entry = strat.on_bar(&mut host).unwrap();
    assert_eq!(entry.trades.len(), 1);
    assert_eq!(entry.trades[0].side, Side::Buy);

    host.advance();
    let exit = strat.on_bar(&mut host).unwrap();
    let sells: Vec<_> = exit
        .trades
        .iter()
        .filter(|t| t.side == Side::Sell)
        .collect();
    assert_eq!(sells.len(), 1);
    assert!(exit.realized_profit > 0.0);
}

// =============================================================================
// Registry & Config
// =============================================================================

#[test]
fn test_registry_knows_both_strategies() {
    let available = available_strategies();
    assert!(available.contains(&"grid"));
    assert!(available.contains(&"ma_trend"));
}

#[test]
fn test_registry_rejects_unknown_strategy() {
    let mut config = Config::default();
    config.strategy_name = "martingale".to_string();
    let err = create_strategy(&config).unwrap_err();
    assert!(err.to_string().contains("Unknown strategy"));
}

#[test]
fn test_create_and_init_from_registry() {
    let mut config = base_config();
    config.strategy_name = "grid".to_string();
    config.strategy = serde_json::json!({
        "per_grid_ratio": 0.05,
        "levels_per_side": 5
    });

    let mut strategy = create_strategy(&config).unwrap();
    let mut host = host_with_tail(26.0, &[], 100_000.0);
    strategy.init(&mut host).unwrap();
    assert_eq!(strategy.name(), "grid");

    let report = strategy.on_bar(&mut host).unwrap();
    assert!(report.trades.is_empty()); // baseline cycle
}
