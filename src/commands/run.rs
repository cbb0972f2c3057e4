//! Replay Run Command
//!
//! Drives a strategy through the simulated host over a CSV candle series,
//! one evaluation cycle per bar, with optional pacing to mimic the host
//! platform's cadence. Recoverable cycle errors are logged and the loop
//! continues; only setup errors abort.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

use grid_strategies::adapters::SimHost;
use grid_strategies::data;
use grid_strategies::report::SessionTracker;
use grid_strategies::strategies::create_strategy;
use grid_strategies::Config;

pub struct RunArgs {
    pub config: String,
    pub data: PathBuf,
    pub cash: f64,
    pub interval_ms: u64,
    pub warmup: usize,
    pub strategy: Option<String>,
}

pub async fn execute(args: RunArgs) -> Result<()> {
    let mut config = Config::from_file(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config))?;

    if let Some(name) = args.strategy {
        config.strategy_name = name;
    }

    let candles = data::load_csv(&args.data)
        .with_context(|| format!("Failed to load candles from {}", args.data.display()))?;
    if candles.is_empty() {
        anyhow::bail!("No candles loaded from {}", args.data.display());
    }
    for warning in data::validate_chronology(&candles) {
        warn!("{}", warning);
    }

    info!(
        symbol = %config.symbol(),
        strategy = %config.strategy_name,
        bars = candles.len(),
        cash = args.cash,
        "Starting replay run"
    );

    let total_bars = candles.len();
    let mut host = SimHost::new(config.symbol(), candles, args.cash);

    // Position the host past the warmup window so indicators start warm
    let warmup = args.warmup.min(total_bars - 1);
    for _ in 0..warmup {
        host.advance();
    }

    let mut strategy = create_strategy(&config).context("Failed to create strategy")?;
    strategy
        .init(&mut host)
        .context("Strategy initialization failed")?;

    let mut tracker = SessionTracker::new();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping replay");
                break;
            }
            _ = sleep(Duration::from_millis(args.interval_ms)) => {
                match strategy.on_bar(&mut host) {
                    Ok(report) => {
                        for trade in &report.trades {
                            info!(
                                side = %trade.side,
                                quantity = trade.quantity,
                                price = trade.price,
                                profit = trade.realized_profit,
                                "Trade"
                            );
                        }
                        tracker.record_cycle(&report);
                    }
                    Err(e) if e.is_recoverable() => {
                        // The next cycle re-evaluates from a clean read
                        warn!(error = %e, "Cycle failed, continuing");
                    }
                    Err(e) => {
                        error!(error = %e, "Fatal engine error");
                        return Err(e.into());
                    }
                }

                if !host.advance() {
                    break;
                }
            }
        }
    }

    let summary = tracker.summary();
    println!("\n=== Session Summary ===");
    println!("{}", summary);
    println!(
        "final cash: {:.2} | final position: {} shares",
        host.cash(),
        host.position_qty()
    );

    Ok(())
}
