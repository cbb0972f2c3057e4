//! Inspect Command
//!
//! Validates a configuration against a data file and prints the grid the
//! strategy would build right now: derived ATR, step, and the level set.
//! Useful before letting a config anywhere near an account.

use anyhow::{Context, Result};
use std::path::PathBuf;

use grid_strategies::data;
use grid_strategies::grid::{build_levels, step_from_atr, GridSpec};
use grid_strategies::indicators::{atr_or_default, clamped_atr};
use grid_strategies::strategies::grid::GridStrategyConfig;
use grid_strategies::Config;

pub fn execute(config_path: String, data_path: PathBuf) -> Result<()> {
    let config = Config::from_file(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path))?;

    let grid_config: GridStrategyConfig = serde_json::from_value(config.strategy.clone())
        .context("Failed to parse grid strategy section")?;
    grid_config.validate()?;

    let candles = data::load_csv(&data_path)
        .with_context(|| format!("Failed to load candles from {}", data_path.display()))?;
    if candles.is_empty() {
        anyhow::bail!("No candles loaded from {}", data_path.display());
    }

    let high: Vec<f64> = candles.iter().map(|c| c.high).collect();
    let low: Vec<f64> = candles.iter().map(|c| c.low).collect();
    let close: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let center = *close.last().expect("non-empty checked above");

    let atr_available = clamped_atr(&high, &low, &close, grid_config.atr_period).is_some();
    let atr = atr_or_default(
        &high,
        &low,
        &close,
        grid_config.atr_period,
        grid_config.default_atr,
    );
    let step = step_from_atr(
        atr,
        grid_config.grid_scale,
        grid_config.min_step,
        grid_config.max_step,
        config.instrument.tick_size,
    );

    let levels = build_levels(
        GridSpec::Center {
            center,
            step,
            levels_per_side: grid_config.levels_per_side,
        },
        config.instrument.tick_size,
    )?;

    println!("=== Grid Preview: {} ===", config.symbol());
    println!("bars loaded:     {}", candles.len());
    println!(
        "ATR({}):         {:.4}{}",
        grid_config.atr_period,
        atr,
        if atr_available { "" } else { " (default — insufficient history)" }
    );
    println!("step:            {:.4}", step);
    println!("center:          {:.4}", center);
    println!(
        "range:           {:.4} .. {:.4} ({} levels)",
        levels.first().expect("at least two levels"),
        levels.last().expect("at least two levels"),
        levels.len()
    );
    println!();
    for level in levels.iter().rev() {
        let marker = if (*level - center).abs() < step / 2.0 {
            "  <- current"
        } else {
            ""
        };
        println!("  {:>10.4}{}", level, marker);
    }

    Ok(())
}
