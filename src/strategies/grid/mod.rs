//! Grid Trading Strategy
//!
//! Buys as price falls through discrete levels and sells each lot as price
//! rises back through them, with an ATR-adaptive level set, an optional
//! trend gate on entries, and drawdown/exposure risk controls.

mod config;
mod strategy;

pub use config::GridStrategyConfig;
pub use strategy::GridStrategy;

use crate::{Config, Strategy};
use anyhow::Result;

/// Create strategy from config (called by registry)
pub fn create(config: &Config) -> Result<Box<dyn Strategy>> {
    let strategy_config: GridStrategyConfig = serde_json::from_value(config.strategy.clone())
        .map_err(|e| anyhow::anyhow!("Failed to parse grid config: {}", e))?;
    Ok(Box::new(GridStrategy::new(config, strategy_config)?))
}
