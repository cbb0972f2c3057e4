//! Single-MA Trend Strategy
//!
//! Trend-following with staged entries: price holding above an N-day moving
//! average opens up to a fixed number of batches; each batch exits on take
//! profit, trailing stop from its high-water mark, hard stop loss, or a
//! technical sell when price falls back through the average.

mod config;
mod strategy;

pub use config::MaTrendConfig;
pub use strategy::MaTrendStrategy;

use crate::{Config, Strategy};
use anyhow::Result;

/// Create strategy from config (called by registry)
pub fn create(config: &Config) -> Result<Box<dyn Strategy>> {
    let strategy_config: MaTrendConfig = serde_json::from_value(config.strategy.clone())
        .map_err(|e| anyhow::anyhow!("Failed to parse ma_trend config: {}", e))?;
    Ok(Box::new(MaTrendStrategy::new(config, strategy_config)?))
}
