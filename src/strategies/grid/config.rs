//! Grid Strategy Configuration

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::trend::TrendFilter;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridStrategyConfig {
    /// Fraction of total assets deployed per grid level (default: 0.05)
    #[serde(default = "default_per_grid_ratio")]
    pub per_grid_ratio: f64,

    /// Minimum profit fraction before a level may sell, e.g. 0.01 = 1%
    /// (default: 0.01). Risk-forced liquidation ignores this gate.
    #[serde(default = "default_min_profit_pct")]
    pub min_profit_pct: f64,

    /// ATR period for step derivation (default: 14)
    #[serde(default = "default_atr_period")]
    pub atr_period: usize,

    /// ATR fallback when history is shorter than the period (default: 0.3)
    #[serde(default = "default_atr")]
    pub default_atr: f64,

    /// Step = ATR × this scale (default: 0.5)
    #[serde(default = "default_grid_scale")]
    pub grid_scale: f64,

    /// Lower clamp on the derived step (default: 0.1)
    #[serde(default = "default_min_step")]
    pub min_step: f64,

    /// Upper clamp on the derived step (default: 1.0)
    #[serde(default = "default_max_step")]
    pub max_step: f64,

    /// Levels on each side of the center price (default: 10)
    #[serde(default = "default_levels_per_side")]
    pub levels_per_side: usize,

    /// Rebuild when price comes within this many steps of a grid edge
    /// (default: 2)
    #[serde(default = "default_expand_buffer")]
    pub expand_buffer: usize,

    /// Rebuild when the freshly derived step deviates from the current one
    /// by more than this fraction (default: 0.25)
    #[serde(default = "default_step_rebuild_pct")]
    pub step_rebuild_pct: f64,

    /// Also rebuild (re-center) when the trend gate flips (default: false)
    #[serde(default)]
    pub recenter_on_trend_flip: bool,

    /// Exit occupied levels when the trend gate flips from open to closed.
    /// The minimum-profit gate still applies; only risk triggers bypass it.
    /// (default: false)
    #[serde(default)]
    pub sell_on_trend_flip: bool,

    /// Optional entry gate. Never consulted for exits.
    #[serde(default)]
    pub trend_filter: Option<TrendFilter>,
}

fn default_per_grid_ratio() -> f64 {
    0.05
}

fn default_min_profit_pct() -> f64 {
    0.01
}

fn default_atr_period() -> usize {
    14
}

fn default_atr() -> f64 {
    0.3
}

fn default_grid_scale() -> f64 {
    0.5
}

fn default_min_step() -> f64 {
    0.1
}

fn default_max_step() -> f64 {
    1.0
}

fn default_levels_per_side() -> usize {
    10
}

fn default_expand_buffer() -> usize {
    2
}

fn default_step_rebuild_pct() -> f64 {
    0.25
}

impl Default for GridStrategyConfig {
    fn default() -> Self {
        GridStrategyConfig {
            per_grid_ratio: default_per_grid_ratio(),
            min_profit_pct: default_min_profit_pct(),
            atr_period: default_atr_period(),
            default_atr: default_atr(),
            grid_scale: default_grid_scale(),
            min_step: default_min_step(),
            max_step: default_max_step(),
            levels_per_side: default_levels_per_side(),
            expand_buffer: default_expand_buffer(),
            step_rebuild_pct: default_step_rebuild_pct(),
            recenter_on_trend_flip: false,
            sell_on_trend_flip: false,
            trend_filter: None,
        }
    }
}

impl GridStrategyConfig {
    pub fn validate(&self) -> EngineResult<()> {
        if self.per_grid_ratio <= 0.0 || self.per_grid_ratio > 1.0 {
            return Err(EngineError::InvalidConfig(format!(
                "per_grid_ratio must be in (0, 1], got {}",
                self.per_grid_ratio
            )));
        }
        if self.min_profit_pct < 0.0 {
            return Err(EngineError::InvalidConfig(
                "min_profit_pct must be non-negative".into(),
            ));
        }
        if self.atr_period == 0 {
            return Err(EngineError::InvalidConfig("atr_period must be positive".into()));
        }
        if self.default_atr <= 0.0 || self.grid_scale <= 0.0 {
            return Err(EngineError::InvalidConfig(
                "default_atr and grid_scale must be positive".into(),
            ));
        }
        if self.min_step <= 0.0 || self.max_step < self.min_step {
            return Err(EngineError::InvalidConfig(format!(
                "step clamps malformed: min {} max {}",
                self.min_step, self.max_step
            )));
        }
        if self.levels_per_side == 0 {
            return Err(EngineError::InvalidConfig(
                "levels_per_side must be positive".into(),
            ));
        }
        Ok(())
    }
}
