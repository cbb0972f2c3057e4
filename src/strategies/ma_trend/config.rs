//! MA Trend Strategy Configuration

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaTrendConfig {
    /// Moving average period in bars (default: 30)
    #[serde(default = "default_ma_period")]
    pub ma_period: usize,

    /// Maximum staged entry batches (default: 4)
    #[serde(default = "default_max_batches")]
    pub max_batches: usize,

    /// Fraction of available cash deployable across all batches
    /// (default: 0.85)
    #[serde(default = "default_risk_ratio")]
    pub risk_ratio: f64,

    /// Hard stop: exit a batch at entry × this ratio (default: 0.92)
    #[serde(default = "default_stop_loss")]
    pub stop_loss_ratio: f64,

    /// Take profit: exit a batch at entry × this ratio (default: 1.12)
    #[serde(default = "default_take_profit")]
    pub take_profit_ratio: f64,

    /// Trailing stop: exit when price gives back this fraction of the
    /// batch's high-water mark (default: 0.06)
    #[serde(default = "default_trailing_stop")]
    pub trailing_stop_pct: f64,

    /// Technical sell: price below MA × (1 − this) while the batch is
    /// profitable (default: 0.02)
    #[serde(default = "default_sell_below_ma")]
    pub sell_below_ma_pct: f64,
}

fn default_ma_period() -> usize {
    30
}

fn default_max_batches() -> usize {
    4
}

fn default_risk_ratio() -> f64 {
    0.85
}

fn default_stop_loss() -> f64 {
    0.92
}

fn default_take_profit() -> f64 {
    1.12
}

fn default_trailing_stop() -> f64 {
    0.06
}

fn default_sell_below_ma() -> f64 {
    0.02
}

impl Default for MaTrendConfig {
    fn default() -> Self {
        MaTrendConfig {
            ma_period: default_ma_period(),
            max_batches: default_max_batches(),
            risk_ratio: default_risk_ratio(),
            stop_loss_ratio: default_stop_loss(),
            take_profit_ratio: default_take_profit(),
            trailing_stop_pct: default_trailing_stop(),
            sell_below_ma_pct: default_sell_below_ma(),
        }
    }
}

impl MaTrendConfig {
    pub fn validate(&self) -> EngineResult<()> {
        if self.ma_period == 0 {
            return Err(EngineError::InvalidConfig("ma_period must be positive".into()));
        }
        if self.max_batches == 0 {
            return Err(EngineError::InvalidConfig(
                "max_batches must be positive".into(),
            ));
        }
        if self.risk_ratio <= 0.0 || self.risk_ratio > 1.0 {
            return Err(EngineError::InvalidConfig(format!(
                "risk_ratio must be in (0, 1], got {}",
                self.risk_ratio
            )));
        }
        if self.stop_loss_ratio >= 1.0 || self.stop_loss_ratio <= 0.0 {
            return Err(EngineError::InvalidConfig(format!(
                "stop_loss_ratio must be in (0, 1), got {}",
                self.stop_loss_ratio
            )));
        }
        if self.take_profit_ratio <= 1.0 {
            return Err(EngineError::InvalidConfig(format!(
                "take_profit_ratio must exceed 1, got {}",
                self.take_profit_ratio
            )));
        }
        if self.trailing_stop_pct <= 0.0 || self.trailing_stop_pct >= 1.0 {
            return Err(EngineError::InvalidConfig(format!(
                "trailing_stop_pct must be in (0, 1), got {}",
                self.trailing_stop_pct
            )));
        }
        Ok(())
    }
}
