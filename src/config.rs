//! Configuration management
//!
//! JSON configuration with typed sections for the instrument, account,
//! fees, risk limits, and cycle pacing, plus an opaque `strategy` section
//! that the selected strategy deserializes itself. Validation runs at load
//! time; a malformed grid setup must never reach the first cycle.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{EngineError, EngineResult};
use crate::Symbol;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub instrument: InstrumentConfig,
    pub account: AccountConfig,
    #[serde(default)]
    pub fees: FeeConfig,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub engine: CycleConfig,
    #[serde(default = "default_strategy_name")]
    pub strategy_name: String,
    /// Strategy-specific parameters, deserialized by the strategy factory
    pub strategy: serde_json::Value,
}

fn default_strategy_name() -> String {
    "grid".to_string()
}

impl Config {
    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref()).context("Failed to read config file")?;
        let mut config: Config =
            serde_json::from_str(&contents).context("Failed to parse config JSON")?;

        // Account id may come from the environment instead of the file
        if let Ok(account_id) = std::env::var("STRATEGY_ACCOUNT_ID") {
            config.account.account_id = account_id;
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    pub fn symbol(&self) -> Symbol {
        Symbol::new(self.instrument.symbol.clone())
    }

    /// Setup-time validation. Failing here prevents initialization entirely.
    pub fn validate(&self) -> EngineResult<()> {
        if self.instrument.symbol.is_empty() {
            return Err(EngineError::InvalidConfig("instrument symbol is empty".into()));
        }
        if self.instrument.lot_size == 0 {
            return Err(EngineError::InvalidConfig("lot_size must be positive".into()));
        }
        if self.instrument.tick_size <= 0.0 {
            return Err(EngineError::InvalidConfig(format!(
                "tick_size must be positive, got {}",
                self.instrument.tick_size
            )));
        }
        if self.risk.max_drawdown >= 0.0 || self.risk.max_drawdown <= -1.0 {
            return Err(EngineError::InvalidConfig(format!(
                "max_drawdown must be a negative fraction in (-1, 0), got {}",
                self.risk.max_drawdown
            )));
        }
        if self.risk.max_risk_ratio <= 0.0 || self.risk.max_risk_ratio > 1.0 {
            return Err(EngineError::InvalidConfig(format!(
                "max_risk_ratio must be in (0, 1], got {}",
                self.risk.max_risk_ratio
            )));
        }
        if self.fees.slippage < 0.0 || self.fees.commission_rate < 0.0 || self.fees.stamp_tax_rate < 0.0
        {
            return Err(EngineError::InvalidConfig(
                "fee rates must be non-negative".into(),
            ));
        }
        if self.engine.history_lookback == 0 {
            return Err(EngineError::InvalidConfig(
                "history_lookback must be positive".into(),
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            instrument: InstrumentConfig::default(),
            account: AccountConfig::default(),
            fees: FeeConfig::default(),
            risk: RiskConfig::default(),
            engine: CycleConfig::default(),
            strategy_name: default_strategy_name(),
            strategy: serde_json::json!({}),
        }
    }
}

/// Traded instrument parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentConfig {
    /// Exchange symbol, e.g. "600900.SH"
    pub symbol: String,
    /// Minimum tradeable share increment (default: 100)
    #[serde(default = "default_lot_size")]
    pub lot_size: u64,
    /// Price precision (default: 0.01)
    #[serde(default = "default_tick_size")]
    pub tick_size: f64,
}

fn default_lot_size() -> u64 {
    100
}

fn default_tick_size() -> f64 {
    0.01
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        InstrumentConfig {
            symbol: "600900.SH".to_string(),
            lot_size: default_lot_size(),
            tick_size: default_tick_size(),
        }
    }
}

/// Trading account identity
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountConfig {
    #[serde(default)]
    pub account_id: String,
}

/// Transaction cost model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeConfig {
    /// Broker commission per side (default: 0.03 bps × 100)
    #[serde(default = "default_commission")]
    pub commission_rate: f64,
    /// Stamp tax, charged on sells (default: 0.1%)
    #[serde(default = "default_stamp_tax")]
    pub stamp_tax_rate: f64,
    /// Slippage estimate applied to execution price (default: 0.2%)
    #[serde(default = "default_slippage")]
    pub slippage: f64,
}

fn default_commission() -> f64 {
    0.0003
}

fn default_stamp_tax() -> f64 {
    0.001
}

fn default_slippage() -> f64 {
    0.002
}

impl Default for FeeConfig {
    fn default() -> Self {
        FeeConfig {
            commission_rate: default_commission(),
            stamp_tax_rate: default_stamp_tax(),
            slippage: default_slippage(),
        }
    }
}

impl FeeConfig {
    /// Conservative buy execution estimate at the current price
    pub fn buy_exec_estimate(&self, price: f64) -> f64 {
        price * (1.0 + self.slippage)
    }

    /// Net profit of closing `shares` bought at `cost_basis` (which already
    /// includes buy-side slippage) and sold at `sell_price`: proceeds after
    /// slippage, sell commission, and stamp tax, minus acquisition cost and
    /// buy commission.
    pub fn net_profit(&self, shares: u64, cost_basis: f64, sell_price: f64) -> f64 {
        let qty = shares as f64;
        let buy_total = cost_basis * qty;
        let buy_commission = buy_total * self.commission_rate;
        let sell_revenue = sell_price * qty * (1.0 - self.slippage);
        let sell_commission = sell_revenue * self.commission_rate;
        let sell_tax = sell_revenue * self.stamp_tax_rate;
        sell_revenue - sell_commission - sell_tax - buy_total - buy_commission
    }
}

/// Global risk limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Maximum drawdown from peak equity before forced liquidation,
    /// as a negative fraction (default: -5%)
    #[serde(default = "default_max_drawdown")]
    pub max_drawdown: f64,
    /// Maximum position_value / total_assets before new buys are suspended
    /// (default: 60%)
    #[serde(default = "default_max_risk_ratio")]
    pub max_risk_ratio: f64,
}

fn default_max_drawdown() -> f64 {
    -0.05
}

fn default_max_risk_ratio() -> f64 {
    0.6
}

impl Default for RiskConfig {
    fn default() -> Self {
        RiskConfig {
            max_drawdown: default_max_drawdown(),
            max_risk_ratio: default_max_risk_ratio(),
        }
    }
}

/// Cycle pacing and data-window parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleConfig {
    /// Minimum seconds between evaluated cycles; cycles inside the window
    /// are skipped whole (default: 30)
    #[serde(default = "default_cooldown")]
    pub cooldown_secs: u64,
    /// Bars of history requested each cycle (default: 120)
    #[serde(default = "default_lookback")]
    pub history_lookback: usize,
}

fn default_cooldown() -> u64 {
    30
}

fn default_lookback() -> usize {
    120
}

impl Default for CycleConfig {
    fn default() -> Self {
        CycleConfig {
            cooldown_secs: default_cooldown(),
            history_lookback: default_lookback(),
        }
    }
}
