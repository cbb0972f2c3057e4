//! Portfolio-level risk controls
//!
//! Two independent triggers, evaluated every cycle before per-level logic:
//! a drawdown stop that forces full liquidation and latches a buy
//! suspension, and an exposure cap that only suppresses new buys. Peak
//! equity is a running non-decreasing maximum of
//! `total_assets + realized_profit`, updated before the drawdown check.

/// Risk controller owned by a strategy instance
#[derive(Debug, Clone)]
pub struct RiskController {
    /// Negative fraction, e.g. -0.05 for a 5% stop
    max_drawdown: f64,
    /// Maximum `position_value / total_assets` before buys are suppressed
    max_risk_ratio: f64,
    peak_equity: f64,
    /// Latched by a drawdown trip; cleared only by [`rearm`](Self::rearm)
    buys_suspended: bool,
}

impl RiskController {
    pub fn new(max_drawdown: f64, max_risk_ratio: f64) -> Self {
        RiskController {
            max_drawdown,
            max_risk_ratio,
            peak_equity: 0.0,
            buys_suspended: false,
        }
    }

    /// Update the peak-equity high-water mark
    pub fn observe_equity(&mut self, equity: f64) {
        if equity > self.peak_equity {
            self.peak_equity = equity;
        }
    }

    pub fn peak_equity(&self) -> f64 {
        self.peak_equity
    }

    /// Drawdown from peak as a signed fraction (zero or negative)
    pub fn current_drawdown(&self, equity: f64) -> f64 {
        if self.peak_equity <= 0.0 {
            return 0.0;
        }
        ((equity - self.peak_equity) / self.peak_equity).min(0.0)
    }

    /// Whether the drawdown stop fires at the given equity
    pub fn drawdown_breached(&self, equity: f64) -> bool {
        self.current_drawdown(equity) < self.max_drawdown
    }

    /// Latch the buy suspension after a drawdown-forced liquidation
    pub fn trip(&mut self) {
        if !self.buys_suspended {
            tracing::warn!(
                peak_equity = self.peak_equity,
                "Drawdown stop tripped, new buys suspended"
            );
        }
        self.buys_suspended = true;
    }

    /// Explicitly re-enable buying after a drawdown stop
    pub fn rearm(&mut self) {
        if self.buys_suspended {
            tracing::info!("Risk controller re-armed, buys enabled");
        }
        self.buys_suspended = false;
    }

    pub fn buys_suspended(&self) -> bool {
        self.buys_suspended
    }

    /// Whether the exposure cap blocks new buys at this position size
    pub fn exposure_exceeded(&self, position_value: f64, total_assets: f64) -> bool {
        if total_assets <= 0.0 {
            return true;
        }
        position_value / total_assets > self.max_risk_ratio
    }
}
