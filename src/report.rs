//! Session-level reporting
//!
//! Accumulates cycle outcomes into an equity curve and produces a summary
//! at the end of a run: trade counts, realized profit, maximum drawdown,
//! and equity volatility.

use statrs::statistics::Statistics;

use crate::strategies::CycleReport;
use crate::types::Side;

/// Accumulates per-cycle outcomes over a session
#[derive(Debug, Default)]
pub struct SessionTracker {
    equity_curve: Vec<f64>,
    cycles: usize,
    skipped: usize,
    buys: usize,
    sells: usize,
    forced_liquidations: usize,
    drift_cycles: usize,
    realized_profit: f64,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_cycle(&mut self, report: &CycleReport) {
        self.cycles += 1;
        if report.skipped.is_some() {
            self.skipped += 1;
            return;
        }
        self.equity_curve.push(report.equity);
        self.realized_profit = report.realized_profit;
        if report.forced_liquidation {
            self.forced_liquidations += 1;
        }
        if report.position_drift.is_some() {
            self.drift_cycles += 1;
        }
        for trade in &report.trades {
            match trade.side {
                Side::Buy => self.buys += 1,
                Side::Sell => self.sells += 1,
            }
        }
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            cycles: self.cycles,
            skipped: self.skipped,
            buys: self.buys,
            sells: self.sells,
            forced_liquidations: self.forced_liquidations,
            drift_cycles: self.drift_cycles,
            realized_profit: self.realized_profit,
            max_drawdown: max_drawdown(&self.equity_curve),
            equity_volatility: equity_volatility(&self.equity_curve),
        }
    }
}

/// Worst peak-to-trough decline over the curve, as a negative fraction
fn max_drawdown(equity: &[f64]) -> f64 {
    let mut peak = f64::MIN;
    let mut worst = 0.0_f64;
    for &e in equity {
        if e > peak {
            peak = e;
        }
        if peak > 0.0 {
            worst = worst.min((e - peak) / peak);
        }
    }
    worst
}

/// Standard deviation of per-cycle equity returns
fn equity_volatility(equity: &[f64]) -> f64 {
    let returns: Vec<f64> = equity
        .windows(2)
        .filter(|w| w[0] > 0.0)
        .map(|w| w[1] / w[0] - 1.0)
        .collect();
    if returns.len() < 2 {
        return 0.0;
    }
    returns.iter().std_dev()
}

/// End-of-session statistics
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub cycles: usize,
    pub skipped: usize,
    pub buys: usize,
    pub sells: usize,
    pub forced_liquidations: usize,
    pub drift_cycles: usize,
    pub realized_profit: f64,
    pub max_drawdown: f64,
    pub equity_volatility: f64,
}

impl std::fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "cycles:              {} ({} skipped)", self.cycles, self.skipped)?;
        writeln!(f, "trades:              {} buys / {} sells", self.buys, self.sells)?;
        writeln!(f, "realized profit:     {:.2}", self.realized_profit)?;
        writeln!(f, "max drawdown:        {:.2}%", self.max_drawdown * 100.0)?;
        writeln!(
            f,
            "equity volatility:   {:.4}%",
            self.equity_volatility * 100.0
        )?;
        writeln!(f, "forced liquidations: {}", self.forced_liquidations)?;
        write!(f, "drift cycles:        {}", self.drift_cycles)
    }
}
