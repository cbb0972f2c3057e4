//! MA trend-following with staged batch entries
//!
//! Each batch is an independent lot with its own entry cost and high-water
//! mark. Entries stage in while price holds above the moving average; exits
//! are evaluated per batch before any new entry. The same order-first,
//! state-second discipline as the grid engine applies.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::adapters::Host;
use crate::config::{Config, FeeConfig};
use crate::error::EngineResult;
use crate::grid::round_to_tick;
use crate::indicators::sma;
use crate::risk::RiskController;
use crate::strategies::{CycleReport, SkipReason, Strategy};
use crate::types::{OrderAck, OrderRequest, Side, Symbol, TradeRecord};

use super::config::MaTrendConfig;

/// One staged entry
#[derive(Debug, Clone)]
struct Batch {
    /// All-in entry cost including slippage
    entry_cost: f64,
    shares: u64,
    high_water: f64,
}

/// Why a batch exits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExitTrigger {
    TakeProfit,
    TrailingStop,
    StopLoss,
    TechnicalSell,
}

#[derive(Debug)]
pub struct MaTrendStrategy {
    symbol: Symbol,
    account_id: String,
    lot_size: u64,
    tick: f64,
    fees: FeeConfig,
    cooldown: Duration,
    lookback: usize,
    config: MaTrendConfig,
    risk: RiskController,
    batches: Vec<Batch>,
    realized_profit: f64,
    last_eval: Option<DateTime<Utc>>,
}

impl MaTrendStrategy {
    pub fn new(config: &Config, strategy_config: MaTrendConfig) -> EngineResult<Self> {
        config.validate()?;
        strategy_config.validate()?;

        let lookback = config
            .engine
            .history_lookback
            .max(strategy_config.ma_period + 1);

        Ok(MaTrendStrategy {
            symbol: config.symbol(),
            account_id: config.account.account_id.clone(),
            lot_size: config.instrument.lot_size,
            tick: config.instrument.tick_size,
            fees: config.fees.clone(),
            cooldown: Duration::seconds(config.engine.cooldown_secs as i64),
            lookback,
            risk: RiskController::new(config.risk.max_drawdown, config.risk.max_risk_ratio),
            config: strategy_config,
            batches: Vec::new(),
            realized_profit: 0.0,
            last_eval: None,
        })
    }

    /// Explicitly re-enable buying after a drawdown stop
    pub fn rearm_risk(&mut self) {
        self.risk.rearm();
    }

    fn total_shares(&self) -> u64 {
        self.batches.iter().map(|b| b.shares).sum()
    }

    fn exit_trigger(&self, batch: &Batch, price: f64, ma: f64) -> Option<ExitTrigger> {
        if price >= batch.entry_cost * self.config.take_profit_ratio {
            return Some(ExitTrigger::TakeProfit);
        }
        if batch.high_water > 0.0
            && (batch.high_water - price) / batch.high_water >= self.config.trailing_stop_pct
        {
            return Some(ExitTrigger::TrailingStop);
        }
        if price <= batch.entry_cost * self.config.stop_loss_ratio {
            return Some(ExitTrigger::StopLoss);
        }
        if price < ma * (1.0 - self.config.sell_below_ma_pct) && price > batch.entry_cost {
            return Some(ExitTrigger::TechnicalSell);
        }
        None
    }

    fn sell_batch(
        &mut self,
        host: &mut dyn Host,
        batch_idx: usize,
        price: f64,
        trigger: Option<ExitTrigger>,
        report: &mut CycleReport,
    ) -> EngineResult<bool> {
        let batch = self.batches[batch_idx].clone();
        let limit = round_to_tick(price * (1.0 - self.fees.slippage), self.tick);
        let order = OrderRequest {
            symbol: self.symbol.clone(),
            side: Side::Sell,
            quantity: batch.shares,
            limit_price: limit,
            account_id: self.account_id.clone(),
        };

        match host.place(&order)? {
            OrderAck::Accepted => {
                let net = self.fees.net_profit(batch.shares, batch.entry_cost, price);
                self.realized_profit += net;
                self.batches.remove(batch_idx);
                info!(
                    shares = batch.shares,
                    price = limit,
                    net_profit = net,
                    trigger = ?trigger,
                    "Batch SELL filled"
                );
                report.trades.push(TradeRecord {
                    symbol: self.symbol.clone(),
                    side: Side::Sell,
                    quantity: batch.shares,
                    price: limit,
                    level: None,
                    realized_profit: net,
                });
                Ok(true)
            }
            OrderAck::Rejected { reason } => {
                warn!(
                    shares = batch.shares,
                    price = limit,
                    reason = %reason,
                    "Batch SELL rejected, batch retained"
                );
                Ok(false)
            }
        }
    }

    fn try_enter_batch(
        &mut self,
        host: &mut dyn Host,
        price: f64,
        available_cash: f64,
        total_assets: f64,
        report: &mut CycleReport,
    ) -> EngineResult<()> {
        if self.risk.buys_suspended() {
            debug!("Entry skipped: suspended after drawdown stop");
            return Ok(());
        }
        if self
            .risk
            .exposure_exceeded(self.total_shares() as f64 * price, total_assets)
        {
            debug!("Entry skipped: exposure cap reached");
            return Ok(());
        }

        let remaining = self.config.max_batches - self.batches.len();
        let batch_cash = available_cash * self.config.risk_ratio / remaining as f64;
        let limit = round_to_tick(self.fees.buy_exec_estimate(price), self.tick);
        let shares = if limit > 0.0 && batch_cash > 0.0 {
            ((batch_cash / limit) as u64) / self.lot_size * self.lot_size
        } else {
            0
        };

        if shares < self.lot_size {
            debug!(batch_cash = batch_cash, "Entry skipped: below one lot");
            return Ok(());
        }

        let order = OrderRequest {
            symbol: self.symbol.clone(),
            side: Side::Buy,
            quantity: shares,
            limit_price: limit,
            account_id: self.account_id.clone(),
        };

        match host.place(&order)? {
            OrderAck::Accepted => {
                self.batches.push(Batch {
                    entry_cost: limit,
                    shares,
                    high_water: limit,
                });
                info!(
                    batch = self.batches.len(),
                    shares = shares,
                    price = limit,
                    "Batch BUY filled"
                );
                report.trades.push(TradeRecord {
                    symbol: self.symbol.clone(),
                    side: Side::Buy,
                    quantity: shares,
                    price: limit,
                    level: None,
                    realized_profit: 0.0,
                });
            }
            OrderAck::Rejected { reason } => {
                warn!(
                    shares = shares,
                    price = limit,
                    reason = %reason,
                    "Batch BUY rejected, state unchanged"
                );
            }
        }
        Ok(())
    }

    /// Sell every batch regardless of per-batch exit conditions
    fn liquidate_all(
        &mut self,
        host: &mut dyn Host,
        price: f64,
        report: &mut CycleReport,
    ) -> EngineResult<()> {
        let mut idx = 0;
        while idx < self.batches.len() {
            if !self.sell_batch(host, idx, price, None, report)? {
                idx += 1; // rejected: keep the batch, move on
            }
        }
        report.forced_liquidation = true;
        Ok(())
    }
}

impl Strategy for MaTrendStrategy {
    fn name(&self) -> &'static str {
        "ma_trend"
    }

    fn init(&mut self, host: &mut dyn Host) -> EngineResult<()> {
        info!(
            symbol = %self.symbol,
            ma_period = self.config.ma_period,
            max_batches = self.config.max_batches,
            "MA trend strategy initialized"
        );
        if let Ok(snapshot) = host.snapshot() {
            self.risk.observe_equity(snapshot.total_assets);
        }
        Ok(())
    }

    fn on_bar(&mut self, host: &mut dyn Host) -> EngineResult<CycleReport> {
        let history = match host.history(self.lookback) {
            Ok(h) => h,
            Err(e) if e.is_recoverable() => {
                warn!(error = %e, "Cycle skipped: history unavailable");
                return Ok(CycleReport::skipped(SkipReason::InsufficientHistory));
            }
            Err(e) => return Err(e),
        };

        let price = match host
            .tick_price()
            .or_else(|| history.last().map(|c| c.close))
        {
            Some(p) => p,
            None => {
                warn!("Cycle skipped: no tick and no bar close");
                return Ok(CycleReport::skipped(SkipReason::NoPrice));
            }
        };

        let bar_time = history.last().map(|c| c.datetime).unwrap_or_else(Utc::now);
        if let Some(last) = self.last_eval {
            if bar_time.signed_duration_since(last) < self.cooldown {
                return Ok(CycleReport::skipped(SkipReason::Cooldown));
            }
        }
        self.last_eval = Some(bar_time);

        let snapshot = match host.snapshot() {
            Ok(s) => s,
            Err(e) if e.is_recoverable() => {
                warn!(error = %e, "Cycle skipped: account unavailable");
                return Ok(CycleReport::skipped(SkipReason::AccountUnavailable));
            }
            Err(e) => return Err(e),
        };

        let mut report = CycleReport::default();

        let internal = self.total_shares();
        if internal != snapshot.position_qty {
            warn!(
                internal = internal,
                reported = snapshot.position_qty,
                "Position drift: engine inventory disagrees with account"
            );
            report.position_drift = Some((internal, snapshot.position_qty));
        }

        let equity = snapshot.total_assets + self.realized_profit;
        self.risk.observe_equity(equity);
        report.equity = equity;

        if self.risk.drawdown_breached(equity) {
            warn!(
                equity = equity,
                peak = self.risk.peak_equity(),
                "Drawdown stop: liquidating all batches"
            );
            self.liquidate_all(host, price, &mut report)?;
            self.risk.trip();
            report.realized_profit = self.realized_profit;
            return Ok(report);
        }

        let closes: Vec<f64> = history.iter().map(|c| c.close).collect();
        let ma = match sma(&closes, self.config.ma_period).last().copied().flatten() {
            Some(v) => v,
            None => {
                debug!(
                    have = closes.len(),
                    need = self.config.ma_period,
                    "Cycle skipped: MA warmup"
                );
                return Ok(CycleReport::skipped(SkipReason::InsufficientHistory));
            }
        };

        for batch in self.batches.iter_mut() {
            batch.high_water = batch.high_water.max(price);
        }

        // Exits first, oldest batch first
        let mut idx = 0;
        while idx < self.batches.len() {
            match self.exit_trigger(&self.batches[idx], price, ma) {
                Some(trigger) => {
                    if !self.sell_batch(host, idx, price, Some(trigger), &mut report)? {
                        idx += 1;
                    }
                }
                None => idx += 1,
            }
        }

        // Then at most one new entry per cycle
        if price > ma && self.batches.len() < self.config.max_batches {
            self.try_enter_batch(
                host,
                price,
                snapshot.available_cash,
                snapshot.total_assets,
                &mut report,
            )?;
        }

        report.realized_profit = self.realized_profit;
        Ok(report)
    }
}
