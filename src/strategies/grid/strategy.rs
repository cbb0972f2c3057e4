//! Grid trading decision engine
//!
//! One evaluation cycle: read price and account fresh, update peak equity,
//! run the risk triggers, regenerate the grid if the regime moved, then walk
//! the levels in ascending price order classifying crossings. Orders go to
//! the execution adapter first; grid state mutates only after a positive
//! acknowledgment, so a rejected order simply re-arms the same condition for
//! the next cycle.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::adapters::Host;
use crate::config::{Config, FeeConfig};
use crate::error::{EngineError, EngineResult};
use crate::grid::{
    build_levels, classify, round_to_tick, step_from_atr, Crossing, GridSpec, GridStore,
};
use crate::indicators::atr_or_default;
use crate::risk::RiskController;
use crate::strategies::{CycleReport, SkipReason, Strategy};
use crate::types::{AccountSnapshot, Candle, OrderAck, OrderRequest, Side, Symbol, TradeRecord};

use super::config::GridStrategyConfig;

#[derive(Debug)]
pub struct GridStrategy {
    symbol: Symbol,
    account_id: String,
    lot_size: u64,
    tick: f64,
    fees: FeeConfig,
    cooldown: Duration,
    lookback: usize,
    config: GridStrategyConfig,
    risk: RiskController,
    /// Present after a successful `init`
    store: Option<GridStore>,
    /// Step of the currently built grid
    step: f64,
    last_price: Option<f64>,
    last_eval: Option<DateTime<Utc>>,
    last_trend_ok: Option<bool>,
}

impl GridStrategy {
    pub fn new(config: &Config, strategy_config: GridStrategyConfig) -> EngineResult<Self> {
        config.validate()?;
        strategy_config.validate()?;

        let trend_bars = strategy_config
            .trend_filter
            .as_ref()
            .map(|f| f.min_bars())
            .unwrap_or(0);
        let lookback = config
            .engine
            .history_lookback
            .max(strategy_config.atr_period + 1)
            .max(trend_bars);

        Ok(GridStrategy {
            symbol: config.symbol(),
            account_id: config.account.account_id.clone(),
            lot_size: config.instrument.lot_size,
            tick: config.instrument.tick_size,
            fees: config.fees.clone(),
            cooldown: Duration::seconds(config.engine.cooldown_secs as i64),
            lookback,
            risk: RiskController::new(config.risk.max_drawdown, config.risk.max_risk_ratio),
            config: strategy_config,
            store: None,
            step: 0.0,
            last_price: None,
            last_eval: None,
            last_trend_ok: None,
        })
    }

    /// Explicitly re-enable buying after a drawdown stop
    pub fn rearm_risk(&mut self) {
        self.risk.rearm();
    }

    pub fn grid(&self) -> Option<&GridStore> {
        self.store.as_ref()
    }

    fn current_price(&self, host: &dyn Host, history: &[Candle]) -> Option<f64> {
        // Fallback chain: live tick, then latest bar close. No guessing.
        host.tick_price().or_else(|| history.last().map(|c| c.close))
    }

    fn derive_step(&self, history: &[Candle]) -> f64 {
        let high: Vec<f64> = history.iter().map(|c| c.high).collect();
        let low: Vec<f64> = history.iter().map(|c| c.low).collect();
        let close: Vec<f64> = history.iter().map(|c| c.close).collect();
        let atr = atr_or_default(
            &high,
            &low,
            &close,
            self.config.atr_period,
            self.config.default_atr,
        );
        step_from_atr(
            atr,
            self.config.grid_scale,
            self.config.min_step,
            self.config.max_step,
            self.tick,
        )
    }

    fn build_grid(&self, center: f64, step: f64) -> EngineResult<Vec<f64>> {
        build_levels(
            GridSpec::Center {
                center,
                step,
                levels_per_side: self.config.levels_per_side,
            },
            self.tick,
        )
    }

    /// Whether the level set should be rebuilt this cycle
    fn needs_rebuild(
        &self,
        store: &GridStore,
        price: f64,
        candidate_step: f64,
        trend_ok: bool,
    ) -> bool {
        let buffer = self.step * self.config.expand_buffer as f64;
        if price > store.upper_bound() - buffer || price < store.lower_bound() + buffer {
            debug!(price = price, "Price near grid edge, rebuilding");
            return true;
        }
        if self.step > 0.0
            && (candidate_step - self.step).abs() / self.step > self.config.step_rebuild_pct
        {
            debug!(
                old_step = self.step,
                new_step = candidate_step,
                "Volatility regime shift, rebuilding"
            );
            return true;
        }
        if self.config.recenter_on_trend_flip {
            if let Some(last) = self.last_trend_ok {
                if last != trend_ok {
                    debug!(trend_ok = trend_ok, "Trend flip, rebuilding");
                    return true;
                }
            }
        }
        false
    }

    fn trend_allows_buys(&self, history: &[Candle]) -> bool {
        match &self.config.trend_filter {
            // Undecidable (short history) counts as "do not enter"
            Some(filter) => {
                let closes: Vec<f64> = history.iter().map(|c| c.close).collect();
                filter.allows_entries(&closes).unwrap_or(false)
            }
            None => true,
        }
    }

    /// Shares affordable from `budget` at `exec_price`, floored to lots
    fn lot_shares(&self, budget: f64, exec_price: f64) -> u64 {
        if exec_price <= 0.0 || !budget.is_finite() || budget <= 0.0 {
            return 0;
        }
        let raw = (budget / exec_price) as u64;
        raw / self.lot_size * self.lot_size
    }

    #[allow(clippy::too_many_arguments)]
    fn try_buy(
        &self,
        host: &mut dyn Host,
        store: &mut GridStore,
        idx: usize,
        price: f64,
        snapshot: &AccountSnapshot,
        cash_remaining: &mut f64,
        report: &mut CycleReport,
    ) -> EngineResult<()> {
        let level = store.slots()[idx].price;

        if self.risk.buys_suspended() {
            debug!(level = level, "Buy skipped: suspended after drawdown stop");
            return Ok(());
        }
        if self
            .risk
            .exposure_exceeded(store.position_value(price), snapshot.total_assets)
        {
            debug!(level = level, "Buy skipped: exposure cap reached");
            return Ok(());
        }

        let limit = round_to_tick(self.fees.buy_exec_estimate(price), self.tick);
        let grid_value = snapshot.total_assets * self.config.per_grid_ratio;
        let budget = grid_value.min(*cash_remaining);
        let shares = self.lot_shares(budget, limit);

        if shares < self.lot_size {
            debug!(
                level = level,
                budget = budget,
                "Buy skipped: budget below one lot"
            );
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
                store.open_level(idx, shares, limit);
                *cash_remaining -= shares as f64 * limit;
                info!(
                    level = level,
                    shares = shares,
                    price = limit,
                    "Grid BUY filled"
                );
                report.trades.push(TradeRecord {
                    symbol: self.symbol.clone(),
                    side: Side::Buy,
                    quantity: shares,
                    price: limit,
                    level: Some(level),
                    realized_profit: 0.0,
                });
            }
            OrderAck::Rejected { reason } => {
                warn!(
                    level = level,
                    shares = shares,
                    price = limit,
                    reason = %reason,
                    "Grid BUY rejected, state unchanged"
                );
            }
        }
        Ok(())
    }

    fn try_sell(
        &self,
        host: &mut dyn Host,
        store: &mut GridStore,
        idx: usize,
        price: f64,
        forced: bool,
        report: &mut CycleReport,
    ) -> EngineResult<()> {
        let slot = &store.slots()[idx];
        let level = slot.price;
        let shares = slot.shares;
        let cost = match slot.cost_basis {
            Some(c) => c,
            None => return Ok(()),
        };

        if !forced && (price / cost - 1.0) < self.config.min_profit_pct {
            debug!(
                level = level,
                cost = cost,
                price = price,
                "Sell skipped: below minimum profit"
            );
            return Ok(());
        }

        let limit = round_to_tick(price * (1.0 - self.fees.slippage), self.tick);
        let order = OrderRequest {
            symbol: self.symbol.clone(),
            side: Side::Sell,
            quantity: shares,
            limit_price: limit,
            account_id: self.account_id.clone(),
        };

        match host.place(&order)? {
            OrderAck::Accepted => {
                let net = self.fees.net_profit(shares, cost, price);
                store.close_level(idx, net);
                info!(
                    level = level,
                    shares = shares,
                    price = limit,
                    net_profit = net,
                    forced = forced,
                    "Grid SELL filled"
                );
                report.trades.push(TradeRecord {
                    symbol: self.symbol.clone(),
                    side: Side::Sell,
                    quantity: shares,
                    price: limit,
                    level: Some(level),
                    realized_profit: net,
                });
            }
            OrderAck::Rejected { reason } => {
                warn!(
                    level = level,
                    shares = shares,
                    price = limit,
                    reason = %reason,
                    "Grid SELL rejected, state unchanged"
                );
            }
        }
        Ok(())
    }

    /// Sell every occupied level regardless of per-level profit state
    fn liquidate_all(
        &self,
        host: &mut dyn Host,
        store: &mut GridStore,
        price: f64,
        report: &mut CycleReport,
    ) -> EngineResult<()> {
        for idx in store.occupied_indices() {
            self.try_sell(host, store, idx, price, true, report)?;
        }
        report.forced_liquidation = true;
        Ok(())
    }

    fn evaluate_cycle(
        &mut self,
        host: &mut dyn Host,
        store: &mut GridStore,
    ) -> EngineResult<CycleReport> {
        // Every cycle starts from a clean read of current inputs
        let history = match host.history(self.lookback) {
            Ok(h) => h,
            Err(e) if e.is_recoverable() => {
                warn!(error = %e, "Cycle skipped: history unavailable");
                return Ok(CycleReport::skipped(SkipReason::InsufficientHistory));
            }
            Err(e) => return Err(e),
        };

        let price = match self.current_price(host, &history) {
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

        // Reconciliation against the host's view, before this cycle trades.
        // Never auto-corrected: an aggregate cannot be attributed to levels.
        let internal = store.total_shares();
        if internal != snapshot.position_qty {
            warn!(
                internal = internal,
                reported = snapshot.position_qty,
                "Position drift: engine inventory disagrees with account"
            );
            report.position_drift = Some((internal, snapshot.position_qty));
        }

        // Peak equity updates before the drawdown check
        let equity = snapshot.total_assets + store.realized_profit();
        self.risk.observe_equity(equity);
        report.equity = equity;

        if self.risk.drawdown_breached(equity) {
            warn!(
                equity = equity,
                peak = self.risk.peak_equity(),
                drawdown = self.risk.current_drawdown(equity),
                "Drawdown stop: liquidating all occupied levels"
            );
            self.liquidate_all(host, store, price, &mut report)?;
            self.risk.trip();
            self.last_price = Some(price);
            report.realized_profit = store.realized_profit();
            return Ok(report);
        }

        let trend_ok = self.trend_allows_buys(&history);

        // Regime checks may replace the trigger set; open lots carry over
        let candidate_step = self.derive_step(&history);
        if self.needs_rebuild(store, price, candidate_step, trend_ok) {
            match self.build_grid(price, candidate_step) {
                Ok(levels) => {
                    store.regenerate(&levels, self.tick)?;
                    self.step = candidate_step;
                    info!(
                        center = price,
                        step = candidate_step,
                        lower = store.lower_bound(),
                        upper = store.upper_bound(),
                        "Grid regenerated"
                    );
                }
                Err(e) => {
                    // Keep trading the old grid rather than aborting the cycle
                    warn!(error = %e, "Grid rebuild failed, keeping current levels");
                }
            }
        }

        // Trend reversal exits profitable levels; the profit gate holds
        if self.config.sell_on_trend_flip && self.last_trend_ok == Some(true) && !trend_ok {
            info!("Trend reversal: exiting levels that clear the profit gate");
            for idx in store.occupied_indices() {
                self.try_sell(host, store, idx, price, false, &mut report)?;
            }
        }
        self.last_trend_ok = Some(trend_ok);

        let prev = match self.last_price {
            Some(p) => p,
            None => {
                // First observation establishes the crossing baseline
                self.last_price = Some(price);
                report.realized_profit = store.realized_profit();
                return Ok(report);
            }
        };

        // Ascending price order: deterministic when several levels cross
        let mut cash_remaining = snapshot.available_cash;
        for idx in 0..store.len() {
            let (level, occupied) = {
                let slot = &store.slots()[idx];
                (slot.price, slot.occupied())
            };
            match classify(prev, price, level) {
                Crossing::Down if !occupied => {
                    if trend_ok {
                        self.try_buy(
                            host,
                            store,
                            idx,
                            price,
                            &snapshot,
                            &mut cash_remaining,
                            &mut report,
                        )?;
                    } else {
                        debug!(level = level, "Buy skipped: trend gate closed");
                    }
                }
                Crossing::Up if occupied => {
                    self.try_sell(host, store, idx, price, false, &mut report)?;
                }
                _ => {}
            }
        }

        self.last_price = Some(price);
        report.realized_profit = store.realized_profit();
        debug_assert!(store.invariants_hold());
        Ok(report)
    }
}

impl Strategy for GridStrategy {
    fn name(&self) -> &'static str {
        "grid"
    }

    fn init(&mut self, host: &mut dyn Host) -> EngineResult<()> {
        let history = host.history(self.lookback)?;
        let center = self
            .current_price(host, &history)
            .ok_or(EngineError::DataUnavailable {
                what: "initial price",
                have: history.len(),
                need: 1,
            })?;

        let step = self.derive_step(&history);
        let levels = self.build_grid(center, step)?;
        let store = GridStore::from_levels(&levels, self.tick)?;

        info!(
            symbol = %self.symbol,
            center = center,
            step = step,
            lower = store.lower_bound(),
            upper = store.upper_bound(),
            levels = store.len(),
            "Grid initialized"
        );

        self.step = step;
        self.store = Some(store);

        // Seed the equity high-water mark from the first snapshot
        if let Ok(snapshot) = host.snapshot() {
            self.risk.observe_equity(snapshot.total_assets);
        }

        Ok(())
    }

    fn on_bar(&mut self, host: &mut dyn Host) -> EngineResult<CycleReport> {
        let mut store = self
            .store
            .take()
            .ok_or_else(|| EngineError::InvalidConfig("on_bar before init".into()))?;
        let result = self.evaluate_cycle(host, &mut store);
        self.store = Some(store);
        result
    }
}
