//! Simulated host for replay runs and tests
//!
//! Replays a candle series one bar at a time and models a cash account with
//! all-or-nothing fills at the limit price. Orders can be forced to reject
//! to exercise the engine's rejection paths.

use tracing::debug;

use crate::error::{EngineError, EngineResult};
use crate::types::{AccountSnapshot, Candle, OrderAck, OrderRequest, Side, Symbol};

use super::{AccountView, MarketData, OrderExecutor};

/// In-memory host replaying a candle series
pub struct SimHost {
    symbol: Symbol,
    candles: Vec<Candle>,
    /// Index of the current bar; history is everything up to and including it
    cursor: usize,
    cash: f64,
    position_qty: u64,
    commission_rate: f64,
    /// When true, the host advertises a live tick equal to the current close
    serve_ticks: bool,
    /// Test hook: refuse every order until cleared
    reject_orders: bool,
    accepted: Vec<OrderRequest>,
}

impl SimHost {
    pub fn new(symbol: Symbol, candles: Vec<Candle>, starting_cash: f64) -> Self {
        SimHost {
            symbol,
            candles,
            cursor: 0,
            cash: starting_cash,
            position_qty: 0,
            commission_rate: 0.0,
            serve_ticks: false,
            reject_orders: false,
            accepted: Vec::new(),
        }
    }

    pub fn with_commission(mut self, rate: f64) -> Self {
        self.commission_rate = rate;
        self
    }

    /// Serve the current close as a live tick instead of exercising the
    /// bar-close fallback
    pub fn with_ticks(mut self) -> Self {
        self.serve_ticks = true;
        self
    }

    /// Force rejection of all subsequent orders (test hook)
    pub fn set_reject_orders(&mut self, reject: bool) {
        self.reject_orders = reject;
    }

    /// Move to the next bar. Returns false once the series is exhausted.
    pub fn advance(&mut self) -> bool {
        if self.cursor + 1 < self.candles.len() {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    pub fn current_close(&self) -> Option<f64> {
        self.candles.get(self.cursor).map(|c| c.close)
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn position_qty(&self) -> u64 {
        self.position_qty
    }

    /// Externally adjust the position, simulating a manual trade outside the
    /// engine (reconciliation-drift scenarios)
    pub fn adjust_position(&mut self, delta: i64) {
        self.position_qty = (self.position_qty as i64 + delta).max(0) as u64;
    }

    /// Orders accepted so far, in placement order
    pub fn accepted_orders(&self) -> &[OrderRequest] {
        &self.accepted
    }
}

impl MarketData for SimHost {
    fn history(&self, lookback: usize) -> EngineResult<Vec<Candle>> {
        if self.candles.is_empty() {
            return Err(EngineError::DataUnavailable {
                what: "history",
                have: 0,
                need: lookback,
            });
        }
        let available = &self.candles[..=self.cursor.min(self.candles.len() - 1)];
        let start = available.len().saturating_sub(lookback);
        Ok(available[start..].to_vec())
    }

    fn tick_price(&self) -> Option<f64> {
        if self.serve_ticks {
            self.current_close()
        } else {
            None
        }
    }
}

impl AccountView for SimHost {
    fn snapshot(&self) -> EngineResult<AccountSnapshot> {
        let mark = self.current_close().ok_or(EngineError::DataUnavailable {
            what: "account mark price",
            have: 0,
            need: 1,
        })?;
        Ok(AccountSnapshot {
            available_cash: self.cash,
            total_assets: self.cash + self.position_qty as f64 * mark,
            position_qty: self.position_qty,
        })
    }
}

impl OrderExecutor for SimHost {
    fn place(&mut self, order: &OrderRequest) -> EngineResult<OrderAck> {
        if order.quantity == 0 {
            return Ok(OrderAck::Rejected {
                reason: "zero quantity".into(),
            });
        }
        if order.symbol != self.symbol {
            return Ok(OrderAck::Rejected {
                reason: format!("unknown symbol {}", order.symbol),
            });
        }
        if self.reject_orders {
            return Ok(OrderAck::Rejected {
                reason: "rejected by host".into(),
            });
        }

        match order.side {
            Side::Buy => {
                let cost =
                    order.quantity as f64 * order.limit_price * (1.0 + self.commission_rate);
                if cost > self.cash {
                    return Ok(OrderAck::Rejected {
                        reason: format!("insufficient cash: need {:.2}, have {:.2}", cost, self.cash),
                    });
                }
                self.cash -= cost;
                self.position_qty += order.quantity;
            }
            Side::Sell => {
                if order.quantity > self.position_qty {
                    return Ok(OrderAck::Rejected {
                        reason: format!(
                            "insufficient position: need {}, have {}",
                            order.quantity, self.position_qty
                        ),
                    });
                }
                let proceeds =
                    order.quantity as f64 * order.limit_price * (1.0 - self.commission_rate);
                self.cash += proceeds;
                self.position_qty -= order.quantity;
            }
        }

        debug!(
            side = %order.side,
            quantity = order.quantity,
            price = order.limit_price,
            "Simulated fill"
        );
        self.accepted.push(order.clone());
        Ok(OrderAck::Accepted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn candles(closes: &[f64]) -> Vec<Candle> {
        let start = Utc::now() - Duration::days(closes.len() as i64);
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Candle {
                datetime: start + Duration::days(i as i64),
                open: c,
                high: c * 1.01,
                low: c * 0.99,
                close: c,
                volume: 10_000.0,
            })
            .collect()
    }

    fn order(side: Side, quantity: u64, price: f64) -> OrderRequest {
        OrderRequest {
            symbol: Symbol::new("600900.SH"),
            side,
            quantity,
            limit_price: price,
            account_id: "test".into(),
        }
    }

    #[test]
    fn test_history_window() {
        let mut host = SimHost::new(Symbol::new("600900.SH"), candles(&[1.0, 2.0, 3.0]), 0.0);
        assert_eq!(host.history(10).unwrap().len(), 1);
        host.advance();
        host.advance();
        assert_eq!(host.history(2).unwrap().len(), 2);
        assert!(!host.advance());
    }

    #[test]
    fn test_buy_sell_roundtrip() {
        let mut host = SimHost::new(Symbol::new("600900.SH"), candles(&[10.0]), 10_000.0);

        assert!(host.place(&order(Side::Buy, 500, 10.0)).unwrap().is_accepted());
        assert_eq!(host.position_qty(), 500);
        assert!((host.cash() - 5_000.0).abs() < 1e-9);

        assert!(host.place(&order(Side::Sell, 500, 11.0)).unwrap().is_accepted());
        assert_eq!(host.position_qty(), 0);
        assert!((host.cash() - 10_500.0).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_overdrawn_buy_and_oversell() {
        let mut host = SimHost::new(Symbol::new("600900.SH"), candles(&[10.0]), 100.0);
        assert!(!host.place(&order(Side::Buy, 500, 10.0)).unwrap().is_accepted());
        assert!(!host.place(&order(Side::Sell, 1, 10.0)).unwrap().is_accepted());
        assert_eq!(host.accepted_orders().len(), 0);
    }

    #[test]
    fn test_forced_rejection() {
        let mut host = SimHost::new(Symbol::new("600900.SH"), candles(&[10.0]), 10_000.0);
        host.set_reject_orders(true);
        assert!(!host.place(&order(Side::Buy, 100, 10.0)).unwrap().is_accepted());
        host.set_reject_orders(false);
        assert!(host.place(&order(Side::Buy, 100, 10.0)).unwrap().is_accepted());
    }

    #[test]
    fn test_snapshot_marks_position() {
        let mut host = SimHost::new(Symbol::new("600900.SH"), candles(&[10.0, 12.0]), 10_000.0);
        host.place(&order(Side::Buy, 100, 10.0)).unwrap();
        host.advance();

        let snap = host.snapshot().unwrap();
        assert_eq!(snap.position_qty, 100);
        assert!((snap.total_assets - (9_000.0 + 1_200.0)).abs() < 1e-9);
    }
}
