//! Host platform adapter seams
//!
//! The strategies never talk to an exchange or a data feed directly; they
//! see the host platform through three narrow traits fixed at integration
//! time. Calls are synchronous — the host invokes one evaluation cycle at a
//! time and every adapter call resolves within it.

pub mod sim;

use crate::error::EngineResult;
use crate::types::{AccountSnapshot, Candle, OrderAck, OrderRequest};

pub use sim::SimHost;

/// Price feed: trailing history plus the live tick when one exists
pub trait MarketData {
    /// Trailing OHLCV history, oldest first, at most `lookback` bars.
    /// Too little data is reported as `DataUnavailable`, not an empty
    /// success.
    fn history(&self, lookback: usize) -> EngineResult<Vec<Candle>>;

    /// Live tick price, if the host has one this cycle. Strategies fall
    /// back to the latest bar close, and skip the cycle when both are
    /// absent.
    fn tick_price(&self) -> Option<f64>;
}

/// Account state: cash, total assets, and the host-reported position
pub trait AccountView {
    fn snapshot(&self) -> EngineResult<AccountSnapshot>;
}

/// Order placement. A fill is all-or-nothing from the engine's perspective;
/// anything other than `Accepted` leaves engine state untouched.
pub trait OrderExecutor {
    fn place(&mut self, order: &OrderRequest) -> EngineResult<OrderAck>;
}

/// The full host surface a strategy is driven against
pub trait Host: MarketData + AccountView + OrderExecutor {}

impl<T: MarketData + AccountView + OrderExecutor> Host for T {}
