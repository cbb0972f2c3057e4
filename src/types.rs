//! Core data types used across the trading system

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OHLCV candlestick data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candle {
    pub datetime: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Validation failure for a single candle row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandleValidationError {
    HighBelowLow,
    NonPositivePrice,
    NegativeVolume,
}

impl std::fmt::Display for CandleValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CandleValidationError::HighBelowLow => write!(f, "high is below low"),
            CandleValidationError::NonPositivePrice => write!(f, "non-positive price"),
            CandleValidationError::NegativeVolume => write!(f, "negative volume"),
        }
    }
}

impl std::error::Error for CandleValidationError {}

impl Candle {
    /// Construct a validated candle. Rejects inverted ranges, non-positive
    /// prices, and negative volume.
    pub fn new(
        datetime: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Result<Self, CandleValidationError> {
        if high < low {
            return Err(CandleValidationError::HighBelowLow);
        }
        if open <= 0.0 || high <= 0.0 || low <= 0.0 || close <= 0.0 {
            return Err(CandleValidationError::NonPositivePrice);
        }
        if volume < 0.0 {
            return Err(CandleValidationError::NegativeVolume);
        }
        Ok(Candle {
            datetime,
            open,
            high,
            low,
            close,
            volume,
        })
    }
}

/// Instrument symbol (e.g. "600900.SH")
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol(pub String);

impl Symbol {
    pub fn new(s: impl Into<String>) -> Self {
        Symbol(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trade direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Point-in-time account state as reported by the host
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    /// Cash available for new orders
    pub available_cash: f64,
    /// Total account value (cash + positions)
    pub total_assets: f64,
    /// Host-reported position quantity for the traded instrument, in shares
    pub position_qty: u64,
}

/// Order submitted to the execution adapter. Quantities are whole shares;
/// callers are responsible for lot-size alignment before submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: Symbol,
    pub side: Side,
    pub quantity: u64,
    pub limit_price: f64,
    pub account_id: String,
}

/// Execution adapter acknowledgment. Fills are all-or-nothing from the
/// engine's perspective; partial-fill reconciliation happens via the next
/// account snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderAck {
    Accepted,
    Rejected { reason: String },
}

impl OrderAck {
    pub fn is_accepted(&self) -> bool {
        matches!(self, OrderAck::Accepted)
    }
}

/// One executed (acknowledged) trade, for reporting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub symbol: Symbol,
    pub side: Side,
    pub quantity: u64,
    pub price: f64,
    /// Grid level the trade was bound to, when applicable
    pub level: Option<f64>,
    /// Realized profit for sells, zero for buys
    pub realized_profit: f64,
}
