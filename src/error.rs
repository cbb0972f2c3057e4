//! Error taxonomy for the strategy engine
//!
//! Recoverable conditions (missing data, rejected orders) are ordinary
//! values the cycle runner logs and skips past; only configuration errors
//! are fatal, and only at setup time.

use thiserror::Error;

use crate::Side;

/// Unified error type for engine operations
#[derive(Debug, Error)]
pub enum EngineError {
    /// Price/history/account fetch returned nothing or too little.
    /// Recovered by skipping the cycle; never fatal.
    #[error("{what} unavailable: have {have} bars, need {need}")]
    DataUnavailable {
        what: &'static str,
        have: usize,
        need: usize,
    },

    /// Execution adapter refused the order. State is left untouched and the
    /// triggering condition re-evaluates fresh next cycle.
    #[error("order rejected: {side} {quantity} @ {price:.4}: {reason}")]
    OrderRejected {
        side: Side,
        quantity: u64,
        price: f64,
        reason: String,
    },

    /// Malformed configuration. Fatal at setup time; initialization must not
    /// complete.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl EngineError {
    /// Whether the condition is recoverable within the cycle loop
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, EngineError::InvalidConfig(_))
    }
}

/// Result alias used throughout the library
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        let err = EngineError::DataUnavailable {
            what: "history",
            have: 3,
            need: 15,
        };
        assert!(err.is_recoverable());

        let err = EngineError::OrderRejected {
            side: Side::Buy,
            quantity: 100,
            price: 26.1,
            reason: "market closed".into(),
        };
        assert!(err.is_recoverable());

        assert!(!EngineError::InvalidConfig("upper <= lower".into()).is_recoverable());
    }

    #[test]
    fn test_display_carries_context() {
        let err = EngineError::OrderRejected {
            side: Side::Sell,
            quantity: 200,
            price: 27.35,
            reason: "throttled".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("SELL"));
        assert!(msg.contains("200"));
        assert!(msg.contains("27.35"));
    }
}
