//! Moving-average trend gate
//!
//! A boolean regime filter built from a fast/slow SMA pair, a long EMA
//! baseline, and the slow-MA slope. The filter only ever gates new entries;
//! exits (including risk-forced liquidation) must never consult it.

use serde::{Deserialize, Serialize};

use crate::indicators::{ema, ma_slope, sma};

/// Trend filter parameters. All periods are in bars.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendFilter {
    /// Fast SMA period (default: 5)
    #[serde(default = "default_fast")]
    pub fast_period: usize,

    /// Slow SMA period (default: 20)
    #[serde(default = "default_slow")]
    pub slow_period: usize,

    /// Long EMA baseline period (default: 60)
    #[serde(default = "default_long")]
    pub long_ema_period: usize,

    /// The slow MA must sit this fraction above the long EMA (default: 1%)
    #[serde(default = "default_margin")]
    pub long_margin: f64,

    /// Additionally require a non-negative slow-MA slope (default: true)
    #[serde(default = "default_true")]
    pub require_rising_slope: bool,
}

fn default_fast() -> usize {
    5
}

fn default_slow() -> usize {
    20
}

fn default_long() -> usize {
    60
}

fn default_margin() -> f64 {
    0.01
}

fn default_true() -> bool {
    true
}

impl Default for TrendFilter {
    fn default() -> Self {
        TrendFilter {
            fast_period: default_fast(),
            slow_period: default_slow(),
            long_ema_period: default_long(),
            long_margin: default_margin(),
            require_rising_slope: default_true(),
        }
    }
}

impl TrendFilter {
    /// Bars of history needed before the filter can evaluate
    pub fn min_bars(&self) -> usize {
        self.fast_period
            .max(self.slow_period + 1)
            .max(self.long_ema_period)
    }

    /// Whether new entries are allowed given the close series.
    ///
    /// Returns `None` when the history is too short to decide; callers treat
    /// that as "do not enter" without treating it as an error.
    pub fn allows_entries(&self, closes: &[f64]) -> Option<bool> {
        if closes.len() < self.min_bars() {
            return None;
        }

        let fast = sma(closes, self.fast_period).last().copied()??;
        let slow = sma(closes, self.slow_period).last().copied()??;
        let long = ema(closes, self.long_ema_period).last().copied()??;

        let above_baseline = slow > long * (1.0 + self.long_margin);
        let short_term_up = fast > slow;
        let slope_ok = if self.require_rising_slope {
            ma_slope(closes, self.slow_period).map(|s| s > 0.0)?
        } else {
            true
        };

        let ok = above_baseline && short_term_up && slope_ok;
        tracing::debug!(
            fast = fast,
            slow = slow,
            long_ema = long,
            allows = ok,
            "Trend filter evaluated"
        );
        Some(ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> TrendFilter {
        TrendFilter {
            fast_period: 3,
            slow_period: 5,
            long_ema_period: 8,
            long_margin: 0.01,
            require_rising_slope: true,
        }
    }

    #[test]
    fn test_insufficient_history_is_none() {
        let closes = vec![10.0; 4];
        assert_eq!(filter().allows_entries(&closes), None);
    }

    #[test]
    fn test_uptrend_allows_entries() {
        let closes: Vec<f64> = (1..=30).map(|i| 10.0 + i as f64 * 0.5).collect();
        assert_eq!(filter().allows_entries(&closes), Some(true));
    }

    #[test]
    fn test_downtrend_blocks_entries() {
        let closes: Vec<f64> = (1..=30).map(|i| 30.0 - i as f64 * 0.5).collect();
        assert_eq!(filter().allows_entries(&closes), Some(false));
    }

    #[test]
    fn test_flat_market_blocks_entries() {
        // Slow MA cannot clear the 1% margin over the EMA in a flat series
        let closes = vec![20.0; 30];
        assert_eq!(filter().allows_entries(&closes), Some(false));
    }
}
