//! Technical indicators
//!
//! Moving averages are thin wrappers over the `ta` crate. True range and the
//! clamped ATR are implemented directly because the grid sizing needs
//! outlier-clamped averaging and a caller-supplied fallback, which `ta`'s
//! Wilder ATR does not provide.

use ta::indicators::{ExponentialMovingAverage, SimpleMovingAverage};
use ta::Next;

/// Calculate Simple Moving Average
///
/// Values before the warmup period are `None`.
pub fn sma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if values.is_empty() || period == 0 {
        return vec![];
    }

    let mut indicator = match SimpleMovingAverage::new(period) {
        Ok(i) => i,
        Err(_) => return vec![None; values.len()],
    };

    let mut result = Vec::with_capacity(values.len());

    for (i, &value) in values.iter().enumerate() {
        let sma_val = indicator.next(value);
        if i + 1 >= period {
            result.push(Some(sma_val));
        } else {
            result.push(None);
        }
    }

    result
}

/// Calculate Exponential Moving Average
pub fn ema(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if values.is_empty() || period == 0 {
        return vec![];
    }

    let mut indicator = match ExponentialMovingAverage::new(period) {
        Ok(i) => i,
        Err(_) => return vec![None; values.len()],
    };

    let mut result = Vec::with_capacity(values.len());

    for (i, &value) in values.iter().enumerate() {
        let ema_val = indicator.next(value);
        if i + 1 >= period {
            result.push(Some(ema_val));
        } else {
            result.push(None);
        }
    }

    result
}

/// Relative slope of the SMA at the last bar: `(ma_t - ma_{t-1}) / ma_{t-1}`.
///
/// Returns `None` with fewer than `period + 1` values.
pub fn ma_slope(values: &[f64], period: usize) -> Option<f64> {
    let series = sma(values, period);
    let len = series.len();
    if len < 2 {
        return None;
    }
    let curr = series[len - 1]?;
    let prev = series[len - 2]?;
    if prev == 0.0 {
        return None;
    }
    Some((curr - prev) / prev)
}

/// Calculate True Range per bar
///
/// The first bar has no previous close, so its TR is simply `high - low`.
pub fn true_range(high: &[f64], low: &[f64], close: &[f64]) -> Vec<f64> {
    let mut tr = Vec::with_capacity(high.len());

    for i in 0..high.len() {
        let tr_value = if i == 0 {
            high[i] - low[i]
        } else {
            let hl = high[i] - low[i];
            let hc = (high[i] - close[i - 1]).abs();
            let lc = (low[i] - close[i - 1]).abs();
            hl.max(hc).max(lc)
        };
        tr.push(tr_value);
    }

    tr
}

/// Average True Range with outlier clamping
///
/// True ranges above the 90th percentile are clamped to it before averaging
/// (when more than five samples exist), so a single gap day cannot dominate
/// the grid step size. The average is taken over the trailing `period`
/// values. Returns `None` with fewer than `period + 1` bars; callers that
/// must always produce a step size use [`atr_or_default`].
pub fn clamped_atr(high: &[f64], low: &[f64], close: &[f64], period: usize) -> Option<f64> {
    let len = high.len().min(low.len()).min(close.len());
    if period == 0 || len < period + 1 {
        return None;
    }

    // Drop the first synthetic TR (no previous close)
    let mut ranges: Vec<f64> = true_range(&high[..len], &low[..len], &close[..len])
        .into_iter()
        .skip(1)
        .collect();

    if ranges.len() > 5 {
        let mut sorted = ranges.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let cutoff = sorted[(sorted.len() as f64 * 0.9) as usize];
        for tr in ranges.iter_mut() {
            *tr = tr.min(cutoff);
        }
    }

    let tail = &ranges[ranges.len() - period.min(ranges.len())..];
    if tail.is_empty() {
        return None;
    }
    Some(tail.iter().sum::<f64>() / tail.len() as f64)
}

/// Clamped ATR, falling back to `default` when history is too short
pub fn atr_or_default(
    high: &[f64],
    low: &[f64],
    close: &[f64],
    period: usize,
    default: f64,
) -> f64 {
    match clamped_atr(high, low, close, period) {
        Some(atr) => atr,
        None => {
            tracing::debug!(
                have = close.len(),
                need = period + 1,
                default = default,
                "Insufficient history for ATR, using default"
            );
            default
        }
    }
}
