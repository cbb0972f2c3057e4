//! Grid level generation
//!
//! Levels are generated either from explicit bounds or around a center
//! price, rounded to the instrument tick, and must come out strictly
//! increasing. Step size is derived from ATR so the grid is tighter in calm
//! markets and wider in volatile ones, clamped at both ends to avoid
//! degenerate single-level or thousand-level grids.

use itertools::Itertools;

use crate::error::{EngineError, EngineResult};

/// How to lay the grid out
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GridSpec {
    /// `count + 1` evenly spaced levels over `[lower, upper]`
    Bounds { lower: f64, upper: f64, count: usize },
    /// `2 * levels_per_side + 1` levels spaced `step` apart around `center`
    Center {
        center: f64,
        step: f64,
        levels_per_side: usize,
    },
}

/// Round a price to the nearest tick
pub fn round_to_tick(price: f64, tick: f64) -> f64 {
    (price / tick).round() * tick
}

/// Derive a grid step from ATR: `clamp(round_to_tick(atr * scale))`.
///
/// The result never drops below one tick even if `min_step` is misconfigured
/// smaller than the tick.
pub fn step_from_atr(atr: f64, scale: f64, min_step: f64, max_step: f64, tick: f64) -> f64 {
    let raw = round_to_tick(atr * scale, tick);
    raw.clamp(min_step, max_step).max(tick)
}

/// Generate the ordered level set for a spec.
///
/// Fails when the layout parameters are malformed or tick rounding
/// collapses the grid below two distinct levels.
pub fn build_levels(spec: GridSpec, tick: f64) -> EngineResult<Vec<f64>> {
    if tick <= 0.0 {
        return Err(EngineError::InvalidConfig(format!(
            "tick size must be positive, got {}",
            tick
        )));
    }

    let raw: Vec<f64> = match spec {
        GridSpec::Bounds {
            lower,
            upper,
            count,
        } => {
            if upper <= lower {
                return Err(EngineError::InvalidConfig(format!(
                    "grid upper ({}) must exceed lower ({})",
                    upper, lower
                )));
            }
            if count == 0 {
                return Err(EngineError::InvalidConfig(
                    "grid level count must be positive".into(),
                ));
            }
            let step = (upper - lower) / count as f64;
            (0..=count).map(|i| lower + i as f64 * step).collect()
        }
        GridSpec::Center {
            center,
            step,
            levels_per_side,
        } => {
            if step <= 0.0 {
                return Err(EngineError::InvalidConfig(format!(
                    "grid step must be positive, got {}",
                    step
                )));
            }
            if levels_per_side == 0 {
                return Err(EngineError::InvalidConfig(
                    "grid must have at least one level per side".into(),
                ));
            }
            let n = levels_per_side as i64;
            (-n..=n).map(|i| center + i as f64 * step).collect()
        }
    };

    // Round to tick precision and drop collisions; two levels within half a
    // tick of each other would be ambiguous triggers.
    let levels: Vec<f64> = raw
        .into_iter()
        .map(|p| round_to_tick(p, tick))
        .dedup_by(|a, b| (a - b).abs() < tick / 2.0)
        .collect();

    if levels.len() < 2 {
        return Err(EngineError::InvalidConfig(
            "grid collapsed below two distinct levels after tick rounding".into(),
        ));
    }

    debug_assert!(levels.iter().tuple_windows().all(|(a, b)| a < b));

    Ok(levels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use itertools::Itertools;

    #[test]
    fn test_bounds_mode_level_count_and_spacing() {
        let levels = build_levels(
            GridSpec::Bounds {
                lower: 58.0,
                upper: 62.0,
                count: 10,
            },
            0.01,
        )
        .unwrap();

        assert_eq!(levels.len(), 11);
        assert_relative_eq!(levels[0], 58.0, epsilon = 1e-9);
        assert_relative_eq!(levels[10], 62.0, epsilon = 1e-9);
        assert_relative_eq!(levels[2], 58.8, epsilon = 1e-9);
    }

    #[test]
    fn test_center_mode_symmetric() {
        let levels = build_levels(
            GridSpec::Center {
                center: 26.0,
                step: 0.3,
                levels_per_side: 5,
            },
            0.01,
        )
        .unwrap();

        assert_eq!(levels.len(), 11);
        assert_relative_eq!(levels[5], 26.0, epsilon = 1e-9);
        assert_relative_eq!(levels[0], 24.5, epsilon = 1e-9);
        assert_relative_eq!(levels[10], 27.5, epsilon = 1e-9);
    }

    #[test]
    fn test_levels_strictly_increasing_after_rounding() {
        let levels = build_levels(
            GridSpec::Bounds {
                lower: 10.0,
                upper: 10.01,
                count: 7,
            },
            0.01,
        )
        .unwrap();

        assert!(levels.iter().tuple_windows().all(|(a, b)| a < b));
        assert_eq!(levels.len(), 2);
    }

    #[test]
    fn test_rejects_inverted_bounds() {
        let err = build_levels(
            GridSpec::Bounds {
                lower: 62.0,
                upper: 58.0,
                count: 10,
            },
            0.01,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig(_)));
    }

    #[test]
    fn test_rejects_collapsed_grid() {
        // Everything rounds onto one tick
        let err = build_levels(
            GridSpec::Bounds {
                lower: 10.000,
                upper: 10.004,
                count: 4,
            },
            0.01,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig(_)));
    }

    #[test]
    fn test_step_from_atr_clamps_both_ends() {
        assert_relative_eq!(step_from_atr(0.02, 0.5, 0.1, 1.0, 0.01), 0.1);
        assert_relative_eq!(step_from_atr(5.0, 0.5, 0.1, 1.0, 0.01), 1.0);
        assert_relative_eq!(step_from_atr(0.6, 0.5, 0.1, 1.0, 0.01), 0.3, epsilon = 1e-9);
        // Never below one tick
        assert!(step_from_atr(0.0, 0.5, 0.0, 1.0, 0.01) >= 0.01);
    }
}
