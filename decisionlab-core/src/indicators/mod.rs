//! Indicator trait and concrete indicator implementations.
//!
//! Indicators are pure functions: candle history in, numeric series out, one
//! value per candle. Values that need more history than is available are
//! `f64::NAN`; signal rules treat NaN as "no signal".

pub mod atr;
pub mod donchian;
pub mod ema;
pub mod rsi;

pub use atr::Atr;
pub use donchian::{Donchian, DonchianBand};
pub use ema::Ema;
pub use rsi::Rsi;

use crate::domain::Candle;

/// Trait for indicators.
///
/// # Look-ahead contamination guard
/// No value at bar t may depend on candles after t. Every indicator must give
/// the same prefix on a truncated series as on the full series.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "ema_20", "atr_14").
    fn name(&self) -> &str;

    /// Number of leading bars that are `NaN`.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire candle series.
    fn compute(&self, candles: &[Candle]) -> Vec<f64>;
}

/// Shift a series forward by `by` bars, filling the head with NaN.
///
/// `shifted[t] == values[t - by]`, so a rolling window ending at t-1 can be
/// compared against bar t without the bar itself leaking in.
pub fn shifted(values: &[f64], by: usize) -> Vec<f64> {
    let n = values.len();
    let mut out = vec![f64::NAN; n];
    for i in by..n {
        out[i] = values[i - by];
    }
    out
}

/// Create synthetic candles from close prices for testing.
///
/// open = prev_close (or close for the first bar), high = max(open,close) + 1.0,
/// low = min(open,close) - 1.0, one hour apart.
#[cfg(test)]
pub fn make_candles(closes: &[f64]) -> Vec<Candle> {
    use chrono::{Duration, TimeZone, Utc};
    let base = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Candle {
                timestamp: base + Duration::hours(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000.0,
            }
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shifted_moves_values_forward() {
        let out = shifted(&[1.0, 2.0, 3.0], 1);
        assert!(out[0].is_nan());
        assert_eq!(out[1], 1.0);
        assert_eq!(out[2], 2.0);
    }

    #[test]
    fn shifted_past_length_is_all_nan() {
        let out = shifted(&[1.0, 2.0], 5);
        assert!(out.iter().all(|v| v.is_nan()));
    }
}
