//! Exponential Moving Average (EMA).
//!
//! Recursive: EMA[t] = alpha * close[t] + (1 - alpha) * EMA[t-1], alpha = 2/(period+1).
//! Seed: EMA[0] = close[0], so the series is defined from the first bar.
//! Lookback: 0.

use super::Indicator;
use crate::domain::Candle;

#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    name: String,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "EMA period must be >= 1");
        Self {
            period,
            name: format!("ema_{period}"),
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        ema_of_series(&closes, self.period)
    }
}

/// Compute raw EMA values from a pre-extracted f64 slice.
///
/// A NaN input taints every later value.
pub fn ema_of_series(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    if n == 0 || period == 0 {
        return result;
    }

    let alpha = 2.0 / (period as f64 + 1.0);
    let mut prev = values[0];
    result[0] = prev;

    for i in 1..n {
        if values[i].is_nan() || prev.is_nan() {
            for val in result.iter_mut().skip(i) {
                *val = f64::NAN;
            }
            return result;
        }
        let ema = alpha * values[i] + (1.0 - alpha) * prev;
        result[i] = ema;
        prev = ema;
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_candles, DEFAULT_EPSILON};

    #[test]
    fn ema_period_1_equals_close() {
        let candles = make_candles(&[100.0, 200.0, 300.0]);
        let result = Ema::new(1).compute(&candles);
        assert_approx(result[0], 100.0, DEFAULT_EPSILON);
        assert_approx(result[1], 200.0, DEFAULT_EPSILON);
        assert_approx(result[2], 300.0, DEFAULT_EPSILON);
    }

    #[test]
    fn ema_3_known_values() {
        // Closes: 10, 11, 12, 13
        // alpha = 2/(3+1) = 0.5, seeded with the first close
        // EMA = 10, 10.5, 11.25, 12.125
        let candles = make_candles(&[10.0, 11.0, 12.0, 13.0]);
        let result = Ema::new(3).compute(&candles);
        assert_approx(result[0], 10.0, DEFAULT_EPSILON);
        assert_approx(result[1], 10.5, DEFAULT_EPSILON);
        assert_approx(result[2], 11.25, DEFAULT_EPSILON);
        assert_approx(result[3], 12.125, DEFAULT_EPSILON);
    }

    #[test]
    fn ema_nan_propagates() {
        let mut candles = make_candles(&[10.0, 11.0, 12.0, 13.0]);
        candles[2].close = f64::NAN;
        let result = Ema::new(3).compute(&candles);
        assert_approx(result[1], 10.5, DEFAULT_EPSILON);
        assert!(result[2].is_nan());
        assert!(result[3].is_nan());
    }

    #[test]
    fn ema_empty_series() {
        assert!(Ema::new(5).compute(&[]).is_empty());
    }

    #[test]
    fn ema_no_lookahead() {
        let candles = make_candles(&[10.0, 12.0, 11.0, 15.0, 14.0, 16.0]);
        let full = Ema::new(4).compute(&candles);
        let truncated = Ema::new(4).compute(&candles[..4]);
        for i in 0..4 {
            assert_approx(full[i], truncated[i], DEFAULT_EPSILON);
        }
    }
}
