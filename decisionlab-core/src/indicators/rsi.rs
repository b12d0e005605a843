//! Relative Strength Index (RSI).
//!
//! Wilder smoothing (alpha = 1/period) of gains and losses, seeded with the
//! first price change.
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss)
//! Lookback: period (needs `period` price changes).
//! Edge case: avg_loss == 0 → RSI pinned to the neutral 50.

use super::Indicator;
use crate::domain::Candle;

/// Value reported when the loss average is zero.
pub const NEUTRAL_RSI: f64 = 50.0;

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    name: String,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        Self {
            period,
            name: format!("rsi_{period}"),
        }
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        let n = candles.len();
        let mut result = vec![f64::NAN; n];

        if n < self.period + 1 {
            return result;
        }

        let alpha = 1.0 / self.period as f64;
        let mut avg_gain = f64::NAN;
        let mut avg_loss = f64::NAN;

        for i in 1..n {
            let change = candles[i].close - candles[i - 1].close;
            if change.is_nan() {
                for val in result.iter_mut().skip(i) {
                    *val = f64::NAN;
                }
                return result;
            }
            let gain = change.max(0.0);
            let loss = (-change).max(0.0);

            if i == 1 {
                avg_gain = gain;
                avg_loss = loss;
            } else {
                avg_gain = alpha * gain + (1.0 - alpha) * avg_gain;
                avg_loss = alpha * loss + (1.0 - alpha) * avg_loss;
            }

            if i >= self.period {
                result[i] = compute_rsi(avg_gain, avg_loss);
            }
        }

        result
    }
}

fn compute_rsi(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        NEUTRAL_RSI
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}
