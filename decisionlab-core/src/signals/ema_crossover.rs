//! Dual-EMA crossover rule.
//!
//! spread = EMA(fast) - EMA(slow)
//! Entry on the bar the spread turns positive (spread > 0, previous <= 0).
//! Exit on the bar it turns negative (spread < 0, previous >= 0).

use crate::domain::Candle;
use crate::indicators::{Ema, Indicator};

use super::{SignalPair, SignalRule};

#[derive(Debug, Clone)]
pub struct EmaCrossover {
    pub fast: usize,
    pub slow: usize,
    name: String,
}

impl EmaCrossover {
    pub fn new(fast: usize, slow: usize) -> Self {
        assert!(fast >= 1 && slow >= 1, "EMA windows must be >= 1");
        Self {
            fast,
            slow,
            name: format!("ema_crossover_{fast}_{slow}"),
        }
    }
}

impl SignalRule for EmaCrossover {
    fn name(&self) -> &str {
        &self.name
    }

    fn warmup_bars(&self) -> usize {
        1
    }

    fn generate(&self, candles: &[Candle]) -> SignalPair {
        let fast = Ema::new(self.fast).compute(candles);
        let slow = Ema::new(self.slow).compute(candles);
        let spread: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();

        let n = spread.len();
        let mut entry = vec![false; n];
        let mut exit = vec![false; n];
        for i in 1..n {
            let (prev, cur) = (spread[i - 1], spread[i]);
            // NaN compares false on both sides, so gaps never signal.
            entry[i] = cur > 0.0 && prev <= 0.0;
            exit[i] = cur < 0.0 && prev >= 0.0;
        }
        SignalPair::new(entry, exit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_candles;

    #[test]
    fn bullish_cross_fires_once() {
        // Spread starts at 0 (both EMAs seeded with close[0]) and turns positive on bar 1.
        let candles = make_candles(&[100.0, 105.0, 110.0, 115.0]);
        let signals = EmaCrossover::new(2, 10).generate(&candles);
        assert_eq!(signals.entry, vec![false, true, false, false]);
        assert!(signals.exit.iter().all(|&s| !s));
    }

    #[test]
    fn bearish_cross_exits() {
        let candles = make_candles(&[100.0, 105.0, 110.0, 90.0, 80.0]);
        let signals = EmaCrossover::new(2, 10).generate(&candles);
        assert!(signals.entry[1]);
        assert!(signals.exit[3]);
        assert!(!signals.exit[4]);
    }

    #[test]
    fn flat_series_never_crosses() {
        let candles = make_candles(&[100.0; 10]);
        let signals = EmaCrossover::new(3, 5).generate(&candles);
        assert_eq!(signals, SignalPair::quiet(10));
    }
}
