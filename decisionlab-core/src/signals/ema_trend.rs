//! Single-EMA trend rule.
//!
//! Entry when close > EMA(window); exit when close < EMA(window).
//! Strict mode requires the relation to hold on the previous bar as well.

use crate::domain::{Candle, SignalStrictness};
use crate::indicators::{Ema, Indicator};

use super::{SignalPair, SignalRule};

#[derive(Debug, Clone)]
pub struct EmaTrend {
    pub window: usize,
    pub strictness: SignalStrictness,
    name: String,
}

impl EmaTrend {
    pub fn new(window: usize, strictness: SignalStrictness) -> Self {
        assert!(window >= 1, "EMA window must be >= 1");
        Self {
            window,
            strictness,
            name: format!("ema_trend_{window}_{strictness}"),
        }
    }
}

impl SignalRule for EmaTrend {
    fn name(&self) -> &str {
        &self.name
    }

    fn warmup_bars(&self) -> usize {
        match self.strictness {
            SignalStrictness::Strict => 1,
            SignalStrictness::Relaxed => 0,
        }
    }

    fn generate(&self, candles: &[Candle]) -> SignalPair {
        let ema = Ema::new(self.window).compute(candles);
        let above: Vec<bool> = candles
            .iter()
            .zip(&ema)
            .map(|(c, &e)| c.close > e)
            .collect();
        let below: Vec<bool> = candles
            .iter()
            .zip(&ema)
            .map(|(c, &e)| c.close < e)
            .collect();

        match self.strictness {
            SignalStrictness::Relaxed => SignalPair::new(above, below),
            SignalStrictness::Strict => {
                SignalPair::new(confirmed(&above), confirmed(&below))
            }
        }
    }
}

/// Two-bar confirmation: true only where this bar and the previous bar agree.
fn confirmed(flags: &[bool]) -> Vec<bool> {
    (0..flags.len())
        .map(|i| i >= 1 && flags[i] && flags[i - 1])
        .collect()
}
