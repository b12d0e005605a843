//! RSI mean-reversion rule: entry when RSI < entry threshold, exit when RSI > exit threshold.

use crate::domain::Candle;
use crate::indicators::{Indicator, Rsi};

use super::{SignalPair, SignalRule};

#[derive(Debug, Clone)]
pub struct RsiMeanReversion {
    pub window: usize,
    pub entry_below: f64,
    pub exit_above: f64,
    name: String,
}

impl RsiMeanReversion {
    pub fn new(window: usize, entry_below: f64, exit_above: f64) -> Self {
        assert!(window >= 1, "RSI window must be >= 1");
        Self {
            window,
            entry_below,
            exit_above,
            name: format!("rsi_mean_reversion_{window}_{entry_below}_{exit_above}"),
        }
    }
}

impl SignalRule for RsiMeanReversion {
    fn name(&self) -> &str {
        &self.name
    }

    fn warmup_bars(&self) -> usize {
        self.window
    }

    fn generate(&self, candles: &[Candle]) -> SignalPair {
        let rsi = Rsi::new(self.window).compute(candles);
        let entry = rsi.iter().map(|&r| r < self.entry_below).collect();
        let exit = rsi.iter().map(|&r| r > self.exit_above).collect();
        SignalPair::new(entry, exit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_candles;

    #[test]
    fn warmup_never_signals() {
        let candles = make_candles(&[105.0, 104.0, 103.0, 102.0, 101.0]);
        let signals = RsiMeanReversion::new(3, 30.0, 70.0).generate(&candles);
        assert_eq!(&signals.entry[..3], &[false, false, false]);
        assert!(signals.entry[3]);
    }

    #[test]
    fn oversold_then_recovery() {
        // Sharp losses pull RSI to 0, then gains push it above the exit level.
        let candles = make_candles(&[100.0, 99.0, 98.0, 97.0, 96.0, 104.0, 112.0]);
        let signals = RsiMeanReversion::new(3, 25.0, 55.0).generate(&candles);
        assert!(signals.entry[3] && signals.entry[4]);
        assert!(!signals.entry[6]);
        assert!(signals.exit[6]);
    }

    #[test]
    fn zero_loss_reads_neutral() {
        // Monotonic gains: RSI pinned at 50, neither below 30 nor above 55.
        let candles = make_candles(&[100.0, 101.0, 102.0, 103.0, 104.0]);
        let signals = RsiMeanReversion::new(3, 30.0, 55.0).generate(&candles);
        assert_eq!(signals, SignalPair::quiet(5));
    }
}
