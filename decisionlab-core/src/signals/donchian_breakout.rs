//! Channel breakout rule.
//!
//! Entry when close > highest high of the prior `breakout` bars; exit when
//! close < lowest low of the prior `exit` bars. Both channels are shifted by
//! one so the signal bar is excluded from its own threshold.

use crate::domain::Candle;
use crate::indicators::{shifted, Donchian, Indicator};

use super::{SignalPair, SignalRule};

#[derive(Debug, Clone)]
pub struct DonchianBreakout {
    pub breakout: usize,
    pub exit: usize,
    name: String,
}

impl DonchianBreakout {
    pub fn new(breakout: usize, exit: usize) -> Self {
        assert!(breakout >= 1 && exit >= 1, "channel windows must be >= 1");
        Self {
            breakout,
            exit,
            name: format!("donchian_breakout_{breakout}_{exit}"),
        }
    }
}

impl SignalRule for DonchianBreakout {
    fn name(&self) -> &str {
        &self.name
    }

    fn warmup_bars(&self) -> usize {
        self.breakout.max(self.exit)
    }

    fn generate(&self, candles: &[Candle]) -> SignalPair {
        let upper = shifted(&Donchian::upper(self.breakout).compute(candles), 1);
        let lower = shifted(&Donchian::lower(self.exit).compute(candles), 1);

        let entry = candles.iter().zip(&upper).map(|(c, &u)| c.close > u).collect();
        let exit = candles.iter().zip(&lower).map(|(c, &l)| c.close < l).collect();
        SignalPair::new(entry, exit)
    }
}
