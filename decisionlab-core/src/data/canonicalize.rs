//! Canonicalize candle series: sort, dedupe, drop void rows.

use crate::domain::Candle;

/// A canonical candle series plus what had to be removed to get there.
#[derive(Debug, Clone, Default)]
pub struct CanonicalCandles {
    pub candles: Vec<Candle>,
    /// Rows dropped because their timestamp was already present.
    pub duplicates_dropped: usize,
    /// Rows dropped because an OHLC value was missing.
    pub void_dropped: usize,
}

impl CanonicalCandles {
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.duplicates_dropped > 0 {
            warnings.push(format!(
                "{} duplicate timestamp(s) dropped (first occurrence kept)",
                self.duplicates_dropped
            ));
        }
        if self.void_dropped > 0 {
            warnings.push(format!(
                "{} candle(s) with missing prices dropped",
                self.void_dropped
            ));
        }
        warnings
    }
}

/// Sort by timestamp, keep the first occurrence of each timestamp, and drop
/// candles with missing prices.
///
/// The sort is stable, so among rows sharing a timestamp the one that came
/// first in the input survives.
pub fn canonicalize(candles: Vec<Candle>) -> CanonicalCandles {
    let total = candles.len();
    let mut valid: Vec<Candle> = candles.into_iter().filter(|c| !c.is_void()).collect();
    let void_dropped = total - valid.len();

    valid.sort_by_key(|c| c.timestamp);
    let before_dedup = valid.len();
    valid.dedup_by_key(|c| c.timestamp);

    CanonicalCandles {
        duplicates_dropped: before_dedup - valid.len(),
        void_dropped,
        candles: valid,
    }
}

/// True if timestamps are strictly increasing.
pub fn is_strictly_increasing(candles: &[Candle]) -> bool {
    candles.windows(2).all(|w| w[0].timestamp < w[1].timestamp)
}
