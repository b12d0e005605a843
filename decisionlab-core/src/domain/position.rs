//! Position — the single open long position owned by the engine loop.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An open long position.
///
/// Created on an entry fill and consumed by the matching exit; never shared
/// outside the engine loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Raw fill price before slippage.
    pub entry_price: f64,
    /// Fill price after slippage (what each unit actually cost).
    pub entry_cost: f64,
    pub entry_time: DateTime<Utc>,
    pub units: f64,
    /// Entry fee paid out of cash when the position opened.
    pub entry_fee: f64,
    pub stop_price: f64,
    pub target_price: f64,
}

impl Position {
    /// Mark-to-market value at `close`, haircut by the exit slippage.
    pub fn market_value(&self, close: f64, slippage_rate: f64) -> f64 {
        self.units * close * (1.0 - slippage_rate)
    }

    /// True when the bar range touches both the stop and the target.
    pub fn both_breached(&self, low: f64, high: f64) -> bool {
        low <= self.stop_price && high >= self.target_price
    }
}
