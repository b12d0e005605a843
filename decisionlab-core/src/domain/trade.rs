//! TradeRecord — a completed round-trip trade.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    SignalExit,
    /// Still open after the last candle; closed at the final close.
    EndOfPeriod,
}

impl ExitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StopLoss => "stop_loss",
            Self::TakeProfit => "take_profit",
            Self::SignalExit => "signal_exit",
            Self::EndOfPeriod => "end_of_period",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A complete round-trip trade record: entry → exit.
///
/// Built in one piece when the position closes and never touched again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    // ── Entry ──
    pub entry_time: DateTime<Utc>,
    /// Raw entry fill price (before slippage).
    pub entry_price: f64,

    // ── Exit ──
    pub exit_time: DateTime<Utc>,
    /// Raw exit price (stop, target, or close), before slippage.
    pub exit_price: f64,
    pub reason: ExitReason,

    // ── Size ──
    pub units: f64,

    // ── PnL ──
    /// units × (slipped exit − slipped entry). Fees are reported separately.
    pub pnl: f64,
    /// Percent move from the slipped entry to the slipped exit.
    pub pnl_pct: f64,
    /// Entry fee plus exit fee.
    pub fees: f64,

    // ── Bracket ──
    pub stop_price: f64,
    pub target_price: f64,
}

impl TradeRecord {
    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }

    /// PnL after both fees.
    pub fn net_pnl(&self) -> f64 {
        self.pnl - self.fees
    }
}
