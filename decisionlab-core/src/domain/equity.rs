//! Equity trace samples — one per input candle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::trade::ExitReason;

/// What the engine did on a bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "reason")]
pub enum BarAction {
    Hold,
    Entry,
    Exit(ExitReason),
}

impl fmt::Display for BarAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hold => f.write_str("HOLD"),
            Self::Entry => f.write_str("ENTRY"),
            Self::Exit(reason) => write!(f, "EXIT:{reason}"),
        }
    }
}

/// Snapshot of the account at the end of one bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquitySample {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
    /// Price the position was valued at (close less slippage), or the close when flat.
    pub mark_price: f64,
    pub equity: f64,
    pub in_position: bool,
    pub action: BarAction,
    pub stop_price: Option<f64>,
    pub target_price: Option<f64>,
}

/// Extract the plain equity series from a trace.
pub fn equity_values(trace: &[EquitySample]) -> Vec<f64> {
    trace.iter().map(|s| s.equity).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_action_display() {
        assert_eq!(BarAction::Hold.to_string(), "HOLD");
        assert_eq!(BarAction::Entry.to_string(), "ENTRY");
        assert_eq!(
            BarAction::Exit(ExitReason::StopLoss).to_string(),
            "EXIT:stop_loss"
        );
    }
}
