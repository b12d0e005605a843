//! Run parameters: trend settings plus the execution policy.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How many consecutive bars must agree before the trend rule fires.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalStrictness {
    /// Two-bar confirmation: the relation must also hold on the previous bar.
    #[default]
    Strict,
    /// Single-bar signal.
    Relaxed,
}

impl SignalStrictness {
    pub const ALL: [SignalStrictness; 2] = [SignalStrictness::Strict, SignalStrictness::Relaxed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Relaxed => "relaxed",
        }
    }
}

impl fmt::Display for SignalStrictness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// When an entry signal is filled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillTiming {
    /// Fill at the following bar's open (falls back to this close on the last bar).
    #[default]
    NextBarOpen,
    /// Fill at the signal bar's close.
    SameBarClose,
}

impl FillTiming {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NextBarOpen => "next_bar_open",
            Self::SameBarClose => "same_bar_close",
        }
    }
}

/// Immutable parameter bundle for one backtest run.
///
/// `ema_window` and `strictness` drive the inline trend rule of the quick
/// variant; the remaining fields form the execution policy shared by every
/// signal family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestParams {
    pub ema_window: usize,
    pub strictness: SignalStrictness,
    pub fill_timing: FillTiming,
    /// Stop distance below the fill, in ATR multiples.
    pub stop_atr_mult: f64,
    /// Target distance above the fill, in ATR multiples.
    pub target_atr_mult: f64,
    /// Fee per side as a fraction of notional.
    pub fee_rate: f64,
    /// Adverse price adjustment per side as a fraction of price.
    pub slippage_rate: f64,
    pub initial_cash: f64,
    /// Bars to wait after an exit before a new entry may open.
    pub cooldown_bars: usize,
}

impl Default for BacktestParams {
    fn default() -> Self {
        Self {
            ema_window: 20,
            strictness: SignalStrictness::Strict,
            fill_timing: FillTiming::NextBarOpen,
            stop_atr_mult: 1.5,
            target_atr_mult: 2.5,
            fee_rate: 0.0006,
            slippage_rate: 0.0002,
            initial_cash: 10_000.0,
            cooldown_bars: 2,
        }
    }
}

impl BacktestParams {
    /// Copy of these params with a different trend setting.
    pub fn with_trend(&self, ema_window: usize, strictness: SignalStrictness) -> Self {
        Self {
            ema_window,
            strictness,
            ..self.clone()
        }
    }

    /// Frictionless copy (no fees, no slippage). Useful as a baseline.
    pub fn frictionless(&self) -> Self {
        Self {
            fee_rate: 0.0,
            slippage_rate: 0.0,
            ..self.clone()
        }
    }
}
