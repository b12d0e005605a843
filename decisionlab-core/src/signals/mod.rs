//! Signal generation — candles in, (entry, exit) boolean sequences out.
//!
//! Rules must NEVER depend on engine state (cash, open position, cooldown).
//! They represent pure market timing logic based on OHLC data only.
//!
//! Family dispatch is a closed enum: [`StrategySpec`] carries the parameters
//! of one family and builds the matching rule.

pub mod donchian_breakout;
pub mod ema_crossover;
pub mod ema_trend;
pub mod rsi_reversion;

pub use donchian_breakout::DonchianBreakout;
pub use ema_crossover::EmaCrossover;
pub use ema_trend::EmaTrend;
pub use rsi_reversion::RsiMeanReversion;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::domain::{Candle, SignalStrictness};
use crate::engine::EngineError;

/// Entry and exit flags, one per candle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalPair {
    pub entry: Vec<bool>,
    pub exit: Vec<bool>,
}

impl SignalPair {
    pub fn new(entry: Vec<bool>, exit: Vec<bool>) -> Self {
        Self { entry, exit }
    }

    /// No signal on any of `len` bars.
    pub fn quiet(len: usize) -> Self {
        Self {
            entry: vec![false; len],
            exit: vec![false; len],
        }
    }

    /// Build from externally supplied sequences that may contain gaps.
    ///
    /// Any `None` is rejected with the index of the first gap.
    pub fn from_optional(entry: &[Option<bool>], exit: &[Option<bool>]) -> Result<Self, EngineError> {
        Ok(Self {
            entry: require_all(entry, "entry")?,
            exit: require_all(exit, "exit")?,
        })
    }

    /// Length of the entry sequence.
    pub fn len(&self) -> usize {
        self.entry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entry.is_empty()
    }
}

fn require_all(values: &[Option<bool>], which: &'static str) -> Result<Vec<bool>, EngineError> {
    values
        .iter()
        .enumerate()
        .map(|(index, v)| v.ok_or(EngineError::MissingSignal { which, index }))
        .collect()
}

/// Portfolio-agnostic signal rule.
///
/// # Invariants
/// - `generate()` MUST be deterministic for the same candle sequence
/// - both returned sequences have exactly `candles.len()` entries
/// - bars without enough history are `false`, never undefined
/// - the value at bar t never depends on candles after t
pub trait SignalRule: Send + Sync {
    /// Rule name for logging and run records.
    fn name(&self) -> &str;

    /// Leading bars on which the rule cannot fire.
    fn warmup_bars(&self) -> usize;

    fn generate(&self, candles: &[Candle]) -> SignalPair;
}

// ── Strategy families ──

/// Signal family identifier, in lab order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyFamily {
    EmaTrend,
    EmaCrossover,
    RsiMeanReversion,
    DonchianBreakout,
}

impl StrategyFamily {
    pub const ALL: [StrategyFamily; 4] = [
        StrategyFamily::EmaTrend,
        StrategyFamily::EmaCrossover,
        StrategyFamily::RsiMeanReversion,
        StrategyFamily::DonchianBreakout,
    ];

    /// Stable id used in candidate ids and run records.
    pub fn id(&self) -> &'static str {
        match self {
            Self::EmaTrend => "ema_trend",
            Self::EmaCrossover => "ema_crossover",
            Self::RsiMeanReversion => "rsi_mean_reversion",
            Self::DonchianBreakout => "donchian_breakout",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::EmaTrend => "EMA Trend",
            Self::EmaCrossover => "EMA Crossover",
            Self::RsiMeanReversion => "RSI Mean Reversion",
            Self::DonchianBreakout => "Donchian Breakout",
        }
    }
}

impl fmt::Display for StrategyFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// One signal family together with its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum StrategySpec {
    EmaTrend {
        ema_window: usize,
        strictness: SignalStrictness,
    },
    EmaCrossover {
        fast_ema: usize,
        slow_ema: usize,
    },
    RsiMeanReversion {
        rsi_window: usize,
        entry_rsi: f64,
        exit_rsi: f64,
    },
    DonchianBreakout {
        breakout_window: usize,
        exit_window: usize,
    },
}

impl StrategySpec {
    pub fn family(&self) -> StrategyFamily {
        match self {
            Self::EmaTrend { .. } => StrategyFamily::EmaTrend,
            Self::EmaCrossover { .. } => StrategyFamily::EmaCrossover,
            Self::RsiMeanReversion { .. } => StrategyFamily::RsiMeanReversion,
            Self::DonchianBreakout { .. } => StrategyFamily::DonchianBreakout,
        }
    }

    /// Reject parameters no rule can be built from.
    pub fn validate(&self) -> Result<(), EngineError> {
        let invalid = |msg: String| Err(EngineError::InvalidParams(msg));
        match *self {
            Self::EmaTrend { ema_window, .. } if ema_window == 0 => {
                invalid("ema_window must be >= 1".into())
            }
            Self::EmaCrossover { fast_ema, slow_ema } if fast_ema == 0 || slow_ema == 0 => {
                invalid(format!("EMA windows must be >= 1 (fast={fast_ema}, slow={slow_ema})"))
            }
            Self::RsiMeanReversion { rsi_window, .. } if rsi_window == 0 => {
                invalid("rsi_window must be >= 1".into())
            }
            Self::RsiMeanReversion {
                entry_rsi, exit_rsi, ..
            } if !(0.0..=100.0).contains(&entry_rsi) || !(0.0..=100.0).contains(&exit_rsi) => {
                invalid(format!("RSI thresholds must lie in [0, 100] (entry={entry_rsi}, exit={exit_rsi})"))
            }
            Self::DonchianBreakout {
                breakout_window,
                exit_window,
            } if breakout_window == 0 || exit_window == 0 => invalid(format!(
                "channel windows must be >= 1 (breakout={breakout_window}, exit={exit_window})"
            )),
            _ => Ok(()),
        }
    }

    /// Build the rule for this family. Call [`validate`](Self::validate) first.
    pub fn rule(&self) -> Box<dyn SignalRule> {
        match *self {
            Self::EmaTrend {
                ema_window,
                strictness,
            } => Box::new(EmaTrend::new(ema_window, strictness)),
            Self::EmaCrossover { fast_ema, slow_ema } => Box::new(EmaCrossover::new(fast_ema, slow_ema)),
            Self::RsiMeanReversion {
                rsi_window,
                entry_rsi,
                exit_rsi,
            } => Box::new(RsiMeanReversion::new(rsi_window, entry_rsi, exit_rsi)),
            Self::DonchianBreakout {
                breakout_window,
                exit_window,
            } => Box::new(DonchianBreakout::new(breakout_window, exit_window)),
        }
    }

    /// Validate, then generate the signal pair.
    pub fn build_signals(&self, candles: &[Candle]) -> Result<SignalPair, EngineError> {
        self.validate()?;
        Ok(self.rule().generate(candles))
    }

    /// Human-readable rule description.
    pub fn describe(&self) -> String {
        match self {
            Self::EmaTrend { ema_window, .. } => format!(
                "Long when close is above EMA({ema_window}); exit when close falls below EMA({ema_window})."
            ),
            Self::EmaCrossover { fast_ema, slow_ema } => format!(
                "Long on fast EMA({fast_ema}) crossing above slow EMA({slow_ema}); exit on bearish cross."
            ),
            Self::RsiMeanReversion {
                rsi_window,
                entry_rsi,
                exit_rsi,
            } => format!("Long when RSI({rsi_window}) < {entry_rsi}; exit when RSI > {exit_rsi}."),
            Self::DonchianBreakout {
                breakout_window,
                exit_window,
            } => format!(
                "Long when close breaks above {breakout_window}-bar high; exit below {exit_window}-bar low."
            ),
        }
    }

    /// Parameters as an ordered name → value map, for tables and records.
    pub fn params(&self) -> BTreeMap<&'static str, String> {
        let mut map = BTreeMap::new();
        match self {
            Self::EmaTrend {
                ema_window,
                strictness,
            } => {
                map.insert("ema_window", ema_window.to_string());
                map.insert("strictness", strictness.to_string());
            }
            Self::EmaCrossover { fast_ema, slow_ema } => {
                map.insert("fast_ema", fast_ema.to_string());
                map.insert("slow_ema", slow_ema.to_string());
            }
            Self::RsiMeanReversion {
                rsi_window,
                entry_rsi,
                exit_rsi,
            } => {
                map.insert("rsi_window", rsi_window.to_string());
                map.insert("entry_rsi", entry_rsi.to_string());
                map.insert("exit_rsi", exit_rsi.to_string());
            }
            Self::DonchianBreakout {
                breakout_window,
                exit_window,
            } => {
                map.insert("breakout_window", breakout_window.to_string());
                map.insert("exit_window", exit_window.to_string());
            }
        }
        map
    }

    /// Compact `k=v` label, e.g. `fast_ema=10,slow_ema=50`.
    pub fn params_label(&self) -> String {
        self.params()
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_candles;

    #[test]
    fn from_optional_rejects_gaps() {
        let err = SignalPair::from_optional(&[Some(true), None], &[Some(false), Some(false)]).unwrap_err();
        assert_eq!(
            err,
            EngineError::MissingSignal {
                which: "entry",
                index: 1
            }
        );
    }

    #[test]
    fn from_optional_accepts_complete() {
        let pair = SignalPair::from_optional(&[Some(true), Some(false)], &[Some(false), Some(true)]).unwrap();
        assert_eq!(pair.entry, vec![true, false]);
        assert_eq!(pair.exit, vec![false, true]);
    }

    #[test]
    fn family_ids_in_lab_order() {
        let ids: Vec<_> = StrategyFamily::ALL.iter().map(|f| f.id()).collect();
        assert_eq!(ids, vec!["ema_trend", "ema_crossover", "rsi_mean_reversion", "donchian_breakout"]);
    }

    #[test]
    fn spec_serde_is_tagged_by_family() {
        let spec = StrategySpec::EmaCrossover {
            fast_ema: 10,
            slow_ema: 50,
        };
        let json = serde_json::to_string(&spec).unwrap();
        assert!(json.contains(r#""family":"ema_crossover""#));
        let back: StrategySpec = serde_json::from_str(&json).unwrap();
        assert_eq!(back, spec);
    }

    #[test]
    fn describe_fills_parameters() {
        let spec = StrategySpec::DonchianBreakout {
            breakout_window: 20,
            exit_window: 10,
        };
        assert_eq!(
            spec.describe(),
            "Long when close breaks above 20-bar high; exit below 10-bar low."
        );
        let rsi = StrategySpec::RsiMeanReversion {
            rsi_window: 14,
            entry_rsi: 30.0,
            exit_rsi: 55.0,
        };
        assert_eq!(rsi.describe(), "Long when RSI(14) < 30; exit when RSI > 55.");
    }

    #[test]
    fn zero_window_is_invalid() {
        let spec = StrategySpec::EmaTrend {
            ema_window: 0,
            strictness: SignalStrictness::Strict,
        };
        assert!(matches!(spec.validate(), Err(EngineError::InvalidParams(_))));
        assert!(spec.build_signals(&make_candles(&[1.0, 2.0])).is_err());
    }

    #[test]
    fn every_family_returns_full_length() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + (i as f64 * 0.4).sin() * 3.0).collect();
        let candles = make_candles(&closes);
        let specs = [
            StrategySpec::EmaTrend {
                ema_window: 5,
                strictness: SignalStrictness::Relaxed,
            },
            StrategySpec::EmaCrossover { fast_ema: 3, slow_ema: 8 },
            StrategySpec::RsiMeanReversion {
                rsi_window: 14,
                entry_rsi: 30.0,
                exit_rsi: 55.0,
            },
            StrategySpec::DonchianBreakout {
                breakout_window: 5,
                exit_window: 3,
            },
        ];
        for spec in &specs {
            let pair = spec.build_signals(&candles).unwrap();
            assert_eq!(pair.entry.len(), candles.len(), "{}", spec.family());
            assert_eq!(pair.exit.len(), candles.len(), "{}", spec.family());
        }
    }

    #[test]
    fn params_label_is_sorted() {
        let spec = StrategySpec::EmaCrossover {
            fast_ema: 10,
            slow_ema: 50,
        };
        assert_eq!(spec.params_label(), "fast_ema=10,slow_ema=50");
    }
}
