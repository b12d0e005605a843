//! Scenario sweep — runs the trend rule across the timeframe × window ×
//! strictness grid and picks three representative, non-overlapping setups.
//!
//! - **A**: best expectancy (then lower drawdown, then frequency closest to target)
//! - **B**: best annualized return within the drawdown cap
//! - **C**: most stable, 1 / (1 + drawdown fraction + frequency gap)
//!
//! A combination used by an earlier pick is skipped unless nothing else is
//! left. Ties keep the earliest candidate in grid order.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use decisionlab_core::domain::{BacktestParams, Candle, SignalStrictness};
use decisionlab_core::engine::{run_trend_backtest, BacktestRun};

use crate::decision::{evaluate_run, final_decision, DecisionThresholds, FinalRecommendation, Verdict};
use crate::error::LabError;
use crate::metrics::MetricsBundle;

// ── Grid axes ──

/// Candle interval of a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "4h")]
    H4,
    #[serde(rename = "1d")]
    D1,
}

impl Timeframe {
    pub const ALL: [Timeframe; 3] = [Timeframe::H1, Timeframe::H4, Timeframe::D1];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::H1 => "1h",
            Self::H4 => "4h",
            Self::D1 => "1d",
        }
    }

    pub fn duration(&self) -> chrono::Duration {
        match self {
            Self::H1 => chrono::Duration::hours(1),
            Self::H4 => chrono::Duration::hours(4),
            Self::D1 => chrono::Duration::days(1),
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|tf| tf.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown timeframe '{s}' (expected 1h, 4h or 1d)"))
    }
}

/// Identity of one grid combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScenarioSignature {
    pub timeframe: Timeframe,
    pub ema_window: usize,
    pub strictness: SignalStrictness,
}

impl fmt::Display for ScenarioSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/ema{}/{}", self.timeframe, self.ema_window, self.strictness)
    }
}

/// The sweep grid. [`ScenarioGrid::default`] is the standard 12 combinations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioGrid {
    pub timeframes: Vec<Timeframe>,
    pub ema_windows: Vec<usize>,
    pub strictness: Vec<SignalStrictness>,
}

impl Default for ScenarioGrid {
    fn default() -> Self {
        Self {
            timeframes: Timeframe::ALL.to_vec(),
            ema_windows: vec![20, 50],
            strictness: SignalStrictness::ALL.to_vec(),
        }
    }
}

impl ScenarioGrid {
    pub fn size(&self) -> usize {
        self.timeframes.len() * self.ema_windows.len() * self.strictness.len()
    }

    /// All combinations, timeframe-major, then window, then strictness.
    pub fn signatures(&self) -> Vec<ScenarioSignature> {
        let mut out = Vec::with_capacity(self.size());
        for &timeframe in &self.timeframes {
            for &ema_window in &self.ema_windows {
                for &strictness in &self.strictness {
                    out.push(ScenarioSignature {
                        timeframe,
                        ema_window,
                        strictness,
                    });
                }
            }
        }
        out
    }
}

// ── Outcomes ──

/// One evaluated grid combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioOutcome {
    pub signature: ScenarioSignature,
    pub params: BacktestParams,
    pub run: BacktestRun,
    pub metrics: MetricsBundle,
    pub verdict: Verdict,
    pub risk_exceeded: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ScenarioLabel {
    A,
    B,
    C,
}

impl ScenarioLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Self::A => "best expectancy",
            Self::B => "best return within risk cap",
            Self::C => "most stable",
        }
    }
}

impl fmt::Display for ScenarioLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Three representative scenarios, the full pool, and the consolidated call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioBundle {
    pub a: ScenarioOutcome,
    pub b: ScenarioOutcome,
    pub c: ScenarioOutcome,
    pub candidates: Vec<ScenarioOutcome>,
    pub final_recommendation: FinalRecommendation,
}

impl ScenarioBundle {
    pub fn get(&self, label: ScenarioLabel) -> &ScenarioOutcome {
        match label {
            ScenarioLabel::A => &self.a,
            ScenarioLabel::B => &self.b,
            ScenarioLabel::C => &self.c,
        }
    }

    /// The three picks in A, B, C order.
    pub fn picks(&self) -> [(ScenarioLabel, &ScenarioOutcome); 3] {
        [
            (ScenarioLabel::A, &self.a),
            (ScenarioLabel::B, &self.b),
            (ScenarioLabel::C, &self.c),
        ]
    }

    pub fn recommended(&self) -> &ScenarioOutcome {
        self.get(self.final_recommendation.recommended)
    }
}

// ── Sweep ──

/// Evaluate one combination: trend backtest → metrics → verdict.
pub fn evaluate_scenario(
    signature: ScenarioSignature,
    candles: &[Candle],
    base: &BacktestParams,
    thresholds: &DecisionThresholds,
    test_days: u32,
) -> Result<ScenarioOutcome, LabError> {
    let params = base.with_trend(signature.ema_window, signature.strictness);
    let run = run_trend_backtest(candles, &params)?;
    let metrics = MetricsBundle::from_run(&run, test_days);
    let verdict = evaluate_run(&metrics, thresholds);
    let risk_exceeded = metrics.max_drawdown_pct > thresholds.dd_max;
    Ok(ScenarioOutcome {
        signature,
        params,
        run,
        metrics,
        verdict,
        risk_exceeded,
    })
}

/// Run every grid combination (in parallel, collected in grid order) and
/// select A/B/C.
pub fn run_scenarios(
    data: &BTreeMap<Timeframe, Vec<Candle>>,
    grid: &ScenarioGrid,
    base: &BacktestParams,
    thresholds: &DecisionThresholds,
    test_days: u32,
) -> Result<ScenarioBundle, LabError> {
    for tf in &grid.timeframes {
        if !data.contains_key(tf) {
            return Err(LabError::MissingTimeframe(tf.to_string()));
        }
    }

    let candidates = grid
        .signatures()
        .into_par_iter()
        .map(|sig| {
            let candles = data
                .get(&sig.timeframe)
                .ok_or_else(|| LabError::MissingTimeframe(sig.timeframe.to_string()))?;
            evaluate_scenario(sig, candles, base, thresholds, test_days)
        })
        .collect::<Result<Vec<_>, _>>()?;

    select_scenarios(candidates, thresholds)
}

/// Pick A, B and C from an evaluated pool.
pub fn select_scenarios(
    candidates: Vec<ScenarioOutcome>,
    thresholds: &DecisionThresholds,
) -> Result<ScenarioBundle, LabError> {
    if candidates.is_empty() {
        return Err(LabError::EmptyPool);
    }

    let t = thresholds;
    let mut used: HashSet<ScenarioSignature> = HashSet::new();

    // A: expectancy, then lower drawdown, then frequency closest to target.
    let key_a = |c: &ScenarioOutcome| {
        [
            c.metrics.expectancy_pct,
            -c.metrics.max_drawdown_pct,
            -t.tpw_gap(c.metrics.trades_per_week),
        ]
    };
    let a_idx = pick_unused(&candidates, &used, |_| true, key_a);
    used.insert(candidates[a_idx].signature);

    // B: annualized return within the drawdown cap; any fallback is flagged.
    let key_b = |c: &ScenarioOutcome| [c.metrics.annualized_return_pct, 0.0, 0.0];
    let within_cap = best_index(&candidates, |c| {
        !used.contains(&c.signature) && c.metrics.max_drawdown_pct <= t.dd_max
    }, key_b);
    let (b_idx, b_fallback) = match within_cap {
        Some(i) => (i, false),
        None => (pick_unused(&candidates, &used, |_| true, key_b), true),
    };
    used.insert(candidates[b_idx].signature);

    // C: stability.
    let key_c = |c: &ScenarioOutcome| [stability_score(&c.metrics, t), 0.0, 0.0];
    let c_idx = pick_unused(&candidates, &used, |_| true, key_c);

    let a = candidates[a_idx].clone();
    let mut b = candidates[b_idx].clone();
    if b_fallback {
        b.risk_exceeded = true;
    }
    let c = candidates[c_idx].clone();

    let final_recommendation = final_decision(&[
        (ScenarioLabel::A, &a.metrics, &a.verdict),
        (ScenarioLabel::B, &b.metrics, &b.verdict),
        (ScenarioLabel::C, &c.metrics, &c.verdict),
    ]);

    Ok(ScenarioBundle {
        a,
        b,
        c,
        candidates,
        final_recommendation,
    })
}

/// 1 / (1 + drawdown as a fraction + distance from the frequency target).
pub fn stability_score(metrics: &MetricsBundle, thresholds: &DecisionThresholds) -> f64 {
    1.0 / (1.0 + metrics.max_drawdown_pct / 100.0 + thresholds.tpw_gap(metrics.trades_per_week))
}

/// Best unused candidate passing `filter`, else best of the whole pool.
fn pick_unused<F, K>(
    candidates: &[ScenarioOutcome],
    used: &HashSet<ScenarioSignature>,
    filter: F,
    key: K,
) -> usize
where
    F: Fn(&ScenarioOutcome) -> bool,
    K: Fn(&ScenarioOutcome) -> [f64; 3],
{
    best_index(candidates, |c| !used.contains(&c.signature) && filter(c), &key)
        .or_else(|| best_index(candidates, |_| true, &key))
        .unwrap_or(0)
}

/// Index of the first candidate with the lexicographically greatest key.
fn best_index<F, K>(candidates: &[ScenarioOutcome], filter: F, key: K) -> Option<usize>
where
    F: Fn(&ScenarioOutcome) -> bool,
    K: Fn(&ScenarioOutcome) -> [f64; 3],
{
    let mut best: Option<(usize, [f64; 3])> = None;
    for (i, c) in candidates.iter().enumerate().filter(|(_, c)| filter(*c)) {
        let k = key(c);
        let better = match &best {
            None => true,
            Some((_, bk)) => k
                .iter()
                .zip(bk)
                .map(|(x, y)| x.total_cmp(y))
                .find(|o| o.is_ne())
                .is_some_and(|o| o.is_gt()),
        };
        if better {
            best = Some((i, k));
        }
    }
    best.map(|(i, _)| i)
}
