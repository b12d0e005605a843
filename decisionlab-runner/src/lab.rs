//! Strategy lab — sweeps several signal families over fixed parameter grids
//! and ranks the candidates by a chosen objective.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

use decisionlab_core::domain::{BacktestParams, Candle, SignalStrictness};
use decisionlab_core::engine::{simulate, BacktestRun, EngineError};
use decisionlab_core::signals::{StrategyFamily, StrategySpec};

use crate::error::LabError;
use crate::metrics::MetricsBundle;
use crate::objective::Objective;

/// Every grid combination in family order: EMA trend, crossover, RSI, Donchian.
pub fn full_grid() -> Vec<StrategySpec> {
    let mut specs = Vec::new();

    for ema_window in [20, 50, 100] {
        specs.push(StrategySpec::EmaTrend {
            ema_window,
            strictness: SignalStrictness::Relaxed,
        });
    }
    for fast_ema in [10, 20] {
        for slow_ema in [50, 100] {
            specs.push(StrategySpec::EmaCrossover { fast_ema, slow_ema });
        }
    }
    for rsi_window in [14] {
        for entry_rsi in [25.0, 30.0] {
            for exit_rsi in [55.0, 60.0] {
                specs.push(StrategySpec::RsiMeanReversion {
                    rsi_window,
                    entry_rsi,
                    exit_rsi,
                });
            }
        }
    }
    for breakout_window in [20, 55] {
        for exit_window in [10, 20] {
            specs.push(StrategySpec::DonchianBreakout {
                breakout_window,
                exit_window,
            });
        }
    }

    specs
}

/// The first `max_runs` grid combinations.
pub fn generate_candidates(max_runs: usize) -> Vec<StrategySpec> {
    let mut specs = full_grid();
    specs.truncate(max_runs);
    specs
}

// ── Results ──

/// One ranked row of the lab table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabCandidate {
    /// `{family_id}__{index}`, index being the position in the candidate list.
    pub candidate_id: String,
    pub family: StrategyFamily,
    pub name: String,
    pub params: BTreeMap<String, String>,
    pub description: String,
    pub metrics: MetricsBundle,
}

/// Full output of one candidate: spec, run and metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabDetail {
    pub spec: StrategySpec,
    pub description: String,
    pub run: BacktestRun,
    pub metrics: MetricsBundle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabReport {
    pub objective: Objective,
    pub evaluated: usize,
    /// Best rows first.
    pub top: Vec<LabCandidate>,
    /// Details for exactly the ids in `top`.
    pub details: BTreeMap<String, LabDetail>,
}

// ── Evaluation ──

/// Signals → engine → metrics (with Sharpe) for one spec.
pub fn evaluate_candidate(
    spec: &StrategySpec,
    candles: &[Candle],
    params: &BacktestParams,
    test_days: u32,
) -> Result<(BacktestRun, MetricsBundle), EngineError> {
    let signals = spec.build_signals(candles)?;
    let run = simulate(candles, &signals, params)?;
    let metrics = MetricsBundle::from_run(&run, test_days).with_sharpe(&run.equity_curve());
    Ok((run, metrics))
}

/// Whole days covered by the series, rounded up.
pub fn span_days(candles: &[Candle]) -> u32 {
    match (candles.first(), candles.last()) {
        (Some(first), Some(last)) => {
            let secs = (last.timestamp - first.timestamp).num_seconds().max(0) as f64;
            (secs / 86_400.0).ceil() as u32
        }
        _ => 0,
    }
}

/// Run the lab with the default execution policy.
pub fn run_strategy_lab(
    candles: &[Candle],
    objective: &str,
    max_runs: usize,
    top_n: usize,
) -> Result<LabReport, LabError> {
    run_strategy_lab_with(candles, objective, max_runs, top_n, &BacktestParams::default())
}

/// Run the lab under an explicit execution policy.
///
/// Input checks run in a fixed order: empty candles, objective name,
/// `max_runs`, `top_n`.
pub fn run_strategy_lab_with(
    candles: &[Candle],
    objective: &str,
    max_runs: usize,
    top_n: usize,
    params: &BacktestParams,
) -> Result<LabReport, LabError> {
    if candles.is_empty() {
        return Err(EngineError::EmptySeries.into());
    }
    let objective: Objective = objective.parse()?;
    if max_runs < 1 {
        return Err(LabError::NoCandidates);
    }
    if top_n < 1 {
        return Err(LabError::NoTopN);
    }

    let specs = generate_candidates(max_runs);
    let test_days = span_days(candles);
    tracing::debug!(candidates = specs.len(), test_days, %objective, "strategy lab");

    let evaluated = specs
        .par_iter()
        .enumerate()
        .map(|(idx, spec)| {
            let (run, metrics) = evaluate_candidate(spec, candles, params, test_days)?;
            Ok::<_, LabError>((format!("{}__{idx}", spec.family().id()), spec, run, metrics))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut order: Vec<usize> = (0..evaluated.len()).collect();
    order.sort_by(|&i, &j| rank_order(objective, &evaluated[i].3, &evaluated[j].3));
    order.truncate(top_n);

    let mut top = Vec::with_capacity(order.len());
    let mut details = BTreeMap::new();
    for i in order {
        let (id, spec, run, metrics) = &evaluated[i];
        let description = spec.describe();
        top.push(LabCandidate {
            candidate_id: id.clone(),
            family: spec.family(),
            name: spec.family().display_name().to_string(),
            params: spec
                .params()
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            description: description.clone(),
            metrics: metrics.clone(),
        });
        details.insert(
            id.clone(),
            LabDetail {
                spec: (*spec).clone(),
                description,
                run: run.clone(),
                metrics: metrics.clone(),
            },
        );
    }

    Ok(LabReport {
        objective,
        evaluated: evaluated.len(),
        top,
        details,
    })
}

/// Objective first (ascending for drawdown), then total return descending.
/// Used with a stable sort, so full ties keep candidate order.
fn rank_order(objective: Objective, a: &MetricsBundle, b: &MetricsBundle) -> Ordering {
    let (ka, kb) = (objective.extract(a), objective.extract(b));
    let primary = if objective.is_ascending() {
        ka.total_cmp(&kb)
    } else {
        kb.total_cmp(&ka)
    };
    primary.then_with(|| b.total_return_pct.total_cmp(&a.total_return_pct))
}
