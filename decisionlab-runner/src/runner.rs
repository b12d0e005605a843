//! Orchestration — wires candle sources, the core engine, metrics, the
//! decision layer and the run store together.
//!
//! Three entry points, one per CLI command:
//! - `run_quick()`: one trend backtest with a verdict
//! - `run_scenario_sweep()`: the 12-combination grid and the A/B/C selection
//! - `run_lab()`: the multi-family strategy lab
//!
//! Data comes in through a [`CandleSource`]; nothing here touches the
//! network.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use decisionlab_core::domain::{BacktestParams, SignalStrictness};
use decisionlab_core::engine::{run_trend_backtest, BacktestRun, EngineError};

use crate::config::{ConfigError, LabConfig};
use crate::data_loader::{CandleSource, LoadError};
use crate::decision::{evaluate_run, Verdict};
use crate::error::LabError;
use crate::history::{RunId, RunKind, RunRecord, RunStore, StoreError};
use crate::lab::{run_strategy_lab_with, LabReport};
use crate::metrics::MetricsBundle;
use crate::scenarios::{run_scenarios, ScenarioBundle, ScenarioGrid, Timeframe};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Load(#[from] LoadError),
    #[error("{0}")]
    Lab(#[from] LabError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("history error: {0}")]
    Store(#[from] StoreError),
}

// ── Quick ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuickRequest {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub days: u32,
    /// Overrides `[execution].ema_window` when set.
    pub ema_window: Option<usize>,
    /// Overrides `[execution].strictness` when set.
    pub strictness: Option<SignalStrictness>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuickResult {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub params: BacktestParams,
    pub bar_count: usize,
    pub run: BacktestRun,
    pub metrics: MetricsBundle,
    pub verdict: Verdict,
}

pub fn run_quick(
    source: &dyn CandleSource,
    config: &LabConfig,
    request: &QuickRequest,
) -> Result<QuickResult, RunError> {
    let params = config.execution.with_trend(
        request.ema_window.unwrap_or(config.execution.ema_window),
        request.strictness.unwrap_or(config.execution.strictness),
    );
    let candles = source.fetch(&request.symbol, request.timeframe, request.days)?;
    tracing::info!(
        symbol = %request.symbol,
        timeframe = %request.timeframe,
        bars = candles.len(),
        source = source.name(),
        "quick backtest"
    );

    let run = run_trend_backtest(&candles, &params)?;
    let metrics = MetricsBundle::from_run(&run, request.days);
    let verdict = evaluate_run(&metrics, &config.thresholds);
    tracing::debug!(status = %verdict.status, trades = metrics.trade_count, "quick verdict");

    Ok(QuickResult {
        symbol: request.symbol.clone(),
        timeframe: request.timeframe,
        params,
        bar_count: candles.len(),
        run,
        metrics,
        verdict,
    })
}

// ── Scenarios ──

/// Fetch every grid timeframe, then sweep and select A/B/C.
pub fn run_scenario_sweep(
    source: &dyn CandleSource,
    config: &LabConfig,
    symbol: &str,
    days: u32,
) -> Result<ScenarioBundle, RunError> {
    let grid = ScenarioGrid::default();
    let mut data = BTreeMap::new();
    for &tf in &grid.timeframes {
        let candles = source.fetch(symbol, tf, days)?;
        tracing::debug!(symbol, timeframe = %tf, bars = candles.len(), "loaded");
        data.insert(tf, candles);
    }

    tracing::info!(symbol, days, combinations = grid.size(), "scenario sweep");
    let bundle = run_scenarios(&data, &grid, &config.execution, &config.thresholds, days)?;

    for (label, outcome) in bundle.picks() {
        tracing::debug!(
            %label,
            signature = %outcome.signature,
            status = %outcome.verdict.status,
            risk_exceeded = outcome.risk_exceeded,
            "scenario pick"
        );
    }
    tracing::info!(
        label = %bundle.final_recommendation.label,
        recommended = %bundle.final_recommendation.recommended,
        "final recommendation"
    );
    Ok(bundle)
}

// ── Lab ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabRequest {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub days: u32,
    /// Objective name; `[lab].objective` when unset.
    pub objective: Option<String>,
    pub max_runs: Option<usize>,
    pub top_n: Option<usize>,
}

pub fn run_lab(
    source: &dyn CandleSource,
    config: &LabConfig,
    request: &LabRequest,
) -> Result<LabReport, RunError> {
    let candles = source.fetch(&request.symbol, request.timeframe, request.days)?;
    let objective = request
        .objective
        .clone()
        .unwrap_or_else(|| config.lab.objective.name().to_string());
    let max_runs = request.max_runs.unwrap_or(config.lab.max_runs);
    let top_n = request.top_n.unwrap_or(config.lab.top_n);

    tracing::info!(
        symbol = %request.symbol,
        timeframe = %request.timeframe,
        bars = candles.len(),
        objective = %objective,
        max_runs,
        top_n,
        "strategy lab"
    );
    let report = run_strategy_lab_with(&candles, &objective, max_runs, top_n, &config.execution)?;
    if let Some(best) = report.top.first() {
        tracing::info!(candidate = %best.candidate_id, "top candidate");
    }
    Ok(report)
}

// ── Persistence ──

/// Build a history record around any serializable outcome.
pub fn build_record<T: Serialize>(
    kind: RunKind,
    symbol: &str,
    days: u32,
    headline: String,
    outcome: &T,
) -> Result<RunRecord, StoreError> {
    Ok(RunRecord {
        kind,
        symbol: symbol.to_string(),
        days,
        created_at: Utc::now(),
        headline,
        payload: serde_json::to_value(outcome)?,
    })
}

/// Persist a record; a failed save is logged and does not fail the run.
pub fn persist(store: &dyn RunStore, record: &RunRecord) -> Option<RunId> {
    match store.save(record) {
        Ok(id) => {
            tracing::debug!(run_id = %id, kind = record.kind.as_str(), "run saved");
            Some(id)
        }
        Err(e) => {
            tracing::warn!(kind = record.kind.as_str(), "failed to save run: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_loader::SyntheticCandleSource;
    use crate::decision::ScenarioView;
    use crate::history::JsonlRunStore;

    #[test]
    fn quick_applies_overrides() {
        let source = SyntheticCandleSource::default();
        let request = QuickRequest {
            symbol: "BTC".into(),
            timeframe: Timeframe::H4,
            days: 60,
            ema_window: Some(50),
            strictness: Some(SignalStrictness::Relaxed),
        };
        let result = run_quick(&source, &LabConfig::default(), &request).unwrap();
        assert_eq!(result.params.ema_window, 50);
        assert_eq!(result.params.strictness, SignalStrictness::Relaxed);
        assert_eq!(result.run.equity.len(), result.bar_count);
        assert_eq!(result.metrics.test_days, 60);
    }

    #[test]
    fn quick_rejects_zero_window() {
        let source = SyntheticCandleSource::default();
        let request = QuickRequest {
            symbol: "BTC".into(),
            timeframe: Timeframe::D1,
            days: 60,
            ema_window: Some(0),
            strictness: None,
        };
        let err = run_quick(&source, &LabConfig::default(), &request).unwrap_err();
        assert!(matches!(err, RunError::Engine(EngineError::InvalidParams(_))));
    }

    #[test]
    fn sweep_on_synthetic_data() {
        let source = SyntheticCandleSource::default();
        let bundle = run_scenario_sweep(&source, &LabConfig::default(), "ETH", 120).unwrap();
        assert_eq!(bundle.candidates.len(), 12);
        let views: [ScenarioView<'_>; 3] = [
            (crate::scenarios::ScenarioLabel::A, &bundle.a.metrics, &bundle.a.verdict),
            (crate::scenarios::ScenarioLabel::B, &bundle.b.metrics, &bundle.b.verdict),
            (crate::scenarios::ScenarioLabel::C, &bundle.c.metrics, &bundle.c.verdict),
        ];
        assert_eq!(crate::decision::final_decision(&views), bundle.final_recommendation);
    }

    #[test]
    fn lab_uses_config_defaults() {
        let source = SyntheticCandleSource::default();
        let request = LabRequest {
            symbol: "SOL".into(),
            timeframe: Timeframe::H4,
            days: 90,
            objective: None,
            max_runs: None,
            top_n: None,
        };
        let report = run_lab(&source, &LabConfig::default(), &request).unwrap();
        assert_eq!(report.top.len(), 5);
        assert_eq!(report.evaluated, 15);
    }

    #[test]
    fn persist_writes_and_logs_failures() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlRunStore::new(dir.path().join("runs.jsonl"));
        let record = build_record(RunKind::Lab, "BTC", 30, "top".into(), &[1, 2, 3]).unwrap();
        assert!(persist(&store, &record).is_some());

        // A directory cannot be opened for append.
        let broken = JsonlRunStore::new(dir.path());
        assert!(persist(&broken, &record).is_none());
    }
}
