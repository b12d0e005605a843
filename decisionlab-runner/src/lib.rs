//! Decision Lab Runner — metrics, verdicts, scenario selection, strategy lab.
//!
//! This crate builds on `decisionlab-core` to provide:
//! - Metrics summaries of a run (return, drawdown, frequency, trade quality)
//! - RED / YELLOW / GREEN verdicts and the INVEST / CAUTION / NO call
//! - The scenario sweep with non-overlapping A/B/C picks
//! - The multi-family strategy lab ranked by an objective
//! - TOML configuration, candle sources, and JSONL run history

pub mod config;
pub mod data_loader;
pub mod decision;
pub mod error;
pub mod history;
pub mod lab;
pub mod metrics;
pub mod objective;
pub mod runner;
pub mod scenarios;

pub use config::{ConfigError, LabConfig, LabSettings};
pub use data_loader::{CandleSource, CsvCandleSource, LoadError, SyntheticCandleSource};
pub use decision::{
    decision_score, evaluate_run, final_decision, DecisionThresholds, FinalLabel,
    FinalRecommendation, Status, Verdict,
};
pub use error::LabError;
pub use history::{JsonlRunStore, RunId, RunKind, RunRecord, RunStore, StoreError, StoredRun};
pub use lab::{run_strategy_lab, run_strategy_lab_with, LabCandidate, LabDetail, LabReport};
pub use metrics::MetricsBundle;
pub use objective::Objective;
pub use runner::{
    build_record, persist, run_lab, run_quick, run_scenario_sweep, LabRequest, QuickRequest,
    QuickResult, RunError,
};
pub use scenarios::{
    run_scenarios, select_scenarios, ScenarioBundle, ScenarioGrid, ScenarioLabel, ScenarioOutcome,
    ScenarioSignature, Timeframe,
};
