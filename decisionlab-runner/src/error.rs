//! Errors raised by the scenario sweep and the strategy lab.

use thiserror::Error;
use decisionlab_core::engine::EngineError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LabError {
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("unsupported objective: {name} (valid options: {valid})")]
    UnsupportedObjective { name: String, valid: String },

    #[error("max_runs must be >= 1")]
    NoCandidates,

    #[error("top_n must be >= 1")]
    NoTopN,

    #[error("no candles supplied for timeframe {0}")]
    MissingTimeframe(String),

    #[error("no scenarios generated, check data availability")]
    EmptyPool,
}
