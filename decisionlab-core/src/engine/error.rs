//! Validation errors raised before a simulation starts.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("candle series is empty")]
    EmptySeries,

    #[error("candle {index} has a missing or non-finite {field}")]
    MissingPrice { index: usize, field: &'static str },

    #[error("{which} signal has {actual} values, expected {expected}")]
    SignalLengthMismatch {
        which: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{which} signal is undefined at index {index}")]
    MissingSignal { which: &'static str, index: usize },

    #[error("invalid parameters: {0}")]
    InvalidParams(String),
}
