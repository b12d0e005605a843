//! Simulation engine — validates inputs, then replays candles against an
//! entry/exit signal pair to produce an equity trace and a trade log.
//!
//! The engine is a pure function of its inputs: no I/O, no logging, no
//! shared state between calls.

pub mod error;
pub mod loop_runner;
pub mod state;
pub mod validate;

pub use error::EngineError;
pub use loop_runner::{run_trend_backtest, simulate};
pub use state::{BacktestRun, EngineState};
pub use validate::{validate_inputs, validate_params};
