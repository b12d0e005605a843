//! Decision Lab Core — domain types, indicators, signal rules, simulation engine.
//!
//! This crate contains the deterministic part of the system:
//! - Domain types (candles, parameters, positions, trades, equity samples)
//! - Candle canonicalization (sort, dedup, drop void rows)
//! - Indicators (EMA, ATR, RSI, Donchian) with NaN warmup
//! - Signal rules for four strategy families behind a closed enum
//! - Bar-by-bar simulation engine with stop-first bracket exits

pub mod data;
pub mod domain;
pub mod engine;
pub mod indicators;
pub mod signals;

pub use domain::{
    BacktestParams, BarAction, Candle, EquitySample, ExitReason, FillTiming, SignalStrictness,
    TradeRecord,
};
pub use engine::{run_trend_backtest, simulate, BacktestRun, EngineError};
pub use signals::{SignalPair, SignalRule, StrategyFamily, StrategySpec};
