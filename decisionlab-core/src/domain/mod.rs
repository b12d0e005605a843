//! Domain types for Decision Lab

pub mod candle;
pub mod equity;
pub mod params;
pub mod position;
pub mod trade;

pub use candle::Candle;
pub use equity::{equity_values, BarAction, EquitySample};
pub use params::{BacktestParams, FillTiming, SignalStrictness};
pub use position::Position;
pub use trade::{ExitReason, TradeRecord};
