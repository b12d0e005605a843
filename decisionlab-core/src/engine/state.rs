//! Mutable account state for the bar loop, and the run result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{equity_values, BacktestParams, EquitySample, ExitReason, Position, TradeRecord};

/// Mutable state that evolves bar-by-bar during the engine loop.
///
/// Owned by one `simulate` call; never shared.
#[derive(Debug)]
pub struct EngineState {
    pub cash: f64,
    pub position: Option<Position>,
    /// Bars left before a new entry may open.
    pub cooldown: usize,
}

impl EngineState {
    pub fn new(initial_cash: f64) -> Self {
        Self {
            cash: initial_cash,
            position: None,
            cooldown: 0,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.position.is_none()
    }

    /// Open an all-in long position. Returns false (and changes nothing) when
    /// nothing would be left to spend after the entry fee.
    pub fn open_position(
        &mut self,
        fill_price: f64,
        fill_time: DateTime<Utc>,
        atr: f64,
        params: &BacktestParams,
    ) -> bool {
        let entry_cost = fill_price * (1.0 + params.slippage_rate);
        let entry_fee = self.cash * params.fee_rate;
        let spendable = self.cash - entry_fee;
        if spendable <= 0.0 || entry_cost <= 0.0 {
            return false;
        }

        self.position = Some(Position {
            entry_price: fill_price,
            entry_cost,
            entry_time: fill_time,
            units: spendable / entry_cost,
            entry_fee,
            stop_price: fill_price - params.stop_atr_mult * atr,
            target_price: fill_price + params.target_atr_mult * atr,
        });
        self.cash = 0.0;
        true
    }

    /// Close the open position at `raw_price` and build its trade record.
    ///
    /// Returns `None` when flat.
    pub fn close_position(
        &mut self,
        raw_price: f64,
        exit_time: DateTime<Utc>,
        reason: ExitReason,
        params: &BacktestParams,
    ) -> Option<TradeRecord> {
        let pos = self.position.take()?;

        let effective = raw_price * (1.0 - params.slippage_rate);
        let gross = pos.units * effective;
        let exit_fee = gross * params.fee_rate;
        self.cash += gross - exit_fee;
        self.cooldown = params.cooldown_bars;

        Some(TradeRecord {
            entry_time: pos.entry_time,
            entry_price: pos.entry_price,
            exit_time,
            exit_price: raw_price,
            reason,
            units: pos.units,
            pnl: pos.units * (effective - pos.entry_cost),
            pnl_pct: (effective - pos.entry_cost) / pos.entry_cost * 100.0,
            fees: pos.entry_fee + exit_fee,
            stop_price: pos.stop_price,
            target_price: pos.target_price,
        })
    }

    /// Cash plus the position marked at `close` less slippage.
    pub fn equity_at(&self, close: f64, slippage_rate: f64) -> f64 {
        match &self.position {
            Some(pos) => self.cash + pos.market_value(close, slippage_rate),
            None => self.cash,
        }
    }
}

/// Output of one simulation: the equity trace and the closed trades.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestRun {
    pub initial_cash: f64,
    /// One sample per input candle.
    pub equity: Vec<EquitySample>,
    pub trades: Vec<TradeRecord>,
}

impl BacktestRun {
    /// Last equity value, or the starting cash for an empty trace.
    pub fn final_equity(&self) -> f64 {
        self.equity.last().map_or(self.initial_cash, |s| s.equity)
    }

    /// Plain equity series.
    pub fn equity_curve(&self) -> Vec<f64> {
        equity_values(&self.equity)
    }

    pub fn total_fees(&self) -> f64 {
        self.trades.iter().map(|t| t.fees).sum()
    }
}
