//! Bar-by-bar simulation loop — the heart of the engine.
//!
//! Four steps per bar, strictly in timestamp order, one position at a time:
//! 1. Exit check (stop-first bracket, then exit signal)
//! 2. Entry check (flat, cooldown elapsed, ATR defined, entry signal)
//! 3. Cooldown tick while flat
//! 4. Equity sample

use chrono::{DateTime, Utc};

use crate::domain::{BacktestParams, BarAction, Candle, EquitySample, ExitReason, FillTiming, Position};
use crate::indicators::atr::ENGINE_ATR_PERIOD;
use crate::indicators::{Atr, Indicator};
use crate::signals::{EmaTrend, SignalPair, SignalRule};

use super::state::{BacktestRun, EngineState};
use super::validate::{validate_inputs, validate_params};
use super::EngineError;

/// Replay `candles` against `signals` under the execution policy in `params`.
///
/// Fails before touching any bar if the series is empty, a price is missing,
/// a signal sequence has the wrong length, or the policy is nonsensical.
pub fn simulate(
    candles: &[Candle],
    signals: &SignalPair,
    params: &BacktestParams,
) -> Result<BacktestRun, EngineError> {
    validate_inputs(candles, signals)?;
    validate_params(params)?;

    let atr = Atr::new(ENGINE_ATR_PERIOD).compute(candles);
    let n = candles.len();
    let mut state = EngineState::new(params.initial_cash);
    let mut equity = Vec::with_capacity(n);
    let mut trades = Vec::new();

    for (i, candle) in candles.iter().enumerate() {
        let mut action = BarAction::Hold;

        // ─── Step 1: exits ───
        let exit = state
            .position
            .as_ref()
            .and_then(|pos| exit_decision(pos, candle, signals.exit[i]));
        if let Some((price, reason)) = exit {
            if let Some(trade) = state.close_position(price, candle.timestamp, reason, params) {
                trades.push(trade);
                action = BarAction::Exit(reason);
            }
        }

        // ─── Step 2: entries ───
        if state.is_flat() && state.cooldown == 0 && !atr[i].is_nan() && signals.entry[i] {
            let (fill_price, fill_time) = fill_for(candles, i, params.fill_timing);
            if state.open_position(fill_price, fill_time, atr[i], params) {
                action = BarAction::Entry;
            }
        }

        // ─── Step 3: cooldown ───
        if state.is_flat() && state.cooldown > 0 {
            state.cooldown -= 1;
        }

        // A position still open on the last bar is closed before its sample is built.
        if i == n - 1 {
            if let Some(trade) =
                state.close_position(candle.close, candle.timestamp, ExitReason::EndOfPeriod, params)
            {
                trades.push(trade);
                action = BarAction::Exit(ExitReason::EndOfPeriod);
            }
        }

        // ─── Step 4: equity sample ───
        equity.push(sample(&state, candle, action, params.slippage_rate));
    }

    Ok(BacktestRun {
        initial_cash: params.initial_cash,
        equity,
        trades,
    })
}

/// Quick variant: trend rule from `params.ema_window` / `params.strictness`.
pub fn run_trend_backtest(candles: &[Candle], params: &BacktestParams) -> Result<BacktestRun, EngineError> {
    if params.ema_window == 0 {
        return Err(EngineError::InvalidParams("ema_window must be >= 1".into()));
    }
    let signals = EmaTrend::new(params.ema_window, params.strictness).generate(candles);
    simulate(candles, &signals, params)
}

/// Exit price and reason for this bar, if any.
///
/// Priority: both bracket legs touched → stop; stop; target; exit signal.
fn exit_decision(pos: &Position, candle: &Candle, exit_signal: bool) -> Option<(f64, ExitReason)> {
    let stop_hit = candle.low <= pos.stop_price;
    let target_hit = candle.high >= pos.target_price;

    if pos.both_breached(candle.low, candle.high) || stop_hit {
        Some((pos.stop_price, ExitReason::StopLoss))
    } else if target_hit {
        Some((pos.target_price, ExitReason::TakeProfit))
    } else if exit_signal {
        Some((candle.close, ExitReason::SignalExit))
    } else {
        None
    }
}

/// Fill price and time for an entry signalled on bar `i`.
fn fill_for(candles: &[Candle], i: usize, timing: FillTiming) -> (f64, DateTime<Utc>) {
    match timing {
        FillTiming::NextBarOpen => match candles.get(i + 1) {
            Some(next) => (next.open, next.timestamp),
            None => (candles[i].close, candles[i].timestamp),
        },
        FillTiming::SameBarClose => (candles[i].close, candles[i].timestamp),
    }
}

fn sample(state: &EngineState, candle: &Candle, action: BarAction, slippage_rate: f64) -> EquitySample {
    let (mark_price, stop_price, target_price) = match &state.position {
        Some(pos) => (
            candle.close * (1.0 - slippage_rate),
            Some(pos.stop_price),
            Some(pos.target_price),
        ),
        None => (candle.close, None, None),
    };
    EquitySample {
        timestamp: candle.timestamp,
        close: candle.close,
        mark_price,
        equity: state.equity_at(candle.close, slippage_rate),
        in_position: state.position.is_some(),
        action,
        stop_price,
        target_price,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn pos(stop: f64, target: f64) -> Position {
        Position {
            entry_price: 100.0,
            entry_cost: 100.0,
            entry_time: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            units: 1.0,
            entry_fee: 0.0,
            stop_price: stop,
            target_price: target,
        }
    }

    fn bar(low: f64, high: f64, close: f64) -> Candle {
        Candle {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 1, 0, 0).unwrap(),
            open: close,
            high,
            low,
            close,
            volume: 1.0,
        }
    }

    #[test]
    fn both_legs_prefer_stop() {
        let d = exit_decision(&pos(95.0, 110.0), &bar(94.0, 111.0, 100.0), true);
        assert_eq!(d, Some((95.0, ExitReason::StopLoss)));
    }

    #[test]
    fn target_before_signal() {
        let d = exit_decision(&pos(95.0, 110.0), &bar(99.0, 112.0, 111.0), true);
        assert_eq!(d, Some((110.0, ExitReason::TakeProfit)));
    }

    #[test]
    fn signal_exits_at_close() {
        let d = exit_decision(&pos(95.0, 110.0), &bar(99.0, 102.0, 101.0), true);
        assert_eq!(d, Some((101.0, ExitReason::SignalExit)));
        assert_eq!(exit_decision(&pos(95.0, 110.0), &bar(99.0, 102.0, 101.0), false), None);
    }
}
