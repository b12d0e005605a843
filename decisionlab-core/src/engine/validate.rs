//! Input and parameter checks run before the first bar is processed.

use super::EngineError;
use crate::domain::{BacktestParams, Candle};
use crate::signals::SignalPair;

/// Series must be non-empty, fully priced, and the signals exactly as long.
pub fn validate_inputs(candles: &[Candle], signals: &SignalPair) -> Result<(), EngineError> {
    if candles.is_empty() {
        return Err(EngineError::EmptySeries);
    }

    if let Some((index, field)) = candles
        .iter()
        .enumerate()
        .find_map(|(i, c)| c.missing_field().map(|f| (i, f)))
    {
        return Err(EngineError::MissingPrice { index, field });
    }

    for (which, len) in [("entry", signals.entry.len()), ("exit", signals.exit.len())] {
        if len != candles.len() {
            return Err(EngineError::SignalLengthMismatch {
                which,
                expected: candles.len(),
                actual: len,
            });
        }
    }

    Ok(())
}

/// Execution policy sanity. The trend window is checked separately by the
/// quick variant, the only path that reads it.
pub fn validate_params(params: &BacktestParams) -> Result<(), EngineError> {
    let invalid = |msg: String| Err(EngineError::InvalidParams(msg));

    if !(params.initial_cash.is_finite() && params.initial_cash > 0.0) {
        return invalid(format!("initial_cash must be positive, got {}", params.initial_cash));
    }
    for (name, value) in [
        ("stop_atr_mult", params.stop_atr_mult),
        ("target_atr_mult", params.target_atr_mult),
    ] {
        if !(value.is_finite() && value >= 0.0) {
            return invalid(format!("{name} must be a non-negative number, got {value}"));
        }
    }
    for (name, value) in [
        ("fee_rate", params.fee_rate),
        ("slippage_rate", params.slippage_rate),
    ] {
        if !(0.0..1.0).contains(&value) {
            return invalid(format!("{name} must be in [0, 1), got {value}"));
        }
    }
    Ok(())
}
