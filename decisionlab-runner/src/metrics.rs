//! Performance metrics — pure functions that reduce a run to scalars.
//!
//! Every metric is a pure function: equity trace and/or trade list in, scalar
//! out. Percentages are reported on a 0-100 scale.

use serde::{Deserialize, Serialize};
use decisionlab_core::domain::{equity_values, EquitySample, TradeRecord};
use decisionlab_core::engine::BacktestRun;

/// Scalar summary of one backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsBundle {
    pub total_return_pct: f64,
    pub annualized_return_pct: f64,
    pub final_equity: f64,
    pub max_drawdown_pct: f64,
    pub trade_count: usize,
    pub trades_per_week: f64,
    pub win_rate_pct: f64,
    pub expectancy_pct: f64,
    /// +∞ with wins and no losses, 0 with neither.
    #[serde(with = "float_or_inf")]
    pub profit_factor: f64,
    pub test_days: u32,
    /// Risk-adjusted return; only filled in by the strategy lab.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sharpe: Option<f64>,
}

impl MetricsBundle {
    /// Summarize an equity trace and trade list over a test period of `test_days`.
    pub fn summarize(
        equity: &[EquitySample],
        trades: &[TradeRecord],
        initial_cash: f64,
        test_days: u32,
    ) -> Self {
        let final_equity = equity.last().map_or(initial_cash, |s| s.equity);
        let total = total_return(final_equity, initial_cash);
        let curve = equity_values(equity);

        Self {
            total_return_pct: total * 100.0,
            annualized_return_pct: annualized_return(total, test_days) * 100.0,
            final_equity,
            max_drawdown_pct: max_drawdown_pct(&curve),
            trade_count: trades.len(),
            trades_per_week: trades_per_week(trades.len(), test_days),
            win_rate_pct: win_rate_pct(trades),
            expectancy_pct: expectancy_pct(trades),
            profit_factor: profit_factor(trades),
            test_days,
            sharpe: None,
        }
    }

    /// Summarize a [`BacktestRun`] directly.
    pub fn from_run(run: &BacktestRun, test_days: u32) -> Self {
        Self::summarize(&run.equity, &run.trades, run.initial_cash, test_days)
    }

    /// Attach the Sharpe ratio of an equity curve (lab variant).
    pub fn with_sharpe(mut self, equity_curve: &[f64]) -> Self {
        self.sharpe = Some(sharpe_ratio(equity_curve));
        self
    }

    /// Sharpe value, 0 when it was not computed.
    pub fn sharpe_or_zero(&self) -> f64 {
        self.sharpe.unwrap_or(0.0)
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Total return as a fraction: final / initial - 1.
pub fn total_return(final_equity: f64, initial_cash: f64) -> f64 {
    if initial_cash <= 0.0 {
        return 0.0;
    }
    final_equity / initial_cash - 1.0
}

/// Compound a total return to a 365-day basis. `days` is floored at 1.
pub fn annualized_return(total_return: f64, days: u32) -> f64 {
    let growth = 1.0 + total_return;
    if growth <= 0.0 {
        return -1.0;
    }
    growth.powf(365.0 / f64::from(days.max(1))) - 1.0
}

/// Worst peak-to-trough decline as a positive percent.
///
/// Non-positive running peaks are skipped; an empty curve has no drawdown.
pub fn max_drawdown_pct(equity_curve: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;
    for &eq in equity_curve {
        if eq > peak {
            peak = eq;
        }
        if peak > 0.0 {
            worst = worst.min((eq - peak) / peak);
        }
    }
    worst.abs() * 100.0
}

/// Trades per week; `days` is floored at 1.
pub fn trades_per_week(trade_count: usize, days: u32) -> f64 {
    trade_count as f64 / (f64::from(days.max(1)) / 7.0)
}

/// Percent of trades with positive pnl.
pub fn win_rate_pct(trades: &[TradeRecord]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let wins = trades.iter().filter(|t| t.is_winner()).count();
    wins as f64 / trades.len() as f64 * 100.0
}

/// Mean trade pnl percent.
pub fn expectancy_pct(trades: &[TradeRecord]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    trades.iter().map(|t| t.pnl_pct).sum::<f64>() / trades.len() as f64
}

/// Gross profit / |gross loss|.
pub fn profit_factor(trades: &[TradeRecord]) -> f64 {
    let profits: f64 = trades.iter().filter(|t| t.pnl > 0.0).map(|t| t.pnl).sum();
    let losses: f64 = trades.iter().filter(|t| t.pnl < 0.0).map(|t| t.pnl).sum();
    if losses == 0.0 {
        if profits > 0.0 {
            f64::INFINITY
        } else {
            0.0
        }
    } else {
        profits / losses.abs()
    }
}

/// Annualized Sharpe ratio of bar-to-bar equity returns.
///
/// Sharpe = mean(returns) / sample_std(returns) * sqrt(252).
/// Returns 0.0 with fewer than two returns or zero variance.
pub fn sharpe_ratio(equity_curve: &[f64]) -> f64 {
    let returns = bar_returns(equity_curve);
    if returns.len() < 2 {
        return 0.0;
    }
    let std = std_dev(&returns);
    if std == 0.0 || !std.is_finite() {
        return 0.0;
    }
    mean_f64(&returns) / std * 252.0_f64.sqrt()
}

// ─── Helpers ────────────────────────────────────────────────────────

/// Percent change between consecutive equity values; steps from a zero
/// value are dropped.
fn bar_returns(equity_curve: &[f64]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .filter(|w| w[0] != 0.0)
        .map(|w| w[1] / w[0] - 1.0)
        .collect()
}

fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1 denominator).
fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

/// JSON has no infinity literal; non-finite values travel as strings.
mod float_or_inf {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_infinite() {
            serializer.serialize_str(if *value > 0.0 { "inf" } else { "-inf" })
        } else {
            serializer.serialize_f64(*value)
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Num(f64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Num(v) => Ok(v),
            Repr::Text(s) => match s.as_str() {
                "inf" => Ok(f64::INFINITY),
                "-inf" => Ok(f64::NEG_INFINITY),
                other => Err(serde::de::Error::custom(format!("invalid float: {other}"))),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use decisionlab_core::domain::ExitReason;

    fn trade(pnl: f64, pnl_pct: f64) -> TradeRecord {
        let t = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        TradeRecord {
            entry_time: t,
            entry_price: 100.0,
            exit_time: t,
            exit_price: 100.0 + pnl_pct,
            reason: ExitReason::SignalExit,
            units: 1.0,
            pnl,
            pnl_pct,
            fees: 0.0,
            stop_price: 95.0,
            target_price: 110.0,
        }
    }

    #[test]
    fn losing_only_trades() {
        let trades = vec![trade(-10.0, -1.0), trade(-20.0, -2.0), trade(-30.0, -3.0)];
        assert_eq!(win_rate_pct(&trades), 0.0);
        assert_eq!(profit_factor(&trades), 0.0);
        assert!((expectancy_pct(&trades) - (-2.0)).abs() < 1e-12);
    }

    #[test]
    fn profit_factor_edges() {
        assert_eq!(profit_factor(&[]), 0.0);
        assert_eq!(profit_factor(&[trade(5.0, 0.5)]), f64::INFINITY);
        let pf = profit_factor(&[trade(30.0, 3.0), trade(-10.0, -1.0)]);
        assert!((pf - 3.0).abs() < 1e-12);
    }

    #[test]
    fn drawdown_from_peak() {
        let curve = [100.0, 120.0, 90.0, 130.0, 117.0];
        assert!((max_drawdown_pct(&curve) - 25.0).abs() < 1e-10);
        assert_eq!(max_drawdown_pct(&[]), 0.0);
        assert_eq!(max_drawdown_pct(&[0.0, 0.0]), 0.0);
    }

    #[test]
    fn annualized_compounds_to_365_days() {
        // 10% over 365 days stays 10%
        assert!((annualized_return(0.10, 365) - 0.10).abs() < 1e-12);
        // 0 days floored at 1
        assert!(annualized_return(0.0, 0).abs() < 1e-12);
        let half_year = annualized_return(0.05, 182);
        assert!(half_year > 0.10);
    }

    #[test]
    fn trades_per_week_floors_days() {
        assert!((trades_per_week(14, 70) - 1.4).abs() < 1e-12);
        assert!((trades_per_week(1, 0) - 7.0).abs() < 1e-12);
    }

    #[test]
    fn sharpe_zero_for_flat_or_short() {
        assert_eq!(sharpe_ratio(&[100.0, 100.0, 100.0]), 0.0);
        assert_eq!(sharpe_ratio(&[100.0, 101.0]), 0.0);
    }

    #[test]
    fn sharpe_sign_follows_drift() {
        let up = [100.0, 101.0, 101.5, 103.0, 103.2, 104.0];
        let down: Vec<f64> = up.iter().rev().copied().collect();
        assert!(sharpe_ratio(&up) > 0.0);
        assert!(sharpe_ratio(&down) < 0.0);
    }

    #[test]
    fn summarize_empty_trace_uses_initial_cash() {
        let m = MetricsBundle::summarize(&[], &[], 10_000.0, 30);
        assert_eq!(m.final_equity, 10_000.0);
        assert_eq!(m.total_return_pct, 0.0);
        assert_eq!(m.max_drawdown_pct, 0.0);
        assert_eq!(m.trade_count, 0);
        assert!(m.sharpe.is_none());
    }

    #[test]
    fn infinite_profit_factor_survives_json() {
        let mut m = MetricsBundle::summarize(&[], &[trade(5.0, 0.5)], 10_000.0, 30);
        assert!(m.profit_factor.is_infinite());
        m.sharpe = Some(1.25);
        let json = serde_json::to_string(&m).unwrap();
        assert!(json.contains(r#""profit_factor":"inf""#));
        let back: MetricsBundle = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
    }
}
