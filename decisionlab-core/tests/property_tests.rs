//! Property tests for engine invariants.
//!
//! Uses proptest to verify, over random candle walks and random signals:
//! 1. Trace completeness — one equity sample per candle
//! 2. Determinism — identical inputs give identical output
//! 3. Cash conservation — final equity = start + Σ(pnl - fees)
//! 4. Trade accounting — every opened position yields exactly one trade
//! 5. Signal shape — every family returns full-length sequences

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;

use decisionlab_core::domain::{BacktestParams, BarAction, Candle, FillTiming, SignalStrictness};
use decisionlab_core::engine::{run_trend_backtest, simulate};
use decisionlab_core::signals::{SignalPair, StrategySpec};

// ── Strategies (proptest) ────────────────────────────────────────────

/// Random walk of 20..120 candles with a consistent OHLC envelope.
fn arb_candles() -> impl Strategy<Value = Vec<Candle>> {
    prop::collection::vec((-3.0..3.0_f64, 0.0..2.0_f64, 0.0..2.0_f64), 20..120).prop_map(|steps| {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut close = 100.0_f64;
        steps
            .into_iter()
            .enumerate()
            .map(|(i, (step, up, down))| {
                let open = close;
                close = (close + step).max(1.0);
                Candle {
                    timestamp: base + Duration::hours(i as i64),
                    open,
                    high: open.max(close) + up,
                    low: (open.min(close) - down).max(0.5),
                    close,
                    volume: 1_000.0,
                }
            })
            .collect()
    })
}

fn arb_params() -> impl Strategy<Value = BacktestParams> {
    (
        1usize..40,
        any::<bool>(),
        any::<bool>(),
        0.0..3.0_f64,
        0.0..4.0_f64,
        0.0..0.01_f64,
        0.0..0.01_f64,
        0usize..5,
    )
        .prop_map(|(window, strict, next_open, sl, tp, fee, slip, cooldown)| BacktestParams {
            ema_window: window,
            strictness: if strict {
                SignalStrictness::Strict
            } else {
                SignalStrictness::Relaxed
            },
            fill_timing: if next_open {
                FillTiming::NextBarOpen
            } else {
                FillTiming::SameBarClose
            },
            stop_atr_mult: sl,
            target_atr_mult: tp,
            fee_rate: fee,
            slippage_rate: slip,
            initial_cash: 10_000.0,
            cooldown_bars: cooldown,
        })
}

proptest! {
    #[test]
    fn trace_has_one_sample_per_candle(candles in arb_candles(), params in arb_params()) {
        let run = run_trend_backtest(&candles, &params).unwrap();
        prop_assert_eq!(run.equity.len(), candles.len());
        for (sample, candle) in run.equity.iter().zip(&candles) {
            prop_assert_eq!(sample.timestamp, candle.timestamp);
        }
    }

    #[test]
    fn simulation_is_deterministic(candles in arb_candles(), params in arb_params()) {
        let a = run_trend_backtest(&candles, &params).unwrap();
        let b = run_trend_backtest(&candles, &params).unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn cash_is_conserved(candles in arb_candles(), params in arb_params()) {
        let run = run_trend_backtest(&candles, &params).unwrap();
        let expected = params.initial_cash
            + run.trades.iter().map(|t| t.pnl - t.fees).sum::<f64>();
        let actual = run.final_equity();
        prop_assert!(
            ((actual - expected) / expected).abs() < 1e-6,
            "final {} vs expected {}", actual, expected
        );
        prop_assert!(!run.equity.last().unwrap().in_position);
    }

    #[test]
    fn every_position_yields_one_trade(
        candles in arb_candles(),
        params in arb_params(),
        entry_bits in prop::collection::vec(any::<bool>(), 120),
        exit_bits in prop::collection::vec(any::<bool>(), 120),
    ) {
        let n = candles.len();
        let signals = SignalPair::new(entry_bits[..n].to_vec(), exit_bits[..n].to_vec());
        let run = simulate(&candles, &signals, &params).unwrap();

        let exits = run.equity.iter().filter(|s| matches!(s.action, BarAction::Exit(_))).count();
        let entries = run.equity.iter().filter(|s| s.action == BarAction::Entry).count();
        // A bar reports one action: a re-entry hides that bar's exit, and a
        // last-bar entry is reported as its forced close.
        prop_assert!(run.trades.len() >= exits);
        prop_assert!(run.trades.len() >= entries);
        prop_assert!(run.trades.len() <= entries + 1);
        for trade in &run.trades {
            prop_assert!(trade.exit_time >= trade.entry_time);
            prop_assert!(trade.units > 0.0);
        }
    }

    #[test]
    fn every_family_fills_the_series(candles in arb_candles(), fast in 2usize..15, slow in 15usize..60) {
        let specs = [
            StrategySpec::EmaTrend { ema_window: slow, strictness: SignalStrictness::Relaxed },
            StrategySpec::EmaCrossover { fast_ema: fast, slow_ema: slow },
            StrategySpec::RsiMeanReversion { rsi_window: fast, entry_rsi: 30.0, exit_rsi: 55.0 },
            StrategySpec::DonchianBreakout { breakout_window: slow, exit_window: fast },
        ];
        for spec in &specs {
            let pair = spec.build_signals(&candles).unwrap();
            prop_assert_eq!(pair.entry.len(), candles.len());
            prop_assert_eq!(pair.exit.len(), candles.len());
        }
    }
}
