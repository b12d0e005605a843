//! Decision Lab CLI — quick backtest, scenario sweep and strategy lab.
//!
//! Commands:
//! - `quick` — one trend backtest with a RED / YELLOW / GREEN verdict
//! - `scenarios` — 12-combination sweep, A/B/C picks, INVEST / CAUTION / NO
//! - `lab` — rank several strategy families by an objective
//!
//! Candles come from `<data-dir>/<SYMBOL>_<timeframe>.csv`, or from the
//! seeded generator with `--synthetic`.

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;

use decisionlab_core::domain::SignalStrictness;
use decisionlab_runner::data_loader::{CandleSource, CsvCandleSource, SyntheticCandleSource};
use decisionlab_runner::history::{JsonlRunStore, RunKind, RunRecord};
use decisionlab_runner::lab::LabReport;
use decisionlab_runner::runner::{
    build_record, persist, run_lab, run_quick, run_scenario_sweep, LabRequest, QuickRequest,
    QuickResult,
};
use decisionlab_runner::scenarios::{ScenarioBundle, ScenarioOutcome, Timeframe};
use decisionlab_runner::{LabConfig, MetricsBundle};

#[derive(Parser)]
#[command(
    name = "decisionlab",
    about = "Decision Lab — backtest a trend rule and turn the numbers into a decision"
)]
struct Cli {
    /// Directory holding `<SYMBOL>_<timeframe>.csv` candle files.
    #[arg(long, global = true, default_value = "data")]
    data_dir: PathBuf,

    /// Use seeded synthetic candles instead of CSV files.
    #[arg(long, global = true, default_value_t = false)]
    synthetic: bool,

    /// TOML config with [execution], [thresholds] and [lab] sections.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Append each run to this JSONL history file.
    #[arg(long, global = true)]
    history: Option<PathBuf>,

    /// Print the full result as JSON instead of a summary.
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    /// Debug logging.
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one trend backtest and classify it.
    Quick {
        symbol: String,

        /// Candle interval: 1h, 4h or 1d.
        #[arg(long, default_value = "4h")]
        timeframe: Timeframe,

        /// Lookback in days.
        #[arg(long, default_value_t = 90)]
        days: u32,

        /// EMA window (defaults to [execution].ema_window).
        #[arg(long)]
        ema: Option<usize>,

        /// strict or relaxed (defaults to [execution].strictness).
        #[arg(long, value_parser = parse_strictness)]
        strictness: Option<SignalStrictness>,
    },
    /// Sweep 1h/4h/1d × EMA 20/50 × strict/relaxed and pick scenarios A, B, C.
    Scenarios {
        symbol: String,

        #[arg(long, default_value_t = 90)]
        days: u32,
    },
    /// Rank EMA trend, EMA crossover, RSI reversion and Donchian candidates.
    Lab {
        symbol: String,

        #[arg(long, default_value = "1d")]
        timeframe: Timeframe,

        #[arg(long, default_value_t = 365)]
        days: u32,

        /// Sharpe, Return, "Min Drawdown" or "Win Rate".
        #[arg(long)]
        objective: Option<String>,

        #[arg(long)]
        max_runs: Option<usize>,

        #[arg(long)]
        top_n: Option<usize>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = LabConfig::load_or_default(cli.config.as_deref())?;
    let source: Box<dyn CandleSource> = if cli.synthetic {
        Box::new(SyntheticCandleSource::default())
    } else {
        if !cli.data_dir.is_dir() {
            bail!(
                "data directory {} does not exist (pass --data-dir or --synthetic)",
                cli.data_dir.display()
            );
        }
        Box::new(CsvCandleSource::new(&cli.data_dir))
    };
    let store = cli.history.map(JsonlRunStore::new);

    match cli.command {
        Commands::Quick {
            symbol,
            timeframe,
            days,
            ema,
            strictness,
        } => {
            let request = QuickRequest {
                symbol,
                timeframe,
                days,
                ema_window: ema,
                strictness,
            };
            let result = run_quick(source.as_ref(), &config, &request)?;
            if cli.json {
                print_json(&result)?;
            } else {
                print_quick(&result);
            }
            if let Some(store) = &store {
                let headline = result.verdict.status.to_string();
                let record = build_record(RunKind::Quick, &result.symbol, days, headline, &result)?;
                save(store, &record);
            }
        }
        Commands::Scenarios { symbol, days } => {
            let bundle = run_scenario_sweep(source.as_ref(), &config, &symbol, days)?;
            if cli.json {
                print_json(&bundle)?;
            } else {
                print_scenarios(&bundle);
            }
            if let Some(store) = &store {
                let headline = bundle.final_recommendation.label.to_string();
                let record = build_record(RunKind::Scenarios, &symbol, days, headline, &bundle)?;
                save(store, &record);
            }
        }
        Commands::Lab {
            symbol,
            timeframe,
            days,
            objective,
            max_runs,
            top_n,
        } => {
            let request = LabRequest {
                symbol,
                timeframe,
                days,
                objective,
                max_runs,
                top_n,
            };
            let report = run_lab(source.as_ref(), &config, &request)?;
            if cli.json {
                print_json(&report)?;
            } else {
                print_lab(&report);
            }
            if let Some(store) = &store {
                let headline = report
                    .top
                    .first()
                    .map(|r| r.candidate_id.clone())
                    .unwrap_or_default();
                let record = build_record(RunKind::Lab, &request.symbol, days, headline, &report)?;
                save(store, &record);
            }
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("debug,decisionlab_runner=debug")
    } else {
        EnvFilter::new("info,decisionlab_runner=info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).compact().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn save(store: &JsonlRunStore, record: &RunRecord) {
    if let Some(id) = persist(store, record) {
        tracing::info!(run_id = %id, "saved to {}", store.path().display());
    }
}

fn parse_strictness(s: &str) -> Result<SignalStrictness, String> {
    SignalStrictness::ALL
        .into_iter()
        .find(|v| v.as_str().eq_ignore_ascii_case(s))
        .ok_or_else(|| format!("unknown strictness '{s}' (expected strict or relaxed)"))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_metrics(m: &MetricsBundle) {
    println!("Total Return:   {:.2}%", m.total_return_pct);
    println!("Annualized:     {:.2}%", m.annualized_return_pct);
    println!("Max Drawdown:   {:.2}%", m.max_drawdown_pct);
    println!("Trades:         {} ({:.2}/week)", m.trade_count, m.trades_per_week);
    println!("Win Rate:       {:.1}%", m.win_rate_pct);
    println!("Expectancy:     {:.2}%", m.expectancy_pct);
    println!("Profit Factor:  {:.2}", m.profit_factor);
    if let Some(sharpe) = m.sharpe {
        println!("Sharpe:         {sharpe:.3}");
    }
}

fn print_quick(result: &QuickResult) {
    println!();
    println!("=== Quick Backtest ===");
    println!("Symbol:         {} {}", result.symbol, result.timeframe);
    println!(
        "Rule:           EMA({}) {}",
        result.params.ema_window, result.params.strictness
    );
    println!("Bars:           {}", result.bar_count);
    println!();
    println!("--- Performance ---");
    print_metrics(&result.metrics);
    println!();
    println!("--- Verdict: {} ---", result.verdict.status);
    for reason in &result.verdict.reasons {
        println!("- {reason}");
    }
    println!("{}", result.verdict.recommendation);
    println!();
}

fn scenario_line(label: &str, o: &ScenarioOutcome) {
    println!(
        "{label}  {:<22} {:<6} ann {:>8.2}%  dd {:>6.2}%  {:>5.2}/wk  exp {:>6.2}%{}",
        o.signature.to_string(),
        o.verdict.status.as_str(),
        o.metrics.annualized_return_pct,
        o.metrics.max_drawdown_pct,
        o.metrics.trades_per_week,
        o.metrics.expectancy_pct,
        if o.risk_exceeded { "  [risk exceeded]" } else { "" }
    );
}

fn print_scenarios(bundle: &ScenarioBundle) {
    println!();
    println!("=== Scenario Sweep ({} combinations) ===", bundle.candidates.len());
    for (label, outcome) in bundle.picks() {
        scenario_line(label.as_str(), outcome);
        println!("   {}", label.describe());
    }
    println!();
    let rec = &bundle.final_recommendation;
    println!(
        "--- Decision: {} (scenario {}, {}) ---",
        rec.label,
        rec.recommended,
        bundle.recommended().signature
    );
    println!("{}", rec.text);
    println!();
}

fn print_lab(report: &LabReport) {
    println!();
    println!(
        "=== Strategy Lab: top {} of {} by {} ===",
        report.top.len(),
        report.evaluated,
        report.objective
    );
    println!(
        "{:<22} {:<20} {:>9} {:>8} {:>8} {:>7}  params",
        "id", "strategy", "return", "dd", "sharpe", "win"
    );
    for row in &report.top {
        let m = &row.metrics;
        let params = row
            .params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(",");
        println!(
            "{:<22} {:<20} {:>8.2}% {:>7.2}% {:>8.3} {:>6.1}%  {params}",
            row.candidate_id,
            row.name,
            m.total_return_pct,
            m.max_drawdown_pct,
            m.sharpe_or_zero(),
            m.win_rate_pct
        );
    }
    if let Some(best) = report.top.first() {
        println!();
        println!("Best: {}", best.description);
    }
    println!();
}
