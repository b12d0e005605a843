//! Candle sources for the runner.
//!
//! The core never fetches data; callers hand it candles obtained through a
//! [`CandleSource`]. Two implementations:
//! - [`CsvCandleSource`]: `<dir>/<SYMBOL>_<timeframe>.csv` with columns
//!   `ts,open,high,low,close,volume` (`ts` as RFC 3339 or epoch milliseconds)
//! - [`SyntheticCandleSource`]: seeded random walk, developer-only
//!
//! Both return canonical series (sorted, first-wins dedup, void rows dropped)
//! trimmed to the requested number of days.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use decisionlab_core::data::canonicalize;
use decisionlab_core::domain::Candle;

use crate::scenarios::Timeframe;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no candle file for '{symbol}' {timeframe} at {path} (use --synthetic for synthetic data)")]
    NotFound {
        symbol: String,
        timeframe: Timeframe,
        path: String,
    },

    #[error("read {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("{path}: row {row}: unparseable timestamp '{value}'")]
    BadTimestamp { path: String, row: usize, value: String },

    #[error("no candles for '{symbol}' {timeframe} in the last {days} day(s)")]
    Empty {
        symbol: String,
        timeframe: Timeframe,
        days: u32,
    },

    #[error("{days} day(s) of synthetic candles requested; the limit is {max}")]
    TooManyDays { days: u32, max: u32 },
}

/// Market-data collaborator injected into the orchestration layer.
pub trait CandleSource: Send + Sync {
    /// Short name for logs ("csv", "synthetic").
    fn name(&self) -> &str;

    /// Canonical candles for `symbol` at `timeframe` covering the last `days`.
    fn fetch(&self, symbol: &str, timeframe: Timeframe, days: u32) -> Result<Vec<Candle>, LoadError>;
}

/// Keep candles within `days` of the last timestamp.
pub fn trim_to_days(candles: Vec<Candle>, days: u32) -> Vec<Candle> {
    let Some(last) = candles.last().map(|c| c.timestamp) else {
        return candles;
    };
    let cutoff = last - Duration::days(i64::from(days));
    candles.into_iter().filter(|c| c.timestamp >= cutoff).collect()
}

// ── CSV ──

#[derive(Debug, Deserialize)]
struct CsvRow {
    ts: String,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    volume: Option<f64>,
}

/// Parse RFC 3339 or integer epoch milliseconds.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ms) = raw.parse::<i64>() {
        return Utc.timestamp_millis_opt(ms).single();
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Reads `<dir>/<SYMBOL>_<timeframe>.csv`.
#[derive(Debug, Clone)]
pub struct CsvCandleSource {
    dir: PathBuf,
}

impl CsvCandleSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, symbol: &str, timeframe: Timeframe) -> PathBuf {
        self.dir
            .join(format!("{}_{}.csv", symbol.to_ascii_uppercase(), timeframe))
    }

    /// Read every row of a candle file. Missing prices become NaN and are
    /// dropped later by canonicalization.
    pub fn read_file(path: &Path) -> Result<Vec<Candle>, LoadError> {
        let display = path.display().to_string();
        let csv_err = |source| LoadError::Csv {
            path: display.clone(),
            source,
        };

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(csv_err)?;

        let mut candles = Vec::new();
        for (i, row) in reader.deserialize::<CsvRow>().enumerate() {
            let row = row.map_err(csv_err)?;
            let timestamp = parse_timestamp(&row.ts).ok_or_else(|| LoadError::BadTimestamp {
                path: display.clone(),
                row: i + 1,
                value: row.ts.clone(),
            })?;
            candles.push(Candle {
                timestamp,
                open: row.open.unwrap_or(f64::NAN),
                high: row.high.unwrap_or(f64::NAN),
                low: row.low.unwrap_or(f64::NAN),
                close: row.close.unwrap_or(f64::NAN),
                volume: row.volume.unwrap_or(0.0),
            });
        }
        Ok(candles)
    }
}

impl CandleSource for CsvCandleSource {
    fn name(&self) -> &str {
        "csv"
    }

    fn fetch(&self, symbol: &str, timeframe: Timeframe, days: u32) -> Result<Vec<Candle>, LoadError> {
        let path = self.path_for(symbol, timeframe);
        if !path.exists() {
            return Err(LoadError::NotFound {
                symbol: symbol.to_string(),
                timeframe,
                path: path.display().to_string(),
            });
        }

        let canonical = canonicalize(Self::read_file(&path)?);
        for warning in canonical.warnings() {
            tracing::warn!(symbol, %timeframe, "{warning}");
        }

        let candles = trim_to_days(canonical.candles, days);
        if candles.is_empty() {
            return Err(LoadError::Empty {
                symbol: symbol.to_string(),
                timeframe,
                days,
            });
        }
        Ok(candles)
    }
}

// ── Synthetic ──

/// Deterministic random walk seeded from `SYMBOL:timeframe`.
///
/// Results on synthetic data say nothing about a market; use it to exercise
/// the pipeline without data files.
#[derive(Debug, Clone)]
pub struct SyntheticCandleSource {
    start: DateTime<Utc>,
}

impl Default for SyntheticCandleSource {
    fn default() -> Self {
        Self {
            start: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().unwrap_or_default(),
        }
    }
}

impl SyntheticCandleSource {
    /// Ten years; above this `generate` refuses.
    pub const MAX_DAYS: u32 = 3_650;

    pub fn starting_at(start: DateTime<Utc>) -> Self {
        Self { start }
    }

    pub fn generate(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        days: u32,
    ) -> Result<Vec<Candle>, LoadError> {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        if days > Self::MAX_DAYS {
            return Err(LoadError::TooManyDays {
                days,
                max: Self::MAX_DAYS,
            });
        }

        let seed_bytes = blake3::hash(format!("{}:{}", symbol.to_ascii_uppercase(), timeframe).as_bytes());
        let mut rng = StdRng::from_seed(*seed_bytes.as_bytes());

        let step = timeframe.duration().num_seconds();
        let bars = (Duration::days(i64::from(days.max(1))).num_seconds() / step).max(1);
        // Per-bar volatility shrinks with the interval.
        let vol = match timeframe {
            Timeframe::H1 => 0.006,
            Timeframe::H4 => 0.012,
            Timeframe::D1 => 0.03,
        };

        let mut candles = Vec::with_capacity(bars as usize);
        let mut price = 100.0_f64;
        for i in 0..bars {
            let ret: f64 = rng.gen_range(-vol..vol);
            let open = price;
            let close = price * (1.0 + ret);
            let high = open.max(close) * (1.0 + rng.gen_range(0.0..vol / 3.0));
            let low = open.min(close) * (1.0 - rng.gen_range(0.0..vol / 3.0));
            candles.push(Candle {
                timestamp: self.start + Duration::seconds(step * i),
                open,
                high,
                low,
                close,
                volume: rng.gen_range(500_000.0..5_000_000.0),
            });
            price = close;
        }
        Ok(candles)
    }
}

impl CandleSource for SyntheticCandleSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch(&self, symbol: &str, timeframe: Timeframe, days: u32) -> Result<Vec<Candle>, LoadError> {
        tracing::warn!(symbol, %timeframe, "generating synthetic candles");
        self.generate(symbol, timeframe, days)
    }
}
