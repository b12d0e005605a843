//! Run history — JSONL append-only persistence.
//!
//! Each completed run becomes one JSON object on its own line, written with a
//! single `writeln!`. The run id is the BLAKE3 hash of the record's JSON, so
//! identical records share an id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub type RunId = String;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("history I/O at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("serialize run record: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunKind {
    Quick,
    Scenarios,
    Lab,
}

impl RunKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Quick => "quick",
            Self::Scenarios => "scenarios",
            Self::Lab => "lab",
        }
    }
}

/// What gets persisted for one run: inputs plus the serialized outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub kind: RunKind,
    pub symbol: String,
    pub days: u32,
    pub created_at: DateTime<Utc>,
    /// Headline line for listings, e.g. the verdict or the top candidate.
    pub headline: String,
    pub payload: serde_json::Value,
}

impl RunRecord {
    pub fn run_id(&self) -> Result<RunId, StoreError> {
        let json = serde_json::to_string(self)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}

/// A record as stored, with its id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRun {
    pub run_id: RunId,
    #[serde(flatten)]
    pub record: RunRecord,
}

/// Persistence collaborator.
pub trait RunStore: Send + Sync {
    /// Persist a record and return its id.
    fn save(&self, record: &RunRecord) -> Result<RunId, StoreError>;
}

/// Appends runs to a JSONL file.
#[derive(Debug, Clone)]
pub struct JsonlRunStore {
    path: PathBuf,
}

impl JsonlRunStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }

    /// Read all stored runs. Malformed lines are skipped.
    pub fn read_all(&self) -> Result<Vec<StoredRun>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = fs::File::open(&self.path).map_err(|e| self.io_err(e))?;
        let mut runs = Vec::new();
        for line in io::BufReader::new(file).lines() {
            let line = line.map_err(|e| self.io_err(e))?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<StoredRun>(&line) {
                Ok(run) => runs.push(run),
                Err(e) => tracing::warn!(path = %self.path.display(), "skipping malformed history line: {e}"),
            }
        }
        Ok(runs)
    }
}

impl RunStore for JsonlRunStore {
    fn save(&self, record: &RunRecord) -> Result<RunId, StoreError> {
        let run_id = record.run_id()?;
        let json = serde_json::to_string(&StoredRun {
            run_id: run_id.clone(),
            record: record.clone(),
        })?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_err(e))?;
        writeln!(file, "{json}").map_err(|e| self.io_err(e))?;
        file.flush().map_err(|e| self.io_err(e))?;

        Ok(run_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(symbol: &str) -> RunRecord {
        RunRecord {
            kind: RunKind::Quick,
            symbol: symbol.into(),
            days: 90,
            created_at: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
            headline: "GREEN".into(),
            payload: serde_json::json!({ "total_return_pct": 12.5 }),
        }
    }

    #[test]
    fn run_id_is_content_hash() {
        let a = record("BTC");
        assert_eq!(a.run_id().unwrap(), record("BTC").run_id().unwrap());
        assert_ne!(a.run_id().unwrap(), record("ETH").run_id().unwrap());
        assert_eq!(a.run_id().unwrap().len(), 64);
    }

    #[test]
    fn save_appends_one_line_per_run() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlRunStore::new(dir.path().join("nested").join("runs.jsonl"));

        let id1 = store.save(&record("BTC")).unwrap();
        let id2 = store.save(&record("ETH")).unwrap();
        assert_ne!(id1, id2);

        let content = fs::read_to_string(store.path()).unwrap();
        assert_eq!(content.lines().count(), 2);

        let runs = store.read_all().unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].run_id, id1);
        assert_eq!(runs[1].record.symbol, "ETH");
    }

    #[test]
    fn reloaded_floats_are_exact() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlRunStore::new(dir.path().join("runs.jsonl"));
        let tpw = 7.0 / 30.0;
        let mut rec = record("BTC");
        rec.payload = serde_json::json!({ "trades_per_week": tpw });
        store.save(&rec).unwrap();

        let runs = store.read_all().unwrap();
        assert_eq!(runs[0].record.payload["trades_per_week"].as_f64(), Some(tpw));
        assert_eq!(runs[0].record, rec);
    }

    #[test]
    fn read_all_skips_malformed_lines() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlRunStore::new(dir.path().join("runs.jsonl"));
        store.save(&record("BTC")).unwrap();
        let mut f = OpenOptions::new().append(true).open(store.path()).unwrap();
        writeln!(f, "{{not json").unwrap();
        store.save(&record("SOL")).unwrap();

        let runs = store.read_all().unwrap();
        assert_eq!(runs.len(), 2);
    }

    #[test]
    fn missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlRunStore::new(dir.path().join("none.jsonl"));
        assert!(store.read_all().unwrap().is_empty());
    }
}
