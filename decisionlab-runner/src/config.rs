//! Lab configuration loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file) is valid:
//!
//! ```toml
//! [execution]
//! fee_rate = 0.001
//! cooldown_bars = 0
//!
//! [thresholds]
//! dd_max = 25.0
//!
//! [lab]
//! objective = "Min Drawdown"
//! top_n = 3
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use decisionlab_core::domain::BacktestParams;
use decisionlab_core::engine::validate_params;

use crate::decision::DecisionThresholds;
use crate::objective::Objective;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Strategy lab defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabSettings {
    pub objective: Objective,
    pub max_runs: usize,
    pub top_n: usize,
}

impl Default for LabSettings {
    fn default() -> Self {
        Self {
            objective: Objective::Sharpe,
            max_runs: 160,
            top_n: 5,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabConfig {
    /// Execution policy shared by every run.
    pub execution: BacktestParams,
    pub thresholds: DecisionThresholds,
    pub lab: LabSettings,
}

impl LabConfig {
    /// Parse from a TOML string and validate.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Load from `path` if given, otherwise defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_params(&self.execution).map_err(|e| ConfigError::Invalid(e.to_string()))?;

        let t = &self.thresholds;
        if !(t.ret_min <= t.ret_good) {
            return Err(ConfigError::Invalid(format!(
                "thresholds.ret_min ({}) must not exceed ret_good ({})",
                t.ret_min, t.ret_good
            )));
        }
        if !(t.dd_warn >= 0.0 && t.dd_warn <= t.dd_max) {
            return Err(ConfigError::Invalid(format!(
                "thresholds.dd_warn ({}) must lie in [0, dd_max ({})]",
                t.dd_warn, t.dd_max
            )));
        }
        if !(t.tpw_target >= 0.0 && t.tpw_tol >= 0.0) {
            return Err(ConfigError::Invalid(
                "thresholds.tpw_target and tpw_tol must be non-negative".into(),
            ));
        }
        if self.lab.max_runs < 1 {
            return Err(ConfigError::Invalid("lab.max_runs must be >= 1".into()));
        }
        if self.lab.top_n < 1 {
            return Err(ConfigError::Invalid("lab.top_n must be >= 1".into()));
        }
        Ok(())
    }
}
