//! Ranking objective — which metric the strategy lab sorts by.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::LabError;
use crate::metrics::MetricsBundle;

/// Which metric to rank lab candidates by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Objective {
    #[default]
    Sharpe,
    Return,
    #[serde(rename = "Min Drawdown")]
    MinDrawdown,
    #[serde(rename = "Win Rate")]
    WinRate,
}

impl Objective {
    pub const ALL: [Objective; 4] = [
        Objective::Sharpe,
        Objective::Return,
        Objective::MinDrawdown,
        Objective::WinRate,
    ];

    /// Display name, also the accepted input spelling.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sharpe => "Sharpe",
            Self::Return => "Return",
            Self::MinDrawdown => "Min Drawdown",
            Self::WinRate => "Win Rate",
        }
    }

    /// Extract the metric this objective ranks by.
    pub fn extract(&self, metrics: &MetricsBundle) -> f64 {
        match self {
            Self::Sharpe => metrics.sharpe_or_zero(),
            Self::Return => metrics.total_return_pct,
            Self::MinDrawdown => metrics.max_drawdown_pct,
            Self::WinRate => metrics.win_rate_pct,
        }
    }

    /// True when smaller values rank first (drawdown).
    pub fn is_ascending(&self) -> bool {
        matches!(self, Self::MinDrawdown)
    }

    fn valid_names() -> String {
        Self::ALL
            .iter()
            .map(|o| o.name())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Objective {
    type Err = LabError;

    /// Accepts the display name ("Min Drawdown") or its snake_case form
    /// ("min_drawdown").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', " ");
        Self::ALL
            .into_iter()
            .find(|o| o.name().to_ascii_lowercase() == normalized)
            .ok_or_else(|| LabError::UnsupportedObjective {
                name: s.to_string(),
                valid: Self::valid_names(),
            })
    }
}
