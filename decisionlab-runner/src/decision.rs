//! Decision layer — metrics bundle → RED / YELLOW / GREEN verdict, and the
//! cross-scenario INVEST / CAUTION / NO recommendation.
//!
//! Classification uses fixed thresholds only; the score is for ranking
//! scenarios against each other and never changes a status.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::metrics::MetricsBundle;
use crate::scenarios::ScenarioLabel;

// ── Threshold defaults ──

/// Minimum acceptable annualized return, percent.
pub const RET_MIN: f64 = 5.0;
/// "Good" annualized return target, percent.
pub const RET_GOOD: f64 = 15.0;
/// Maximum tolerable drawdown, percent.
pub const DD_MAX: f64 = 20.0;
/// Comfortable drawdown bound, percent.
pub const DD_WARN: f64 = 12.0;
/// Minimum closed trades for a confident verdict.
pub const MIN_TRADES: usize = 10;
/// Target trade frequency, trades per week.
pub const TPW_TARGET: f64 = 2.0;
/// Allowed deviation from the frequency target.
pub const TPW_TOL: f64 = 1.5;

/// Named decision thresholds. Every field defaults to the constants above.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionThresholds {
    pub ret_min: f64,
    pub ret_good: f64,
    pub dd_max: f64,
    pub dd_warn: f64,
    pub min_trades: usize,
    pub tpw_target: f64,
    pub tpw_tol: f64,
}

impl Default for DecisionThresholds {
    fn default() -> Self {
        Self {
            ret_min: RET_MIN,
            ret_good: RET_GOOD,
            dd_max: DD_MAX,
            dd_warn: DD_WARN,
            min_trades: MIN_TRADES,
            tpw_target: TPW_TARGET,
            tpw_tol: TPW_TOL,
        }
    }
}

impl DecisionThresholds {
    /// Distance of a trade frequency from the target.
    pub fn tpw_gap(&self, trades_per_week: f64) -> f64 {
        (trades_per_week - self.tpw_target).abs()
    }

    fn frequency_off(&self, trades_per_week: f64) -> bool {
        self.tpw_gap(trades_per_week) > self.tpw_tol
    }
}

/// Traffic-light status of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Red,
    Yellow,
    Green,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Red => "RED",
            Self::Yellow => "YELLOW",
            Self::Green => "GREEN",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of one run with its reasons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub status: Status,
    pub reasons: Vec<String>,
    pub recommendation: String,
    pub score: f64,
}

/// Ranking score: rewards return and expectancy, penalizes drawdown and
/// distance from the trade-frequency target.
pub fn decision_score(metrics: &MetricsBundle, t: &DecisionThresholds) -> f64 {
    let ret_s = metrics.annualized_return_pct / t.ret_good.max(1e-9);
    let dd_s = metrics.max_drawdown_pct / t.dd_max.max(1e-9);
    let tpw_pen = t.tpw_gap(metrics.trades_per_week) / t.tpw_target.max(1e-9);
    1.0 * ret_s - 0.8 * dd_s - 0.1 * tpw_pen + 0.2 * metrics.expectancy_pct
}

/// Classify a metrics bundle.
pub fn evaluate_run(metrics: &MetricsBundle, t: &DecisionThresholds) -> Verdict {
    let ann = metrics.annualized_return_pct;
    let dd = metrics.max_drawdown_pct;
    let trades = metrics.trade_count;
    let tpw = metrics.trades_per_week;

    let is_red = ann < t.ret_min || dd > t.dd_max || trades < t.min_trades;
    let is_green = ann >= t.ret_good && dd <= t.dd_warn && trades >= t.min_trades;

    let mut reasons = Vec::new();
    let (status, recommendation) = if is_red {
        if ann < t.ret_min {
            reasons.push(format!(
                "Annualized return {ann:.2}% is below minimum {:.2}%.",
                t.ret_min
            ));
        }
        if dd > t.dd_max {
            reasons.push(format!("Max drawdown {dd:.2}% exceeds risk limit {:.2}%.", t.dd_max));
        }
        if trades < t.min_trades {
            reasons.push(format!(
                "Only {trades} trades (min {}) -> low confidence.",
                t.min_trades
            ));
        }
        (Status::Red, "NO - conditions are not supportive under this setup.")
    } else if is_green {
        reasons.push(format!(
            "Return >= {:.0}% annualized and drawdown <= {:.0}%.",
            t.ret_good, t.dd_warn
        ));
        if t.frequency_off(tpw) {
            reasons.push(format!(
                "Trade frequency {tpw:.2}/week deviates from target {:.0}/week.",
                t.tpw_target
            ));
        }
        (Status::Green, "INVEST - setup looks reasonable under tested conditions.")
    } else {
        if ann < t.ret_good {
            reasons.push(format!(
                "Annualized return {ann:.2}% is below target {:.2}%.",
                t.ret_good
            ));
        }
        if dd > t.dd_warn {
            reasons.push(format!("Drawdown {dd:.2}% is above comfort zone {:.2}%.", t.dd_warn));
        }
        if t.frequency_off(tpw) {
            reasons.push(format!(
                "Trades/week {tpw:.2} is far from target {:.0}.",
                t.tpw_target
            ));
        }
        if reasons.is_empty() {
            reasons.push("Mixed return/risk profile.".to_string());
        }
        (
            Status::Yellow,
            "CAUTION - consider parameter changes or reduced position size.",
        )
    };

    Verdict {
        status,
        reasons,
        recommendation: recommendation.to_string(),
        score: decision_score(metrics, t),
    }
}

// ── Cross-scenario recommendation ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinalLabel {
    Invest,
    Caution,
    No,
}

impl FinalLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Invest => "INVEST",
            Self::Caution => "CAUTION",
            Self::No => "NO",
        }
    }

    fn text(&self) -> &'static str {
        match self {
            Self::Invest => "INVEST - at least one scenario is robust with acceptable risk.",
            Self::Caution => "CAUTION - no fully robust setup; proceed only with risk controls.",
            Self::No => "NO - all scenarios are high-risk or underperforming.",
        }
    }
}

impl fmt::Display for FinalLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalRecommendation {
    pub label: FinalLabel,
    pub text: String,
    pub recommended: ScenarioLabel,
}

/// One selected scenario as seen by [`final_decision`].
pub type ScenarioView<'a> = (ScenarioLabel, &'a MetricsBundle, &'a Verdict);

/// Consolidate the A/B/C verdicts (given in A, B, C order).
///
/// Recommended: first GREEN in priority B, A, C; else the best-scoring
/// YELLOW; else best annualized return, then lowest drawdown. Ties keep the
/// earlier scenario.
pub fn final_decision(scenarios: &[ScenarioView<'_>; 3]) -> FinalRecommendation {
    let status_of = |label: ScenarioLabel| {
        scenarios
            .iter()
            .find(|(l, _, _)| *l == label)
            .map(|(_, _, v)| v.status)
    };

    let green = [ScenarioLabel::B, ScenarioLabel::A, ScenarioLabel::C]
        .into_iter()
        .find(|&l| status_of(l) == Some(Status::Green));

    let recommended = green.unwrap_or_else(|| {
        let yellow = first_max_by(
            scenarios.iter().filter(|(_, _, v)| v.status == Status::Yellow),
            |(_, _, v)| (v.score, 0.0),
        );
        yellow
            .or_else(|| {
                first_max_by(scenarios.iter(), |(_, m, _)| {
                    (m.annualized_return_pct, -m.max_drawdown_pct)
                })
            })
            .map_or(scenarios[0].0, |(l, _, _)| *l)
    });

    let all_red = scenarios.iter().all(|(_, _, v)| v.status == Status::Red);
    let any_green = scenarios.iter().any(|(_, _, v)| v.status == Status::Green);

    let label = if all_red {
        FinalLabel::No
    } else if any_green && status_of(recommended) != Some(Status::Red) {
        FinalLabel::Invest
    } else {
        FinalLabel::Caution
    };

    FinalRecommendation {
        label,
        text: label.text().to_string(),
        recommended,
    }
}

/// First element with the greatest `(primary, secondary)` key.
fn first_max_by<'a, T, I, F>(items: I, key: F) -> Option<&'a T>
where
    I: Iterator<Item = &'a T>,
    F: Fn(&T) -> (f64, f64),
{
    let mut best: Option<(&'a T, (f64, f64))> = None;
    for item in items {
        let k = key(item);
        let better = match &best {
            None => true,
            Some((_, bk)) => k.0.total_cmp(&bk.0).then(k.1.total_cmp(&bk.1)).is_gt(),
        };
        if better {
            best = Some((item, k));
        }
    }
    best.map(|(item, _)| item)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(ann: f64, dd: f64, trades: usize, tpw: f64, exp: f64) -> MetricsBundle {
        MetricsBundle {
            total_return_pct: ann / 2.0,
            annualized_return_pct: ann,
            final_equity: 10_000.0,
            max_drawdown_pct: dd,
            trade_count: trades,
            trades_per_week: tpw,
            win_rate_pct: 50.0,
            expectancy_pct: exp,
            profit_factor: 1.2,
            test_days: 180,
            sharpe: None,
        }
    }

    fn t() -> DecisionThresholds {
        DecisionThresholds::default()
    }

    #[test]
    fn red_lists_every_failure() {
        let v = evaluate_run(&metrics(2.0, 25.0, 3, 2.0, 0.1), &t());
        assert_eq!(v.status, Status::Red);
        assert_eq!(v.reasons.len(), 3);
        assert_eq!(v.reasons[0], "Annualized return 2.00% is below minimum 5.00%.");
        assert_eq!(v.reasons[1], "Max drawdown 25.00% exceeds risk limit 20.00%.");
        assert_eq!(v.reasons[2], "Only 3 trades (min 10) -> low confidence.");
        assert!(v.recommendation.starts_with("NO"));
    }

    #[test]
    fn green_notes_frequency_drift() {
        let v = evaluate_run(&metrics(20.0, 10.0, 30, 5.0, 0.5), &t());
        assert_eq!(v.status, Status::Green);
        assert_eq!(v.reasons[0], "Return >= 15% annualized and drawdown <= 12%.");
        assert_eq!(v.reasons[1], "Trade frequency 5.00/week deviates from target 2/week.");
        assert!(v.recommendation.starts_with("INVEST"));
    }

    #[test]
    fn yellow_lists_shortfalls() {
        let v = evaluate_run(&metrics(10.0, 15.0, 20, 2.0, 0.2), &t());
        assert_eq!(v.status, Status::Yellow);
        assert_eq!(
            v.reasons,
            vec![
                "Annualized return 10.00% is below target 15.00%.".to_string(),
                "Drawdown 15.00% is above comfort zone 12.00%.".to_string(),
            ]
        );
        assert!(v.recommendation.starts_with("CAUTION"));
    }

    #[test]
    fn score_matches_weights() {
        let m = metrics(15.0, 10.0, 20, 3.0, 0.5);
        // 1.0 - 0.8 * 0.5 - 0.1 * 0.5 + 0.2 * 0.5
        assert!((decision_score(&m, &t()) - 0.65).abs() < 1e-12);
    }

    #[test]
    fn score_never_changes_status() {
        // Huge expectancy cannot lift a RED.
        let v = evaluate_run(&metrics(1.0, 5.0, 50, 2.0, 100.0), &t());
        assert_eq!(v.status, Status::Red);
        assert!(v.score > 10.0);
    }

    fn verdict(status: Status, score: f64) -> Verdict {
        Verdict {
            status,
            reasons: vec![],
            recommendation: String::new(),
            score,
        }
    }

    #[test]
    fn all_red_is_no() {
        let m = metrics(1.0, 30.0, 2, 0.1, -1.0);
        let r = verdict(Status::Red, 0.0);
        let fr = final_decision(&[
            (ScenarioLabel::A, &m, &r),
            (ScenarioLabel::B, &m, &r),
            (ScenarioLabel::C, &m, &r),
        ]);
        assert_eq!(fr.label, FinalLabel::No);
        assert_eq!(fr.text, "NO - all scenarios are high-risk or underperforming.");
    }

    #[test]
    fn all_red_recommends_best_return_then_lower_drawdown() {
        let r = verdict(Status::Red, 0.0);
        let weak = metrics(2.0, 8.0, 30, 2.0, 0.1);
        let strong = metrics(6.0, 40.0, 30, 2.0, 0.1);
        let fr = final_decision(&[
            (ScenarioLabel::A, &weak, &r),
            (ScenarioLabel::B, &weak, &r),
            (ScenarioLabel::C, &strong, &r),
        ]);
        assert_eq!(fr.recommended, ScenarioLabel::C);
        assert_eq!(fr.label, FinalLabel::No);

        // Equal returns: the shallower drawdown wins.
        let deep = metrics(6.0, 40.0, 30, 2.0, 0.1);
        let shallow = metrics(6.0, 25.0, 30, 2.0, 0.1);
        let fr = final_decision(&[
            (ScenarioLabel::A, &deep, &r),
            (ScenarioLabel::B, &weak, &r),
            (ScenarioLabel::C, &shallow, &r),
        ]);
        assert_eq!(fr.recommended, ScenarioLabel::C);
        assert_eq!(fr.label, FinalLabel::No);
    }

    #[test]
    fn green_prefers_b_then_a() {
        let m = metrics(20.0, 5.0, 30, 2.0, 0.5);
        let g = verdict(Status::Green, 1.0);
        let y = verdict(Status::Yellow, 5.0);
        let fr = final_decision(&[
            (ScenarioLabel::A, &m, &g),
            (ScenarioLabel::B, &m, &y),
            (ScenarioLabel::C, &m, &g),
        ]);
        assert_eq!(fr.recommended, ScenarioLabel::A);
        assert_eq!(fr.label, FinalLabel::Invest);

        let fr = final_decision(&[
            (ScenarioLabel::A, &m, &g),
            (ScenarioLabel::B, &m, &g),
            (ScenarioLabel::C, &m, &g),
        ]);
        assert_eq!(fr.recommended, ScenarioLabel::B);
    }

    #[test]
    fn best_yellow_without_green_is_caution() {
        let m = metrics(10.0, 15.0, 20, 2.0, 0.2);
        let fr = final_decision(&[
            (ScenarioLabel::A, &m, &verdict(Status::Yellow, 0.3)),
            (ScenarioLabel::B, &m, &verdict(Status::Red, 9.0)),
            (ScenarioLabel::C, &m, &verdict(Status::Yellow, 0.7)),
        ]);
        assert_eq!(fr.recommended, ScenarioLabel::C);
        assert_eq!(fr.label, FinalLabel::Caution);
    }

    #[test]
    fn yellow_ties_keep_first() {
        let m = metrics(10.0, 15.0, 20, 2.0, 0.2);
        let y = verdict(Status::Yellow, 0.5);
        let fr = final_decision(&[
            (ScenarioLabel::A, &m, &y),
            (ScenarioLabel::B, &m, &y),
            (ScenarioLabel::C, &m, &verdict(Status::Red, 0.0)),
        ]);
        assert_eq!(fr.recommended, ScenarioLabel::A);
    }

    #[test]
    fn thresholds_deserialize_partially() {
        let t: DecisionThresholds = serde_json::from_str(r#"{"dd_max": 30.0}"#).unwrap();
        assert_eq!(t.dd_max, 30.0);
        assert_eq!(t.ret_good, RET_GOOD);
    }
}
