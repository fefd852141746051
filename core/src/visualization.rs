//! Visualization state: what the gauge and the history chart draw.
//!
//! Pure: (latest decision, history) in, state out. Recomputed on every
//! analysis and never stored.

use crate::{
    response_parser::{Decision, Verdict},
    session::SessionHistory,
    types::RiskScore,
};
use serde::{Deserialize, Serialize};

/// Score at which the gauge draws its decision threshold line.
pub const DECISION_THRESHOLD_MARKER: RiskScore = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskBand {
    Low,      // score < 20
    Guarded,  // 20 ≤ score < 40
    Elevated, // 40 ≤ score < 70
    Severe,   // score ≥ 70
}

impl RiskBand {
    pub fn for_score(score: RiskScore) -> Self {
        match score {
            0..=19  => RiskBand::Low,
            20..=39 => RiskBand::Guarded,
            40..=69 => RiskBand::Elevated,
            _       => RiskBand::Severe,
        }
    }

    /// 0 is the lowest risk, 3 the highest.
    pub fn index(self) -> u8 {
        match self {
            RiskBand::Low      => 0,
            RiskBand::Guarded  => 1,
            RiskBand::Elevated => 2,
            RiskBand::Severe   => 3,
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            RiskBand::Low      => "#00ff00",
            RiskBand::Guarded  => "#ffff00",
            RiskBand::Elevated => "#ff6600",
            RiskBand::Severe   => "#ff0000",
        }
    }
}

/// Share of each verdict in the history, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    pub approved_pct: f64,
    pub declined_pct: f64,
    pub unknown_pct:  f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualizationState {
    pub risk_score:       RiskScore,
    pub verdict:          Verdict,
    pub risk_band:        RiskBand,
    pub risk_band_index:  u8,
    pub risk_band_color:  String,
    /// Gauge fill, 0.0–1.0.
    pub gauge_value:      f64,
    pub threshold_marker: RiskScore,
    pub approved_count:   usize,
    pub declined_count:   usize,
    pub unknown_count:    usize,
    pub total_count:      usize,
    /// False until the first analysis is recorded; the chart shows
    /// "no transactions yet" instead of a distribution.
    pub has_data:         bool,
    pub distribution:     Option<Distribution>,
}

impl VisualizationState {
    pub fn map(decision: &Decision, history: &SessionHistory) -> Self {
        let band = RiskBand::for_score(decision.risk_score);
        let summary = history.summary();

        let distribution = (summary.total_count > 0).then(|| {
            let pct = |n: usize| n as f64 * 100.0 / summary.total_count as f64;
            Distribution {
                approved_pct: pct(summary.approved_count),
                declined_pct: pct(summary.declined_count),
                unknown_pct:  pct(summary.unknown_count),
            }
        });

        Self {
            risk_score:       decision.risk_score,
            verdict:          decision.verdict,
            risk_band:        band,
            risk_band_index:  band.index(),
            risk_band_color:  band.color().to_string(),
            gauge_value:      decision.risk_score as f64 / 100.0,
            threshold_marker: DECISION_THRESHOLD_MARKER,
            approved_count:   summary.approved_count,
            declined_count:   summary.declined_count,
            unknown_count:    summary.unknown_count,
            total_count:      summary.total_count,
            has_data:         distribution.is_some(),
            distribution,
        }
    }

    /// The state shown before any analysis has run.
    pub fn idle(history: &SessionHistory) -> Self {
        Self::map(&Decision::default(), history)
    }
}
