//! Session history: every decision the operator has seen this run.
//!
//! RULE: Append-only. Entries are never edited, removed or deduplicated.
//! Lives for the process lifetime; nothing here is written to disk.

use crate::{
    response_parser::{Decision, Verdict},
    types::{AccountId, AnalysisId, RiskScore},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// 1-based position in the session.
    pub sequence:    usize,
    pub analysis_id: AnalysisId,
    pub analyzed_at: DateTime<Utc>,
    pub account_id:  AccountId,
    pub amount:      f64,
    pub risk_score:  RiskScore,
    pub verdict:     Verdict,
}

/// Aggregates over the whole history, recomputed by full scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub approved_count:     usize,
    pub declined_count:     usize,
    pub unknown_count:      usize,
    pub total_count:        usize,
    pub total_amount:       f64,
    pub average_risk_score: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct SessionHistory {
    entries: Vec<HistoryEntry>,
}

impl SessionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one completed analysis and return the stored entry.
    pub fn record(&mut self, account_id: &str, amount: f64, decision: Decision) -> &HistoryEntry {
        let entry = HistoryEntry {
            sequence:    self.entries.len() + 1,
            analysis_id: Uuid::new_v4(),
            analyzed_at: Utc::now(),
            account_id:  account_id.to_string(),
            amount,
            risk_score:  decision.risk_score,
            verdict:     decision.verdict,
        };
        self.entries.push(entry);
        &self.entries[self.entries.len() - 1]
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.last()
    }

    pub fn summary(&self) -> SessionSummary {
        let mut summary = SessionSummary::default();
        let mut score_sum: u64 = 0;

        for entry in &self.entries {
            match entry.verdict {
                Verdict::Approved => summary.approved_count += 1,
                Verdict::Declined => summary.declined_count += 1,
                Verdict::Unknown  => summary.unknown_count += 1,
            }
            summary.total_amount += entry.amount;
            score_sum += entry.risk_score as u64;
        }

        summary.total_count = self.entries.len();
        if summary.total_count > 0 {
            summary.average_risk_score = Some(score_sum as f64 / summary.total_count as f64);
        }
        summary
    }
}
