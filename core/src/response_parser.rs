//! Response parser: free engine text in, structured `Decision` out.
//!
//! The engine's only contract is two substrings somewhere in its output:
//!   RISK SCORE CALCULATED: <int>
//!   TRANSACTION APPROVED | TRANSACTION DECLINED
//! Everything else is ignored. Parsing never fails; anything unmatched
//! falls back to score 0 / UNKNOWN and the match flags say so.

use crate::types::{RiskScore, MAX_RISK_SCORE};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

pub const SCORE_MARKER: &str = "RISK SCORE CALCULATED:";
pub const APPROVED_MARKER: &str = "TRANSACTION APPROVED";
pub const DECLINED_MARKER: &str = "TRANSACTION DECLINED";

static SCORE_PATTERN: OnceLock<Regex> = OnceLock::new();

fn score_pattern() -> &'static Regex {
    SCORE_PATTERN.get_or_init(|| {
        let pattern = format!(r"{}\s*([0-9]+)", regex::escape(SCORE_MARKER));
        Regex::new(&pattern).expect("score pattern is a valid regex")
    })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Approved,
    Declined,
    #[default]
    Unknown,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Approved => "APPROVED",
            Verdict::Declined => "DECLINED",
            Verdict::Unknown  => "UNKNOWN",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub risk_score: RiskScore,
    pub verdict:    Verdict,
}

/// A decision plus what the extractor actually found.
/// `verdict_matched == false` means the engine said nothing recognisable,
/// as opposed to a verdict the engine itself could not settle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedDecision {
    pub decision:        Decision,
    pub score_matched:   bool,
    pub verdict_matched: bool,
}

impl ParsedDecision {
    /// True when either field fell back to its default.
    pub fn is_degraded(&self) -> bool {
        !(self.score_matched && self.verdict_matched)
    }
}

pub fn parse_response(output: &str) -> ParsedDecision {
    let score = extract_risk_score(output);
    let verdict = extract_verdict(output);

    ParsedDecision {
        decision: Decision {
            risk_score: score.unwrap_or(0),
            verdict:    verdict.unwrap_or(Verdict::Unknown),
        },
        score_matched:   score.is_some(),
        verdict_matched: verdict.is_some(),
    }
}

/// First score token wins. Scores above the scale, including digit runs
/// too long for a `u64`, clamp to `MAX_RISK_SCORE`.
pub fn extract_risk_score(output: &str) -> Option<RiskScore> {
    let digits = score_pattern().captures(output)?.get(1)?.as_str();
    let score = digits
        .parse::<u64>()
        .map_or(MAX_RISK_SCORE, |raw| raw.min(MAX_RISK_SCORE as u64) as RiskScore);
    Some(score)
}

/// APPROVED is checked before DECLINED, so output carrying both resolves
/// to APPROVED.
pub fn extract_verdict(output: &str) -> Option<Verdict> {
    if output.contains(APPROVED_MARKER) {
        Some(Verdict::Approved)
    } else if output.contains(DECLINED_MARKER) {
        Some(Verdict::Declined)
    } else {
        None
    }
}
