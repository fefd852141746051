//! Shared primitive types used across the entire pipeline.

/// An ATM account identifier as typed by the operator.
pub type AccountId = String;

/// A risk score on the engine's 0–100 scale.
pub type RiskScore = u8;

/// Upper bound of the risk scale. Scores above this are clamped.
pub const MAX_RISK_SCORE: RiskScore = 100;

/// Stable identifier of one completed analysis.
pub type AnalysisId = uuid::Uuid;
