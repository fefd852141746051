//! The risk decision pipeline: one operator request, one decision.
//!
//! STAGE ORDER (fixed, never reordered):
//!   1. Validate the raw operator fields
//!   2. Build the engine goal
//!   3. Invoke the rule engine (the only blocking step, bounded by timeout)
//!   4. Parse the engine transcript into a Decision
//!   5. Record the Decision in the session history
//!   6. Map Decision + history to the visualization state
//!
//! RULES:
//!   - A validation failure stops before the engine is called.
//!   - An engine failure stops before anything is recorded.
//!   - A badly parsed transcript is still a decision and is recorded.
//!   - Nothing is retried. The pipeline is reusable after any outcome.

use crate::{
    config::DeskConfig,
    error::AnalysisResult,
    query::EngineQuery,
    response_parser::{parse_response, Decision, ParsedDecision},
    rule_engine::{RuleEngine, SubprocessEngine},
    session::SessionHistory,
    transaction::RawTransactionInput,
    visualization::VisualizationState,
};
use serde::Serialize;
use std::time::Duration;

/// Everything the presentation layer needs after a successful analysis.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
    pub query:      String,
    pub decision:   Decision,
    pub parsed:     ParsedDecision,
    pub state:      VisualizationState,
    /// Raw engine output, shown to the operator verbatim.
    pub transcript: String,
}

pub struct RiskPipeline {
    engine:  Box<dyn RuleEngine>,
    timeout: Duration,
    session: SessionHistory,
}

impl RiskPipeline {
    pub fn new(engine: Box<dyn RuleEngine>, timeout: Duration, session: SessionHistory) -> Self {
        Self {
            engine,
            timeout,
            session,
        }
    }

    /// Build a pipeline around the subprocess engine described by `config`,
    /// starting with an empty session.
    pub fn from_config(config: &DeskConfig) -> Self {
        let timeout = config.engine.timeout();
        let engine = SubprocessEngine::new(config.engine.clone());
        Self::new(Box::new(engine), timeout, SessionHistory::new())
    }

    pub fn session(&self) -> &SessionHistory {
        &self.session
    }

    /// State to render before the first analysis, or after a failed one.
    pub fn current_state(&self) -> VisualizationState {
        let latest = self
            .session
            .latest()
            .map(|e| Decision {
                risk_score: e.risk_score,
                verdict:    e.verdict,
            })
            .unwrap_or_default();
        VisualizationState::map(&latest, &self.session)
    }

    /// Run one analysis end to end.
    pub fn analyze(&mut self, raw: &RawTransactionInput) -> AnalysisResult<AnalysisOutcome> {
        let input = raw.validate().map_err(|e| {
            log::warn!("analysis rejected: {e}");
            e
        })?;

        let query = EngineQuery::build(&input);
        log::debug!("engine={} query: {query}", self.engine.name());

        let response = self.engine.evaluate(&query, self.timeout);
        if let Err(e) = response.check() {
            log::warn!("account={} engine={}: {e}", input.account_id, self.engine.name());
            return Err(e.into());
        }

        if response.output.trim().is_empty() {
            log::warn!("account={} engine produced no output", input.account_id);
        }
        let parsed = parse_response(&response.output);
        if parsed.is_degraded() {
            log::warn!(
                "account={} partial engine response: score_matched={} verdict_matched={} exit_code={:?}",
                input.account_id,
                parsed.score_matched,
                parsed.verdict_matched,
                response.exit_code,
            );
        }

        let decision = parsed.decision;
        let entry = self.session.record(&input.account_id, input.amount, decision);
        log::info!(
            "analysis #{} account={} amount={} score={} verdict={}",
            entry.sequence,
            entry.account_id,
            entry.amount,
            entry.risk_score,
            entry.verdict,
        );

        let state = VisualizationState::map(&decision, &self.session);

        Ok(AnalysisOutcome {
            query: query.to_string(),
            decision,
            parsed,
            state,
            transcript: response.output,
        })
    }
}
