//! Test doubles shared by the integration tests.
#![allow(dead_code)]

use atm_risk_core::{
    query::EngineQuery,
    rule_engine::{EngineResponse, InvocationStatus, RuleEngine},
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Replays canned responses in order and counts invocations.
/// Once the script runs out it keeps answering with empty output.
pub struct ScriptedEngine {
    replies: VecDeque<EngineResponse>,
    pub calls: Arc<AtomicUsize>,
    pub queries: Arc<Mutex<Vec<String>>>,
}

impl ScriptedEngine {
    pub fn new(replies: impl IntoIterator<Item = EngineResponse>) -> Self {
        Self {
            replies: replies.into_iter().collect(),
            calls: Arc::new(AtomicUsize::new(0)),
            queries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn replying(outputs: &[&str]) -> Self {
        Self::new(outputs.iter().map(|o| EngineResponse::completed(*o)))
    }

    pub fn call_count(calls: &Arc<AtomicUsize>) -> usize {
        calls.load(Ordering::SeqCst)
    }
}

impl RuleEngine for ScriptedEngine {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn evaluate(&mut self, query: &EngineQuery, _timeout: Duration) -> EngineResponse {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(query.to_string());
        self.replies
            .pop_front()
            .unwrap_or_else(|| EngineResponse::completed(""))
    }
}

pub fn timed_out() -> EngineResponse {
    EngineResponse::failed(InvocationStatus::Timeout {
        after: Duration::from_secs(5),
    })
}

pub fn engine_output(score: u32, verdict: &str) -> String {
    format!(
        "Evaluating transaction...\nRISK SCORE CALCULATED: {score}\n*** TRANSACTION {verdict} ***\n"
    )
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
