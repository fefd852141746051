//! The subprocess engine against real child processes.
//!
//! `/bin/sh -c <script> engine` stands in for the rule engine binary, so
//! the standard `-s <policy> -g <goal> -g halt` tail arrives as $1..$6.
#![cfg(unix)]

mod common;

use atm_risk_core::{
    config::EngineConfig,
    error::{AnalysisError, EngineError},
    pipeline::RiskPipeline,
    query::EngineQuery,
    response_parser::Verdict,
    rule_engine::{InvocationStatus, RuleEngine, SubprocessEngine, DRAIN_GRACE},
    scenario::Scenario,
    session::SessionHistory,
};
use common::init_logging;
use std::time::{Duration, Instant};

fn policy_file() -> std::path::PathBuf {
    // Any existing file will do; the fake engine never reads it.
    std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("Cargo.toml")
}

fn shell_engine(script: &str, timeout_ms: u64) -> SubprocessEngine {
    SubprocessEngine::new(EngineConfig {
        binary:      "/bin/sh".into(),
        prefix_args: vec!["-c".into(), script.into(), "engine".into()],
        policy_file: policy_file(),
        timeout_ms,
    })
}

fn query() -> EngineQuery {
    EngineQuery::build(&Scenario::ForeignLocation.input().validate().unwrap())
}

#[test]
fn goal_is_passed_as_a_single_argument() {
    init_logging();
    let mut engine = shell_engine(r#"printf '%s|%s|%s|%s' "$1" "$3" "$4" "$6""#, 5_000);
    let response = engine.evaluate(&query(), Duration::from_secs(5));

    assert_eq!(response.status, InvocationStatus::Ok);
    assert_eq!(
        response.output,
        "-s|-g|process_transaction(67890, 500, 'Moscow', 2, 1, 5).|halt"
    );
}

#[test]
fn policy_path_follows_dash_s() {
    init_logging();
    let mut engine = shell_engine(r#"printf '%s' "$2""#, 5_000);
    let response = engine.evaluate(&query(), Duration::from_secs(5));
    assert_eq!(response.output, policy_file().to_string_lossy());
}

#[test]
fn stdout_and_stderr_are_combined() {
    init_logging();
    let mut engine = shell_engine(
        "echo 'RISK SCORE CALCULATED: 73'; echo 'TRANSACTION DECLINED' >&2",
        5_000,
    );
    let response = engine.evaluate(&query(), Duration::from_secs(5));

    assert_eq!(response.status, InvocationStatus::Ok);
    assert_eq!(response.output, "RISK SCORE CALCULATED: 73\nTRANSACTION DECLINED\n");
    assert_eq!(response.exit_code, Some(0));
}

#[test]
fn nonzero_exit_still_completes() {
    init_logging();
    let mut engine = shell_engine("echo 'Warning: goal failed'; exit 1", 5_000);
    let response = engine.evaluate(&query(), Duration::from_secs(5));

    assert_eq!(response.status, InvocationStatus::Ok);
    assert_eq!(response.exit_code, Some(1));
    assert!(response.output.contains("goal failed"));
}

#[test]
fn slow_engine_is_killed_at_the_deadline() {
    init_logging();
    let mut engine = shell_engine("exec sleep 10", 300);
    let started = Instant::now();
    let response = engine.evaluate(&query(), Duration::from_millis(300));

    assert_eq!(
        response.status,
        InvocationStatus::Timeout { after: Duration::from_millis(300) }
    );
    assert!(
        started.elapsed() < Duration::from_secs(5),
        "timeout took {:?}",
        started.elapsed()
    );
}

#[test]
fn lingering_grandchild_does_not_stretch_the_timeout() {
    init_logging();
    // The child exits at once; the backgrounded sleep keeps both pipes open.
    let mut engine = shell_engine("sleep 3 & echo 'RISK SCORE CALCULATED: 10'; exit 0", 1_000);
    let timeout = Duration::from_millis(1_000);
    let started = Instant::now();
    let response = engine.evaluate(&query(), timeout);
    let elapsed = started.elapsed();

    assert_eq!(response.status, InvocationStatus::Timeout { after: timeout });
    assert!(
        elapsed <= timeout + DRAIN_GRACE,
        "invocation took {elapsed:?}, bound is {:?}",
        timeout + DRAIN_GRACE
    );
}

#[cfg(target_os = "linux")]
fn process_alive(pid: &str) -> bool {
    match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
        // A zombie has already exited.
        Ok(stat) => !matches!(
            stat.rsplit(')').next().and_then(|rest| rest.trim_start().chars().next()),
            Some('Z') | Some('X')
        ),
        Err(_) => false,
    }
}

#[cfg(target_os = "linux")]
#[test]
fn timeout_kills_processes_started_by_the_engine() {
    init_logging();
    let pid_file = std::env::temp_dir().join(format!("atm-risk-grandchild-{}.pid", std::process::id()));
    let _ = std::fs::remove_file(&pid_file);
    let script = format!("sleep 7 & echo $! > '{}'; wait; true", pid_file.display());
    let mut engine = shell_engine(&script, 500);

    let response = engine.evaluate(&query(), Duration::from_millis(500));
    assert_eq!(
        response.status,
        InvocationStatus::Timeout { after: Duration::from_millis(500) }
    );

    let pid = std::fs::read_to_string(&pid_file).expect("engine wrote its grandchild pid");
    let pid = pid.trim().to_string();
    let _ = std::fs::remove_file(&pid_file);

    let waited = Instant::now();
    while process_alive(&pid) && waited.elapsed() < Duration::from_secs(2) {
        std::thread::sleep(Duration::from_millis(20));
    }
    assert!(!process_alive(&pid), "grandchild {pid} outlived the timeout");
}

#[test]
fn oversized_timeout_is_capped_not_a_panic() {
    init_logging();
    let mut engine = shell_engine("echo 'RISK SCORE CALCULATED: 5'", u64::MAX);
    let response = engine.evaluate(&query(), Duration::MAX);
    assert_eq!(response.status, InvocationStatus::Ok);
    assert_eq!(response.output, "RISK SCORE CALCULATED: 5\n");
}

#[test]
fn missing_binary_is_not_found() {
    init_logging();
    let mut engine = SubprocessEngine::new(EngineConfig {
        binary:      "atm-risk-no-such-engine".into(),
        prefix_args: Vec::new(),
        policy_file: policy_file(),
        timeout_ms:  1_000,
    });
    let response = engine.evaluate(&query(), Duration::from_secs(1));
    assert_eq!(
        response.status,
        InvocationStatus::EngineNotFound { binary: "atm-risk-no-such-engine".into() }
    );
}

#[test]
fn pipeline_over_subprocess() {
    init_logging();
    let script = "echo 'RISK SCORE CALCULATED: 73'; echo '>>> TRANSACTION DECLINED'";
    let mut pipeline = RiskPipeline::new(
        Box::new(shell_engine(script, 5_000)),
        Duration::from_secs(5),
        SessionHistory::new(),
    );

    let outcome = pipeline.analyze(&Scenario::ForeignLocation.input()).unwrap();
    assert_eq!(outcome.decision.risk_score, 73);
    assert_eq!(outcome.decision.verdict, Verdict::Declined);
    assert_eq!(pipeline.session().len(), 1);
}

#[test]
fn subprocess_timeout_is_not_recorded() {
    init_logging();
    let mut pipeline = RiskPipeline::new(
        Box::new(shell_engine("exec sleep 10", 200)),
        Duration::from_millis(200),
        SessionHistory::new(),
    );

    let err = pipeline.analyze(&Scenario::Normal.input()).unwrap_err();
    assert!(
        matches!(err, AnalysisError::Engine(EngineError::Timeout { timeout_ms: 200 })),
        "got {err:?}"
    );
    assert!(pipeline.session().is_empty());
}
