//! atm-risk-desk: headless operator desk for the ATM risk pipeline.
//!
//! Usage:
//!   atm-risk-desk --scenario foreign_location
//!   atm-risk-desk --account 12345 --amount 150 --location "New York" --hour 14 --count 2 --days 1
//!   atm-risk-desk --data-dir ./data --ipc-mode

use anyhow::Result;
use atm_risk_core::{
    config::DeskConfig,
    pipeline::{AnalysisOutcome, RiskPipeline},
    scenario::Scenario,
    session::{HistoryEntry, SessionSummary},
    transaction::RawTransactionInput,
    visualization::VisualizationState,
};
use std::env;
use std::io::{self, BufRead, Write};

const GAUGE_WIDTH: usize = 50;

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    GetState,
    Analyze { transaction: RawTransactionInput },
    Scenario { name: Scenario },
    History,
    Quit,
}

#[derive(serde::Serialize)]
struct UiState<'a> {
    state:   VisualizationState,
    summary: SessionSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    last:    Option<&'a AnalysisOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error:   Option<String>,
}

#[derive(serde::Serialize)]
struct HistoryReply<'a> {
    exported_at: chrono::DateTime<chrono::Utc>,
    entries:     &'a [HistoryEntry],
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let data_dir = arg_value(&args, "--data-dir").unwrap_or("./data");

    let config = DeskConfig::load_or_default(data_dir)?;
    let mut pipeline = RiskPipeline::from_config(&config);

    if ipc_mode {
        return run_ipc_loop(&mut pipeline);
    }

    let scenario: Scenario = arg_value(&args, "--scenario")
        .unwrap_or("normal")
        .parse::<Scenario>()
        .map_err(anyhow::Error::msg)?;
    let raw = apply_overrides(scenario.input(), &args);

    println!("ATM Risk Desk: one-shot analysis");
    println!("  engine:    {}", config.engine.binary);
    println!("  policy:    {}", config.engine.policy_file.display());
    println!("  timeout:   {} ms", config.engine.timeout_ms);
    println!();

    let outcome = pipeline.analyze(&raw)?;
    print_outcome(&outcome, &pipeline.session().summary());
    Ok(())
}

fn run_ipc_loop(pipeline: &mut RiskPipeline) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                log::warn!("ipc: unrecognised command: {e}");
                let err_json = serde_json::json!({ "error": e.to_string() });
                writeln!(stdout, "{}", err_json)?;
                stdout.flush()?;
                continue;
            }
        };

        match cmd {
            IpcCommand::Quit => break,
            IpcCommand::GetState => {
                write_state(&mut stdout, pipeline, None, None)?;
            }
            IpcCommand::Analyze { transaction } => {
                analyze_and_reply(&mut stdout, pipeline, &transaction)?;
            }
            IpcCommand::Scenario { name } => {
                analyze_and_reply(&mut stdout, pipeline, &name.input())?;
            }
            IpcCommand::History => {
                let reply = HistoryReply {
                    exported_at: chrono::Utc::now(),
                    entries:     pipeline.session().entries(),
                };
                writeln!(stdout, "{}", serde_json::to_string(&reply)?)?;
            }
        }
        stdout.flush()?;
    }
    Ok(())
}

fn analyze_and_reply(
    out: &mut impl Write,
    pipeline: &mut RiskPipeline,
    raw: &RawTransactionInput,
) -> Result<()> {
    match pipeline.analyze(raw) {
        Ok(outcome) => write_state(out, pipeline, Some(&outcome), None),
        Err(e) => write_state(out, pipeline, None, Some(e.to_string())),
    }
}

fn write_state(
    out: &mut impl Write,
    pipeline: &RiskPipeline,
    last: Option<&AnalysisOutcome>,
    error: Option<String>,
) -> Result<()> {
    let state = match last {
        Some(outcome) => outcome.state.clone(),
        None => pipeline.current_state(),
    };
    let reply = UiState {
        state,
        summary: pipeline.session().summary(),
        last,
        error,
    };
    writeln!(out, "{}", serde_json::to_string(&reply)?)?;
    Ok(())
}

fn print_outcome(outcome: &AnalysisOutcome, summary: &SessionSummary) {
    let state = &outcome.state;

    println!("=== ENGINE OUTPUT ===");
    println!("  query: {}", outcome.query);
    for line in outcome.transcript.lines() {
        println!("  {line}");
    }
    if !outcome.parsed.verdict_matched {
        println!("  (engine output did not contain a recognisable verdict)");
    }

    println!();
    println!("=== DECISION ===");
    println!("  risk score:  {}/100", state.risk_score);
    println!("  verdict:     {}", state.verdict);
    println!(
        "  band:        {} ({:?}, {})",
        state.risk_band_index, state.risk_band, state.risk_band_color
    );
    println!("  gauge:       {}", render_gauge(state));

    println!();
    println!("=== SESSION ===");
    println!("  total:       {}", summary.total_count);
    println!("  approved:    {}", summary.approved_count);
    println!("  declined:    {}", summary.declined_count);
    println!("  unknown:     {}", summary.unknown_count);
    println!("  amount:      ${:.2}", summary.total_amount);
}

/// `[#######.....|.......]` with the threshold marker drawn as `|`.
fn render_gauge(state: &VisualizationState) -> String {
    let filled = (state.gauge_value * GAUGE_WIDTH as f64).round() as usize;
    let marker = state.threshold_marker as usize * GAUGE_WIDTH / 100;
    let bar: String = (0..GAUGE_WIDTH)
        .map(|i| match i {
            _ if i == marker => '|',
            _ if i < filled => '#',
            _ => '.',
        })
        .collect();
    format!("[{bar}]")
}

fn apply_overrides(mut raw: RawTransactionInput, args: &[String]) -> RawTransactionInput {
    let fields: [(&str, &mut String); 6] = [
        ("--account", &mut raw.account_id),
        ("--amount", &mut raw.amount),
        ("--location", &mut raw.location),
        ("--hour", &mut raw.hour),
        ("--count", &mut raw.transactions_today),
        ("--days", &mut raw.days_since_last),
    ];
    for (flag, field) in fields {
        if let Some(value) = arg_value(args, flag) {
            *field = value.to_string();
        }
    }
    raw
}

fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
