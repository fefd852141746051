//! Rule engine boundary.
//!
//! RULE: The pipeline only ever talks to the engine through `RuleEngine`.
//! It never assumes the engine is a subprocess; an in-process or remote
//! engine can be substituted by implementing the trait.
//!
//! `SubprocessEngine` is the production implementation:
//!   <binary> [prefix args] -s <policy> -g <goal> -g halt
//! One child per call, bounded by the timeout. On unix the child leads its
//! own process group and the whole group is killed on expiry, so nothing a
//! wrapper launcher started outlives the call.

use crate::{
    config::{EngineConfig, MAX_ENGINE_TIMEOUT_MS},
    error::EngineError,
    query::EngineQuery,
};
use std::io::{self, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Time allowed for pipe readers after the child has exited, when the
/// deadline itself leaves less than this.
pub const DRAIN_GRACE: Duration = Duration::from_millis(250);

/// How one invocation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationStatus {
    /// The engine ran to completion; its output is in the response.
    Ok,
    Timeout { after: Duration },
    EngineNotFound { binary: String },
    LaunchError { reason: String },
}

/// Raw result of one engine invocation. Consumed immediately by the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineResponse {
    pub status:    InvocationStatus,
    /// Standard output followed by standard error.
    pub output:    String,
    pub exit_code: Option<i32>,
}

impl EngineResponse {
    pub fn completed(output: impl Into<String>) -> Self {
        Self {
            status:    InvocationStatus::Ok,
            output:    output.into(),
            exit_code: Some(0),
        }
    }

    pub fn failed(status: InvocationStatus) -> Self {
        Self {
            status,
            output:    String::new(),
            exit_code: None,
        }
    }

    /// Map a failed invocation onto the error taxonomy.
    pub fn check(&self) -> Result<(), EngineError> {
        match &self.status {
            InvocationStatus::Ok => Ok(()),
            InvocationStatus::Timeout { after } => Err(EngineError::Timeout {
                timeout_ms: after.as_millis() as u64,
            }),
            InvocationStatus::EngineNotFound { binary } => Err(EngineError::NotFound {
                binary: binary.clone(),
            }),
            InvocationStatus::LaunchError { reason } => Err(EngineError::Launch {
                reason: reason.clone(),
            }),
        }
    }
}

/// The contract every rule engine must fulfill.
pub trait RuleEngine: Send {
    /// Stable name for logging.
    fn name(&self) -> &'static str;

    /// Evaluate one goal. Must return within roughly `timeout`.
    /// Never panics on engine misbehaviour; failures are reported
    /// through `EngineResponse::status`.
    fn evaluate(&mut self, query: &EngineQuery, timeout: Duration) -> EngineResponse;
}

// ── Subprocess engine ────────────────────────────────────────────────────────

pub struct SubprocessEngine {
    config: EngineConfig,
}

impl SubprocessEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn command(&self, query: &EngineQuery) -> Command {
        let mut command = Command::new(&self.config.binary);
        command
            .args(&self.config.prefix_args)
            .arg("-s")
            .arg(&self.config.policy_file)
            .arg("-g")
            .arg(query.as_str())
            .arg("-g")
            .arg("halt")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }
        command
    }
}

impl RuleEngine for SubprocessEngine {
    fn name(&self) -> &'static str {
        "subprocess"
    }

    fn evaluate(&mut self, query: &EngineQuery, timeout: Duration) -> EngineResponse {
        if !self.config.policy_file.exists() {
            return EngineResponse::failed(InvocationStatus::LaunchError {
                reason: format!(
                    "policy file {} not found",
                    self.config.policy_file.display()
                ),
            });
        }

        let timeout = timeout.min(Duration::from_millis(MAX_ENGINE_TIMEOUT_MS));
        let deadline = Instant::now() + timeout;
        let mut child = match self.command(query).spawn() {
            Ok(child) => child,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return EngineResponse::failed(InvocationStatus::EngineNotFound {
                    binary: self.config.binary.clone(),
                });
            }
            Err(e) => {
                return EngineResponse::failed(InvocationStatus::LaunchError {
                    reason: e.to_string(),
                });
            }
        };
        log::debug!("engine pid={} started for {query}", child.id());

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let exit = match wait_until(&mut child, deadline) {
            Ok(Some(status)) => status,
            Ok(None) => {
                terminate(&mut child);
                return EngineResponse::failed(InvocationStatus::Timeout { after: timeout });
            }
            Err(e) => {
                terminate(&mut child);
                return EngineResponse::failed(InvocationStatus::LaunchError {
                    reason: format!("waiting on engine: {e}"),
                });
            }
        };

        // One budget for both pipes.
        let drain_deadline = deadline.max(Instant::now() + DRAIN_GRACE);
        let out = collect(&stdout, drain_deadline);
        let err = collect(&stderr, drain_deadline);
        let (Some(out), Some(err)) = (out, err) else {
            // The engine exited but something it spawned still holds the pipes.
            kill_group(&child);
            return EngineResponse::failed(InvocationStatus::Timeout { after: timeout });
        };

        EngineResponse {
            status:    InvocationStatus::Ok,
            output:    out + &err,
            exit_code: exit.code(),
        }
    }
}

/// Read a pipe to the end on a helper thread so a chatty engine can't
/// block on a full pipe while we wait on it.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            if let Err(e) = pipe.read_to_end(&mut buf) {
                log::warn!("engine output read failed: {e}");
            }
        }
        let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
    });
    rx
}

fn collect(rx: &Receiver<String>, deadline: Instant) -> Option<String> {
    match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(text) => Some(text),
        Err(mpsc::RecvTimeoutError::Disconnected) => Some(String::new()),
        Err(mpsc::RecvTimeoutError::Timeout) => None,
    }
}

fn wait_until(child: &mut Child, deadline: Instant) -> io::Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL.min(deadline - now));
    }
}

/// Kill and reap. A killed child must never be left as a zombie.
fn terminate(child: &mut Child) {
    kill_group(child);
    if let Err(e) = child.kill() {
        log::debug!("engine pid={} already gone: {e}", child.id());
    }
    if let Err(e) = child.wait() {
        log::warn!("failed to reap engine pid={}: {e}", child.id());
    }
}

/// SIGKILL every process in the child's group. The group id stays reserved
/// while any member is alive, so this is safe after the leader was reaped.
#[cfg(unix)]
fn kill_group(child: &Child) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let pgid = Pid::from_raw(child.id() as i32);
    match killpg(pgid, Signal::SIGKILL) {
        Ok(()) | Err(nix::errno::Errno::ESRCH) => {}
        Err(e) => log::warn!("failed to kill engine process group {pgid}: {e}"),
    }
}

#[cfg(not(unix))]
fn kill_group(_child: &Child) {}
