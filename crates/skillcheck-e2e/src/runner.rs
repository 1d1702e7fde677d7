//! Subprocess execution with bounded wall-clock time.
//!
//! Output is pumped by reader tasks into shared buffers, so whatever the
//! child wrote before a timeout kill is still returned. Neither a timeout
//! nor a non-zero exit is an error here; both are reported through
//! [`ProcessExit`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use skillcheck_core::{reduce_stream, ProcessExit, RunResult};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::error::RunnerError;
use crate::invocation::AgentSettings;

/// Window given to reader tasks to flush the pipes after the child ends.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Environment variables layered over the inherited environment.
pub type EnvOverrides = BTreeMap<String, String>;

/// One subprocess call.
#[derive(Debug, Clone, Default)]
pub struct ProcessSpec {
    /// Program followed by its arguments.
    pub argv: Vec<String>,

    pub cwd: Option<PathBuf>,

    pub env: EnvOverrides,

    /// `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl ProcessSpec {
    pub fn new<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            argv: argv.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn envs(mut self, env: &EnvOverrides) -> Self {
        self.env.extend(env.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    pub fn timeout(mut self, limit: Option<Duration>) -> Self {
        self.timeout = limit;
        self
    }
}

/// Captured result of a subprocess call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit: ProcessExit,
    pub duration_ms: u64,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit.success()
    }
}

/// Run a subprocess to completion or until its timeout elapses.
pub async fn run_process(spec: &ProcessSpec) -> Result<ProcessOutput, RunnerError> {
    let (program, args) = spec.argv.split_first().ok_or(RunnerError::EmptyCommand)?;
    let started = Instant::now();

    let mut cmd = Command::new(program);
    cmd.args(args)
        .envs(&spec.env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    cmd.process_group(0);
    if let Some(dir) = &spec.cwd {
        cmd.current_dir(dir);
    }

    debug!(program = %program, args = args.len(), cwd = ?spec.cwd, "spawning process");

    let mut child = cmd.spawn().map_err(|source| RunnerError::Spawn {
        program: program.clone(),
        source,
    })?;

    let stdout_buf = Arc::new(Mutex::new(Vec::new()));
    let stderr_buf = Arc::new(Mutex::new(Vec::new()));
    let stdout_task = child
        .stdout
        .take()
        .map(|r| tokio::spawn(pump(r, Arc::clone(&stdout_buf))));
    let stderr_task = child
        .stderr
        .take()
        .map(|r| tokio::spawn(pump(r, Arc::clone(&stderr_buf))));

    let waited = match spec.timeout {
        Some(limit) => timeout(limit, child.wait()).await.ok(),
        None => Some(child.wait().await),
    };

    let exit = match waited {
        Some(Ok(status)) => exit_from_status(status),
        Some(Err(source)) => {
            return Err(RunnerError::Wait {
                program: program.clone(),
                source,
            })
        }
        None => {
            let after_ms = spec.timeout.map(|d| d.as_millis() as u64).unwrap_or(0);
            warn!(program = %program, after_ms = after_ms, "process timed out; killing");
            kill_tree(&mut child, program).await;
            ProcessExit::TimedOut { after_ms }
        }
    };

    drain("stdout", stdout_task).await;
    drain("stderr", stderr_task).await;

    Ok(ProcessOutput {
        stdout: take_lossy(&stdout_buf),
        stderr: take_lossy(&stderr_buf),
        exit,
        duration_ms: started.elapsed().as_millis() as u64,
    })
}

/// Kill the child and everything it started. On unix the child leads its
/// own process group, so descendants holding the output pipes die with it.
async fn kill_tree(child: &mut Child, program: &str) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        // SAFETY: kill(2) takes no pointers; a negative pid addresses the group.
        let rc = unsafe { libc::kill(-(pid as libc::pid_t), libc::SIGKILL) };
        if rc != 0 {
            let err = std::io::Error::last_os_error();
            warn!(program = %program, error = %err, "failed to kill process group");
        }
    }
    if let Err(err) = child.kill().await {
        warn!(program = %program, error = %err, "failed to kill timed-out process");
    }
}

fn exit_from_status(status: ExitStatus) -> ProcessExit {
    match status.code() {
        Some(code) => ProcessExit::Exited { code },
        None => ProcessExit::Signaled,
    }
}

async fn pump<R>(mut reader: R, sink: Arc<Mutex<Vec<u8>>>) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut chunk = [0u8; 8192];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        sink.lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .extend_from_slice(&chunk[..n]);
    }
}

async fn drain(stream: &str, task: Option<JoinHandle<std::io::Result<()>>>) {
    let Some(mut task) = task else {
        return;
    };
    match timeout(DRAIN_TIMEOUT, &mut task).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(err))) => warn!(stream = stream, error = %err, "output capture failed"),
        Ok(Err(err)) => warn!(stream = stream, error = %err, "output reader panicked"),
        Err(_) => {
            warn!(stream = stream, "output capture timed out; keeping partial output");
            task.abort();
        }
    }
}

fn take_lossy(buf: &Arc<Mutex<Vec<u8>>>) -> String {
    let bytes = std::mem::take(&mut *buf.lock().unwrap_or_else(|poisoned| poisoned.into_inner()));
    String::from_utf8_lossy(&bytes).into_owned()
}

// ---------------------------------------------------------------------------
// Agent-under-test
// ---------------------------------------------------------------------------

/// Executes the agent-under-test and reduces its event stream.
#[async_trait]
pub trait AgentRunner: Send + Sync {
    async fn run(
        &self,
        prompt: &str,
        workdir: &Path,
        env: &EnvOverrides,
        limit: Option<Duration>,
    ) -> Result<RunResult, RunnerError>;

    /// Display form of the command line, when there is one.
    fn command_line(&self, _prompt: &str, _workdir: &Path) -> Option<Vec<String>> {
        None
    }
}

/// Runs the agent CLI in `exec --json` mode.
#[derive(Debug, Clone)]
pub struct CodexAgent {
    settings: AgentSettings,
}

impl CodexAgent {
    pub fn new(settings: AgentSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }
}

#[async_trait]
impl AgentRunner for CodexAgent {
    async fn run(
        &self,
        prompt: &str,
        workdir: &Path,
        env: &EnvOverrides,
        limit: Option<Duration>,
    ) -> Result<RunResult, RunnerError> {
        let spec = ProcessSpec::new(self.settings.argv(workdir, prompt, None))
            .cwd(workdir)
            .envs(env)
            .timeout(limit);
        let output = run_process(&spec).await?;
        Ok(fold_output(output))
    }

    fn command_line(&self, prompt: &str, workdir: &Path) -> Option<Vec<String>> {
        Some(self.settings.argv(workdir, prompt, None))
    }
}

/// Reduce captured stdout and attach the process outcome and stderr.
pub fn fold_output(output: ProcessOutput) -> RunResult {
    let mut run = reduce_stream(&output.stdout).with_exit(output.exit);
    run.stderr = with_timeout_note(output.stderr, &output.exit);
    run
}

pub(crate) fn with_timeout_note(stderr: String, exit: &ProcessExit) -> String {
    match exit {
        ProcessExit::TimedOut { .. } if stderr.is_empty() => exit.to_string(),
        ProcessExit::TimedOut { .. } => format!("{}\n{}", stderr.trim_end(), exit),
        _ => stderr,
    }
}
