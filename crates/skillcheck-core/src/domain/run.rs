//! Folded outcome of a single agent invocation.

use serde::{Deserialize, Serialize};

use super::event::Usage;

/// One shell command the agent executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRecord {
    pub command: String,

    /// `None` when the event carried no integer exit code.
    pub exit_code: Option<i64>,

    pub output: String,
}

impl CommandRecord {
    /// True when the command reported a non-zero integer exit code.
    pub fn failed(&self) -> bool {
        matches!(self.exit_code, Some(code) if code != 0)
    }
}

/// How the agent process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProcessExit {
    /// Process exited on its own with the given status code.
    Exited { code: i32 },

    /// Process was terminated by a signal it did not send itself.
    Signaled,

    /// The harness killed the process after the timeout elapsed.
    TimedOut { after_ms: u64 },
}

impl ProcessExit {
    pub fn success(&self) -> bool {
        matches!(self, ProcessExit::Exited { code: 0 })
    }

    pub fn timed_out(&self) -> bool {
        matches!(self, ProcessExit::TimedOut { .. })
    }
}

impl std::fmt::Display for ProcessExit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessExit::Exited { code } => write!(f, "exit code {}", code),
            ProcessExit::Signaled => f.write_str("terminated by signal"),
            ProcessExit::TimedOut { after_ms } => write!(f, "timed out after {}ms", after_ms),
        }
    }
}

/// Reduced view of one agent run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    /// False if any command failed or the process did not exit cleanly.
    pub ok: bool,

    pub thread_id: Option<String>,

    /// Text of the last `agent_message` item.
    pub final_message: String,

    pub commands: Vec<CommandRecord>,

    /// Usage from the last `turn.completed` event.
    pub usage: Usage,

    /// Set once the process outcome is known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit: Option<ProcessExit>,

    /// Captured stderr of the process.
    #[serde(default)]
    pub stderr: String,
}

impl RunResult {
    /// Combine the stream-derived result with the process outcome.
    pub fn with_exit(mut self, exit: ProcessExit) -> Self {
        if !exit.success() {
            self.ok = false;
        }
        self.exit = Some(exit);
        self
    }

    pub fn timed_out(&self) -> bool {
        self.exit.map(|e| e.timed_out()).unwrap_or(false)
    }
}
