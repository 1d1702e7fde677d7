//! skillcheck e2e - agent runs against disposable workspaces
//!
//! Provides the evaluation pipeline that:
//! - Stages a copy of the repository per case and seeds fixtures into it
//! - Runs the agent CLI with an isolated configuration home
//! - Grades each run with a read-only judge subprocess
//! - Runs the deterministic local checks

pub mod error;
pub mod fsutil;
pub mod invocation;
pub mod isolation;
pub mod judge;
pub mod local;
pub mod pipeline;
pub mod report;
pub mod runner;
pub mod seed;
pub mod workspace;

// Re-export key types
pub use error::{IsolationError, JudgeError, RunnerError, SeedError};
pub use invocation::{AgentSettings, ExecMode, SandboxLevel};
pub use isolation::{AgentHomeMode, IsolatedHome, AGENT_HOME_ENV};
pub use judge::{CodexJudge, Judge};
pub use local::{run_local_checks, CheckGroup};
pub use pipeline::{run_e2e, CaseOutcome, DisplayOptions, E2eConfig, E2eSummary, RunLabels};
pub use report::Reporter;
pub use runner::{
    fold_output, run_process, AgentRunner, CodexAgent, EnvOverrides, ProcessOutput, ProcessSpec,
};
pub use seed::ScriptInterpreter;
pub use workspace::StagedWorkspace;
