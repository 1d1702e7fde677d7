//! Error types for the process-facing parts of the harness.

use std::path::PathBuf;

use skillcheck_core::{EvalError, VerdictDecodeError};

/// Harness-side failures of a subprocess call. A child that exits non-zero
/// or times out is not an error; see `ProcessExit`.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed waiting for {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("empty command line")]
    EmptyCommand,
}

#[derive(Debug, thiserror::Error)]
pub enum IsolationError {
    #[error("missing agent config file: {0} (use --codex-home system to skip isolation)")]
    MissingConfig(PathBuf),

    #[error("missing agent auth file: {0} (use --codex-home system to skip isolation)")]
    MissingAuth(PathBuf),

    #[error("cannot determine the agent home: neither CODEX_HOME nor HOME is set")]
    NoHome,

    #[error("failed to copy {from} to {to}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("missing script: {0}")]
    MissingScript(PathBuf),

    #[error("setup.plan_packages.feature must not be empty")]
    EmptyFeature,

    #[error(transparent)]
    Variant(#[from] EvalError),

    #[error("create_package failed: feature={feature} {exit} err={stderr}")]
    Collaborator {
        feature: String,
        exit: String,
        stderr: String,
    },

    #[error("create_package report is not valid JSON: {0}")]
    Report(#[source] serde_json::Error),

    #[error("create_package report lacks context.package_path")]
    MissingPackagePath,

    #[error("risky variant requires tasks.md: {0}")]
    MissingTasks(PathBuf),

    #[error(transparent)]
    Runner(#[from] RunnerError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum JudgeError {
    #[error("judge timed out: {0}")]
    TimedOut(String),

    #[error("judge failed {exit}: {stderr}")]
    Failed { exit: String, stderr: String },

    #[error(transparent)]
    Decode(#[from] VerdictDecodeError),

    #[error(transparent)]
    Runner(#[from] RunnerError),
}
