//! Agent CLI command lines for the agent-under-test and the judge.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// How the agent-under-test is confined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecMode {
    /// `--dangerously-bypass-approvals-and-sandbox`
    #[default]
    Bypass,
    /// `-a never -s <sandbox>`
    Sandboxed,
}

impl ExecMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecMode::Bypass => "bypass",
            ExecMode::Sandboxed => "sandboxed",
        }
    }
}

impl fmt::Display for ExecMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SandboxLevel {
    ReadOnly,
    #[default]
    WorkspaceWrite,
    DangerFullAccess,
}

impl SandboxLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SandboxLevel::ReadOnly => "read-only",
            SandboxLevel::WorkspaceWrite => "workspace-write",
            SandboxLevel::DangerFullAccess => "danger-full-access",
        }
    }
}

impl fmt::Display for SandboxLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SandboxLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read-only" => Ok(SandboxLevel::ReadOnly),
            "workspace-write" => Ok(SandboxLevel::WorkspaceWrite),
            "danger-full-access" => Ok(SandboxLevel::DangerFullAccess),
            other => Err(format!("unknown sandbox level: {}", other)),
        }
    }
}

/// Everything needed to build an agent command line, minus the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentSettings {
    /// Agent CLI executable.
    pub binary: PathBuf,

    pub model: Option<String>,

    /// Lower-cased on construction via [`AgentSettings::with_reasoning_effort`].
    pub reasoning_effort: Option<String>,

    pub exec_mode: ExecMode,

    pub sandbox: SandboxLevel,
}

impl AgentSettings {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            model: None,
            reasoning_effort: None,
            exec_mode: ExecMode::default(),
            sandbox: SandboxLevel::default(),
        }
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model.filter(|m| !m.trim().is_empty());
        self
    }

    pub fn with_reasoning_effort(mut self, effort: Option<String>) -> Self {
        self.reasoning_effort = effort
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty());
        self
    }

    pub fn with_exec_mode(mut self, mode: ExecMode, sandbox: SandboxLevel) -> Self {
        self.exec_mode = mode;
        self.sandbox = sandbox;
        self
    }

    /// Settings for the judge: same binary, always sandboxed read-only.
    pub fn judge(&self, model: Option<String>, effort: Option<String>) -> Self {
        Self::new(self.binary.clone())
            .with_model(model.or_else(|| self.model.clone()))
            .with_reasoning_effort(effort.or_else(|| self.reasoning_effort.clone()))
            .with_exec_mode(ExecMode::Sandboxed, SandboxLevel::ReadOnly)
    }

    /// Full argv, program first.
    pub fn argv(&self, workdir: &Path, prompt: &str, output_schema: Option<&Path>) -> Vec<String> {
        let mut cmd = vec![self.binary.to_string_lossy().into_owned()];
        match self.exec_mode {
            ExecMode::Bypass => cmd.push("--dangerously-bypass-approvals-and-sandbox".to_string()),
            ExecMode::Sandboxed => {
                cmd.extend(["-a", "never", "-s"].map(String::from));
                cmd.push(self.sandbox.as_str().to_string());
            }
        }
        if let Some(model) = &self.model {
            cmd.push("-m".to_string());
            cmd.push(model.clone());
        }
        if let Some(effort) = &self.reasoning_effort {
            cmd.push("-c".to_string());
            cmd.push(format!("model_reasoning_effort=\"{}\"", effort));
        }
        cmd.extend(["exec", "--skip-git-repo-check", "--json"].map(String::from));
        if let Some(schema) = output_schema {
            cmd.push("--output-schema".to_string());
            cmd.push(schema.to_string_lossy().into_owned());
        }
        cmd.push("-C".to_string());
        cmd.push(workdir.to_string_lossy().into_owned());
        cmd.push(prompt.to_string());
        cmd
    }
}

/// Quote one argument for display in a POSIX shell.
pub fn shell_quote(arg: &str) -> String {
    if arg.is_empty() {
        return "''".to_string();
    }
    let safe = arg
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "@%+=:,./_-".contains(c));
    if safe {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', "'\"'\"'"))
    }
}

/// Display form of a command line. Environment is never included.
pub fn format_command(argv: &[String]) -> String {
    argv.iter()
        .map(|a| shell_quote(a))
        .collect::<Vec<_>>()
        .join(" ")
}
