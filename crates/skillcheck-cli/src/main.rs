//! skillcheck - end-to-end evaluation harness for agent skills
//!
//! The `skillcheck` command runs the evaluation cases under `evals/` against
//! the agent CLI and grades each transcript with a read-only judge run.
//!
//! ## Modes (`--only`)
//!
//! - `e2e`: agent runs graded by the judge (default)
//! - `local`: every deterministic local check, no agent involved
//! - `schema`, `lint`, `docs`, `scripts`: one group of local checks
//! - `all`: local checks, then e2e

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{debug, Level};

use skillcheck_core::{
    case_files, cases_digest, write_results_json, CheckResult, PromptLimits, RunResultsArtifact,
};
use skillcheck_e2e::isolation::system_agent_home;
use skillcheck_e2e::pipeline::checks_passed;
use skillcheck_e2e::{
    run_e2e, run_local_checks, AgentHomeMode, AgentSettings, CheckGroup, CodexAgent, CodexJudge,
    DisplayOptions, E2eConfig, EnvOverrides, ExecMode, IsolatedHome, Reporter, RunLabels,
    SandboxLevel, ScriptInterpreter,
};

/// Judge output schema, relative to the repository root.
const JUDGE_SCHEMA: &str = "evals/judge.schema.json";

#[derive(Parser, Debug)]
#[command(name = "skillcheck")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Run agent skill evals against disposable workspaces", long_about = None)]
struct Cli {
    /// Which checks to run
    #[arg(long, value_enum, default_value_t = Mode::E2e)]
    only: Mode,

    /// Case file glob under evals/
    #[arg(long, default_value = "helloagents-*.json")]
    pattern: String,

    /// Model for the agent-under-test
    #[arg(long, default_value = "gpt-5.2")]
    model: String,

    /// Reasoning effort for the agent-under-test (low/medium/high/xhigh)
    #[arg(long, default_value = "medium")]
    reasoning_effort: String,

    /// Judge model (default: --model)
    #[arg(long)]
    judge_model: Option<String>,

    /// Judge reasoning effort (default: --reasoning-effort)
    #[arg(long)]
    judge_reasoning_effort: Option<String>,

    /// Timeout per agent or judge call, in seconds (0 disables it)
    #[arg(long, default_value_t = 180)]
    timeout: u64,

    /// Max assistant_output characters passed to the judge (0 = no limit)
    #[arg(long, default_value_t = 8000)]
    max_output_chars: usize,

    /// Max commands passed to the judge (0 = no limit)
    #[arg(long, default_value_t = 50)]
    max_commands: usize,

    /// Print assistant_output when a case fails
    #[arg(long)]
    show_output_on_fail: bool,

    /// Print commands when a case fails
    #[arg(long)]
    show_commands_on_fail: bool,

    /// Print query, assistant_output and commands for every case
    #[arg(long)]
    show_io: bool,

    #[arg(long)]
    show_query: bool,

    #[arg(long)]
    show_output: bool,

    #[arg(long)]
    show_commands: bool,

    /// With --show-commands: also print each command's output
    #[arg(long)]
    show_command_output: bool,

    /// Print the exact agent and judge command lines
    #[arg(long)]
    show_agent_cmd: bool,

    /// Print the agent's stderr, if any
    #[arg(long)]
    show_stderr: bool,

    #[arg(long, default_value_t = 4000)]
    show_output_chars: usize,

    #[arg(long, default_value_t = 4000)]
    show_stderr_chars: usize,

    #[arg(long, default_value_t = 20)]
    show_max_commands: usize,

    #[arg(long, default_value_t = 2000)]
    show_command_output_chars: usize,

    /// Sandbox for the agent-under-test when --exec-mode sandboxed
    #[arg(long, value_enum, default_value_t = SandboxArg::WorkspaceWrite)]
    sandbox: SandboxArg,

    /// bypass: no approvals and no sandbox; sandboxed: -a never -s <sandbox>
    #[arg(long, value_enum, default_value_t = ExecModeArg::Bypass)]
    exec_mode: ExecModeArg,

    /// isolated: temp agent home with this repository's skills; system: current home
    #[arg(long, value_enum, default_value_t = HomeArg::Isolated)]
    codex_home: HomeArg,

    /// Repository root (must contain AGENTS.md, skills/ and evals/)
    #[arg(long, env = "SKILLCHECK_ROOT", default_value = ".")]
    root: PathBuf,

    /// Agent CLI executable
    #[arg(long, env = "SKILLCHECK_AGENT_BIN", default_value = "codex")]
    agent_bin: PathBuf,

    /// Python interpreter for the scaffolding scripts
    #[arg(long, env = "SKILLCHECK_PYTHON", default_value = "python3")]
    python: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    log_json: bool,

    /// Write a JSON results artifact to this path
    #[arg(long)]
    report_json: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    E2e,
    Local,
    Schema,
    Lint,
    Docs,
    Scripts,
    All,
}

impl Mode {
    fn as_str(&self) -> &'static str {
        match self {
            Mode::E2e => "e2e",
            Mode::Local => "local",
            Mode::Schema => "schema",
            Mode::Lint => "lint",
            Mode::Docs => "docs",
            Mode::Scripts => "scripts",
            Mode::All => "all",
        }
    }

    /// Check groups of a local-only mode; `None` for modes that run the agent.
    fn local_groups(&self) -> Option<&'static [CheckGroup]> {
        const LOCAL: &[CheckGroup] = &CheckGroup::ALL;
        const SCHEMA: &[CheckGroup] = &[CheckGroup::Schema];
        const LINT: &[CheckGroup] = &[CheckGroup::Lint];
        const DOCS: &[CheckGroup] = &[CheckGroup::Docs];
        const SCRIPTS: &[CheckGroup] = &[CheckGroup::Scripts];
        match self {
            Mode::Local => Some(LOCAL),
            Mode::Schema => Some(SCHEMA),
            Mode::Lint => Some(LINT),
            Mode::Docs => Some(DOCS),
            Mode::Scripts => Some(SCRIPTS),
            Mode::E2e | Mode::All => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SandboxArg {
    ReadOnly,
    WorkspaceWrite,
    DangerFullAccess,
}

impl From<SandboxArg> for SandboxLevel {
    fn from(arg: SandboxArg) -> Self {
        match arg {
            SandboxArg::ReadOnly => SandboxLevel::ReadOnly,
            SandboxArg::WorkspaceWrite => SandboxLevel::WorkspaceWrite,
            SandboxArg::DangerFullAccess => SandboxLevel::DangerFullAccess,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ExecModeArg {
    Bypass,
    Sandboxed,
}

impl From<ExecModeArg> for ExecMode {
    fn from(arg: ExecModeArg) -> Self {
        match arg {
            ExecModeArg::Bypass => ExecMode::Bypass,
            ExecModeArg::Sandboxed => ExecMode::Sandboxed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum HomeArg {
    Isolated,
    System,
}

impl From<HomeArg> for AgentHomeMode {
    fn from(arg: HomeArg) -> Self {
        match arg {
            HomeArg::Isolated => AgentHomeMode::Isolated,
            HomeArg::System => AgentHomeMode::System,
        }
    }
}

impl Cli {
    fn display_options(&self) -> DisplayOptions {
        let display = DisplayOptions {
            show_query: self.show_query,
            show_output: self.show_output,
            show_commands: self.show_commands,
            show_command_output: self.show_command_output,
            show_agent_cmd: self.show_agent_cmd,
            show_stderr: self.show_stderr,
            show_output_on_fail: self.show_output_on_fail,
            show_commands_on_fail: self.show_commands_on_fail,
            output_chars: self.show_output_chars,
            stderr_chars: self.show_stderr_chars,
            max_commands: self.show_max_commands,
            command_output_chars: self.show_command_output_chars,
        };
        if self.show_io {
            display.with_io()
        } else {
            display
        }
    }

    fn timeout(&self) -> Option<Duration> {
        match self.timeout {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    fn agent_settings(&self) -> AgentSettings {
        AgentSettings::new(self.agent_bin.clone())
            .with_model(Some(self.model.clone()))
            .with_reasoning_effort(Some(self.reasoning_effort.clone()))
            .with_exec_mode(self.exec_mode.into(), self.sandbox.into())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    skillcheck_core::init_tracing(cli.log_json, level);

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::from(1)
        }
    }
}

/// Run the selected mode. `Ok(false)` means something failed its checks.
async fn run(cli: Cli) -> Result<bool> {
    let root = resolve_root(&cli.root)?;
    let schema = root.join(JUDGE_SCHEMA);
    if !schema.is_file() {
        bail!("missing judge schema: {}", schema.display());
    }
    let interpreter = ScriptInterpreter::python(cli.python.clone());
    let mut reporter = Reporter::stdout();
    debug!(mode = cli.only.as_str(), root = %root.display(), "starting");

    if let Some(groups) = cli.only.local_groups() {
        let checks = run_local_checks(&root, groups, &cli.pattern, &interpreter).await;
        print_checks(&mut reporter, &checks)?;
        let ok = checks_passed(&checks);
        if let Some(path) = &cli.report_json {
            let cases = case_files(&root.join("evals"), &cli.pattern);
            let artifact =
                RunResultsArtifact::new(cli.only.as_str(), cases_digest(&cases)?, Vec::new(), checks);
            write_results_json(path, &artifact)?;
        }
        return Ok(ok);
    }

    let home_mode = AgentHomeMode::from(cli.codex_home);
    let isolated = match home_mode {
        AgentHomeMode::Isolated => {
            let label = "prepare isolated agent home (skills + config/auth)";
            let step = reporter.step_start(label)?;
            let built = system_agent_home().and_then(|source| IsolatedHome::build(&root, &source));
            match built {
                Ok(home) => {
                    reporter.step_ok(&step)?;
                    Some(home)
                }
                Err(err) => {
                    reporter.step_fail(&step, &err)?;
                    return Err(err).context("isolated agent home");
                }
            }
        }
        AgentHomeMode::System => None,
    };
    let env: EnvOverrides = isolated.as_ref().map(|h| h.env().clone()).unwrap_or_default();
    let agent_home_label = match &isolated {
        Some(home) => format!("{}:{}", home_mode.as_str(), home.path().display()),
        None => home_mode.as_str().to_string(),
    };

    let mut local_checks = Vec::new();
    let mut local_ok = true;
    if cli.only == Mode::All {
        let label = format!("local checks (pattern=evals/{})", cli.pattern);
        let step = reporter.step_start(&label)?;
        local_checks = run_local_checks(&root, &CheckGroup::ALL, &cli.pattern, &interpreter).await;
        print_checks(&mut reporter, &local_checks)?;
        local_ok = checks_passed(&local_checks);
        if local_ok {
            reporter.step_ok(&step)?;
        } else {
            let failed = local_checks.iter().filter(|c| !c.ok).count();
            reporter.step_fail(&step, &format!("{} failing checks", failed))?;
        }
    }

    let cases = case_files(&root.join("evals"), &cli.pattern);
    if cases.is_empty() {
        bail!("no eval files match evals/{}", cli.pattern);
    }

    let agent_settings = cli.agent_settings();
    let judge_settings =
        agent_settings.judge(cli.judge_model.clone(), cli.judge_reasoning_effort.clone());
    let labels = RunLabels {
        exec_mode: agent_settings.exec_mode.to_string(),
        sandbox: agent_settings.sandbox.to_string(),
        agent_home: agent_home_label,
        model: agent_settings.model.clone().unwrap_or_default(),
        reasoning_effort: agent_settings.reasoning_effort.clone().unwrap_or_default(),
        judge_model: judge_settings.model.clone().unwrap_or_default(),
        judge_reasoning_effort: judge_settings.reasoning_effort.clone().unwrap_or_default(),
    };

    let judge = CodexJudge::new(judge_settings, schema, env.clone(), cli.timeout())
        .context("create judge directory")?;
    let agent = CodexAgent::new(agent_settings);
    let config = E2eConfig {
        root: root.clone(),
        pattern: cli.pattern.clone(),
        timeout: cli.timeout(),
        limits: PromptLimits {
            max_output_chars: cli.max_output_chars,
            max_commands: cli.max_commands,
        },
        display: cli.display_options(),
        interpreter,
        labels,
    };

    let summary = run_e2e(&config, &cases, &agent, &judge, &env, &mut reporter).await?;

    if let Some(path) = &cli.report_json {
        let artifact = RunResultsArtifact::new(
            cli.only.as_str(),
            cases_digest(&cases)?,
            summary.artifacts(),
            local_checks,
        );
        write_results_json(path, &artifact)?;
    }

    Ok(local_ok && summary.all_passed())
}

/// Canonical repository root; it must hold `AGENTS.md`, `skills/` and `evals/`.
fn resolve_root(root: &Path) -> Result<PathBuf> {
    let root = root
        .canonicalize()
        .with_context(|| format!("repository root not found: {}", root.display()))?;
    let missing: Vec<&str> = [("AGENTS.md", true), ("skills", false), ("evals", false)]
        .into_iter()
        .filter(|(name, is_file)| {
            let path = root.join(name);
            if *is_file {
                !path.is_file()
            } else {
                !path.is_dir()
            }
        })
        .map(|(name, _)| name)
        .collect();
    if !missing.is_empty() {
        bail!(
            "{} is not a skill repository (missing: {})",
            root.display(),
            missing.join(", ")
        );
    }
    Ok(root)
}

fn print_checks<W: std::io::Write>(
    reporter: &mut Reporter<W>,
    checks: &[CheckResult],
) -> std::io::Result<()> {
    reporter.check_results(checks)?;
    let passed = checks.iter().filter(|c| c.ok).count();
    reporter.summary(passed, checks.len() - passed)
}
