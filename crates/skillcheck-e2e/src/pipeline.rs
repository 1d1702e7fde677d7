//! Per-case pipeline (load → stage → seed → run → judge) and aggregation.
//!
//! Cases run strictly one after another. Any failure inside a case becomes a
//! failing verdict for that case; only reporter I/O errors escape.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::Instrument;

use skillcheck_core::obs;
use skillcheck_core::{
    build_judge_prompt, case_name, CaseResultArtifact, CheckResult, EvalCase, PromptLimits,
    RunResult, Verdict,
};

use crate::invocation::format_command;
use crate::judge::Judge;
use crate::report::{CommandBlockLimits, Reporter};
use crate::runner::{AgentRunner, EnvOverrides};
use crate::seed::{seed_plan_packages, ScriptInterpreter};
use crate::workspace::StagedWorkspace;

/// Synthetic check names for failures outside the judge's own items.
pub const CASE_CHECK: &str = "__case__";
pub const AGENT_EXEC_CHECK: &str = "__agent_exec__";
pub const JUDGE_CHECK: &str = "__judge__";

/// What to print around each case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayOptions {
    pub show_query: bool,
    pub show_output: bool,
    pub show_commands: bool,
    pub show_command_output: bool,
    pub show_agent_cmd: bool,
    pub show_stderr: bool,
    pub show_output_on_fail: bool,
    pub show_commands_on_fail: bool,

    pub output_chars: usize,
    pub stderr_chars: usize,
    pub max_commands: usize,
    pub command_output_chars: usize,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            show_query: false,
            show_output: false,
            show_commands: false,
            show_command_output: false,
            show_agent_cmd: false,
            show_stderr: false,
            show_output_on_fail: false,
            show_commands_on_fail: false,
            output_chars: 4000,
            stderr_chars: 4000,
            max_commands: 20,
            command_output_chars: 2000,
        }
    }
}

impl DisplayOptions {
    /// `--show-io`: query, output and commands.
    pub fn with_io(mut self) -> Self {
        self.show_query = true;
        self.show_output = true;
        self.show_commands = true;
        self
    }

    fn command_limits(&self) -> CommandBlockLimits {
        CommandBlockLimits {
            max_commands: self.max_commands,
            show_output: self.show_command_output,
            output_chars: self.command_output_chars,
        }
    }
}

/// Settings echoed in the run header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunLabels {
    pub exec_mode: String,
    pub sandbox: String,
    pub agent_home: String,
    pub model: String,
    pub reasoning_effort: String,
    pub judge_model: String,
    pub judge_reasoning_effort: String,
}

#[derive(Debug, Clone)]
pub struct E2eConfig {
    /// Project root; staged per case.
    pub root: PathBuf,

    /// Glob under `<root>/evals`, for the header.
    pub pattern: String,

    /// Wall-clock limit per agent call; `None` disables it.
    pub timeout: Option<Duration>,

    pub limits: PromptLimits,

    pub display: DisplayOptions,

    pub interpreter: ScriptInterpreter,

    pub labels: RunLabels,
}

impl E2eConfig {
    pub fn header(&self, total: usize) -> String {
        let l = &self.labels;
        format!(
            "Running e2e evals: total={} pattern=evals/{} exec_mode={} sandbox={} agent_home={} model={} reasoning_effort={} judge_model={} judge_reasoning_effort={} timeout={}s",
            total,
            self.pattern,
            l.exec_mode,
            l.sandbox,
            l.agent_home,
            l.model,
            l.reasoning_effort,
            l.judge_model,
            l.judge_reasoning_effort,
            self.timeout.map(|d| d.as_secs()).unwrap_or(0),
        )
    }
}

/// Result of one case.
#[derive(Debug, Clone)]
pub struct CaseOutcome {
    pub name: String,
    pub passed: bool,
    pub verdict: Verdict,
    pub run: Option<RunResult>,
    pub duration_ms: u64,
}

impl CaseOutcome {
    pub fn to_artifact(&self) -> CaseResultArtifact {
        CaseResultArtifact {
            name: self.name.clone(),
            passed: self.passed,
            checks: self.verdict.to_checks(),
            duration_ms: self.duration_ms,
            thread_id: self.run.as_ref().and_then(|r| r.thread_id.clone()),
            usage: self.run.as_ref().map(|r| r.usage).unwrap_or_default(),
            command_count: self.run.as_ref().map(|r| r.commands.len()).unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct E2eSummary {
    pub outcomes: Vec<CaseOutcome>,
}

impl E2eSummary {
    pub fn passed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.passed).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.passed()
    }

    pub fn all_passed(&self) -> bool {
        self.failed() == 0
    }

    pub fn artifacts(&self) -> Vec<CaseResultArtifact> {
        self.outcomes.iter().map(CaseOutcome::to_artifact).collect()
    }
}

/// Run every case in order, printing progress and PASS/FAIL lines.
pub async fn run_e2e<W: Write>(
    config: &E2eConfig,
    cases: &[PathBuf],
    agent: &dyn AgentRunner,
    judge: &dyn Judge,
    env: &EnvOverrides,
    reporter: &mut Reporter<W>,
) -> anyhow::Result<E2eSummary> {
    reporter.line(&config.header(cases.len()))?;

    let mut summary = E2eSummary::default();
    for (idx, path) in cases.iter().enumerate() {
        let name = case_name(path);
        reporter.line("")?;
        reporter.case_start(idx + 1, cases.len(), &name)?;

        obs::emit_case_started(&name, idx + 1, cases.len());
        let started = Instant::now();

        let (verdict, run) = run_case(config, path, &name, agent, judge, env, reporter)
            .instrument(obs::case_span(&name))
            .await?;
        let passed = verdict.effective_passed();
        reporter.case_result(&name, passed, &verdict)?;

        if !passed {
            if let Some(run) = &run {
                let display = &config.display;
                if display.show_commands_on_fail && !display.show_commands {
                    reporter.commands_block(&run.commands, display.command_limits())?;
                }
                if display.show_output_on_fail && !display.show_output {
                    reporter.text_block("assistant_output", &run.final_message, display.output_chars)?;
                }
            }
        }

        let duration_ms = started.elapsed().as_millis() as u64;
        obs::emit_case_finished(&name, duration_ms, passed);
        summary.outcomes.push(CaseOutcome {
            name,
            passed,
            verdict,
            run,
            duration_ms,
        });
    }

    reporter.summary(summary.passed(), summary.failed())?;
    Ok(summary)
}

async fn run_case<W: Write>(
    config: &E2eConfig,
    path: &Path,
    name: &str,
    agent: &dyn AgentRunner,
    judge: &dyn Judge,
    env: &EnvOverrides,
    reporter: &mut Reporter<W>,
) -> anyhow::Result<(Verdict, Option<RunResult>)> {
    let display = &config.display;

    let step = reporter.step_start("load case")?;
    let case = match EvalCase::load(path).and_then(|c| c.ensure_runnable().map(|_| c)) {
        Ok(case) => case,
        Err(err) => {
            reporter.step_fail(&step, &err)?;
            return Ok((Verdict::failed_with(CASE_CHECK, err.to_string()), None));
        }
    };
    reporter.step_ok(&step)?;

    if display.show_query {
        reporter.text_block("agent_input(query)", &case.query, display.output_chars)?;
    }

    let step = reporter.step_start("stage workspace")?;
    let workspace = match StagedWorkspace::stage(&config.root) {
        Ok(ws) => ws,
        Err(err) => {
            reporter.step_fail(&step, &err)?;
            return Ok((
                Verdict::failed_with(CASE_CHECK, format!("stage workspace: {}", err)),
                None,
            ));
        }
    };
    reporter.step_ok(&step)?;

    let run = stage_and_run(config, &case, &workspace, agent, env, reporter).await;

    let step = reporter.step_start("clean up workspace")?;
    drop(workspace);
    reporter.step_ok(&step)?;

    let run = match run? {
        Ok(run) => run,
        Err(reason) => {
            tracing::warn!(case = %name, reason = %reason, "agent run did not complete");
            return Ok((Verdict::failed_with(AGENT_EXEC_CHECK, reason), None));
        }
    };

    if display.show_stderr && !run.stderr.trim().is_empty() {
        reporter.text_block("agent_stderr(exec)", &run.stderr, display.stderr_chars)?;
    }
    if display.show_output {
        reporter.text_block("assistant_output", &run.final_message, display.output_chars)?;
    }
    if display.show_commands {
        reporter.commands_block(&run.commands, display.command_limits())?;
    }

    let prompt = build_judge_prompt(&case.query, &case.expected_behavior, &run, config.limits);
    if display.show_agent_cmd {
        if let Some(argv) = judge.command_line(&prompt) {
            reporter.text_block("agent_cmd(judge)", &format_command(&argv), 0)?;
        }
    }

    let step = reporter.step_start("run judge")?;
    let verdict = match judge.grade(&prompt).await {
        Ok(verdict) => {
            reporter.step_ok(&step)?;
            verdict
        }
        Err(err) => {
            reporter.step_fail(&step, &err)?;
            Verdict::failed_with(JUDGE_CHECK, err.to_string())
        }
    };

    audit_verdict(name, &case, &verdict);
    Ok((verdict, Some(run)))
}

/// Seed fixtures and run the agent. The outer result carries reporter I/O
/// errors, the inner one the reason the run could not complete.
async fn stage_and_run<W: Write>(
    config: &E2eConfig,
    case: &EvalCase,
    workspace: &StagedWorkspace,
    agent: &dyn AgentRunner,
    env: &EnvOverrides,
    reporter: &mut Reporter<W>,
) -> anyhow::Result<Result<RunResult, String>> {
    let packages = case.plan_packages();
    if !packages.is_empty() {
        let step = reporter.step_start("seed plan packages")?;
        match seed_plan_packages(workspace.path(), packages, &config.interpreter).await {
            Ok(created) => {
                reporter.step_ok(&step)?;
                tracing::debug!(created = created.len(), "fixtures seeded");
            }
            Err(err) => {
                reporter.step_fail(&step, &err)?;
                return Ok(Err(err.to_string()));
            }
        }
    }

    if config.display.show_agent_cmd {
        if let Some(argv) = agent.command_line(&case.query, workspace.path()) {
            reporter.text_block("agent_cmd(exec)", &format_command(&argv), 0)?;
        }
    }

    let label = format!("run agent (sandbox={})", config.labels.sandbox);
    let step = reporter.step_start(&label)?;
    match agent
        .run(&case.query, workspace.path(), env, config.timeout)
        .await
    {
        Ok(run) => {
            reporter.step_ok(&step)?;
            if let Some(exit) = &run.exit {
                obs::emit_agent_finished(exit, run.commands.len(), &run.usage, run.ok);
            }
            Ok(Ok(run))
        }
        Err(err) => {
            reporter.step_fail(&step, &err)?;
            Ok(Err(err.to_string()))
        }
    }
}

fn audit_verdict(name: &str, case: &EvalCase, verdict: &Verdict) {
    let items_passed = verdict.checks.iter().all(|c| c.pass);
    if verdict.aggregate_mismatch() {
        obs::emit_verdict_mismatch(name, verdict.passed, items_passed);
    }
    let is_synthetic = verdict.checks.len() == 1 && verdict.checks[0].item == JUDGE_CHECK;
    if !is_synthetic && verdict.checks.len() != case.expected_behavior.len() {
        obs::emit_verdict_cardinality(name, case.expected_behavior.len(), verdict.checks.len());
    }
    obs::emit_judge_finished(
        verdict.effective_passed(),
        verdict.checks.len(),
        verdict.failing().count(),
    );
}

/// Local check results folded into a single pass flag.
pub fn checks_passed(checks: &[CheckResult]) -> bool {
    checks.iter().all(|c| c.ok)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_format() {
        let config = E2eConfig {
            root: PathBuf::from("/repo"),
            pattern: "helloagents-*.json".to_string(),
            timeout: Some(Duration::from_secs(180)),
            limits: PromptLimits::default(),
            display: DisplayOptions::default(),
            interpreter: ScriptInterpreter::default(),
            labels: RunLabels {
                exec_mode: "bypass".to_string(),
                sandbox: "workspace-write".to_string(),
                agent_home: "system".to_string(),
                model: "gpt-5.2".to_string(),
                reasoning_effort: "medium".to_string(),
                judge_model: "gpt-5.2".to_string(),
                judge_reasoning_effort: "medium".to_string(),
            },
        };
        assert_eq!(
            config.header(2),
            "Running e2e evals: total=2 pattern=evals/helloagents-*.json exec_mode=bypass sandbox=workspace-write agent_home=system model=gpt-5.2 reasoning_effort=medium judge_model=gpt-5.2 judge_reasoning_effort=medium timeout=180s"
        );
    }

    #[test]
    fn test_display_with_io() {
        let d = DisplayOptions::default().with_io();
        assert!(d.show_query && d.show_output && d.show_commands);
        assert!(!d.show_stderr);
    }

    #[test]
    fn test_summary_counts() {
        let outcome = |passed| CaseOutcome {
            name: "c".to_string(),
            passed,
            verdict: Verdict::failed_with(CASE_CHECK, "x"),
            run: None,
            duration_ms: 0,
        };
        let summary = E2eSummary {
            outcomes: vec![outcome(true), outcome(false), outcome(true)],
        };
        assert_eq!(summary.passed(), 2);
        assert_eq!(summary.failed(), 1);
        assert!(!summary.all_passed());
        assert_eq!(summary.artifacts()[1].command_count, 0);
    }
}
