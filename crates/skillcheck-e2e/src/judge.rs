//! Judge orchestration: a second, read-only agent invocation constrained to
//! the verdict schema.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use skillcheck_core::{parse_verdict, Verdict};
use tempfile::TempDir;

use crate::error::JudgeError;
use crate::invocation::AgentSettings;
use crate::runner::{fold_output, run_process, EnvOverrides, ProcessSpec};

/// Grades a judge prompt into a verdict.
#[async_trait]
pub trait Judge: Send + Sync {
    async fn grade(&self, prompt: &str) -> Result<Verdict, JudgeError>;

    /// Display form of the command line, when there is one.
    fn command_line(&self, _prompt: &str) -> Option<Vec<String>> {
        None
    }
}

/// Runs the agent CLI as judge inside its own empty directory, so it never
/// loads project instructions.
#[derive(Debug)]
pub struct CodexJudge {
    settings: AgentSettings,
    schema: PathBuf,
    env: EnvOverrides,
    timeout: Option<Duration>,
    dir: TempDir,
}

impl CodexJudge {
    pub fn new(
        settings: AgentSettings,
        schema: impl Into<PathBuf>,
        env: EnvOverrides,
        timeout: Option<Duration>,
    ) -> std::io::Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("skillcheck-judge-")
            .tempdir()?;
        Ok(Self {
            settings,
            schema: schema.into(),
            env,
            timeout,
            dir,
        })
    }

    pub fn workdir(&self) -> &Path {
        self.dir.path()
    }

    fn argv(&self, prompt: &str) -> Vec<String> {
        self.settings
            .argv(self.dir.path(), prompt, Some(&self.schema))
    }
}

#[async_trait]
impl Judge for CodexJudge {
    async fn grade(&self, prompt: &str) -> Result<Verdict, JudgeError> {
        let spec = ProcessSpec::new(self.argv(prompt))
            .cwd(self.dir.path())
            .envs(&self.env)
            .timeout(self.timeout);
        let output = run_process(&spec).await?;

        if output.exit.timed_out() {
            let run = fold_output(output);
            return Err(JudgeError::TimedOut(run.stderr.trim().to_string()));
        }
        if !output.success() {
            return Err(JudgeError::Failed {
                exit: output.exit.to_string(),
                stderr: output.stderr.trim().to_string(),
            });
        }

        let run = fold_output(output);
        Ok(parse_verdict(&run.final_message)?)
    }

    fn command_line(&self, prompt: &str) -> Option<Vec<String>> {
        let mut argv = self.argv(prompt);
        if let Some(last) = argv.last_mut() {
            *last = format!("<judge_prompt len={} chars>", prompt.chars().count());
        }
        Some(argv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_judge_command_line_hides_prompt() {
        let judge = CodexJudge::new(
            AgentSettings::new("codex").judge(Some("m".to_string()), None),
            "/repo/evals/judge.schema.json",
            EnvOverrides::new(),
            None,
        )
        .unwrap();
        let argv = judge.command_line("grade this").unwrap();
        assert_eq!(argv.last().map(String::as_str), Some("<judge_prompt len=10 chars>"));
        assert!(argv.iter().any(|a| a == "--output-schema"));
        assert!(argv.windows(2).any(|w| w[0] == "-s" && w[1] == "read-only"));
        let workdir = judge.workdir().to_string_lossy().into_owned();
        assert!(argv.windows(2).any(|w| w[0] == "-C" && w[1] == workdir));
    }
}
