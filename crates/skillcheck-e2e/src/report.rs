//! Human-readable console report. Every line goes through one writer so tests
//! can capture the exact output.

use std::io::{self, Write};
use std::time::Instant;

use skillcheck_core::{trim_for_display, CheckResult, CommandRecord, Verdict};

use crate::pipeline::JUDGE_CHECK;

/// Failing judge items printed under a `FAIL` line.
pub const MAX_FAILURE_LINES: usize = 10;

/// A pipeline stage in progress.
#[derive(Debug)]
pub struct Step {
    label: String,
    started: Instant,
}

impl Step {
    pub fn elapsed_secs(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }
}

/// Display limits for command blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandBlockLimits {
    pub max_commands: usize,
    pub show_output: bool,
    pub output_chars: usize,
}

pub struct Reporter<W: Write> {
    out: W,
}

impl Reporter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn line(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.out, "{}", text)?;
        self.out.flush()
    }

    // -----------------------------------------------------------------------
    // Steps
    // -----------------------------------------------------------------------

    pub fn step_start(&mut self, label: &str) -> io::Result<Step> {
        self.line(&format!("  - {} ...", label))?;
        Ok(Step {
            label: label.to_string(),
            started: Instant::now(),
        })
    }

    pub fn step_ok(&mut self, step: &Step) -> io::Result<()> {
        self.line(&format!("    OK  {} ({:.2}s)", step.label, step.elapsed_secs()))
    }

    pub fn step_fail(&mut self, step: &Step, error: &dyn std::fmt::Display) -> io::Result<()> {
        self.line(&format!(
            "    FAIL {} ({:.2}s): {}",
            step.label,
            step.elapsed_secs(),
            error
        ))
    }

    // -----------------------------------------------------------------------
    // Blocks
    // -----------------------------------------------------------------------

    /// `  - (<label>)` followed by the trimmed, truncated text indented by 4.
    pub fn text_block(&mut self, label: &str, text: &str, max_chars: usize) -> io::Result<()> {
        self.line(&format!("  - ({})", label))?;
        let shown = trim_for_display(text, max_chars);
        if shown.is_empty() {
            return self.line("    (empty)");
        }
        for line in shown.lines() {
            self.line(&format!("    {}", line))?;
        }
        Ok(())
    }

    pub fn commands_block(
        &mut self,
        commands: &[CommandRecord],
        limits: CommandBlockLimits,
    ) -> io::Result<()> {
        self.line("  - (commands)")?;
        if commands.is_empty() {
            return self.line("    (empty)");
        }

        let shown = match limits.max_commands {
            0 => commands.len(),
            n => n.min(commands.len()),
        };
        for cmd in &commands[..shown] {
            let prefix = cmd
                .exit_code
                .map(|code| format!("[exit={}] ", code))
                .unwrap_or_default();
            self.line(format!("    {}{}", prefix, cmd.command.trim()).trim_end())?;

            if limits.show_output {
                let output = trim_for_display(&cmd.output, limits.output_chars);
                for line in output.lines() {
                    self.line(&format!("      {}", line))?;
                }
            }
        }
        if shown < commands.len() {
            self.line(&format!("    (truncated, {} commands total)", commands.len()))?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Cases and summaries
    // -----------------------------------------------------------------------

    pub fn case_start(&mut self, index: usize, total: usize, name: &str) -> io::Result<()> {
        self.line(&format!("CASE {}/{} {}", index, total, name))
    }

    /// `PASS <name>`, or `FAIL <name>` plus up to [`MAX_FAILURE_LINES`]
    /// failing items. A failure always carries at least one reason line.
    pub fn case_result(&mut self, name: &str, passed: bool, verdict: &Verdict) -> io::Result<()> {
        if passed {
            return self.line(&format!("PASS {}", name));
        }
        self.line(&format!("FAIL {}", name))?;

        let failing: Vec<_> = verdict.failing().collect();
        if failing.is_empty() {
            let reason = if verdict.checks.is_empty() {
                "judge reported passed=false with no checks"
            } else {
                "judge reported passed=false with no failing items"
            };
            return self.line(&format!("  - {}: {}", JUDGE_CHECK, reason));
        }
        for check in failing.iter().take(MAX_FAILURE_LINES) {
            self.line(&format!("  - {}: {}", check.item, check.reason))?;
        }
        if failing.len() > MAX_FAILURE_LINES {
            self.line(&format!(
                "  - ({} more failing items)",
                failing.len() - MAX_FAILURE_LINES
            ))?;
        }
        Ok(())
    }

    pub fn check_results(&mut self, checks: &[CheckResult]) -> io::Result<()> {
        for check in checks {
            if check.ok {
                self.line(&format!("PASS {}", check.name))?;
            } else if check.detail.is_empty() {
                self.line(&format!("FAIL {}", check.name))?;
            } else {
                self.line(&format!("FAIL {} - {}", check.name, check.detail))?;
            }
        }
        Ok(())
    }

    pub fn summary(&mut self, passed: usize, failed: usize) -> io::Result<()> {
        self.line(&format!(
            "\nSUMMARY passed={} failed={} total={}",
            passed,
            failed,
            passed + failed
        ))
    }
}
