//! Structured lifecycle events for eval runs.
//!
//! - `case_span` tags everything inside one case with `case = <name>`
//! - `emit_*` functions log the key transitions of the case pipeline
//!
//! Async callers attach the span with `tracing::Instrument`.

use tracing::{info, warn};

use crate::domain::{ProcessExit, Usage};

/// Span covering one case.
pub fn case_span(case: &str) -> tracing::Span {
    tracing::info_span!("skillcheck.case", case = %case)
}

pub fn emit_case_started(case: &str, index: usize, total: usize) {
    info!(event = "case.started", case = %case, index = index, total = total);
}

pub fn emit_case_finished(case: &str, duration_ms: u64, passed: bool) {
    info!(
        event = "case.finished",
        case = %case,
        duration_ms = duration_ms,
        passed = passed,
    );
}

/// Emit event: agent process finished and its stream was folded.
pub fn emit_agent_finished(exit: &ProcessExit, commands: usize, usage: &Usage, ok: bool) {
    info!(
        event = "agent.finished",
        exit = %exit,
        commands = commands,
        input_tokens = usage.input_tokens,
        output_tokens = usage.output_tokens,
        ok = ok,
    );
}

pub fn emit_judge_finished(passed: bool, items: usize, failing: usize) {
    info!(
        event = "judge.finished",
        passed = passed,
        items = items,
        failing = failing,
    );
}

/// Emit event: the judge's aggregate disagrees with its per-item ratings.
pub fn emit_verdict_mismatch(case: &str, judge_passed: bool, items_passed: bool) {
    warn!(
        event = "judge.aggregate_mismatch",
        case = %case,
        judge_passed = judge_passed,
        items_passed = items_passed,
    );
}

/// Emit event: the judge rated a different number of items than expected.
pub fn emit_verdict_cardinality(case: &str, expected: usize, rated: usize) {
    warn!(
        event = "judge.cardinality_mismatch",
        case = %case,
        expected = expected,
        rated = rated,
    );
}

pub fn emit_workspace_released(path: &std::path::Path) {
    info!(event = "workspace.released", path = %path.display());
}

pub fn emit_cleanup_error(what: &str, error: &dyn std::fmt::Display) {
    warn!(event = "cleanup.error", what = %what, error = %error);
}
