//! Event stream parser: NDJSON agent output to a folded [`RunResult`].
//!
//! Decoding is line-at-a-time: a blank or undecodable line is dropped, so a
//! stream cut mid-line by a timeout kill still yields every complete event
//! before the cut.

use crate::domain::{AgentEvent, CommandRecord, RunResult, ThreadItem};

/// Decode each non-blank line as one event, skipping undecodable lines.
pub fn parse_event_stream(raw: &str) -> Vec<AgentEvent> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| match serde_json::from_str::<AgentEvent>(line) {
            Ok(ev) => Some(ev),
            Err(e) => {
                tracing::trace!(error = %e, "skipping undecodable event line");
                None
            }
        })
        .collect()
}

/// Fold events into a run result.
///
/// The last `agent_message` wins, commands accumulate in order, and the last
/// `turn.completed` usage is kept. `ok` is cleared by any command with a
/// non-zero integer exit code.
pub fn fold_events<I>(events: I) -> RunResult
where
    I: IntoIterator<Item = AgentEvent>,
{
    let mut run = RunResult {
        ok: true,
        ..RunResult::default()
    };

    for ev in events {
        match ev {
            AgentEvent::ThreadStarted { thread_id } => {
                if thread_id.is_some() {
                    run.thread_id = thread_id;
                }
            }
            AgentEvent::ItemCompleted { item } => match item {
                ThreadItem::AgentMessage { text } => run.final_message = text,
                ThreadItem::CommandExecution {
                    command,
                    exit_code,
                    aggregated_output,
                } => {
                    let record = CommandRecord {
                        command,
                        exit_code,
                        output: aggregated_output,
                    };
                    if record.failed() {
                        run.ok = false;
                    }
                    run.commands.push(record);
                }
                ThreadItem::Other => {}
            },
            AgentEvent::TurnCompleted { usage } => run.usage = usage,
            AgentEvent::Unknown => {}
        }
    }

    run
}

/// Parse and fold in one step.
pub fn reduce_stream(raw: &str) -> RunResult {
    fold_events(parse_event_stream(raw))
}
