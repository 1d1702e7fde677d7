//! Stream reduction feeding judge prompt construction and verdict decoding.

use skillcheck_core::{
    build_judge_prompt, parse_verdict, reduce_stream, EvalCase, PromptLimits, Verdict,
};

const TRANSCRIPT: &str = r#"{"type":"thread.started","thread_id":"th-42"}
{"type":"turn.started"}
{"type":"item.completed","item":{"type":"reasoning","text":"looking around"}}
{"type":"item.completed","item":{"type":"command_execution","command":"bash -lc ls","exit_code":0,"aggregated_output":"hello.txt\n"}}
{"type":"item.completed","item":{"type":"agent_message","text":"The workspace contains hello.txt."}}
{"type":"turn.completed","usage":{"input_tokens":1200,"cached_input_tokens":800,"output_tokens":40}}
"#;

fn case() -> EvalCase {
    serde_json::from_value(serde_json::json!({
        "query": "list files",
        "expected_behavior": ["lists at least one file"],
        "files": [],
        "skills": ["helloagents"]
    }))
    .expect("case")
}

// -------------------------------------------------------------------------
// Stream -> prompt
// -------------------------------------------------------------------------

#[test]
fn test_transcript_reduces_and_renders_prompt() {
    let run = reduce_stream(TRANSCRIPT);
    assert!(run.ok);
    assert_eq!(run.thread_id.as_deref(), Some("th-42"));
    assert_eq!(run.usage.cached_input_tokens, 800);

    let case = case();
    let prompt = build_judge_prompt(
        &case.query,
        &case.expected_behavior,
        &run,
        PromptLimits::default(),
    );
    assert!(prompt.contains("1) lists at least one file"));
    assert!(prompt.contains("- bash -lc ls"));
    assert!(prompt.contains("The workspace contains hello.txt."));
}

#[test]
fn test_timeout_cut_transcript_still_reduces() {
    let cut = &TRANSCRIPT[..TRANSCRIPT.find("\"agent_message\"").expect("marker")];
    let run = reduce_stream(cut);
    assert_eq!(run.commands.len(), 1);
    assert!(run.final_message.is_empty());
    assert_eq!(run.usage.input_tokens, 0);
}

// -------------------------------------------------------------------------
// Judge message -> verdict
// -------------------------------------------------------------------------

#[test]
fn test_judge_message_decodes_to_passing_verdict() {
    let message = r#"{"passed":true,"checks":[{"item":"lists at least one file","pass":true,"reason":"hello.txt named"}]}"#;
    let verdict: Verdict = parse_verdict(message).expect("verdict");
    assert!(verdict.effective_passed());
    assert_eq!(verdict.to_checks()[0].name, "lists at least one file");
}

#[test]
fn test_judge_self_contradiction_fails_case() {
    let message = r#"Result: {"passed":true,"checks":[{"item":"a","pass":false,"reason":"no"}]}"#;
    let verdict = parse_verdict(message).expect("verdict");
    assert!(verdict.passed);
    assert!(!verdict.effective_passed());
}
