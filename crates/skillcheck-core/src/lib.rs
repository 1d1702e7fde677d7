//! skillcheck core library
//!
//! Domain model and pure logic for the skillcheck harness: eval cases, the
//! agent event stream and its reduction, judge prompts and verdicts.

pub mod domain;
pub mod grading;
pub mod obs;
pub mod reporting;
pub mod stream;
pub mod telemetry;
pub mod text;

pub use domain::{
    case_files, case_name, AgentEvent, CaseSetup, CheckResult, CommandRecord, EvalCase, EvalError,
    ItemVerdict, PackageVariant, PlanPackageSpec, ProcessExit, Result, RunResult, ThreadItem,
    Usage, Verdict, VerdictDecodeError, DEFAULT_PACKAGE_TYPE,
};

pub use grading::{build_judge_prompt, extract_first_json_object, parse_verdict, PromptLimits};

pub use stream::{fold_events, parse_event_stream, reduce_stream};

pub use reporting::{
    cases_digest, write_results_json, CaseResultArtifact, RunResultsArtifact,
    RunSummaryArtifact,
};

pub use telemetry::init_tracing;

pub use text::{trim_for_display, truncate_chars};

/// Crate version, reported in the run header.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
