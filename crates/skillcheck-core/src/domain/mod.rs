pub mod case;
pub mod error;
pub mod event;
pub mod run;
pub mod verdict;

pub use case::{
    case_files, case_name, CaseSetup, EvalCase, PackageVariant, PlanPackageSpec,
    DEFAULT_PACKAGE_TYPE,
};
pub use error::{EvalError, Result, VerdictDecodeError};
pub use event::{AgentEvent, ThreadItem, Usage};
pub use run::{CommandRecord, ProcessExit, RunResult};
pub use verdict::{CheckResult, ItemVerdict, Verdict};
