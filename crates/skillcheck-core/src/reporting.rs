use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

use crate::domain::{case_name, CheckResult, Usage};

pub const RESULTS_SCHEMA_VERSION: &str = "1.0";

/// One case's entry in the persisted results artifact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaseResultArtifact {
    pub name: String,
    pub passed: bool,
    pub checks: Vec<CheckResult>,
    pub duration_ms: u64,
    pub thread_id: Option<String>,
    pub usage: Usage,
    pub command_count: usize,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunSummaryArtifact {
    pub passed: usize,
    pub failed: usize,
    pub total: usize,
}

impl RunSummaryArtifact {
    pub fn from_outcomes<I: IntoIterator<Item = bool>>(outcomes: I) -> Self {
        let mut summary = Self::default();
        for passed in outcomes {
            if passed {
                summary.passed += 1;
            } else {
                summary.failed += 1;
            }
            summary.total += 1;
        }
        summary
    }
}

/// Results artifact written by `--report-json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunResultsArtifact {
    pub schema_version: String,
    pub generated_at: DateTime<Utc>,
    pub mode: String,
    pub cases_digest: String,
    pub summary: RunSummaryArtifact,
    pub case_results: Vec<CaseResultArtifact>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub local_checks: Vec<CheckResult>,
}

impl RunResultsArtifact {
    pub fn new(
        mode: &str,
        cases_digest: String,
        case_results: Vec<CaseResultArtifact>,
        local_checks: Vec<CheckResult>,
    ) -> Self {
        let summary = if case_results.is_empty() {
            RunSummaryArtifact::from_outcomes(local_checks.iter().map(|c| c.ok))
        } else {
            RunSummaryArtifact::from_outcomes(case_results.iter().map(|c| c.passed))
        };
        Self {
            schema_version: RESULTS_SCHEMA_VERSION.to_string(),
            generated_at: Utc::now(),
            mode: mode.to_string(),
            cases_digest,
            summary,
            case_results,
            local_checks,
        }
    }
}

/// SHA-256 over the ordered case file names and contents, hex encoded.
pub fn cases_digest(paths: &[PathBuf]) -> Result<String> {
    let mut hasher = Sha256::new();
    for path in paths {
        let bytes = std::fs::read(path).with_context(|| format!("read {:?}", path))?;
        hasher.update(case_name(path).as_bytes());
        hasher.update([0u8]);
        hasher.update(&bytes);
        hasher.update([0u8]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Write the results artifact in pretty JSON format.
pub fn write_results_json(path: &Path, artifact: &RunResultsArtifact) -> Result<()> {
    let content = serde_json::to_string_pretty(artifact).context("serialize results artifact")?;
    std::fs::write(path, content).with_context(|| format!("write {:?}", path))?;
    Ok(())
}
