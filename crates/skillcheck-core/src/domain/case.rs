//! Evaluation case files and their optional setup preconditions.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::{EvalError, Result};

/// Package type used when a fixture spec leaves `type` blank.
pub const DEFAULT_PACKAGE_TYPE: &str = "implementation";

/// One evaluation case, loaded from a JSON file under `evals/`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvalCase {
    /// Skills the case exercises.
    #[serde(default)]
    pub skills: Vec<String>,

    /// Prompt given to the agent-under-test.
    #[serde(default)]
    pub query: String,

    /// Paths (relative to the repository root) that must exist.
    #[serde(default)]
    pub files: Vec<String>,

    /// Ordered natural-language assertions the judge rates.
    #[serde(default)]
    pub expected_behavior: Vec<String>,

    /// Optional preconditions seeded into the staged workspace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setup: Option<CaseSetup>,
}

impl EvalCase {
    /// Read and decode a case file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| EvalError::CaseRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| EvalError::CaseParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// A case can only run end-to-end with a prompt and at least one assertion.
    pub fn ensure_runnable(&self) -> Result<()> {
        if self.query.trim().is_empty() {
            return Err(EvalError::NotRunnable("query is empty".to_string()));
        }
        if self.expected_behavior.is_empty() {
            return Err(EvalError::NotRunnable(
                "expected_behavior is empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Fixture specs to seed, empty when the case has no setup.
    pub fn plan_packages(&self) -> &[PlanPackageSpec] {
        self.setup
            .as_ref()
            .map(|s| s.plan_packages.as_slice())
            .unwrap_or_default()
    }
}

/// Display name of a case: its file name.
pub fn case_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Sorted case files in `evals_dir` matching a glob pattern. An invalid
/// pattern matches nothing.
pub fn case_files(evals_dir: &Path, pattern: &str) -> Vec<PathBuf> {
    let full = evals_dir.join(pattern);
    let mut files = glob_paths(&full.to_string_lossy()).unwrap_or_default();
    files.sort();
    files
}

fn glob_paths(pattern: &str) -> Option<Vec<PathBuf>> {
    let entries = glob::glob(pattern).ok()?;
    Some(entries.filter_map(|e| e.ok()).filter(|p| p.is_file()).collect())
}

/// Structured preconditions for a case.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CaseSetup {
    /// Plan packages to create before the agent runs.
    #[serde(default)]
    pub plan_packages: Vec<PlanPackageSpec>,
}

/// One plan package fixture: which feature, which package type, which state.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PlanPackageSpec {
    #[serde(default)]
    pub feature: String,

    #[serde(rename = "type", default)]
    pub pkg_type: String,

    #[serde(default)]
    pub variant: String,
}

impl PlanPackageSpec {
    /// Trimmed feature name.
    pub fn feature(&self) -> &str {
        self.feature.trim()
    }

    /// Trimmed package type, defaulting to `implementation` when blank.
    pub fn package_type(&self) -> &str {
        match self.pkg_type.trim() {
            "" => DEFAULT_PACKAGE_TYPE,
            t => t,
        }
    }

    /// Parsed variant, defaulting to `complete` when blank.
    pub fn variant(&self) -> Result<PackageVariant> {
        match self.variant.trim() {
            "" => Ok(PackageVariant::Complete),
            v => v.parse(),
        }
    }
}

/// Completeness state a seeded plan package is left in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageVariant {
    /// Leave the created package untouched.
    Complete,
    /// Delete `tasks.md`.
    MissingTasks,
    /// Delete `proposal.md`.
    MissingProposal,
    /// Append a destructive, confirmation-gated task to `tasks.md`.
    Risky,
}

impl PackageVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            PackageVariant::Complete => "complete",
            PackageVariant::MissingTasks => "missing_tasks",
            PackageVariant::MissingProposal => "missing_proposal",
            PackageVariant::Risky => "risky",
        }
    }
}

impl fmt::Display for PackageVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PackageVariant {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "complete" => Ok(PackageVariant::Complete),
            "missing_tasks" => Ok(PackageVariant::MissingTasks),
            "missing_proposal" => Ok(PackageVariant::MissingProposal),
            "risky" => Ok(PackageVariant::Risky),
            other => Err(EvalError::UnknownVariant(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_case_deserializes_with_setup() {
        let raw = json!({
            "skills": ["helloagents"],
            "query": "~exec",
            "files": ["AGENTS.md"],
            "expected_behavior": ["asks for confirmation"],
            "setup": {
                "plan_packages": [
                    {"feature": "login", "type": "implementation", "variant": "risky"}
                ]
            }
        });
        let case: EvalCase = serde_json::from_value(raw).expect("deserialize");
        assert_eq!(case.plan_packages().len(), 1);
        let spec = &case.plan_packages()[0];
        assert_eq!(spec.feature(), "login");
        assert_eq!(spec.variant().unwrap(), PackageVariant::Risky);
    }

    #[test]
    fn test_case_without_setup_has_no_packages() {
        let case: EvalCase = serde_json::from_value(json!({
            "query": "list files",
            "expected_behavior": ["lists at least one file"]
        }))
        .unwrap();
        assert!(case.plan_packages().is_empty());
        assert!(case.ensure_runnable().is_ok());
    }

    #[test]
    fn test_blank_query_is_not_runnable() {
        let case: EvalCase = serde_json::from_value(json!({
            "query": "   ",
            "expected_behavior": ["anything"]
        }))
        .unwrap();
        let err = case.ensure_runnable().unwrap_err();
        assert!(err.to_string().contains("query is empty"));
    }

    #[test]
    fn test_empty_expected_behavior_is_not_runnable() {
        let case: EvalCase = serde_json::from_value(json!({"query": "hi"})).unwrap();
        let err = case.ensure_runnable().unwrap_err();
        assert!(err.to_string().contains("expected_behavior"));
    }

    #[test]
    fn test_package_spec_defaults() {
        let spec: PlanPackageSpec = serde_json::from_value(json!({"feature": " auth "})).unwrap();
        assert_eq!(spec.feature(), "auth");
        assert_eq!(spec.package_type(), DEFAULT_PACKAGE_TYPE);
        assert_eq!(spec.variant().unwrap(), PackageVariant::Complete);
    }

    #[test]
    fn test_unknown_variant_is_rejected() {
        let spec = PlanPackageSpec {
            feature: "x".to_string(),
            pkg_type: String::new(),
            variant: "half_done".to_string(),
        };
        assert!(matches!(spec.variant(), Err(EvalError::UnknownVariant(v)) if v == "half_done"));
    }

    #[test]
    fn test_load_reports_parse_errors_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = EvalCase::load(&path).unwrap_err();
        assert!(matches!(err, EvalError::CaseParse { .. }));
        assert!(err.to_string().contains("broken.json"));
    }

    #[test]
    fn test_case_files_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["helloagents-02.json", "helloagents-01.json", "judge.schema.json"] {
            std::fs::write(dir.path().join(name), "{}").unwrap();
        }
        let files = case_files(dir.path(), "helloagents-*.json");
        let names: Vec<String> = files.iter().map(|p| case_name(p)).collect();
        assert_eq!(names, vec!["helloagents-01.json", "helloagents-02.json"]);
    }
}
