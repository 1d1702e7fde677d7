//! Judge verdicts and the uniform check record shared with local checks.

use serde::{Deserialize, Serialize};

/// Per-assertion rating from the judge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemVerdict {
    #[serde(default)]
    pub item: String,

    #[serde(default)]
    pub pass: bool,

    #[serde(default)]
    pub reason: String,
}

/// Structured judge output: `{"passed": bool, "checks": [...]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    #[serde(default)]
    pub passed: bool,

    #[serde(default)]
    pub checks: Vec<ItemVerdict>,
}

impl Verdict {
    /// Synthetic failing verdict with a single check, used when a stage
    /// before or during judging fails.
    pub fn failed_with(item: &str, reason: impl Into<String>) -> Self {
        Self {
            passed: false,
            checks: vec![ItemVerdict {
                item: item.to_string(),
                pass: false,
                reason: reason.into(),
            }],
        }
    }

    /// Overall pass: the judge's aggregate and every individual item.
    pub fn effective_passed(&self) -> bool {
        self.passed && self.checks.iter().all(|c| c.pass)
    }

    /// True when the judge's aggregate disagrees with its own items.
    pub fn aggregate_mismatch(&self) -> bool {
        self.passed != self.checks.iter().all(|c| c.pass)
    }

    pub fn failing(&self) -> impl Iterator<Item = &ItemVerdict> {
        self.checks.iter().filter(|c| !c.pass)
    }

    pub fn to_checks(&self) -> Vec<CheckResult> {
        self.checks
            .iter()
            .map(|c| CheckResult {
                name: c.item.clone(),
                ok: c.pass,
                detail: c.reason.clone(),
            })
            .collect()
    }
}

/// Minimal check record used by both local checks and reduced judge verdicts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub name: String,
    pub ok: bool,
    pub detail: String,
}

impl CheckResult {
    pub fn pass(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ok: true,
            detail: String::new(),
        }
    }

    pub fn fail(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ok: false,
            detail: detail.into(),
        }
    }

    pub fn new(name: impl Into<String>, ok: bool, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ok,
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(pass: bool) -> ItemVerdict {
        ItemVerdict {
            item: "x".to_string(),
            pass,
            reason: String::new(),
        }
    }

    #[test]
    fn test_effective_passed_requires_all_items() {
        let v = Verdict {
            passed: true,
            checks: vec![item(true), item(false)],
        };
        assert!(!v.effective_passed());
        assert!(v.aggregate_mismatch());
    }

    #[test]
    fn test_effective_passed_respects_judge_aggregate() {
        let v = Verdict {
            passed: false,
            checks: vec![item(true)],
        };
        assert!(!v.effective_passed());
        assert!(v.aggregate_mismatch());
    }

    #[test]
    fn test_consistent_pass() {
        let v = Verdict {
            passed: true,
            checks: vec![item(true), item(true)],
        };
        assert!(v.effective_passed());
        assert!(!v.aggregate_mismatch());
    }

    #[test]
    fn test_failed_with_builds_single_check() {
        let v = Verdict::failed_with("__judge__", "timed out");
        assert!(!v.effective_passed());
        let checks = v.to_checks();
        assert_eq!(checks, vec![CheckResult::fail("__judge__", "timed out")]);
    }

    #[test]
    fn test_verdict_missing_fields_default() {
        let v: Verdict = serde_json::from_str(r#"{"checks":[{"item":"a"}]}"#).unwrap();
        assert!(!v.passed);
        assert!(!v.checks[0].pass);
        assert_eq!(v.failing().count(), 1);
    }
}
