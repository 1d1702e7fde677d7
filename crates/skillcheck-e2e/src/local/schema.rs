//! Shape checks for case files under `evals/`.

use std::path::Path;

use serde_json::Value;
use skillcheck_core::{case_files, case_name, CheckResult};

use super::read_for_check;

const REQUIRED_FIELDS: [(&str, FieldKind); 4] = [
    ("skills", FieldKind::Array),
    ("query", FieldKind::String),
    ("files", FieldKind::Array),
    ("expected_behavior", FieldKind::Array),
];

#[derive(Debug, Clone, Copy)]
enum FieldKind {
    Array,
    String,
}

impl FieldKind {
    fn matches(&self, value: &Value) -> bool {
        match self {
            FieldKind::Array => value.is_array(),
            FieldKind::String => value.is_string(),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            FieldKind::Array => "array",
            FieldKind::String => "string",
        }
    }
}

/// Check every case file under `<root>/evals` matching `pattern`.
pub fn check_cases(root: &Path, pattern: &str) -> Vec<CheckResult> {
    case_files(&root.join("evals"), pattern)
        .iter()
        .flat_map(|path| check_case_file(path, root))
        .collect()
}

/// Checks for one case file: JSON validity, field types, referenced files.
pub fn check_case_file(path: &Path, root: &Path) -> Vec<CheckResult> {
    let file = case_name(path);
    let json_check = format!("{}:json", file);

    let raw = match read_for_check(path, &json_check) {
        Ok(raw) => raw,
        Err(failed) => return vec![failed],
    };
    let data: Value = match serde_json::from_str(&raw) {
        Ok(v) => v,
        Err(e) => return vec![CheckResult::fail(json_check, format!("invalid JSON: {}", e))],
    };

    let mut results = Vec::new();
    for (field, kind) in REQUIRED_FIELDS {
        let name = format!("{}:{}", file, field);
        match data.get(field) {
            None => results.push(CheckResult::fail(name, "missing field")),
            Some(v) if !kind.matches(v) => results.push(CheckResult::fail(
                name,
                format!("field must be of type {}", kind.name()),
            )),
            Some(_) => results.push(CheckResult::pass(name)),
        }
    }

    if let Some(files) = data.get("files").and_then(Value::as_array) {
        for entry in files {
            match entry.as_str() {
                Some(rel) => {
                    let name = format!("{}:file:{}", file, rel);
                    if root.join(rel).exists() {
                        results.push(CheckResult::pass(name));
                    } else {
                        results.push(CheckResult::fail(name, "file does not exist"));
                    }
                }
                None => results.push(CheckResult::fail(
                    format!("{}:files", file),
                    "files contains a non-string entry",
                )),
            }
        }
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn repo() -> tempfile::TempDir {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("evals")).unwrap();
        fs::write(root.path().join("AGENTS.md"), "# agents").unwrap();
        root
    }

    #[test]
    fn test_well_formed_case_passes() {
        let root = repo();
        fs::write(
            root.path().join("evals/helloagents-01.json"),
            r#"{"skills":["helloagents"],"query":"hi","files":["AGENTS.md"],"expected_behavior":["greets"]}"#,
        )
        .unwrap();
        let checks = check_cases(root.path(), "helloagents-*.json");
        assert_eq!(checks.len(), 5);
        assert!(checks.iter().all(|c| c.ok), "{:?}", checks);
        assert_eq!(checks[4].name, "helloagents-01.json:file:AGENTS.md");
    }

    #[test]
    fn test_wrong_types_and_missing_files() {
        let root = repo();
        fs::write(
            root.path().join("evals/helloagents-02.json"),
            r#"{"skills":"helloagents","query":"hi","files":["nope.md", 3]}"#,
        )
        .unwrap();
        let checks = check_cases(root.path(), "helloagents-*.json");
        let failed: Vec<&str> = checks
            .iter()
            .filter(|c| !c.ok)
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(
            failed,
            vec![
                "helloagents-02.json:skills",
                "helloagents-02.json:expected_behavior",
                "helloagents-02.json:file:nope.md",
                "helloagents-02.json:files",
            ]
        );
    }

    #[test]
    fn test_invalid_json_is_a_failing_check() {
        let root = repo();
        fs::write(root.path().join("evals/helloagents-03.json"), "{oops").unwrap();
        let checks = check_cases(root.path(), "helloagents-*.json");
        assert_eq!(checks.len(), 1);
        assert_eq!(checks[0].name, "helloagents-03.json:json");
        assert!(!checks[0].ok);
    }
}
