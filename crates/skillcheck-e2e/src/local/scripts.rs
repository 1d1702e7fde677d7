//! Smoke tests of the scaffolding scripts, each in a throw-away project.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::Value;
use skillcheck_core::CheckResult;

use super::SKILL_DIR;
use crate::runner::{run_process, ProcessOutput, ProcessSpec};
use crate::seed::{package_path_from_report, ScriptInterpreter};

const SCRIPT_TIMEOUT: Duration = Duration::from_secs(120);
const KB_DIRS: [&str; 3] = ["modules", "archive", "plan"];

fn script(root: &Path, name: &str) -> PathBuf {
    root.join(SKILL_DIR).join("scripts").join(name)
}

fn temp_project() -> Result<tempfile::TempDir, String> {
    tempfile::Builder::new()
        .prefix("skillcheck-evals-")
        .tempdir()
        .map_err(|e| format!("cannot create temp project: {}", e))
}

async fn run_script(
    interpreter: &ScriptInterpreter,
    script: &Path,
    args: &[&str],
    cwd: &Path,
) -> Result<ProcessOutput, String> {
    let spec = ProcessSpec::new(interpreter.argv(script, args))
        .cwd(cwd)
        .timeout(Some(SCRIPT_TIMEOUT));
    run_process(&spec).await.map_err(|e| e.to_string())
}

fn failure_detail(output: &ProcessOutput) -> String {
    format!("{}, err={}", output.exit, output.stderr.trim())
}

fn parse_json(output: &ProcessOutput) -> Option<Value> {
    serde_json::from_str(output.stdout.trim()).ok()
}

fn count(value: &Value, key: &str) -> i64 {
    value.get(key).and_then(Value::as_i64).unwrap_or(0)
}

fn string_set(value: Option<&Value>) -> BTreeSet<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// `create_package.py` creates a complete package that `validate_package.py` accepts.
pub async fn create_package_smoke(root: &Path, interpreter: &ScriptInterpreter) -> Vec<CheckResult> {
    const CREATE: &str = "plan-create-package:create_package";
    const VALIDATE: &str = "plan-create-package:validate_package";
    let mut results = Vec::new();

    let project = match temp_project() {
        Ok(dir) => dir,
        Err(e) => return vec![CheckResult::fail(CREATE, e)],
    };
    let proj = project.path().to_string_lossy().into_owned();

    let output = match run_script(
        interpreter,
        &script(root, "create_package.py"),
        &["evals-smoke", "--path", &proj],
        root,
    )
    .await
    {
        Ok(out) if out.success() => out,
        Ok(out) => return vec![CheckResult::fail(CREATE, failure_detail(&out))],
        Err(e) => return vec![CheckResult::fail(CREATE, e)],
    };
    let Some(report) = parse_json(&output) else {
        return vec![CheckResult::fail(CREATE, "create_package output is not JSON")];
    };
    results.push(CheckResult::new(
        CREATE,
        report.get("success") == Some(&Value::Bool(true)),
        "report.success != true",
    ));

    let package = match package_path_from_report(&output.stdout, project.path()) {
        Ok(p) => p,
        Err(_) => {
            results.push(CheckResult::fail(
                "plan-create-package:package_path",
                "report.context.package_path missing",
            ));
            return results;
        }
    };
    results.push(CheckResult::new(
        "plan-create-package:proposal.md",
        package.join("proposal.md").is_file(),
        "proposal.md does not exist",
    ));
    results.push(CheckResult::new(
        "plan-create-package:tasks.md",
        package.join("tasks.md").is_file(),
        "tasks.md does not exist",
    ));

    let output = match run_script(
        interpreter,
        &script(root, "validate_package.py"),
        &["--path", &proj],
        root,
    )
    .await
    {
        Ok(out) if out.success() => out,
        Ok(out) => {
            results.push(CheckResult::fail(VALIDATE, failure_detail(&out)));
            return results;
        }
        Err(e) => {
            results.push(CheckResult::fail(VALIDATE, e));
            return results;
        }
    };
    let Some(report) = parse_json(&output) else {
        results.push(CheckResult::fail(VALIDATE, "validate_package output is not JSON"));
        return results;
    };
    let total = count(&report, "total");
    let invalid = count(&report, "invalid");
    results.push(CheckResult::new(
        "plan-create-package:validate.total>=1",
        total >= 1,
        format!("total={}", total),
    ));
    results.push(CheckResult::new(
        "plan-create-package:validate.invalid==0",
        invalid == 0,
        format!("invalid={}", invalid),
    ));
    results
}

/// `upgradewiki.py --scan/--init` initialises the knowledge base layout.
pub async fn init_upgrade_smoke(root: &Path, interpreter: &ScriptInterpreter) -> Vec<CheckResult> {
    let mut results = Vec::new();
    let upgradewiki = script(root, "upgradewiki.py");

    let project = match temp_project() {
        Ok(dir) => dir,
        Err(e) => return vec![CheckResult::fail("init-upgrade:scan-before", e)],
    };
    let proj = project.path().to_string_lossy().into_owned();

    let before = match json_step(
        interpreter,
        &upgradewiki,
        &["--scan", "--path", &proj],
        root,
        "init-upgrade:scan-before",
    )
    .await
    {
        Ok(v) => v,
        Err(failed) => return vec![failed],
    };
    results.push(CheckResult::new(
        "init-upgrade:scan-before.exists==false",
        before.get("exists") == Some(&Value::Bool(false)),
        format!("exists={}", before.get("exists").unwrap_or(&Value::Null)),
    ));

    let init = match json_step(
        interpreter,
        &upgradewiki,
        &["--init", "--path", &proj],
        root,
        "init-upgrade:init",
    )
    .await
    {
        Ok(v) => v,
        Err(failed) => {
            results.push(failed);
            return results;
        }
    };
    let mut known = string_set(init.get("created"));
    known.extend(string_set(init.get("existed")));
    for dir in KB_DIRS {
        results.push(CheckResult::new(
            format!("init-upgrade:init-has:{}", dir),
            known.contains(dir),
            format!("directory not created or recognised: {}", dir),
        ));
    }

    let after = match json_step(
        interpreter,
        &upgradewiki,
        &["--scan", "--path", &proj],
        root,
        "init-upgrade:scan-after",
    )
    .await
    {
        Ok(v) => v,
        Err(failed) => {
            results.push(failed);
            return results;
        }
    };
    results.push(CheckResult::new(
        "init-upgrade:scan-after.exists==true",
        after.get("exists") == Some(&Value::Bool(true)),
        format!("exists={}", after.get("exists").unwrap_or(&Value::Null)),
    ));

    let structure = after.get("structure");
    let dirs = string_set(structure.and_then(|s| s.get("directories")));
    for dir in KB_DIRS {
        results.push(CheckResult::new(
            format!("init-upgrade:structure-has:{}", dir),
            dirs.contains(dir),
            format!("structure.directories lacks {}", dir),
        ));
    }
    let root_files = structure
        .and_then(|s| s.get("root_files"))
        .cloned()
        .unwrap_or(Value::Array(Vec::new()));
    results.push(CheckResult::new(
        "init-upgrade:root_files_empty",
        root_files.as_array().map(Vec::is_empty).unwrap_or(false),
        format!("root_files={}", root_files),
    ));
    results
}

async fn json_step(
    interpreter: &ScriptInterpreter,
    script: &Path,
    args: &[&str],
    cwd: &Path,
    name: &str,
) -> Result<Value, CheckResult> {
    let output = run_script(interpreter, script, args, cwd)
        .await
        .map_err(|e| CheckResult::fail(name, e))?;
    if !output.success() {
        return Err(CheckResult::fail(name, failure_detail(&output)));
    }
    parse_json(&output).ok_or_else(|| CheckResult::fail(name, "output is not JSON"))
}

/// `validate_package.py` rejects a package with `proposal.md` but no `tasks.md`.
pub async fn incomplete_package_detected(
    root: &Path,
    interpreter: &ScriptInterpreter,
) -> Vec<CheckResult> {
    const CREATE: &str = "exec-safety:create_ok";
    let mut results = Vec::new();

    let project = match temp_project() {
        Ok(dir) => dir,
        Err(e) => return vec![CheckResult::fail(CREATE, e)],
    };
    let proj = project.path().to_string_lossy().into_owned();

    match run_script(
        interpreter,
        &script(root, "create_package.py"),
        &["evals-exec-ok", "--path", &proj],
        root,
    )
    .await
    {
        Ok(out) if out.success() => {}
        Ok(out) => return vec![CheckResult::fail(CREATE, failure_detail(&out))],
        Err(e) => return vec![CheckResult::fail(CREATE, e)],
    }

    let bad_dir = project
        .path()
        .join("helloagents/plan/200001010000_incomplete");
    let planted = std::fs::create_dir_all(&bad_dir)
        .and_then(|_| std::fs::write(bad_dir.join("proposal.md"), "# proposal\n"));
    if let Err(e) = planted {
        return vec![CheckResult::fail(
            "exec-safety:plant_incomplete",
            e.to_string(),
        )];
    }

    let output = match run_script(
        interpreter,
        &script(root, "validate_package.py"),
        &["--path", &proj],
        root,
    )
    .await
    {
        Ok(out) => out,
        Err(e) => return vec![CheckResult::fail("exec-safety:validate_exit_nonzero", e)],
    };
    results.push(CheckResult::new(
        "exec-safety:validate_exit_nonzero",
        !output.success(),
        failure_detail(&output),
    ));

    let Some(report) = parse_json(&output) else {
        results.push(CheckResult::fail(
            "exec-safety:validate_json",
            "validate_package output is not JSON",
        ));
        return results;
    };
    let invalid = count(&report, "invalid");
    results.push(CheckResult::new(
        "exec-safety:invalid>=1",
        invalid >= 1,
        format!("invalid={}", invalid),
    ));
    results
}
