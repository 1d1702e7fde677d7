//! Deterministic local checks over the repository's files and scaffolding
//! scripts. No agent is involved.

pub mod docs;
pub mod lint;
pub mod schema;
pub mod scripts;

use std::path::Path;

use skillcheck_core::CheckResult;

use crate::seed::ScriptInterpreter;

/// Skill directory the checks look at, relative to the repository root.
pub const SKILL_DIR: &str = "skills/helloagents";

/// A group of local checks, selectable on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckGroup {
    Schema,
    Lint,
    Docs,
    Scripts,
}

impl CheckGroup {
    pub const ALL: [CheckGroup; 4] = [
        CheckGroup::Schema,
        CheckGroup::Lint,
        CheckGroup::Docs,
        CheckGroup::Scripts,
    ];
}

/// Run the selected groups in a fixed order: schema, lint, docs, scripts.
pub async fn run_local_checks(
    root: &Path,
    groups: &[CheckGroup],
    pattern: &str,
    interpreter: &ScriptInterpreter,
) -> Vec<CheckResult> {
    let mut checks = Vec::new();
    for group in CheckGroup::ALL {
        if !groups.contains(&group) {
            continue;
        }
        let before = checks.len();
        match group {
            CheckGroup::Schema => checks.extend(schema::check_cases(root, pattern)),
            CheckGroup::Lint => {
                checks.extend(lint::no_bare_references(root));
                checks.extend(lint::skill_metadata_consistency(root));
                checks.extend(lint::output_wrapper_consistency(root));
            }
            CheckGroup::Docs => {
                checks.extend(docs::activation(root));
                checks.extend(docs::plan_clarify(root));
            }
            CheckGroup::Scripts => {
                checks.extend(scripts::create_package_smoke(root, interpreter).await);
                checks.extend(scripts::init_upgrade_smoke(root, interpreter).await);
                checks.extend(scripts::incomplete_package_detected(root, interpreter).await);
            }
        }
        tracing::debug!(group = ?group, checks = checks.len() - before, "local check group done");
    }
    checks
}

/// Read a file for a check; a read failure becomes the failing check `name`.
pub(crate) fn read_for_check(path: &Path, name: &str) -> Result<String, CheckResult> {
    std::fs::read_to_string(path)
        .map_err(|e| CheckResult::fail(name, format!("cannot read {}: {}", path.display(), e)))
}
