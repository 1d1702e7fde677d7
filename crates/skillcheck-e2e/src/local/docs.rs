//! Documentation invariants that activation and plan clarification rely on.

use std::path::Path;

use skillcheck_core::CheckResult;

use super::{read_for_check, SKILL_DIR};

/// Hard constraints the evaluate stage must state verbatim.
pub const EVALUATE_REQUIRED: [&str; 3] = [
    "禁止在需求评估阶段扫描用户项目目录或读取用户项目代码文件",
    "禁止在需求评估阶段获取项目上下文",
    "仅基于用户输入进行评估",
];

const DEGRADED_OUTPUT_MARKERS: [&str; 2] = ["允许**降级输出**", "允许降级输出"];

/// Skill triggers, degraded output and the output rule.
pub fn activation(root: &Path) -> Vec<CheckResult> {
    let skill_dir = root.join(SKILL_DIR);
    let skill_md = match read_for_check(&skill_dir.join("SKILL.md"), "activate:skill-triggers") {
        Ok(text) => text,
        Err(failed) => return vec![failed],
    };
    let agents_md = match read_for_check(&root.join("AGENTS.md"), "activate:output-downgrade") {
        Ok(text) => text,
        Err(failed) => return vec![failed],
    };

    let triggers = skill_md.contains("/helloagents") && skill_md.contains("$helloagents");
    let downgrade = DEGRADED_OUTPUT_MARKERS.iter().any(|m| agents_md.contains(m));
    let rule_file = skill_dir.join("references/rules/output.md").is_file();
    let rule_linked = skill_md.contains("references/rules/output.md");

    vec![
        check(
            "activate:skill-triggers",
            triggers,
            "SKILL.md lacks /helloagents or $helloagents",
        ),
        check(
            "activate:output-downgrade",
            downgrade,
            "AGENTS.md does not declare degraded output",
        ),
        check("activate:output-rule-file", rule_file, "missing output.md"),
        check(
            "activate:skill-links-output-rule",
            rule_linked,
            "SKILL.md does not index output.md",
        ),
    ]
}

/// The evaluate stage forbids scanning the user's project.
pub fn plan_clarify(root: &Path) -> Vec<CheckResult> {
    let path = root.join(SKILL_DIR).join("references/stages/evaluate.md");
    let evaluate_md = match read_for_check(&path, "plan-clarify:evaluate-md") {
        Ok(text) => text,
        Err(failed) => return vec![failed],
    };
    EVALUATE_REQUIRED
        .iter()
        .map(|s| {
            check(
                &format!("plan-clarify:evaluate-has:{}", s),
                evaluate_md.contains(s),
                "missing hard-constraint text",
            )
        })
        .collect()
}

fn check(name: &str, ok: bool, failure: &str) -> CheckResult {
    if ok {
        CheckResult::pass(name)
    } else {
        CheckResult::fail(name, failure)
    }
}
