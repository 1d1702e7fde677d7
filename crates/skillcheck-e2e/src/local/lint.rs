//! Content lints over the skill's Markdown and metadata files.

use std::path::Path;

use regex::Regex;
use skillcheck_core::CheckResult;

use super::{read_for_check, SKILL_DIR};

/// Offending lines shown in a failing `lint:no-bare-references` detail.
const MAX_BARE_REFERENCES: usize = 20;

const BARE_REFERENCE: &str = r"(?i)references/(functions|stages|rules|services)/[a-z0-9_-]+\.md";
const FRONT_MATTER: &str = r"(?s)\A---[ \t]*\r?\n(.*?)\r?\n---[ \t]*\r?\n";
const MD_DESCRIPTION: &str = r"(?m)^description:[ \t]*(.+?)[ \t]*$";
const TOML_SHORT_DESCRIPTION: &str = r#"(?m)^short_description[ \t]*=[ \t]*"([^"]*)"[ \t]*$"#;
const AGENTS_WRAPPER: &str = r"```[^\n]*\n(【HelloAGENTS】- \{状态描述\}[\s\S]*?)\n```";
const SKILL_WRAPPER_FALLBACK: &str = r"<!--\s*OUTPUT_WRAPPER_FALLBACK:[^>]*-->\s*```[^\n]*\n([\s\S]*?)\n```";

fn compile(pattern: &str) -> Result<Regex, CheckResult> {
    Regex::new(pattern).map_err(|e| CheckResult::fail("lint:regex", e.to_string()))
}

/// Outside fenced code blocks, reference docs may only name other reference
/// docs as the target of an explicit `[..](..)` link.
pub fn no_bare_references(root: &Path) -> Vec<CheckResult> {
    const NAME: &str = "lint:no-bare-references";
    let pattern = match compile(BARE_REFERENCE) {
        Ok(re) => re,
        Err(failed) => return vec![failed],
    };
    let refs_dir = root.join(SKILL_DIR).join("references");

    let mut files: Vec<_> = walkdir::WalkDir::new(&refs_dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().map(|x| x == "md").unwrap_or(false))
        .map(|e| e.into_path())
        .collect();
    files.sort();

    let mut bad = Vec::new();
    for path in files {
        let text = match read_for_check(&path, NAME) {
            Ok(text) => text,
            Err(failed) => return vec![failed],
        };
        let rel = path.strip_prefix(root).unwrap_or(&path).display().to_string();
        bad.extend(
            bare_references(&text, &pattern)
                .into_iter()
                .map(|(line, found)| format!("{}:{}: {}", rel, line, found)),
        );
    }

    let detail = bad
        .iter()
        .take(MAX_BARE_REFERENCES)
        .cloned()
        .collect::<Vec<_>>()
        .join("\n");
    vec![CheckResult::new(NAME, bad.is_empty(), detail)]
}

/// `(line number, match)` for every bare reference outside code fences.
fn bare_references(text: &str, pattern: &Regex) -> Vec<(usize, String)> {
    let mut found = Vec::new();
    let mut in_fence = false;
    for (idx, line) in text.lines().enumerate() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        for m in pattern.find_iter(line) {
            let before = line[..m.start()].chars().next_back();
            let is_link_target = before == Some('[') && line[m.end()..].starts_with("](");
            if !is_link_target {
                found.push((idx + 1, m.as_str().to_string()));
            }
        }
    }
    found
}

/// `description` in the SKILL.md front matter equals `short_description` in SKILL.toml.
pub fn skill_metadata_consistency(root: &Path) -> Vec<CheckResult> {
    const PRESENT: &str = "lint:skill-metadata:present";
    let skill_dir = root.join(SKILL_DIR);
    let skill_md = match read_for_check(&skill_dir.join("SKILL.md"), PRESENT) {
        Ok(text) => text,
        Err(failed) => return vec![failed],
    };
    let skill_toml = match read_for_check(&skill_dir.join("SKILL.toml"), PRESENT) {
        Ok(text) => text,
        Err(failed) => return vec![failed],
    };

    let (front_matter, md_desc, toml_desc) = match (
        compile(FRONT_MATTER),
        compile(MD_DESCRIPTION),
        compile(TOML_SHORT_DESCRIPTION),
    ) {
        (Ok(a), Ok(b), Ok(c)) => (a, b, c),
        (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => return vec![e],
    };

    let fm = front_matter
        .captures(&skill_md)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or("");
    let md = md_desc
        .captures(fm)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().trim_matches('"').trim_matches('\'').to_string())
        .unwrap_or_default();
    let toml = toml_desc
        .captures(&skill_toml)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default();

    if md.is_empty() || toml.is_empty() {
        let mut missing = Vec::new();
        if md.is_empty() {
            missing.push("SKILL.md:description");
        }
        if toml.is_empty() {
            missing.push("SKILL.toml:short_description");
        }
        return vec![CheckResult::fail(
            PRESENT,
            format!("missing fields: {}", missing.join(", ")),
        )];
    }

    let detail = if md == toml {
        String::new()
    } else {
        format!(
            "mismatch: SKILL.md(description)={:?} vs SKILL.toml(short_description)={:?}",
            md, toml
        )
    };
    vec![CheckResult::new(
        "lint:skill-metadata:short_description_matches_frontmatter",
        md == toml,
        detail,
    )]
}

/// The output wrapper block in AGENTS.md equals the fallback copy in SKILL.md.
pub fn output_wrapper_consistency(root: &Path) -> Vec<CheckResult> {
    const AGENTS_PRESENT: &str = "lint:output-wrapper:agents_present";
    const FALLBACK_PRESENT: &str = "lint:output-wrapper:fallback_present";

    let agents_md = match read_for_check(&root.join("AGENTS.md"), AGENTS_PRESENT) {
        Ok(text) => text,
        Err(failed) => return vec![failed],
    };
    let skill_md = match read_for_check(&root.join(SKILL_DIR).join("SKILL.md"), FALLBACK_PRESENT) {
        Ok(text) => text,
        Err(failed) => return vec![failed],
    };
    let (agents_re, skill_re) = match (compile(AGENTS_WRAPPER), compile(SKILL_WRAPPER_FALLBACK)) {
        (Ok(a), Ok(b)) => (a, b),
        (Err(e), _) | (_, Err(e)) => return vec![e],
    };

    let Some(agents_block) = agents_re.captures(&agents_md).and_then(|c| c.get(1)) else {
        return vec![CheckResult::fail(
            AGENTS_PRESENT,
            "AGENTS.md has no output wrapper code block",
        )];
    };
    let Some(skill_block) = skill_re.captures(&skill_md).and_then(|c| c.get(1)) else {
        return vec![CheckResult::fail(
            FALLBACK_PRESENT,
            "SKILL.md has no OUTPUT_WRAPPER_FALLBACK code block",
        )];
    };

    let same = normalize_block(agents_block.as_str()) == normalize_block(skill_block.as_str());
    vec![CheckResult::new(
        "lint:output-wrapper:fallback_matches_agents",
        same,
        if same {
            ""
        } else {
            "SKILL.md fallback output wrapper differs from AGENTS.md"
        },
    )]
}

fn normalize_block(block: &str) -> String {
    block
        .trim()
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn skill_root() -> tempfile::TempDir {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join(SKILL_DIR).join("references/stages")).unwrap();
        root
    }

    #[test]
    fn test_bare_reference_detection() {
        let re = Regex::new(BARE_REFERENCE).unwrap();
        let text = "\
See references/stages/evaluate.md for details.
Linked: [references/rules/output.md](../rules/output.md)
```
references/stages/develop.md inside fence
```
Upper: REFERENCES/Services/kb.md
";
        let found = bare_references(text, &re);
        assert_eq!(
            found,
            vec![
                (1, "references/stages/evaluate.md".to_string()),
                (6, "REFERENCES/Services/kb.md".to_string()),
            ]
        );
    }

    #[test]
    fn test_no_bare_references_reports_paths() {
        let root = skill_root();
        let refs = root.path().join(SKILL_DIR).join("references/stages");
        fs::write(refs.join("ok.md"), "[references/rules/output.md](x)\n").unwrap();
        fs::write(refs.join("bad.md"), "line one\nuse references/rules/output.md\n").unwrap();

        let checks = no_bare_references(root.path());
        assert_eq!(checks.len(), 1);
        assert!(!checks[0].ok);
        assert!(checks[0]
            .detail
            .ends_with("references/stages/bad.md:2: references/rules/output.md"));
    }

    #[test]
    fn test_skill_metadata_match_and_mismatch() {
        let root = skill_root();
        let dir = root.path().join(SKILL_DIR);
        fs::write(
            dir.join("SKILL.md"),
            "---\nname: helloagents\ndescription: \"Structured workflow\"\n---\n# body\n",
        )
        .unwrap();
        fs::write(dir.join("SKILL.toml"), "short_description = \"Structured workflow\"\n").unwrap();
        let checks = skill_metadata_consistency(root.path());
        assert_eq!(checks.len(), 1);
        assert!(checks[0].ok, "{:?}", checks);

        fs::write(dir.join("SKILL.toml"), "short_description = \"Other\"\n").unwrap();
        let checks = skill_metadata_consistency(root.path());
        assert!(!checks[0].ok);
        assert!(checks[0].detail.contains("Other"));
    }

    #[test]
    fn test_skill_metadata_missing_fields() {
        let root = skill_root();
        let dir = root.path().join(SKILL_DIR);
        fs::write(dir.join("SKILL.md"), "# no front matter\n").unwrap();
        fs::write(dir.join("SKILL.toml"), "name = \"x\"\n").unwrap();
        let checks = skill_metadata_consistency(root.path());
        assert_eq!(checks[0].name, "lint:skill-metadata:present");
        assert!(checks[0].detail.contains("SKILL.md:description"));
        assert!(checks[0].detail.contains("SKILL.toml:short_description"));
    }

    #[test]
    fn test_output_wrapper_consistency() {
        let root = skill_root();
        let wrapper = "【HelloAGENTS】- {状态描述}\n\n{内容}   \n";
        fs::write(
            root.path().join("AGENTS.md"),
            format!("# G3\n```text\n{}\n```\n", wrapper),
        )
        .unwrap();
        fs::write(
            root.path().join(SKILL_DIR).join("SKILL.md"),
            format!(
                "<!-- OUTPUT_WRAPPER_FALLBACK: keep in sync -->\n```text\n{}\n```\n",
                wrapper.replace("   \n", "\n")
            ),
        )
        .unwrap();
        let checks = output_wrapper_consistency(root.path());
        assert_eq!(checks.len(), 1);
        assert!(checks[0].ok, "{:?}", checks);
    }

    #[test]
    fn test_output_wrapper_missing_in_agents() {
        let root = skill_root();
        fs::write(root.path().join("AGENTS.md"), "# nothing\n").unwrap();
        fs::write(root.path().join(SKILL_DIR).join("SKILL.md"), "# skill\n").unwrap();
        let checks = output_wrapper_consistency(root.path());
        assert_eq!(checks[0].name, "lint:output-wrapper:agents_present");
        assert!(!checks[0].ok);
    }
}
