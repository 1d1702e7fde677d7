//! Integration tests for plan-package seeding with a shell stand-in for the
//! package-creation script.
#![cfg(unix)]

use std::fs;

use skillcheck_core::PlanPackageSpec;
use skillcheck_e2e::seed::{seed_plan_packages, CREATE_PACKAGE_SCRIPT};
use skillcheck_e2e::{run_process, ProcessSpec, ScriptInterpreter, SeedError};

const CREATE: &str = r##"feature="$1"
ws="$3"
kind="$5"
rel="helloagents/plan/202501010000_$feature"
mkdir -p "$ws/$rel"
echo "# proposal ($kind)" > "$ws/$rel/proposal.md"
echo '# tasks' > "$ws/$rel/tasks.md"
printf '{"success":true,"context":{"package_path":"%s"}}\n' "$rel"
"##;

const VALIDATE: &str = r#"proj="$2"
total=0
invalid=0
for d in "$proj"/helloagents/plan/*/; do
  total=$((total+1))
  if [ ! -f "$d/proposal.md" ] || [ ! -f "$d/tasks.md" ]; then invalid=$((invalid+1)); fi
done
printf '{"total":%d,"invalid":%d}\n' "$total" "$invalid"
[ "$invalid" -eq 0 ]
"#;

fn workspace(script: &str) -> tempfile::TempDir {
    let ws = tempfile::tempdir().unwrap();
    let path = ws.path().join(CREATE_PACKAGE_SCRIPT);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, script).unwrap();
    ws
}

fn spec(feature: &str, variant: Option<&str>) -> PlanPackageSpec {
    PlanPackageSpec {
        feature: feature.to_string(),
        variant: variant.unwrap_or_default().to_string(),
        ..PlanPackageSpec::default()
    }
}

/// Test: every fixture yields a package, degraded to its variant
#[tokio::test]
async fn test_seed_variants() {
    let ws = workspace(CREATE);
    let specs = vec![
        spec("login", None),
        spec("search", Some("missing_tasks")),
        spec("cleanup", Some("risky")),
    ];

    let created = seed_plan_packages(ws.path(), &specs, &ScriptInterpreter::plain("sh"))
        .await
        .expect("seeding failed");
    assert_eq!(created.len(), 3);
    assert!(created.iter().all(|p| p.starts_with(ws.path())));

    let login = &created[0];
    assert!(login.join("tasks.md").is_file());
    let proposal = fs::read_to_string(login.join("proposal.md")).unwrap();
    assert!(proposal.contains("implementation"), "default package type is passed");

    assert!(!created[1].join("tasks.md").exists());
    assert!(created[1].join("proposal.md").is_file());

    let tasks = fs::read_to_string(created[2].join("tasks.md")).unwrap();
    assert!(tasks.contains("rm -rf /tmp/helloagents-e2e-demo"));
}

/// Test: a failing script stops seeding with its stderr
#[tokio::test]
async fn test_script_failure_is_reported() {
    let ws = workspace("echo 'no python here' >&2\nexit 2\n");
    let err = seed_plan_packages(ws.path(), &[spec("login", None)], &ScriptInterpreter::plain("sh"))
        .await
        .unwrap_err();
    match err {
        SeedError::Collaborator { feature, stderr, .. } => {
            assert_eq!(feature, "login");
            assert_eq!(stderr, "no python here");
        }
        other => panic!("unexpected error: {other}"),
    }
}

/// Test: unknown variants and empty features are rejected before running
#[tokio::test]
async fn test_invalid_specs_rejected() {
    let ws = workspace(CREATE);
    let interpreter = ScriptInterpreter::plain("sh");

    let err = seed_plan_packages(ws.path(), &[spec("", None)], &interpreter)
        .await
        .unwrap_err();
    assert!(matches!(err, SeedError::EmptyFeature));

    let err = seed_plan_packages(ws.path(), &[spec("x", Some("half_done"))], &interpreter)
        .await
        .unwrap_err();
    assert!(matches!(err, SeedError::Variant(_)));
    assert!(!ws.path().join("helloagents").exists());
}

/// Test: a package seeded without tasks fails validation in that workspace
#[tokio::test]
async fn test_missing_tasks_fails_validation() {
    let ws = workspace(CREATE);
    let validate = ws.path().join("validate_package.sh");
    fs::write(&validate, VALIDATE).unwrap();
    let interpreter = ScriptInterpreter::plain("sh");
    let argv = |path: &std::path::Path| {
        vec![
            "sh".to_string(),
            validate.to_string_lossy().into_owned(),
            "--path".to_string(),
            path.to_string_lossy().into_owned(),
        ]
    };

    seed_plan_packages(ws.path(), &[spec("login", None)], &interpreter)
        .await
        .expect("seeding failed");
    let clean = run_process(&ProcessSpec::new(argv(ws.path())).cwd(ws.path()))
        .await
        .expect("validate failed to run");
    assert!(clean.success(), "complete package should validate: {}", clean.stdout);

    seed_plan_packages(ws.path(), &[spec("search", Some("missing_tasks"))], &interpreter)
        .await
        .expect("seeding failed");
    let output = run_process(&ProcessSpec::new(argv(ws.path())).cwd(ws.path()))
        .await
        .expect("validate failed to run");
    assert!(!output.success());

    let report: serde_json::Value = serde_json::from_str(output.stdout.trim()).unwrap();
    assert_eq!(report["total"], 2);
    assert!(report["invalid"].as_u64().unwrap() >= 1);
}
