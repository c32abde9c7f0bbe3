//! End-to-end tests of `view` over replayed API responses.

mod common;

use common::{ReplayFixture, REPO};
use serde_json::Value;

const CI_YAML: &str = "name: CI\non: push\njobs:\n  deploy:\n    uses: octocat/Hello-World/.github/workflows/deploy.yml@v1\n  test:\n    runs-on: ubuntu-latest\n    steps:\n      - run: make test\n";
const DEPLOY_YAML: &str = "name: Deploy\non: workflow_call\njobs:\n  notify:\n    uses: octocat/Hello-World/.github/workflows/notify.yml@main\n";
const NOTIFY_YAML: &str = "name: Notify\non: workflow_call\njobs:\n  ping:\n    runs-on: ubuntu-latest\n";
const DEPLOY_REF: &str = "octocat/Hello-World/.github/workflows/deploy.yml@v1";
const NOTIFY_REF: &str = "octocat/Hello-World/.github/workflows/notify.yml@main";

fn hello_world() -> ReplayFixture {
    let fixture = ReplayFixture::new();
    fixture.run(
        REPO,
        "12345",
        161335,
        &[(DEPLOY_REF, "86e8bc9e"), (NOTIFY_REF, "5c3f1a2b")],
    );
    fixture.workflow(REPO, "161335", "CI", ".github/workflows/ci.yml");
    fixture.workflow(
        REPO,
        ".github/workflows/deploy.yml",
        "Deploy",
        ".github/workflows/deploy.yml",
    );
    fixture.workflow(
        REPO,
        ".github/workflows/notify.yml",
        "Notify",
        ".github/workflows/notify.yml",
    );
    fixture.content(REPO, ".github/workflows/ci.yml", "main", CI_YAML);
    fixture.content(REPO, ".github/workflows/deploy.yml", "v1", DEPLOY_YAML);
    fixture.content(REPO, ".github/workflows/notify.yml", "main", NOTIFY_YAML);
    fixture
}

#[test]
fn json_output_indexes_call_sites() {
    let fixture = hello_world();
    let result = fixture.view(&["12345", "--json"]);
    assert!(result.success, "view failed: {}", result.stderr);

    let value: Value = serde_json::from_str(&result.stdout).expect("stdout is JSON");
    assert_eq!(value["workflow"]["name"], "CI");
    assert_eq!(value["workflow"]["ref_path"], "");
    assert_eq!(
        value["workflow"]["sha"],
        "acb5820ced9479c074f688cc328bf03f341a511d"
    );
    assert_eq!(value["workflow"]["yaml"], CI_YAML);

    let reusable = value["reusable_workflows"].as_array().expect("array");
    assert_eq!(reusable.len(), 2);
    assert_eq!(reusable[0]["filename"], "deploy.yml");
    assert_eq!(reusable[0]["ref"], "v1");
    assert_eq!(reusable[0]["sha"], "86e8bc9e");
    assert_eq!(reusable[1]["filename"], "notify.yml");

    let deploy_refs = &value["references"][DEPLOY_REF];
    assert_eq!(deploy_refs.as_array().map(Vec::len), Some(1));
    assert_eq!(deploy_refs[0]["source_filename"], "ci.yml");
    assert_eq!(
        deploy_refs[0]["source_line"],
        "    uses: octocat/Hello-World/.github/workflows/deploy.yml@v1"
    );
    assert_eq!(deploy_refs[0]["source_line_number"], 5);

    let notify_refs = &reusable[1]["references"];
    assert_eq!(notify_refs[0]["source_filename"], "deploy.yml");
    assert_eq!(notify_refs[0]["source_line_number"], 5);
}

#[test]
fn terminal_output_shows_each_workflow_with_references() {
    let fixture = hello_world();
    let result = fixture.view(&["12345"]);
    assert!(result.success, "view failed: {}", result.stderr);

    let out = &result.stdout;
    assert!(out.starts_with("Workflow file for this run\n\nCI - ci.yml@main (acb5820ced9479c074f688cc328bf03f341a511d)\n"));
    assert_eq!(out.matches("Called reusable workflow file").count(), 2);
    assert!(out.contains("Deploy - deploy.yml@v1 (86e8bc9e)\n\n1 reference\n"));
    assert!(out.contains(
        "ci.yml     5  uses: octocat/Hello-World/.github/workflows/deploy.yml@v1\n"
    ));
    assert!(out.contains(
        "deploy.yml     5  uses: octocat/Hello-World/.github/workflows/notify.yml@main\n"
    ));
    assert!(out.contains(CI_YAML));
    assert!(!out.contains("\u{1b}["));
}

#[test]
fn missing_file_at_ref_suggests_another_revision() {
    let fixture = hello_world();
    let result = fixture.view(&["12345", "--ref", "feature/gone"]);
    assert!(!result.success);
    assert!(result.stdout.is_empty(), "unexpected output: {}", result.stdout);
    assert!(result.stderr.contains("ci.yml"), "{}", result.stderr);
    assert!(result.stderr.contains("feature/gone"), "{}", result.stderr);
    assert!(
        result.stderr.contains("try a different one with --ref"),
        "{}",
        result.stderr
    );
}

#[test]
fn non_string_uses_fails_without_partial_output() {
    let fixture = hello_world();
    fixture.content(
        REPO,
        ".github/workflows/notify.yml",
        "main",
        "jobs:\n  broken:\n    uses:\n      workflow: x.yml\n",
    );
    let result = fixture.view(&["12345"]);
    assert!(!result.success);
    assert!(result.stdout.is_empty(), "unexpected output: {}", result.stdout);
    assert!(
        result.stderr.contains("unexpected node type for uses"),
        "{}",
        result.stderr
    );
}

#[test]
fn malformed_referenced_workflow_fails() {
    let fixture = hello_world();
    fixture.run(REPO, "777", 161335, &[("octocat/Hello-World@main", "")]);
    let result = fixture.view(&["777"]);
    assert!(!result.success);
    assert!(
        result.stderr.contains("malformed workflow reference"),
        "{}",
        result.stderr
    );
}

#[test]
fn unknown_run_fails() {
    let fixture = hello_world();
    let result = fixture.view(&["999"]);
    assert!(!result.success);
    assert!(result.stderr.contains("failed to get run 999"), "{}", result.stderr);
}

#[test]
fn run_id_is_required() {
    let fixture = hello_world();
    let result = fixture.view(&[]);
    assert!(!result.success);
    assert!(
        result.stderr.contains("run ID required"),
        "{}",
        result.stderr
    );
}
