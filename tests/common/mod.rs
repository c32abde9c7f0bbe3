//! Shared test infrastructure for integration tests.
//!
//! Fixtures are replay directories: each API response is a JSON file at the
//! path of its REST endpoint, served by the binary's `--replay` transport.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

pub const REPO: &str = "octocat/Hello-World";

/// A replay directory populated with canned API responses.
pub struct ReplayFixture {
    dir: TempDir,
}

/// Output of one binary invocation.
#[derive(Debug)]
pub struct ViewResult {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl From<Output> for ViewResult {
    fn from(output: Output) -> Self {
        Self {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

impl Default for ReplayFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplayFixture {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create replay dir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    fn write(&self, rel: &str, body: &Value) {
        let path: PathBuf = self.root().join(rel);
        std::fs::create_dir_all(path.parent().expect("response has a parent dir"))
            .expect("create response dir");
        std::fs::write(&path, serde_json::to_vec_pretty(body).expect("serialize response"))
            .expect("write response");
    }

    /// Run metadata with `(path, sha)` referenced workflow declarations.
    pub fn run(&self, repo: &str, run_id: &str, workflow_id: u64, referenced: &[(&str, &str)]) {
        let referenced: Vec<Value> = referenced
            .iter()
            .map(|(path, sha)| json!({ "path": path, "sha": sha, "ref": "" }))
            .collect();
        self.write(
            &format!("repos/{repo}/actions/runs/{run_id}.json"),
            &json!({
                "id": run_id.parse::<u64>().unwrap_or_default(),
                "workflow_id": workflow_id,
                "head_branch": "main",
                "head_sha": "acb5820ced9479c074f688cc328bf03f341a511d",
                "referenced_workflows": referenced,
            }),
        );
    }

    /// Workflow metadata reachable by `id_or_path`.
    pub fn workflow(&self, repo: &str, id_or_path: &str, name: &str, path: &str) {
        self.write(
            &format!(
                "repos/{repo}/actions/workflows/{}.json",
                urlencoding::encode(id_or_path)
            ),
            &json!({ "name": name, "path": path, "state": "active" }),
        );
    }

    /// File content at `git_ref`, base64-encoded and line-wrapped like the API.
    pub fn content(&self, repo: &str, path: &str, git_ref: &str, yaml: &str) {
        let encoded = STANDARD.encode(yaml);
        let wrapped = encoded
            .as_bytes()
            .chunks(60)
            .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
            .collect::<Vec<_>>()
            .join("\n");
        self.write(
            &format!(
                "repos/{repo}/contents/{path}@{}.json",
                urlencoding::encode(git_ref)
            ),
            &json!({ "type": "file", "encoding": "base64", "content": wrapped }),
        );
    }

    /// Run `gh-effective-workflow view` against this fixture.
    pub fn view(&self, args: &[&str]) -> ViewResult {
        Command::new(env!("CARGO_BIN_EXE_gh-effective-workflow"))
            .arg("view")
            .args(args)
            .args(["--repo", REPO, "--color", "never"])
            .arg("--replay")
            .arg(self.root())
            .env_remove("RUST_LOG")
            .env_remove("GH_REPO")
            .env("NO_COLOR", "1")
            .output()
            .expect("run gh-effective-workflow")
            .into()
    }
}
