//! Lookups against the Actions REST API.
//!
//! Resolution only sees the [`ActionsApi`] trait. [`RestClient`] talks to a
//! live API; [`ReplayApi`] serves captured responses from disk using the same
//! endpoint layout.
mod replay;
mod rest;

pub(crate) use replay::ReplayApi;
pub(crate) use rest::{ApiConfig, RestClient};

use crate::model::{ReferencedWorkflowDeclaration, RunRecord, WorkflowMeta};
use crate::repository::Repository;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum ApiError {
    #[error("HTTP 404: Not Found ({resource})")]
    NotFound { resource: String },

    #[error("HTTP {status} ({resource}){}", message_suffix(.message))]
    Status {
        status: u16,
        resource: String,
        message: Option<String>,
    },

    #[error("request to {resource} failed: {message}")]
    Transport { resource: String, message: String },

    #[error("unexpected response from {resource}: {message}")]
    Decode { resource: String, message: String },
}

fn message_suffix(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(": {m}"))
        .unwrap_or_default()
}

/// The lookups resolution depends on.
pub(crate) trait ActionsApi {
    /// Run metadata, including the flat list of referenced workflows.
    fn fetch_run(&self, repo: &Repository, run_id: &str) -> Result<RunRecord, ApiError>;

    /// Workflow metadata by numeric ID or in-repo path.
    fn fetch_workflow(&self, repo: &Repository, id_or_path: &str)
        -> Result<WorkflowMeta, ApiError>;

    /// Encoded file content at `git_ref` (default branch when `None`).
    fn fetch_file_content(
        &self,
        repo: &Repository,
        path: &str,
        git_ref: Option<&str>,
    ) -> Result<FileContent, ApiError>;
}

/// A REST resource path plus its query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Endpoint {
    pub(crate) path: String,
    pub(crate) query: Vec<(&'static str, String)>,
}

impl Endpoint {
    pub(crate) fn run(repo: &Repository, run_id: &str) -> Self {
        Self {
            path: format!(
                "repos/{}/{}/actions/runs/{}",
                repo.owner(),
                repo.name(),
                urlencoding::encode(run_id)
            ),
            query: vec![("exclude_pull_requests", "true".to_string())],
        }
    }

    pub(crate) fn workflow(repo: &Repository, id_or_path: &str) -> Self {
        Self {
            path: format!(
                "repos/{}/{}/actions/workflows/{}",
                repo.owner(),
                repo.name(),
                urlencoding::encode(id_or_path)
            ),
            query: Vec::new(),
        }
    }

    pub(crate) fn content(repo: &Repository, path: &str, git_ref: Option<&str>) -> Self {
        Self {
            path: format!(
                "repos/{}/{}/contents/{}",
                repo.owner(),
                repo.name(),
                path.trim_start_matches('/')
            ),
            query: git_ref
                .filter(|r| !r.is_empty())
                .map(|r| vec![("ref", r.to_string())])
                .unwrap_or_default(),
        }
    }

    pub(crate) fn git_ref(&self) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| *key == "ref")
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RunPayload {
    workflow_id: u64,
    #[serde(default)]
    head_branch: Option<String>,
    #[serde(default)]
    head_sha: Option<String>,
    #[serde(default)]
    referenced_workflows: Option<Vec<ReferencedWorkflowDeclaration>>,
}

impl From<RunPayload> for RunRecord {
    fn from(payload: RunPayload) -> Self {
        RunRecord {
            workflow_id: payload.workflow_id.to_string(),
            head_branch: payload.head_branch.unwrap_or_default(),
            head_sha: payload.head_sha.unwrap_or_default(),
            referenced_workflows: payload.referenced_workflows.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WorkflowPayload {
    name: String,
    path: String,
}

impl From<WorkflowPayload> for WorkflowMeta {
    fn from(payload: WorkflowPayload) -> Self {
        WorkflowMeta {
            name: payload.name,
            path: payload.path,
        }
    }
}

/// File content as served by the contents API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub(crate) struct FileContent {
    /// `base64` for regular files; `none` when the file is too large to inline.
    #[serde(default)]
    pub(crate) encoding: Option<String>,
    #[serde(default)]
    pub(crate) content: String,
}

#[cfg(test)]
impl FileContent {
    pub(crate) fn base64(content: impl Into<String>) -> Self {
        Self {
            encoding: Some("base64".to_string()),
            content: content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::DEFAULT_HOST;

    fn repo() -> Repository {
        Repository::new(DEFAULT_HOST, "octocat", "Hello-World")
    }

    #[test]
    fn workflow_endpoint_escapes_paths() {
        let endpoint = Endpoint::workflow(&repo(), ".github/workflows/ci.yml");
        assert_eq!(
            endpoint.path,
            "repos/octocat/Hello-World/actions/workflows/.github%2Fworkflows%2Fci.yml"
        );
        let endpoint = Endpoint::workflow(&repo(), "161335");
        assert_eq!(endpoint.path, "repos/octocat/Hello-World/actions/workflows/161335");
    }

    #[test]
    fn content_endpoint_carries_ref() {
        let endpoint = Endpoint::content(&repo(), ".github/workflows/ci.yml", Some("main"));
        assert_eq!(
            endpoint.path,
            "repos/octocat/Hello-World/contents/.github/workflows/ci.yml"
        );
        assert_eq!(endpoint.git_ref(), Some("main"));
        assert_eq!(
            Endpoint::content(&repo(), "ci.yml", Some("")).git_ref(),
            None
        );
        assert_eq!(Endpoint::content(&repo(), "ci.yml", None).git_ref(), None);
    }

    #[test]
    fn file_content_keeps_encoding() {
        let content: FileContent =
            serde_json::from_str(r#"{"type": "file", "encoding": "none", "content": ""}"#)
                .unwrap();
        assert_eq!(content.encoding.as_deref(), Some("none"));
        assert!(content.content.is_empty());
    }

    #[test]
    fn run_payload_tolerates_nulls() {
        let payload: RunPayload = serde_json::from_str(
            r#"{"workflow_id": 7, "head_branch": null, "head_sha": "abc", "referenced_workflows": null}"#,
        )
        .unwrap();
        let run = RunRecord::from(payload);
        assert_eq!(run.workflow_id, "7");
        assert_eq!(run.head_branch, "");
        assert_eq!(run.head_sha, "abc");
        assert!(run.referenced_workflows.is_empty());
    }

    #[test]
    fn run_payload_reads_referenced_workflows() {
        let payload: RunPayload = serde_json::from_str(
            r#"{
                "id": 30433642,
                "workflow_id": 159038,
                "head_branch": "master",
                "head_sha": "acb5820ced9479c074f688cc328bf03f341a511d",
                "referenced_workflows": [
                    {
                        "path": "octocat/Hello-World/.github/workflows/deploy.yml@main",
                        "sha": "86e8bc9ecf7d38b1ed2d2cfb8eb87ba9b35b01db",
                        "ref": "refs/heads/main"
                    }
                ]
            }"#,
        )
        .unwrap();
        let run = RunRecord::from(payload);
        assert_eq!(run.referenced_workflows.len(), 1);
        assert_eq!(run.referenced_workflows[0].git_ref, "refs/heads/main");
    }
}
