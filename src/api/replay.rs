use super::{ActionsApi, ApiError, Endpoint, FileContent, RunPayload, WorkflowPayload};
use crate::model::{RunRecord, WorkflowMeta};
use crate::repository::Repository;
use serde::de::DeserializeOwned;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Serves API responses captured as JSON files.
///
/// A response lives at `<root>/<endpoint path>[@<ref>].json`, where the ref is
/// percent-encoded. A missing file is reported as a 404.
#[derive(Debug, Clone)]
pub(crate) struct ReplayApi {
    root: PathBuf,
}

impl ReplayApi {
    pub(crate) fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub(crate) fn root(&self) -> &Path {
        &self.root
    }

    fn response_path(&self, endpoint: &Endpoint) -> PathBuf {
        let mut rel = endpoint.path.clone();
        if let Some(git_ref) = endpoint.git_ref() {
            rel.push('@');
            rel.push_str(&urlencoding::encode(git_ref));
        }
        rel.push_str(".json");
        self.root.join(rel)
    }

    fn read_json<T: DeserializeOwned>(&self, endpoint: &Endpoint) -> Result<T, ApiError> {
        let path = self.response_path(endpoint);
        let resource = endpoint.path.clone();
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "replay response missing");
                return Err(ApiError::NotFound { resource });
            }
            Err(err) => {
                return Err(ApiError::Transport {
                    resource,
                    message: format!("read {}: {err}", path.display()),
                })
            }
        };
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "replay response");
        serde_json::from_slice(&bytes).map_err(|err| ApiError::Decode {
            resource,
            message: err.to_string(),
        })
    }
}

impl ActionsApi for ReplayApi {
    fn fetch_run(&self, repo: &Repository, run_id: &str) -> Result<RunRecord, ApiError> {
        let payload: RunPayload = self.read_json(&Endpoint::run(repo, run_id))?;
        Ok(payload.into())
    }

    fn fetch_workflow(
        &self,
        repo: &Repository,
        id_or_path: &str,
    ) -> Result<WorkflowMeta, ApiError> {
        let payload: WorkflowPayload = self.read_json(&Endpoint::workflow(repo, id_or_path))?;
        Ok(payload.into())
    }

    fn fetch_file_content(
        &self,
        repo: &Repository,
        path: &str,
        git_ref: Option<&str>,
    ) -> Result<FileContent, ApiError> {
        self.read_json(&Endpoint::content(repo, path, git_ref))
    }
}
