use super::{ActionsApi, ApiError, Endpoint, FileContent, RunPayload, WorkflowPayload};
use crate::model::{RunRecord, WorkflowMeta};
use crate::repository::Repository;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::{Duration, Instant};
use ureq::Agent;

const ACCEPT: &str = "application/vnd.github+json";
const API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = concat!("gh-effective-workflow/", env!("CARGO_PKG_VERSION"));

/// Connection settings for [`RestClient`].
#[derive(Debug, Clone)]
pub(crate) struct ApiConfig {
    /// API root, e.g. `https://api.github.com`.
    pub(crate) base_url: String,
    pub(crate) token: Option<String>,
    pub(crate) timeout: Duration,
}

/// Blocking client for the Actions REST API.
pub(crate) struct RestClient {
    agent: Agent,
    base_url: String,
    token: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl RestClient {
    pub(crate) fn new(config: &ApiConfig) -> Self {
        let agent_config = Agent::config_builder()
            .timeout_global(Some(config.timeout))
            .http_status_as_error(false)
            .build();
        Self {
            agent: Agent::new_with_config(agent_config),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        }
    }

    fn get_json<T: DeserializeOwned>(&self, endpoint: &Endpoint) -> Result<T, ApiError> {
        let url = format!("{}/{}", self.base_url, endpoint.path);
        let resource = endpoint.path.clone();

        let mut request = self
            .agent
            .get(&url)
            .header("Accept", ACCEPT)
            .header("X-GitHub-Api-Version", API_VERSION)
            .header("User-Agent", USER_AGENT);
        for (key, value) in &endpoint.query {
            request = request.query(*key, value);
        }
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Bearer {token}"));
        }

        let start = Instant::now();
        let mut response = request.call().map_err(|err| ApiError::Transport {
            resource: resource.clone(),
            message: err.to_string(),
        })?;
        let status = response.status().as_u16();
        tracing::debug!(
            resource = %resource,
            status,
            elapsed_ms = start.elapsed().as_millis(),
            "api request complete"
        );

        if status == 404 {
            return Err(ApiError::NotFound { resource });
        }
        if !(200..300).contains(&status) {
            let message = response
                .body_mut()
                .read_json::<ErrorBody>()
                .ok()
                .and_then(|body| body.message);
            return Err(ApiError::Status {
                status,
                resource,
                message,
            });
        }

        response
            .body_mut()
            .read_json::<T>()
            .map_err(|err| ApiError::Decode {
                resource,
                message: err.to_string(),
            })
    }
}

impl ActionsApi for RestClient {
    fn fetch_run(&self, repo: &Repository, run_id: &str) -> Result<RunRecord, ApiError> {
        let payload: RunPayload = self.get_json(&Endpoint::run(repo, run_id))?;
        Ok(payload.into())
    }

    fn fetch_workflow(
        &self,
        repo: &Repository,
        id_or_path: &str,
    ) -> Result<WorkflowMeta, ApiError> {
        let payload: WorkflowPayload = self.get_json(&Endpoint::workflow(repo, id_or_path))?;
        Ok(payload.into())
    }

    fn fetch_file_content(
        &self,
        repo: &Repository,
        path: &str,
        git_ref: Option<&str>,
    ) -> Result<FileContent, ApiError> {
        self.get_json(&Endpoint::content(repo, path, git_ref))
    }
}
