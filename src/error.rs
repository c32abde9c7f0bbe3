//! Failures raised while resolving an effective workflow.
//!
//! Every variant carries the coordinates needed to report it; nothing is
//! retried and no partial result survives an error.
use crate::api::ApiError;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum ResolveError {
    #[error("malformed workflow reference {reference:?}: {reason}")]
    MalformedReference {
        reference: String,
        reason: &'static str,
    },

    #[error("failed to get run {run_id} in {repository}")]
    RunLookupFailed {
        repository: String,
        run_id: String,
        #[source]
        source: ApiError,
    },

    #[error("{}", resolution_message(.repository, .workflow, .git_ref, .stage, .top_level, .source))]
    WorkflowResolutionFailed {
        repository: String,
        /// Workflow ID or in-repo path that was looked up.
        workflow: String,
        git_ref: Option<String>,
        stage: LookupStage,
        /// The run's own workflow, whose revision `--ref` can change.
        top_level: bool,
        #[source]
        source: ApiError,
    },

    #[error("failed to decode content of {path} in {repository}: {reason}")]
    ContentDecodeFailed {
        repository: String,
        path: String,
        reason: String,
    },

    #[error("unexpected node type for uses in job {job:?} of {filename} (line {line}): {kind}")]
    UnexpectedNodeType {
        filename: String,
        job: String,
        line: usize,
        kind: NodeKind,
    },

    #[error("failed to parse {filename}{}: {message}", line_suffix(.line))]
    InvalidDocument {
        filename: String,
        line: Option<usize>,
        message: String,
    },
}

impl ResolveError {
    /// Mark a workflow resolution failure as concerning the run's top-level workflow.
    pub(crate) fn at_top_level(self) -> Self {
        match self {
            ResolveError::WorkflowResolutionFailed {
                repository,
                workflow,
                git_ref,
                stage,
                source,
                ..
            } => ResolveError::WorkflowResolutionFailed {
                repository,
                workflow,
                git_ref,
                stage,
                top_level: true,
                source,
            },
            other => other,
        }
    }
}

/// Which lookup of a workflow failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LookupStage {
    Metadata,
    Content,
}

/// Shape of a `uses` value that is not a plain string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum NodeKind {
    Mapping,
    Sequence,
    Alias,
    /// A scalar that resolves to a non-string tag, e.g. `!!int`.
    Scalar(String),
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Mapping => f.write_str("mapping"),
            NodeKind::Sequence => f.write_str("sequence"),
            NodeKind::Alias => f.write_str("alias"),
            NodeKind::Scalar(tag) => write!(f, "scalar ({tag})"),
        }
    }
}

fn resolution_message(
    repository: &str,
    workflow: &str,
    git_ref: &Option<String>,
    stage: &LookupStage,
    top_level: &bool,
    source: &ApiError,
) -> String {
    let at = git_ref
        .as_deref()
        .map(|r| format!("@{r}"))
        .unwrap_or_default();
    match (stage, source) {
        (LookupStage::Content, ApiError::NotFound { .. }) => match git_ref {
            Some(r) if *top_level => format!(
                "could not find workflow file {workflow} in {repository} at {r}; \
                 the file may not exist on that revision, try a different one with --ref"
            ),
            Some(r) => format!(
                "could not find workflow file {workflow} in {repository} at {r}; \
                 the file may not exist on that revision"
            ),
            None => format!("could not find workflow file {workflow} in {repository}"),
        },
        (LookupStage::Content, _) => {
            format!("failed to get workflow content {repository}/{workflow}{at}")
        }
        (LookupStage::Metadata, _) => format!("failed to get workflow {workflow} in {repository}"),
    }
}

fn line_suffix(line: &Option<usize>) -> String {
    line.map(|l| format!(" (line {l})")).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_content_suggests_another_revision() {
        let err = ResolveError::WorkflowResolutionFailed {
            repository: "octocat/Hello-World".to_string(),
            workflow: ".github/workflows/ci.yml".to_string(),
            git_ref: Some("feature".to_string()),
            stage: LookupStage::Content,
            top_level: true,
            source: ApiError::NotFound {
                resource: "repos/octocat/Hello-World/contents/.github/workflows/ci.yml"
                    .to_string(),
            },
        };
        let message = err.to_string();
        assert!(message.contains(".github/workflows/ci.yml"), "{message}");
        assert!(message.contains("at feature"), "{message}");
        assert!(message.contains("try a different one with --ref"), "{message}");
    }

    #[test]
    fn source_error_is_not_repeated_in_message() {
        use std::error::Error as _;

        let err = ResolveError::RunLookupFailed {
            repository: "octocat/Hello-World".to_string(),
            run_id: "42".to_string(),
            source: ApiError::Status {
                status: 502,
                resource: "repos/octocat/Hello-World/actions/runs/42".to_string(),
                message: Some("Bad Gateway".to_string()),
            },
        };
        assert_eq!(err.to_string(), "failed to get run 42 in octocat/Hello-World");
        let source = err.source().map(ToString::to_string).unwrap_or_default();
        assert!(source.contains("Bad Gateway"), "{source}");

        let err = ResolveError::WorkflowResolutionFailed {
            repository: "octocat/Hello-World".to_string(),
            workflow: "161335".to_string(),
            git_ref: None,
            stage: LookupStage::Metadata,
            top_level: true,
            source: ApiError::Transport {
                resource: "repos/octocat/Hello-World/actions/workflows/161335".to_string(),
                message: "timed out".to_string(),
            },
        };
        assert!(!err.to_string().contains("timed out"), "{err}");
    }

    #[test]
    fn missing_content_without_revision_has_no_hint() {
        let err = ResolveError::WorkflowResolutionFailed {
            repository: "octocat/Hello-World".to_string(),
            workflow: "ci.yml".to_string(),
            git_ref: None,
            stage: LookupStage::Content,
            top_level: true,
            source: ApiError::NotFound {
                resource: "ci.yml".to_string(),
            },
        };
        let message = err.to_string();
        assert!(message.contains("ci.yml"));
        assert!(!message.contains("different"));
    }

    #[test]
    fn node_kind_names_scalar_tag() {
        assert_eq!(
            NodeKind::Scalar("!!int".to_string()).to_string(),
            "scalar (!!int)"
        );
        assert_eq!(NodeKind::Mapping.to_string(), "mapping");
    }
}
