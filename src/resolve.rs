//! Effective-workflow resolution for a run.
//!
//! Lookups happen one at a time: the run, the top-level workflow, then each
//! declared reusable workflow in order. Any failure aborts the whole pass.
use crate::aggregate::aggregate_references;
use crate::api::{ActionsApi, FileContent};
use crate::error::{LookupStage, ResolveError};
use crate::invocation::{parse_invocation, InvocationPath};
use crate::model::{EffectiveWorkflow, Workflow};
use crate::repository::Repository;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Caller overrides for a resolution pass.
#[derive(Debug, Clone, Default)]
pub(crate) struct ResolveOptions {
    /// Revision to fetch the top-level workflow at instead of the run's head branch.
    pub(crate) git_ref: Option<String>,
}

/// Resolve the top-level workflow of `run_id`, every reusable workflow the run
/// declares, and the index of their call sites.
pub(crate) fn resolve_effective_workflow(
    api: &dyn ActionsApi,
    repo: &Repository,
    run_id: &str,
    options: &ResolveOptions,
) -> Result<EffectiveWorkflow, ResolveError> {
    let run = api
        .fetch_run(repo, run_id)
        .map_err(|source| ResolveError::RunLookupFailed {
            repository: repo.to_string(),
            run_id: run_id.to_string(),
            source,
        })?;
    tracing::info!(
        run_id,
        workflow_id = %run.workflow_id,
        head_branch = %run.head_branch,
        referenced = run.referenced_workflows.len(),
        "fetched run"
    );

    // Parse every invocation before fetching anything so a bad entry fails fast.
    let invocations = run
        .referenced_workflows
        .iter()
        .map(|declaration| parse_invocation(&declaration.path))
        .collect::<Result<Vec<InvocationPath>, _>>()?;

    let (git_ref, sha) = match options.git_ref.as_deref().filter(|r| !r.is_empty()) {
        Some(git_ref) => (git_ref.to_string(), String::new()),
        None => (run.head_branch.clone(), run.head_sha.clone()),
    };
    let top = resolve_workflow(api, repo, &run.workflow_id, &git_ref)
        .map_err(ResolveError::at_top_level)?;
    let workflow = Workflow { sha, ..top };

    let mut reusable_workflows = Vec::with_capacity(invocations.len());
    for (declaration, invocation) in run.referenced_workflows.iter().zip(&invocations) {
        let target = repo.sibling(&invocation.owner, &invocation.repo);
        let resolved = resolve_workflow(api, &target, &invocation.path, &invocation.git_ref)?;
        reusable_workflows.push(Workflow {
            ref_path: declaration.path.clone(),
            sha: declaration.sha.clone(),
            ..resolved
        });
    }

    let references = aggregate_references(
        std::iter::once(&workflow).chain(&reusable_workflows),
        &run.referenced_workflows,
    )?;

    Ok(EffectiveWorkflow {
        workflow,
        reusable_workflows,
        references,
    })
}

/// Fetch metadata and content of one workflow at `git_ref`.
///
/// `id_or_path` is either a numeric workflow ID or an in-repo path. The
/// returned record has an empty `ref_path` and `sha`; callers that know them
/// fill them in.
pub(crate) fn resolve_workflow(
    api: &dyn ActionsApi,
    repo: &Repository,
    id_or_path: &str,
    git_ref: &str,
) -> Result<Workflow, ResolveError> {
    let revision = (!git_ref.is_empty()).then_some(git_ref);
    let failed = |stage, source| ResolveError::WorkflowResolutionFailed {
        repository: repo.to_string(),
        workflow: id_or_path.to_string(),
        git_ref: revision.map(str::to_string),
        stage,
        top_level: false,
        source,
    };

    let meta = api
        .fetch_workflow(repo, id_or_path)
        .map_err(|source| failed(LookupStage::Metadata, source))?;
    let content = api
        .fetch_file_content(repo, &meta.path, revision)
        .map_err(|source| ResolveError::WorkflowResolutionFailed {
            repository: repo.to_string(),
            workflow: meta.path.clone(),
            git_ref: revision.map(str::to_string),
            stage: LookupStage::Content,
            top_level: false,
            source,
        })?;
    let yaml = decode_content(&content).map_err(|reason| ResolveError::ContentDecodeFailed {
        repository: repo.to_string(),
        path: meta.path.clone(),
        reason,
    })?;
    tracing::info!(
        repository = %repo,
        path = %meta.path,
        git_ref,
        bytes = yaml.len(),
        "resolved workflow"
    );

    Ok(Workflow {
        filename: meta.filename(),
        name: meta.name,
        ref_path: String::new(),
        git_ref: git_ref.to_string(),
        sha: String::new(),
        yaml,
    })
}

/// Decode file content as served by the contents API.
///
/// The API wraps the encoding across lines, so ASCII whitespace is dropped
/// before decoding. Files too large to inline come back with encoding `none`
/// and no content, which is an error rather than an empty document.
fn decode_content(file: &FileContent) -> Result<String, String> {
    match file.encoding.as_deref() {
        None | Some("base64") => {}
        Some(other) => {
            return Err(format!(
                "unsupported content encoding {other:?} (files over 1 MB are not served inline)"
            ))
        }
    }
    let compact: String = file
        .content
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|err| format!("invalid base64: {err}"))?;
    String::from_utf8(bytes).map_err(|err| format!("content is not UTF-8: {err}"))
}
