//! Resolved workflow records and the reference index built over them.
//!
//! Records are constructed once per resolution pass and never mutated, so the
//! rendering layer can borrow them freely.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A workflow document pinned to the revision a run used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct Workflow {
    /// Display name from the workflow metadata.
    pub(crate) name: String,
    /// Invocation string other workflows used to reach this one.
    ///
    /// Empty for the top-level workflow, which nothing references.
    pub(crate) ref_path: String,
    /// Base name of the workflow file.
    pub(crate) filename: String,
    /// Branch, tag, or commit the content was fetched at.
    #[serde(rename = "ref")]
    pub(crate) git_ref: String,
    /// Commit actually executed; empty when unknown.
    pub(crate) sha: String,
    /// Raw document text, exactly as retrieved.
    pub(crate) yaml: String,
}

/// One entry of a run's `referenced_workflows` list.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub(crate) struct ReferencedWorkflowDeclaration {
    /// Full invocation string, `owner/repo/path@ref`.
    #[serde(default)]
    pub(crate) path: String,
    #[serde(default)]
    pub(crate) sha: String,
    #[serde(default, rename = "ref")]
    pub(crate) git_ref: String,
}

/// A single call site of a reusable workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct Reference {
    /// Filename of the workflow containing the call.
    pub(crate) source_filename: String,
    /// Verbatim text of the calling line, leading whitespace included.
    pub(crate) source_line: String,
    /// 1-based line number within the calling workflow.
    pub(crate) source_line_number: usize,
}

/// Invocation string (as written in `uses:`) to its call sites, in scan order.
pub(crate) type ReferenceIndex = BTreeMap<String, Vec<Reference>>;

/// Run metadata consumed from the run lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RunRecord {
    pub(crate) workflow_id: String,
    pub(crate) head_branch: String,
    pub(crate) head_sha: String,
    pub(crate) referenced_workflows: Vec<ReferencedWorkflowDeclaration>,
}

/// Workflow metadata consumed from the workflow lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct WorkflowMeta {
    pub(crate) name: String,
    /// Canonical in-repo path, e.g. `.github/workflows/ci.yml`.
    pub(crate) path: String,
}

impl WorkflowMeta {
    /// Base name of the workflow file.
    pub(crate) fn filename(&self) -> String {
        file_name(&self.path)
    }
}

/// Result of resolving a run's effective workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct EffectiveWorkflow {
    pub(crate) workflow: Workflow,
    /// Reusable workflows in the run's declared order.
    pub(crate) reusable_workflows: Vec<Workflow>,
    pub(crate) references: ReferenceIndex,
}

impl EffectiveWorkflow {
    /// Call sites that reach `workflow`, looked up by its invocation string.
    pub(crate) fn references_to(&self, workflow: &Workflow) -> &[Reference] {
        if workflow.ref_path.is_empty() {
            return &[];
        }
        self.references
            .get(&workflow.ref_path)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

fn file_name(path: &str) -> String {
    path.rsplit('/').next().unwrap_or(path).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_is_last_path_segment() {
        let meta = WorkflowMeta {
            name: "CI".to_string(),
            path: ".github/workflows/ci.yml".to_string(),
        };
        assert_eq!(meta.filename(), "ci.yml");
        assert_eq!(file_name("ci.yml"), "ci.yml");
    }

    #[test]
    fn top_level_workflow_has_no_incoming_references() {
        let top = Workflow {
            name: "CI".to_string(),
            ref_path: String::new(),
            filename: "ci.yml".to_string(),
            git_ref: "main".to_string(),
            sha: String::new(),
            yaml: String::new(),
        };
        let mut references = ReferenceIndex::new();
        references.insert(
            String::new(),
            vec![Reference {
                source_filename: "other.yml".to_string(),
                source_line: "uses: ''".to_string(),
                source_line_number: 1,
            }],
        );
        let effective = EffectiveWorkflow {
            workflow: top.clone(),
            reusable_workflows: Vec::new(),
            references,
        };
        assert!(effective.references_to(&top).is_empty());
    }
}
