//! Reference index construction over a resolved workflow set.
use crate::error::ResolveError;
use crate::extract::extract_references;
use crate::model::{ReferenceIndex, ReferencedWorkflowDeclaration, Workflow};

/// Scan every workflow for `uses:` calls and index them by invocation string.
///
/// Workflows are scanned in the order given (top-level first), so each entry
/// lists its call sites in scan order. The first extraction error aborts the
/// whole aggregation. `declarations` only feeds diagnostics: a declared
/// workflow that nothing references is logged, not indexed.
pub(crate) fn aggregate_references<'a, I>(
    workflows: I,
    declarations: &[ReferencedWorkflowDeclaration],
) -> Result<ReferenceIndex, ResolveError>
where
    I: IntoIterator<Item = &'a Workflow>,
{
    let mut index = ReferenceIndex::new();
    for workflow in workflows {
        let extracted = extract_references(&workflow.yaml, &workflow.filename)?;
        tracing::debug!(
            workflow = %workflow.filename,
            references = extracted.len(),
            "scanned workflow"
        );
        for found in extracted {
            tracing::debug!(
                invocation = %found.invocation,
                job = %found.job,
                line = found.reference.source_line_number,
                "reference"
            );
            index
                .entry(found.invocation)
                .or_default()
                .push(found.reference);
        }
    }

    for declaration in declarations {
        if !index.contains_key(&declaration.path) {
            tracing::warn!(
                path = %declaration.path,
                "referenced workflow has no matching uses: in the scanned workflows"
            );
        }
    }
    Ok(index)
}
