//! Parsing of reusable-workflow invocation strings.
//!
//! An invocation string has the shape `owner/repo/path/to/file.yml@ref`. The
//! `@` must appear exactly once; everything before it is split on `/` into the
//! repository coordinates and the in-repo path.
use crate::error::ResolveError;

/// Decomposed `owner/repo/path@ref`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct InvocationPath {
    pub(crate) owner: String,
    pub(crate) repo: String,
    /// In-repo path, segments rejoined with `/`.
    pub(crate) path: String,
    pub(crate) git_ref: String,
}

pub(crate) fn parse_invocation(reference: &str) -> Result<InvocationPath, ResolveError> {
    let malformed = |reason| ResolveError::MalformedReference {
        reference: reference.to_string(),
        reason,
    };

    let (location, git_ref) = match reference.split_once('@') {
        Some((_, rest)) if rest.contains('@') => return Err(malformed("more than one '@'")),
        Some(parts) => parts,
        None => return Err(malformed("missing '@<ref>'")),
    };
    if git_ref.is_empty() {
        return Err(malformed("empty ref after '@'"));
    }

    let segments: Vec<&str> = location.split('/').collect();
    if segments.len() < 3 {
        return Err(malformed("expected owner/repo/path before '@'"));
    }
    let (owner, repo) = (segments[0], segments[1]);
    if owner.is_empty() || repo.is_empty() {
        return Err(malformed("empty owner or repository"));
    }
    let path = segments[2..].join("/");
    if path.is_empty() {
        return Err(malformed("empty workflow path"));
    }

    Ok(InvocationPath {
        owner: owner.to_string(),
        repo: repo.to_string(),
        path,
        git_ref: git_ref.to_string(),
    })
}
