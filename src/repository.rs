//! Repository coordinates (`[HOST/]OWNER/REPO`).
use anyhow::{anyhow, Result};
use std::fmt;

pub(crate) const DEFAULT_HOST: &str = "github.com";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct Repository {
    host: String,
    owner: String,
    name: String,
}

impl Repository {
    pub(crate) fn new(host: impl Into<String>, owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Parse `OWNER/REPO` or `HOST/OWNER/REPO`, defaulting the host to `default_host`.
    pub(crate) fn parse(input: &str, default_host: &str) -> Result<Self> {
        let trimmed = input.trim().trim_end_matches(".git");
        let parts: Vec<&str> = trimmed.split('/').collect();
        let (host, owner, name) = match parts.as_slice() {
            [owner, name] => (default_host, *owner, *name),
            [host, owner, name] => (*host, *owner, *name),
            _ => {
                return Err(anyhow!(
                    "expected the \"[HOST/]OWNER/REPO\" format, got {input:?}"
                ))
            }
        };
        if host.is_empty() || owner.is_empty() || name.is_empty() {
            return Err(anyhow!(
                "expected the \"[HOST/]OWNER/REPO\" format, got {input:?}"
            ));
        }
        Ok(Self::new(host, owner, name))
    }

    pub(crate) fn host(&self) -> &str {
        &self.host
    }

    pub(crate) fn owner(&self) -> &str {
        &self.owner
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    /// Same host, different owner/name.
    pub(crate) fn sibling(&self, owner: &str, name: &str) -> Self {
        Self::new(self.host.clone(), owner, name)
    }
}

impl fmt::Display for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}
