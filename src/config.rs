//! Host, token, and repository discovery.
//!
//! Each setting resolves in priority order: command-line flag, environment,
//! then local state (the git remote, the GitHub CLI `hosts.yml`).
use crate::api::ApiConfig;
use crate::repository::{Repository, DEFAULT_HOST};
use anyhow::{anyhow, Context, Result};
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

/// Pick the repository to inspect: `--repo`, then `GH_REPO`, then the
/// `origin` remote of the current git checkout.
pub(crate) fn resolve_repository(flag: Option<&str>) -> Result<Repository> {
    let host = default_host(env_var);
    if let Some(value) = flag.map(str::trim).filter(|v| !v.is_empty()) {
        return Repository::parse(value, &host).context("parse --repo");
    }
    if let Some(value) = env_var("GH_REPO") {
        return Repository::parse(&value, &host).context("parse GH_REPO");
    }
    let url = git_remote_url(Path::new("."))
        .context("failed to determine base repo; pass --repo OWNER/REPO")?;
    parse_remote_url(&url)
        .ok_or_else(|| anyhow!("unrecognized git remote URL {url:?}; pass --repo OWNER/REPO"))
}

/// Connection settings for `host`.
pub(crate) fn api_config(host: &str, timeout: Duration) -> ApiConfig {
    ApiConfig {
        base_url: api_base_url(host, env_var),
        token: resolve_token(host, env_var, gh_hosts_path(env_var).as_deref()),
        timeout,
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn default_host(lookup: impl Fn(&str) -> Option<String>) -> String {
    lookup("GH_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string())
}

fn api_base_url(host: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    if let Some(url) = lookup("GH_API_URL") {
        return url.trim_end_matches('/').to_string();
    }
    if host == DEFAULT_HOST {
        "https://api.github.com".to_string()
    } else {
        format!("https://{host}/api/v3")
    }
}

fn resolve_token(
    host: &str,
    lookup: impl Fn(&str) -> Option<String>,
    hosts_file: Option<&Path>,
) -> Option<String> {
    let env_names: &[&str] = if host == DEFAULT_HOST {
        &["GH_TOKEN", "GITHUB_TOKEN"]
    } else {
        &["GH_ENTERPRISE_TOKEN", "GITHUB_ENTERPRISE_TOKEN"]
    };
    if let Some(token) = env_names.iter().find_map(|name| lookup(*name)) {
        return Some(token);
    }
    let path = hosts_file?;
    match token_from_hosts_file(path, host) {
        Ok(token) => token,
        Err(err) => {
            tracing::warn!(path = %path.display(), "ignoring unreadable gh hosts file: {err:#}");
            None
        }
    }
}

fn gh_hosts_path(lookup: impl Fn(&str) -> Option<String>) -> Option<PathBuf> {
    let dir = lookup("GH_CONFIG_DIR")
        .map(PathBuf::from)
        .or_else(|| dirs::config_dir().map(|dir| dir.join("gh")))?;
    Some(dir.join("hosts.yml"))
}

#[derive(Debug, Deserialize)]
struct HostEntry {
    #[serde(default)]
    oauth_token: Option<String>,
}

fn token_from_hosts_file(path: &Path, host: &str) -> Result<Option<String>> {
    if !path.is_file() {
        return Ok(None);
    }
    let text =
        std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let hosts: BTreeMap<String, HostEntry> =
        serde_yaml::from_str(&text).with_context(|| format!("parse {}", path.display()))?;
    Ok(hosts
        .get(host)
        .and_then(|entry| entry.oauth_token.clone())
        .filter(|token| !token.is_empty()))
}

fn git_remote_url(dir: &Path) -> Result<String> {
    let git = which::which("git").context("git not found on PATH")?;
    let output = Command::new(git)
        .args(["remote", "get-url", "origin"])
        .current_dir(dir)
        .output()
        .context("run git remote get-url origin")?;
    if !output.status.success() {
        return Err(anyhow!(
            "git remote get-url origin failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Parse https, ssh, and scp-like remote URLs into a repository.
fn parse_remote_url(url: &str) -> Option<Repository> {
    let url_form = Regex::new(
        r"^(?:https?|ssh|git)://(?:[^@/]+@)?(?P<host>[^/:]+)(?::\d+)?/(?P<owner>[^/]+)/(?P<name>[^/]+?)(?:\.git)?/?$",
    )
    .ok()?;
    let scp_form =
        Regex::new(r"^(?:[^@/]+@)?(?P<host>[^:/]+):(?P<owner>[^/]+)/(?P<name>[^/]+?)(?:\.git)?$")
            .ok()?;
    let captures = url_form
        .captures(url)
        .or_else(|| scp_form.captures(url))?;
    let host = match &captures["host"] {
        "ssh.github.com" | "www.github.com" => DEFAULT_HOST,
        other => other,
    };
    Some(Repository::new(host, &captures["owner"], &captures["name"]))
}
