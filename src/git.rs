use anyhow::{bail, Context, Result};
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;
use tokio::process::Command;

const GIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Organization/project/repository triple parsed from an Azure Repos remote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteInfo {
    pub organization: String,
    pub project: String,
    pub repository: String,
}

// https://dev.azure.com/{org}/{project}/_git/{repo}
// https://{org}.visualstudio.com/{project}/_git/{repo}
// git@ssh.dev.azure.com:v3/{org}/{project}/{repo}
static REMOTE_PATTERNS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        r"^https://(?:[^@/]+@)?dev\.azure\.com/([^/]+)/([^/]+)/_git/(.+)$",
        r"^https://(?:[^@/]+@)?([^./]+)\.visualstudio\.com/(?:DefaultCollection/)?([^/]+)/_git/(.+)$",
        r"^git@ssh\.dev\.azure\.com:v3/([^/]+)/([^/]+)/(.+)$",
    ]
    .map(|pattern| Regex::new(pattern).expect("valid remote regex (verified by tests)"))
});

impl RemoteInfo {
    /// Parse a remote URL; `None` when it is not an Azure Repos remote
    pub fn parse(url: &str) -> Option<Self> {
        let url = url.trim();
        let url = url.strip_suffix(".git").unwrap_or(url);

        REMOTE_PATTERNS.iter().find_map(|re| {
            let caps = re.captures(url)?;
            Some(Self {
                organization: decode(&caps[1]),
                project: decode(&caps[2]),
                repository: decode(&caps[3]),
            })
        })
    }
}

fn decode(segment: &str) -> String {
    urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_string())
}

async fn git(args: &[&str]) -> Result<std::process::Output> {
    let future = Command::new("git").args(args).output();
    tokio::time::timeout(GIT_TIMEOUT, future)
        .await
        .context("git command timed out")?
        .context("Failed to execute git - is git installed?")
}

/// Whether the working directory is inside a git repository
pub async fn is_git_repository() -> bool {
    matches!(git(&["rev-parse", "--git-dir"]).await, Ok(out) if out.status.success())
}

/// URL of the `origin` remote
pub async fn origin_url() -> Result<String> {
    let output = git(&["remote", "get-url", "origin"]).await?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("git remote get-url failed: {}", stderr.trim());
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Azure Repos coordinates of the current repository's origin remote
pub async fn get_remote_info() -> Result<RemoteInfo> {
    let url = origin_url().await?;
    RemoteInfo::parse(&url).with_context(|| format!("not an Azure DevOps remote: {url}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(org: &str, project: &str, repo: &str) -> RemoteInfo {
        RemoteInfo {
            organization: org.to_string(),
            project: project.to_string(),
            repository: repo.to_string(),
        }
    }

    #[test]
    fn test_remote_patterns_compile_once() {
        let first = &*REMOTE_PATTERNS as *const _;
        assert_eq!(REMOTE_PATTERNS.len(), 3);
        assert!(std::ptr::eq(first, &*REMOTE_PATTERNS), "Patterns are shared across parses");
    }

    #[test]
    fn test_parse_https_remote() {
        assert_eq!(
            RemoteInfo::parse("https://dev.azure.com/Acme/Widgets/_git/api-service"),
            Some(info("Acme", "Widgets", "api-service"))
        );
        assert_eq!(
            RemoteInfo::parse("https://acme@dev.azure.com/Acme/Widgets/_git/api-service.git\n"),
            Some(info("Acme", "Widgets", "api-service"))
        );
    }

    #[test]
    fn test_parse_visualstudio_remote() {
        assert_eq!(
            RemoteInfo::parse("https://acme.visualstudio.com/Widgets/_git/api-service"),
            Some(info("acme", "Widgets", "api-service"))
        );
    }

    #[test]
    fn test_parse_ssh_remote() {
        assert_eq!(
            RemoteInfo::parse("git@ssh.dev.azure.com:v3/Acme/Widgets/api-service"),
            Some(info("Acme", "Widgets", "api-service"))
        );
    }

    #[test]
    fn test_parse_decodes_spaces() {
        assert_eq!(
            RemoteInfo::parse("https://dev.azure.com/Acme/My%20Project/_git/My%20Repo"),
            Some(info("Acme", "My Project", "My Repo"))
        );
    }

    #[test]
    fn test_parse_rejects_other_hosts() {
        assert_eq!(RemoteInfo::parse("git@github.com:owner/repo.git"), None);
        assert_eq!(RemoteInfo::parse("https://github.com/owner/repo"), None);
        assert_eq!(RemoteInfo::parse(""), None);
    }
}
