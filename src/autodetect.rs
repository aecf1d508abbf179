use crate::azure::{AzureClient, Project, Repository};
use crate::git::{self, RemoteInfo};
use tracing::{debug, info};

/// Project/repository resolved from the local git checkout
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AutoDetectResult {
    pub organization: String,
    pub project: Option<Project>,
    pub repository: Option<Repository>,
    pub should_auto_load: bool,
}

/// Resolve the current directory's origin remote to a project and repository.
///
/// Never fails: anything that prevents a full match yields a result with
/// `should_auto_load == false`.
pub async fn detect_project_and_repo(org_url: &str, client: &AzureClient) -> AutoDetectResult {
    if !git::is_git_repository().await {
        debug!("Not inside a git repository, skipping autodetect");
        return AutoDetectResult::default();
    }

    let remote = match git::get_remote_info().await {
        Ok(remote) => remote,
        Err(e) => {
            debug!(error = %e, "No Azure DevOps remote");
            return AutoDetectResult::default();
        }
    };

    resolve(org_url, &remote, client).await
}

/// Match a parsed remote against the configured organization and its projects
pub async fn resolve(org_url: &str, remote: &RemoteInfo, client: &AzureClient) -> AutoDetectResult {
    if !organization_matches(org_url, &remote.organization) {
        debug!(remote_org = %remote.organization, "Remote organization does not match config");
        return AutoDetectResult::default();
    }

    let mut result = AutoDetectResult {
        organization: remote.organization.clone(),
        ..Default::default()
    };

    let projects = match client.list_projects().await {
        Ok(projects) => projects,
        Err(e) => {
            debug!(error = %e, "Autodetect project lookup failed");
            return result;
        }
    };
    let Some(project) = find_by_name(projects, &remote.project, |p| &p.name) else {
        debug!(project = %remote.project, "Autodetected project not found");
        return result;
    };

    let repos = client.list_repositories(&project.name).await;
    result.project = Some(project);
    let repos = match repos {
        Ok(repos) => repos,
        Err(e) => {
            debug!(error = %e, "Autodetect repository lookup failed");
            return result;
        }
    };
    let Some(repository) = find_by_name(repos, &remote.repository, |r| &r.name) else {
        debug!(repository = %remote.repository, "Autodetected repository not found");
        return result;
    };

    info!(
        project = %remote.project,
        repository = %repository.name,
        "Autodetected repository from git remote"
    );
    result.repository = Some(repository);
    result.should_auto_load = true;
    result
}

/// Whether an organization name taken from a git remote is the configured one
pub fn organization_matches(config_url: &str, git_org: &str) -> bool {
    let config_url = config_url.trim().trim_end_matches('/');
    let config_url = config_url
        .strip_prefix("https://")
        .or_else(|| config_url.strip_prefix("http://"))
        .unwrap_or(config_url);

    if config_url.contains("dev.azure.com") {
        let parts: Vec<&str> = config_url.split('/').collect();
        if parts.len() >= 2 {
            return parts[parts.len() - 1].eq_ignore_ascii_case(git_org);
        }
    } else if config_url.contains("visualstudio.com") {
        let parts: Vec<&str> = config_url.split('.').collect();
        if parts.len() >= 3 {
            return parts[0].eq_ignore_ascii_case(git_org);
        }
    }

    false
}

/// Exact name match first, then case-insensitive
fn find_by_name<T>(items: Vec<T>, name: &str, key: impl Fn(&T) -> &String) -> Option<T> {
    let index = items
        .iter()
        .position(|item| key(item) == name)
        .or_else(|| {
            items
                .iter()
                .position(|item| key(item).to_lowercase() == name.to_lowercase())
        })?;
    items.into_iter().nth(index)
}
