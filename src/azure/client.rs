use crate::azure::error::ApiError;
use crate::azure::types::*;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};
use urlencoding::encode;

const API_VERSION: &str = "7.1";
const ENTITLEMENTS_API_VERSION: &str = "7.1-preview.3";
const USER_LICENSE_FILTER: &str =
    "(licenseId eq 'Account-Express' or licenseId eq 'Account-TestManager')";

/// Thin REST gateway: one method per Azure DevOps call, no retries, no caching
#[derive(Debug, Clone)]
pub struct AzureClient {
    http: reqwest::Client,
    org_url: String,
    entitlements_url: String,
    pat: String,
}

impl AzureClient {
    pub fn new(org_url: &str, pat: &str) -> Result<Self, ApiError> {
        Self::with_timeout(org_url, pat, 30)
    }

    pub fn with_timeout(org_url: &str, pat: &str, timeout_secs: u64) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("aztui/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let org_url = org_url.trim().trim_end_matches('/').to_string();
        Ok(Self {
            http,
            entitlements_url: entitlements_base(&org_url),
            org_url,
            pat: pat.trim().to_string(),
        })
    }

    pub fn org_url(&self) -> &str {
        &self.org_url
    }

    fn project_url(&self, project: &str, rest: &str) -> String {
        format!("{}/{}/_apis/{}", self.org_url, encode(project), rest)
    }

    fn pr_url(&self, project: &str, repo_id: &str, pr_id: i32, rest: &str) -> String {
        let base = format!(
            "git/repositories/{}/pullrequests/{}{}",
            encode(repo_id),
            pr_id,
            rest
        );
        self.project_url(project, &base)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.http
            .request(method, url)
            .basic_auth("", Some(&self.pat))
            .header(ACCEPT, "application/json")
            .query(&[("api-version", API_VERSION)])
    }

    /// Send and return the raw body of a successful response
    async fn send_raw(&self, req: RequestBuilder) -> Result<Vec<u8>, ApiError> {
        let resp = req.send().await?;
        let status = resp.status();
        let url = resp.url().path().to_string();
        let body = resp.bytes().await?;
        if !status.is_success() {
            let text = String::from_utf8_lossy(&body);
            warn!(%url, status = status.as_u16(), "Azure DevOps request failed");
            return Err(ApiError::status(status.as_u16(), &text));
        }
        debug!(%url, status = status.as_u16(), bytes = body.len(), "Azure DevOps response");
        Ok(body.to_vec())
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, ApiError> {
        let body = self.send_raw(req).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn get_list<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<Vec<T>, ApiError> {
        let resp: ListResponse<T> = self.send(req).await?;
        Ok(resp.value)
    }

    pub async fn list_projects(&self) -> Result<Vec<Project>, ApiError> {
        let url = format!("{}/_apis/projects", self.org_url);
        self.get_list(self.request(Method::GET, &url).query(&[("$top", "500")]))
            .await
    }

    pub async fn list_repositories(&self, project: &str) -> Result<Vec<Repository>, ApiError> {
        let url = self.project_url(project, "git/repositories");
        self.get_list(self.request(Method::GET, &url)).await
    }

    pub async fn list_pipelines(&self, project: &str) -> Result<Vec<Pipeline>, ApiError> {
        let url = self.project_url(project, "pipelines");
        self.get_list(self.request(Method::GET, &url)).await
    }

    /// Pipelines associated with a repository (named after it)
    pub async fn list_pipelines_for_repo(
        &self,
        project: &str,
        repo_name: &str,
    ) -> Result<Vec<Pipeline>, ApiError> {
        let pipelines = self.list_pipelines(project).await?;
        Ok(pipelines
            .into_iter()
            .filter(|p| p.name == repo_name)
            .collect())
    }

    pub async fn list_runs(&self, project: &str, pipeline_id: i32) -> Result<Vec<Run>, ApiError> {
        let url = self.project_url(project, &format!("pipelines/{pipeline_id}/runs"));
        self.get_list(self.request(Method::GET, &url)).await
    }

    pub async fn get_run(&self, project: &str, pipeline_id: i32, run_id: i32) -> Result<Run, ApiError> {
        let url = self.project_url(project, &format!("pipelines/{pipeline_id}/runs/{run_id}"));
        self.send(self.request(Method::GET, &url)).await
    }

    /// Build timeline for a run; a run that has not started yet has no timeline
    pub async fn get_timeline(&self, project: &str, run_id: i32) -> Result<Vec<TimelineRecord>, ApiError> {
        let url = self.project_url(project, &format!("build/builds/{run_id}/timeline"));
        let body = self.send_raw(self.request(Method::GET, &url)).await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        let resp: Option<TimelineResponse> = serde_json::from_slice(&body)?;
        let mut records = resp.map(|t| t.records).unwrap_or_default();
        records.sort_by_key(|r| r.order.unwrap_or(i32::MAX));
        Ok(records)
    }

    pub async fn list_pull_requests(&self, project: &str, repo_id: &str) -> Result<Vec<PullRequest>, ApiError> {
        let url = self.project_url(project, &format!("git/repositories/{}/pullrequests", encode(repo_id)));
        self.get_list(
            self.request(Method::GET, &url)
                .query(&[("searchCriteria.status", "active")]),
        )
        .await
    }

    pub async fn get_pull_request(&self, project: &str, repo_id: &str, pr_id: i32) -> Result<PullRequest, ApiError> {
        let url = self.pr_url(project, repo_id, pr_id, "");
        self.send(self.request(Method::GET, &url)).await
    }

    pub async fn list_threads(&self, project: &str, repo_id: &str, pr_id: i32) -> Result<Vec<CommentThread>, ApiError> {
        let url = self.pr_url(project, repo_id, pr_id, "/threads");
        self.get_list(self.request(Method::GET, &url)).await
    }

    /// PR plus its discussion threads; a thread failure leaves the thread list empty
    pub async fn get_pull_request_detail(
        &self,
        project: &str,
        repo_id: &str,
        pr_id: i32,
    ) -> Result<PullRequestDetail, ApiError> {
        let pr = self.get_pull_request(project, repo_id, pr_id).await?;
        let threads = match self.list_threads(project, repo_id, pr_id).await {
            Ok(threads) => threads.into_iter().filter(|t| t.is_discussion()).collect(),
            Err(e) => {
                warn!(pr_id, error = %e, "Failed to load PR threads");
                Vec::new()
            }
        };
        Ok(PullRequestDetail { pr, threads })
    }

    pub async fn create_thread(&self, project: &str, repo_id: &str, pr_id: i32, content: &str) -> Result<CommentThread, ApiError> {
        let url = self.pr_url(project, repo_id, pr_id, "/threads");
        let body = json!({
            "comments": [{ "parentCommentId": 0, "content": content, "commentType": 1 }],
            "status": 1,
        });
        self.send(
            self.request(Method::POST, &url)
                .header(CONTENT_TYPE, "application/json")
                .json(&body),
        )
        .await
    }

    pub async fn update_reviewer_vote(
        &self,
        project: &str,
        repo_id: &str,
        pr_id: i32,
        reviewer_id: &str,
        vote: i32,
    ) -> Result<Reviewer, ApiError> {
        let url = self.pr_url(project, repo_id, pr_id, &format!("/reviewers/{}", encode(reviewer_id)));
        let body = json!({
            "vote": vote,
            "isRequired": false,
            "isFlagged": vote == vote::WAIT_FOR_AUTHOR,
            "hasDeclined": vote == vote::REJECT,
        });
        self.send(self.request(Method::PUT, &url).json(&body)).await
    }

    /// Cast a vote as the calling identity.
    ///
    /// The API has no "vote as me" call, so this posts a comment first (which
    /// makes the caller a reviewer of record), then tries each reviewer on the
    /// PR in order until one vote update is accepted.
    pub async fn approve_pr(
        &self,
        project: &str,
        repo_id: &str,
        pr_id: i32,
        vote: i32,
        comment: Option<&str>,
    ) -> Result<(), ApiError> {
        let comment = comment
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| vote::default_comment(vote));

        self.create_thread(project, repo_id, pr_id, comment)
            .await
            .map_err(|e| ApiError::Comment(e.to_string()))?;

        let pr = self
            .get_pull_request(project, repo_id, pr_id)
            .await
            .map_err(|e| ApiError::PullRequestLookup(e.to_string()))?;

        if pr.reviewers.is_empty() {
            return Err(ApiError::NoReviewers);
        }

        let mut last_error = None;
        for reviewer_id in pr.reviewers.iter().filter_map(|r| r.id.as_deref()) {
            match self
                .update_reviewer_vote(project, repo_id, pr_id, reviewer_id, vote)
                .await
            {
                Ok(_) => {
                    debug!(pr_id, reviewer_id, vote, "Reviewer vote updated");
                    return Ok(());
                }
                Err(e) => {
                    debug!(pr_id, reviewer_id, error = %e, "Reviewer vote rejected, trying next");
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) => Err(ApiError::ReviewerUpdate(e.to_string())),
            None => Err(ApiError::NoValidReviewers),
        }
    }

    pub async fn complete_pr(
        &self,
        project: &str,
        repo_id: &str,
        pr_id: i32,
        last_merge_source_commit: Option<&str>,
        options: &CompletionOptions,
    ) -> Result<PullRequest, ApiError> {
        let url = self.pr_url(project, repo_id, pr_id, "");
        let mut body = json!({
            "status": "completed",
            "completionOptions": options,
        });
        if let Some(commit) = last_merge_source_commit {
            body["lastMergeSourceCommit"] = json!({ "commitId": commit });
        }
        self.send(self.request(Method::PATCH, &url).json(&body)).await
    }

    pub async fn create_pr(&self, project: &str, repo_id: &str, pr: &NewPullRequest) -> Result<PullRequest, ApiError> {
        let url = self.project_url(project, &format!("git/repositories/{}/pullrequests", encode(repo_id)));
        self.send(self.request(Method::POST, &url).json(pr)).await
    }

    pub async fn list_branches(&self, project: &str, repo_id: &str) -> Result<Vec<Branch>, ApiError> {
        let url = self.project_url(project, &format!("git/repositories/{}/refs", encode(repo_id)));
        self.get_list(self.request(Method::GET, &url).query(&[("filter", "heads/")]))
            .await
    }

    /// Organization members who can be added as reviewers
    pub async fn list_users(&self) -> Result<Vec<User>, ApiError> {
        let url = format!("{}/_apis/userentitlements", self.entitlements_url);
        let req = self
            .http
            .get(&url)
            .basic_auth("", Some(&self.pat))
            .header(ACCEPT, "application/json")
            .query(&[
                ("api-version", ENTITLEMENTS_API_VERSION),
                ("$filter", USER_LICENSE_FILTER),
            ]);
        let resp: UserEntitlementsResponse = self.send(req).await?;
        Ok(resp.into_users())
    }
}

/// User entitlements live on the vsaex host for cloud organizations
fn entitlements_base(org_url: &str) -> String {
    let without_scheme = org_url
        .strip_prefix("https://")
        .or_else(|| org_url.strip_prefix("http://"));
    match without_scheme {
        Some(rest) if rest.starts_with("dev.azure.com/") => {
            format!("https://vsaex.{rest}")
        }
        Some(rest) if rest.split('/').next().is_some_and(|h| h.ends_with(".visualstudio.com")) => {
            let org = rest.split('.').next().unwrap_or_default();
            format!("https://vsaex.dev.azure.com/{org}")
        }
        _ => org_url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> AzureClient {
        AzureClient::new(&format!("{}/acme/", server.uri()), "pat").unwrap()
    }

    fn pr_json(reviewers: &[&str]) -> serde_json::Value {
        let reviewers: Vec<_> = reviewers
            .iter()
            .map(|id| json!({ "id": id, "displayName": id.to_uppercase(), "vote": 0 }))
            .collect();
        json!({
            "pullRequestId": 42,
            "title": "Add feature",
            "status": "active",
            "sourceRefName": "refs/heads/feature",
            "targetRefName": "refs/heads/main",
            "reviewers": reviewers,
        })
    }

    #[test]
    fn test_entitlements_base() {
        assert_eq!(
            entitlements_base("https://dev.azure.com/Acme"),
            "https://vsaex.dev.azure.com/Acme"
        );
        assert_eq!(
            entitlements_base("https://acme.visualstudio.com"),
            "https://vsaex.dev.azure.com/acme"
        );
        assert_eq!(entitlements_base("http://127.0.0.1:9000/acme"), "http://127.0.0.1:9000/acme");
    }

    #[tokio::test]
    async fn test_list_projects_sends_basic_auth() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/acme/_apis/projects"))
            .and(header("authorization", "Basic OnBhdA=="))
            .and(query_param("api-version", "7.1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "count": 2,
                "value": [
                    { "id": "p1", "name": "Widgets" },
                    { "id": "p2", "name": "Gadgets" }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let projects = client_for(&server).await.list_projects().await.unwrap();
        assert_eq!(projects.len(), 2);
        assert_eq!(projects[0].name, "Widgets");
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/acme/Widgets/_apis/git/repositories"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .await
            .list_repositories("Widgets")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 401, .. }));
        assert!(err.to_string().contains("401"));
    }

    #[tokio::test]
    async fn test_project_names_are_path_encoded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/acme/My%20Project/_apis/git/repositories"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [{ "id": "r1", "name": "api-service", "remoteUrl": "https://x" }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let repos = client_for(&server)
            .await
            .list_repositories("My Project")
            .await
            .unwrap();
        assert_eq!(repos[0].remote_url.as_deref(), Some("https://x"));
    }

    #[tokio::test]
    async fn test_pipelines_for_repo_filters_by_name() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/acme/Widgets/_apis/pipelines"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [
                    { "id": 1, "name": "api-service" },
                    { "id": 2, "name": "web" },
                    { "id": 3, "name": "api-service" }
                ]
            })))
            .mount(&server)
            .await;

        let pipelines = client_for(&server)
            .await
            .list_pipelines_for_repo("Widgets", "api-service")
            .await
            .unwrap();
        let ids: Vec<i32> = pipelines.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[tokio::test]
    async fn test_timeline_empty_body_is_empty_list() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/acme/Widgets/_apis/build/builds/9/timeline"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let records = client_for(&server)
            .await
            .get_timeline("Widgets", 9)
            .await
            .unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_timeline_sorted_by_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/acme/Widgets/_apis/build/builds/9/timeline"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "records": [
                    { "id": "b", "name": "Test", "order": 2, "state": "pending" },
                    { "id": "a", "name": "Build", "order": 1, "state": "completed", "result": "succeeded" }
                ]
            })))
            .mount(&server)
            .await;

        let records = client_for(&server)
            .await
            .get_timeline("Widgets", 9)
            .await
            .unwrap();
        assert_eq!(records[0].name.as_deref(), Some("Build"));
        assert_eq!(records[1].name.as_deref(), Some("Test"));
    }

    #[tokio::test]
    async fn test_approve_pr_stops_at_first_successful_reviewer() {
        let server = MockServer::start().await;
        let base = "/acme/Widgets/_apis/git/repositories/repo-1/pullrequests/42";

        Mock::given(method("POST"))
            .and(path(format!("{base}/threads")))
            .and(body_partial_json(json!({ "comments": [{ "content": "Approved" }] })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 1 })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(base))
            .respond_with(ResponseTemplate::new(200).set_body_json(pr_json(&["a", "b", "c"])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path(format!("{base}/reviewers/a")))
            .respond_with(ResponseTemplate::new(403).set_body_string("not you"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path(format!("{base}/reviewers/b")))
            .respond_with(ResponseTemplate::new(403).set_body_string("not you either"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path(format!("{base}/reviewers/c")))
            .and(body_partial_json(json!({ "vote": 10, "hasDeclined": false })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "c", "vote": 10 })))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server)
            .await
            .approve_pr("Widgets", "repo-1", 42, vote::APPROVE, None)
            .await
            .unwrap();
        server.verify().await;
    }

    #[tokio::test]
    async fn test_approve_pr_without_reviewers() {
        let server = MockServer::start().await;
        let base = "/acme/Widgets/_apis/git/repositories/repo-1/pullrequests/42";

        Mock::given(method("POST"))
            .and(path(format!("{base}/threads")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 1 })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(base))
            .respond_with(ResponseTemplate::new(200).set_body_json(pr_json(&[])))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .await
            .approve_pr("Widgets", "repo-1", 42, vote::REJECT, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NoReviewers));
    }

    #[tokio::test]
    async fn test_approve_pr_all_updates_fail() {
        let server = MockServer::start().await;
        let base = "/acme/Widgets/_apis/git/repositories/repo-1/pullrequests/42";

        Mock::given(method("POST"))
            .and(path(format!("{base}/threads")))
            .and(body_partial_json(json!({ "comments": [{ "content": "Declined" }] })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 1 })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(base))
            .respond_with(ResponseTemplate::new(200).set_body_json(pr_json(&["a"])))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path(format!("{base}/reviewers/a")))
            .respond_with(ResponseTemplate::new(403).set_body_string("denied"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .await
            .approve_pr("Widgets", "repo-1", 42, vote::REJECT, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::ReviewerUpdate(_)));
    }

    #[tokio::test]
    async fn test_approve_pr_comment_failure_aborts() {
        let server = MockServer::start().await;
        let base = "/acme/Widgets/_apis/git/repositories/repo-1/pullrequests/42";

        Mock::given(method("POST"))
            .and(path(format!("{base}/threads")))
            .respond_with(ResponseTemplate::new(500).set_body_string("down"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(base))
            .respond_with(ResponseTemplate::new(200).set_body_json(pr_json(&["a"])))
            .expect(0)
            .mount(&server)
            .await;

        let err = client_for(&server)
            .await
            .approve_pr("Widgets", "repo-1", 42, vote::APPROVE, Some("ship it"))
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("failed to add comment"));
        server.verify().await;
    }

    #[tokio::test]
    async fn test_complete_pr_sends_merge_commit_and_bypass() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/acme/Widgets/_apis/git/repositories/repo-1/pullrequests/42"))
            .and(body_partial_json(json!({
                "status": "completed",
                "lastMergeSourceCommit": { "commitId": "abc123" },
                "completionOptions": { "bypassPolicy": true, "bypassReason": "hotfix" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "pullRequestId": 42, "title": "Add feature", "status": "completed"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let pr = client_for(&server)
            .await
            .complete_pr(
                "Widgets",
                "repo-1",
                42,
                Some("abc123"),
                &CompletionOptions::bypass("hotfix"),
            )
            .await
            .unwrap();
        assert_eq!(pr.status, PrStatus::Completed);
    }

    #[tokio::test]
    async fn test_create_pr_posts_reviewers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/acme/Widgets/_apis/git/repositories/repo-1/pullrequests"))
            .and(body_partial_json(json!({
                "sourceRefName": "refs/heads/feature",
                "targetRefName": "refs/heads/main",
                "title": "Add feature",
                "reviewers": [{ "id": "u1" }]
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(pr_json(&["u1"])))
            .expect(1)
            .mount(&server)
            .await;

        let new_pr = NewPullRequest {
            source_ref_name: "refs/heads/feature".to_string(),
            target_ref_name: "refs/heads/main".to_string(),
            title: "Add feature".to_string(),
            description: String::new(),
            reviewers: vec![ReviewerRef { id: "u1".to_string() }],
        };
        let pr = client_for(&server)
            .await
            .create_pr("Widgets", "repo-1", &new_pr)
            .await
            .unwrap();
        assert_eq!(pr.pull_request_id, 42);
    }

    #[tokio::test]
    async fn test_pull_request_detail_tolerates_thread_failure() {
        let server = MockServer::start().await;
        let base = "/acme/Widgets/_apis/git/repositories/repo-1/pullrequests/42";
        Mock::given(method("GET"))
            .and(path(base))
            .respond_with(ResponseTemplate::new(200).set_body_json(pr_json(&["a"])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("{base}/threads")))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let detail = client_for(&server)
            .await
            .get_pull_request_detail("Widgets", "repo-1", 42)
            .await
            .unwrap();
        assert_eq!(detail.pr.reviewers.len(), 1);
        assert!(detail.threads.is_empty());
    }

    #[tokio::test]
    async fn test_list_users_filters_by_license() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/acme/_apis/userentitlements"))
            .and(query_param("api-version", "7.1-preview.3"))
            .and(query_param("$filter", USER_LICENSE_FILTER))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "members": [
                    { "id": "u1", "user": { "displayName": "Ada", "mailAddress": "ada@x.io" } },
                    { "id": "u2", "user": { "displayName": "Build Service" } }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let users = client_for(&server).await.list_users().await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].display_name, "Ada");
    }

    #[tokio::test]
    async fn test_list_branches_uses_heads_filter() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/acme/Widgets/_apis/git/repositories/repo-1/refs"))
            .and(query_param("filter", "heads/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [
                    { "name": "refs/heads/main", "objectId": "1" },
                    { "name": "refs/heads/feature", "objectId": "2" }
                ]
            })))
            .mount(&server)
            .await;

        let branches = client_for(&server)
            .await
            .list_branches("Widgets", "repo-1")
            .await
            .unwrap();
        assert_eq!(branches.len(), 2);
        assert_eq!(branches[1].short_name(), "feature");
    }
}
