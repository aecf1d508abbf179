use serde::{Deserialize, Serialize};

/// Envelope used by most Azure DevOps list endpoints
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub remote_url: Option<String>,
    #[serde(default)]
    pub default_branch: Option<String>,
}

// Pipeline types
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pipeline {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub folder: Option<String>,
    #[serde(default)]
    pub revision: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RunState {
    NotStarted,
    InProgress,
    Canceling,
    Completed,
    #[default]
    #[serde(other)]
    Unknown,
}

impl RunState {
    /// A run in this state is still producing timeline updates
    pub fn is_active(self) -> bool {
        matches!(self, Self::InProgress | Self::NotStarted)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::NotStarted => "Not started",
            Self::InProgress => "In progress",
            Self::Canceling => "Canceling",
            Self::Completed => "Completed",
            Self::Unknown => "Unknown",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Run {
    pub id: i32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub state: RunState,
    #[serde(default)]
    pub result: Option<String>, // succeeded, failed, canceled
    #[serde(default)]
    pub created_date: Option<String>,
    #[serde(default)]
    pub finished_date: Option<String>,
}

impl Run {
    pub fn status_icon(&self) -> &'static str {
        match self.state {
            RunState::InProgress => "◐",
            RunState::NotStarted => "○",
            RunState::Canceling => "◌",
            RunState::Completed => match self.result.as_deref() {
                Some("succeeded") => "✓",
                Some("failed") => "✗",
                Some("canceled") => "⊘",
                _ => "●",
            },
            RunState::Unknown => "?",
        }
    }
}

/// Build timeline record (stage, job, task)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type")]
    #[serde(default)]
    pub record_type: Option<String>, // Stage, Job, Task, Checkpoint
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub state: Option<String>, // pending, inProgress, completed
    #[serde(default)]
    pub result: Option<String>, // succeeded, failed, canceled, skipped
    #[serde(default)]
    pub order: Option<i32>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub finish_time: Option<String>,
}

impl TimelineRecord {
    pub fn status_icon(&self) -> &'static str {
        match (self.state.as_deref(), self.result.as_deref()) {
            (Some("completed"), Some("succeeded")) => "✓",
            (Some("completed"), Some("succeededWithIssues")) => "⚠",
            (Some("completed"), Some("failed")) => "✗",
            (Some("completed"), Some("canceled")) => "⊘",
            (Some("completed"), Some("skipped")) => "○",
            (Some("inProgress"), _) => "◐",
            (Some("pending"), _) => "·",
            _ => "?",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineResponse {
    #[serde(default)]
    pub records: Vec<TimelineRecord>,
}

// Pull Request types
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PrStatus {
    Active,
    Completed,
    Abandoned,
    #[default]
    #[serde(other)]
    NotSet,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityRef {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub unique_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reviewer {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub unique_name: Option<String>,
    #[serde(default)]
    pub vote: i32,
    #[serde(default)]
    pub is_required: Option<bool>,
    #[serde(default)]
    pub has_declined: Option<bool>,
    #[serde(default)]
    pub is_flagged: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRef {
    pub commit_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequest {
    pub pull_request_id: i32,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub source_ref_name: String,
    #[serde(default)]
    pub target_ref_name: String,
    #[serde(default)]
    pub status: PrStatus,
    #[serde(default)]
    pub reviewers: Vec<Reviewer>,
    #[serde(default)]
    pub created_by: Option<IdentityRef>,
    #[serde(default)]
    pub creation_date: Option<String>,
    #[serde(default)]
    pub is_draft: bool,
    #[serde(default)]
    pub merge_status: Option<String>,
    #[serde(default)]
    pub last_merge_source_commit: Option<CommitRef>,
}

impl PullRequest {
    /// Vote icons for PR reviewers
    pub fn vote_icon(vote: i32) -> &'static str {
        match vote {
            vote::APPROVE => "✓",
            vote::APPROVE_WITH_SUGGESTIONS => "✓~",
            vote::NONE => "○",
            vote::WAIT_FOR_AUTHOR => "⏳",
            vote::REJECT => "✗",
            _ => "?",
        }
    }

    pub fn vote_label(vote: i32) -> &'static str {
        match vote {
            vote::APPROVE => "Approved",
            vote::APPROVE_WITH_SUGGESTIONS => "Approved w/ suggestions",
            vote::NONE => "No vote",
            vote::WAIT_FOR_AUTHOR => "Waiting for author",
            vote::REJECT => "Rejected",
            _ => "Unknown",
        }
    }

    pub fn status_icon(&self) -> &'static str {
        if self.is_draft {
            return "◑";
        }
        match self.status {
            PrStatus::Active => "●",
            PrStatus::Completed => "✓",
            PrStatus::Abandoned => "✗",
            PrStatus::NotSet => "?",
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == PrStatus::Active
    }

    /// Strip "refs/heads/" prefix from branch names
    pub fn short_branch(branch: &str) -> &str {
        branch.strip_prefix("refs/heads/").unwrap_or(branch)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentThread {
    #[serde(default)]
    pub id: i32,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(default)]
    pub id: i32,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub comment_type: Option<String>, // text, system, codeChange
    #[serde(default)]
    pub author: Option<IdentityRef>,
    #[serde(default)]
    pub published_date: Option<String>,
}

impl CommentThread {
    /// Threads worth showing: not deleted and carrying at least one human comment
    pub fn is_discussion(&self) -> bool {
        !self.is_deleted
            && self
                .comments
                .iter()
                .any(|c| c.comment_type.as_deref() != Some("system"))
    }
}

/// A loaded PR together with its discussion threads
#[derive(Debug, Clone, Default)]
pub struct PullRequestDetail {
    pub pr: PullRequest,
    pub threads: Vec<CommentThread>,
}

/// Git ref (branch) as returned by the refs endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    pub name: String,
    #[serde(default)]
    pub object_id: Option<String>,
}

impl Branch {
    pub fn short_name(&self) -> &str {
        PullRequest::short_branch(&self.name)
    }

    pub fn is_default_name(&self) -> bool {
        self.name == "refs/heads/main" || self.name == "refs/heads/master"
    }
}

/// Organization user (reviewer candidate)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub principal_name: String,
    #[serde(default)]
    pub mail_address: String,
    #[serde(default)]
    pub descriptor: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEntitlement {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub user: Option<GraphUser>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphUser {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub principal_name: Option<String>,
    #[serde(default)]
    pub mail_address: Option<String>,
    #[serde(default)]
    pub descriptor: Option<String>,
    #[serde(default)]
    pub origin_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEntitlementsResponse {
    #[serde(default)]
    pub members: Vec<UserEntitlement>,
}

impl UserEntitlementsResponse {
    /// Users with a mail address, in response order
    pub fn into_users(self) -> Vec<User> {
        self.members
            .into_iter()
            .filter_map(|member| {
                let user = member.user?;
                let mail = user.mail_address.filter(|m| !m.is_empty())?;
                Some(User {
                    id: member.id.or(user.origin_id).unwrap_or_default(),
                    display_name: user.display_name.unwrap_or_default(),
                    principal_name: user.principal_name.unwrap_or_default(),
                    mail_address: mail,
                    descriptor: user.descriptor.unwrap_or_default(),
                })
            })
            .collect()
    }
}

/// Body for creating a pull request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPullRequest {
    pub source_ref_name: String,
    pub target_ref_name: String,
    pub title: String,
    pub description: String,
    pub reviewers: Vec<ReviewerRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReviewerRef {
    pub id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionOptions {
    pub delete_source_branch: bool,
    pub merge_strategy: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub bypass_policy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bypass_reason: Option<String>,
}

impl CompletionOptions {
    pub fn standard() -> Self {
        Self {
            delete_source_branch: false,
            merge_strategy: "noFastForward".to_string(),
            bypass_policy: false,
            bypass_reason: None,
        }
    }

    pub fn bypass(reason: impl Into<String>) -> Self {
        Self {
            bypass_policy: true,
            bypass_reason: Some(reason.into()),
            ..Self::standard()
        }
    }
}

/// Reviewer vote values
pub mod vote {
    pub const APPROVE: i32 = 10;
    pub const APPROVE_WITH_SUGGESTIONS: i32 = 5;
    pub const NONE: i32 = 0;
    pub const WAIT_FOR_AUTHOR: i32 = -5;
    pub const REJECT: i32 = -10;

    /// Comment posted before a vote when the user gave none
    pub fn default_comment(vote: i32) -> &'static str {
        match vote {
            APPROVE => "Approved",
            REJECT => "Declined",
            _ => "Reviewed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_run(state: RunState, result: Option<&str>) -> Run {
        Run {
            id: 1,
            name: "20240101.1".to_string(),
            state,
            result: result.map(str::to_string),
            created_date: None,
            finished_date: None,
        }
    }

    #[test]
    fn test_run_state_deserializes_known_and_unknown() {
        let run: Run = serde_json::from_str(r#"{"id":7,"name":"r","state":"inProgress"}"#).unwrap();
        assert_eq!(run.state, RunState::InProgress);

        let run: Run = serde_json::from_str(r#"{"id":7,"state":"somethingNew"}"#).unwrap();
        assert_eq!(run.state, RunState::Unknown);

        let run: Run = serde_json::from_str(r#"{"id":7}"#).unwrap();
        assert_eq!(run.state, RunState::Unknown);
    }

    #[test]
    fn test_run_state_is_active() {
        assert!(RunState::InProgress.is_active());
        assert!(RunState::NotStarted.is_active());
        assert!(!RunState::Completed.is_active());
        assert!(!RunState::Canceling.is_active());
        assert!(!RunState::Unknown.is_active());
    }

    #[test]
    fn test_run_status_icon() {
        assert_eq!(make_run(RunState::InProgress, None).status_icon(), "◐");
        assert_eq!(make_run(RunState::Completed, Some("succeeded")).status_icon(), "✓");
        assert_eq!(make_run(RunState::Completed, Some("failed")).status_icon(), "✗");
    }

    #[test]
    fn test_pr_status_deserialize() {
        let pr: PullRequest = serde_json::from_str(
            r#"{"pullRequestId":3,"title":"t","status":"abandoned","sourceRefName":"refs/heads/a","targetRefName":"refs/heads/main"}"#,
        )
        .unwrap();
        assert_eq!(pr.status, PrStatus::Abandoned);
        assert!(!pr.is_active());
        assert_eq!(PullRequest::short_branch(&pr.source_ref_name), "a");
    }

    #[test]
    fn test_vote_icon_and_label() {
        assert_eq!(PullRequest::vote_icon(10), "✓");
        assert_eq!(PullRequest::vote_icon(-10), "✗");
        assert_eq!(PullRequest::vote_icon(3), "?");
        assert_eq!(PullRequest::vote_label(-5), "Waiting for author");
        assert_eq!(PullRequest::vote_icon(vote::APPROVE_WITH_SUGGESTIONS), "✓~");
        assert_eq!(PullRequest::vote_label(vote::NONE), "No vote");
    }

    #[test]
    fn test_default_comment() {
        assert_eq!(vote::default_comment(vote::APPROVE), "Approved");
        assert_eq!(vote::default_comment(vote::REJECT), "Declined");
        assert_eq!(vote::default_comment(vote::WAIT_FOR_AUTHOR), "Reviewed");
    }

    #[test]
    fn test_entitlements_keep_only_users_with_mail() {
        let resp: UserEntitlementsResponse = serde_json::from_str(
            r#"{"members":[
                {"id":"u1","user":{"displayName":"Ada","principalName":"ada@x.io","mailAddress":"ada@x.io","descriptor":"aad.1"}},
                {"id":"u2","user":{"displayName":"Svc","principalName":"svc","mailAddress":""}},
                {"id":"u3"}
            ]}"#,
        )
        .unwrap();
        let users = resp.into_users();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].id, "u1");
        assert_eq!(users[0].display_name, "Ada");
    }

    #[test]
    fn test_completion_options_serialization() {
        let json = serde_json::to_value(CompletionOptions::standard()).unwrap();
        assert!(json.get("bypassPolicy").is_none());
        assert_eq!(json["mergeStrategy"], "noFastForward");

        let json = serde_json::to_value(CompletionOptions::bypass("hotfix")).unwrap();
        assert_eq!(json["bypassPolicy"], true);
        assert_eq!(json["bypassReason"], "hotfix");
    }

    #[test]
    fn test_thread_is_discussion() {
        let system_only = CommentThread {
            comments: vec![Comment {
                comment_type: Some("system".to_string()),
                ..Default::default()
            }],
            ..Default::default()
        };
        assert!(!system_only.is_discussion());

        let human = CommentThread {
            comments: vec![Comment {
                comment_type: Some("text".to_string()),
                content: Some("LGTM".to_string()),
                ..Default::default()
            }],
            ..Default::default()
        };
        assert!(human.is_discussion());

        let deleted = CommentThread {
            is_deleted: true,
            ..human
        };
        assert!(!deleted.is_discussion());
    }
}
