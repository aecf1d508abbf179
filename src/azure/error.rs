use thiserror::Error;

/// Errors returned by the Azure DevOps REST gateway
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to parse response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("failed to add comment: {0}")]
    Comment(String),

    #[error("failed to get PR details: {0}")]
    PullRequestLookup(String),

    #[error("no reviewers found on PR")]
    NoReviewers,

    #[error("no valid reviewers found to update")]
    NoValidReviewers,

    #[error("failed to update reviewer vote: {0}")]
    ReviewerUpdate(String),
}

impl ApiError {
    /// Build a status error from a non-2xx response body, keeping the message short
    pub fn status(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
            .unwrap_or_else(|| body.lines().next().unwrap_or("").trim().to_string());
        let body = if message.chars().count() > 200 {
            message.chars().take(200).collect()
        } else {
            message
        };
        Self::Status { status, body }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_prefers_json_message() {
        let err = ApiError::status(401, r#"{"message":"TF400813: not authorized","typeKey":"X"}"#);
        assert_eq!(err.to_string(), "HTTP 401: TF400813: not authorized");
    }

    #[test]
    fn test_status_uses_first_line_of_plain_body() {
        let err = ApiError::status(500, "boom\nstack trace");
        assert_eq!(err.to_string(), "HTTP 500: boom");
    }

    #[test]
    fn test_reviewer_errors_are_distinct() {
        assert_eq!(ApiError::NoReviewers.to_string(), "no reviewers found on PR");
        assert!(ApiError::ReviewerUpdate("HTTP 403: nope".into())
            .to_string()
            .starts_with("failed to update reviewer vote"));
    }
}
