//! GitHub service fetchers.
//!
//! Typed wrappers over [`ApiClient`] for the handful of GitHub v3 endpoints
//! the sync needs. List endpoints paginate via `Link` headers; the search
//! endpoint returns object pages whose `items` arrays get flattened.

use serde::{Deserialize, Serialize};

use crate::api::{ApiClient, ApiError, RequestOptions, Target};

pub const GITHUB_API_URL: &str = "https://api.github.com";

// ── Wire types ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    /// Issue bodies can be null on the wire.
    #[serde(default)]
    pub body: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub html_url: String,
    pub user: IssueUser,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueUser {
    pub login: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueComment {
    pub body: String,
    pub user: IssueUser,
    pub created_at: String,
    pub updated_at: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueLabel {
    pub name: String,
    /// Hex color without the leading `#`.
    pub color: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewIssue {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewComment {
    pub body: String,
}

// ── Client ─────────────────────────────────────────────────────────

/// Authenticated GitHub API client.
pub struct Github {
    api: ApiClient,
    token: String,
    base: String,
}

impl Github {
    pub fn new(token: impl Into<String>) -> Result<Self, ApiError> {
        Self::with_base_url(token, GITHUB_API_URL)
    }

    /// Point the client at a different API root (tests, GitHub Enterprise).
    pub fn with_base_url(
        token: impl Into<String>,
        base: impl Into<String>,
    ) -> Result<Self, ApiError> {
        Ok(Self {
            api: ApiClient::new()?,
            token: token.into(),
            base: base.into(),
        })
    }

    fn authed(&self, opts: RequestOptions) -> RequestOptions {
        opts.header("Authorization", format!("token {}", self.token))
    }

    pub async fn get_issue(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Issue, ApiError> {
        let target = Target::endpoint(&self.base, format!("/repos/{owner}/{repo}/issues/{number}"));
        self.api
            .fetch_json(&target, &self.authed(RequestOptions::get()))
            .await
    }

    pub async fn get_comments_for_issue(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<IssueComment>, ApiError> {
        let target = Target::endpoint(
            &self.base,
            format!("/repos/{owner}/{repo}/issues/{number}/comments"),
        );
        self.api
            .fetch_all_pages_as(&target, &self.authed(RequestOptions::get()))
            .await
    }

    pub async fn get_labels_for_issue(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<IssueLabel>, ApiError> {
        let target = Target::endpoint(
            &self.base,
            format!("/repos/{owner}/{repo}/issues/{number}/labels"),
        );
        self.api
            .fetch_all_pages_as(&target, &self.authed(RequestOptions::get()))
            .await
    }

    /// Issues matching a search query, across every result page.
    ///
    /// Search pages are objects, not arrays; each page's `items` array is
    /// flattened into one sequence.
    pub async fn search_issues(&self, query: &str) -> Result<Vec<Issue>, ApiError> {
        let target = Target::endpoint(&self.base, "/search/issues").query("q", query);
        let url = target.resolve()?;
        let pages = self
            .api
            .fetch_all_pages(&target, &self.authed(RequestOptions::get()))
            .await?;

        let mut issues = Vec::new();
        for page in pages {
            let items = page
                .get("items")
                .cloned()
                .unwrap_or(serde_json::Value::Array(Vec::new()));
            let mut batch: Vec<Issue> =
                serde_json::from_value(items).map_err(|e| ApiError::decode(e, &url))?;
            issues.append(&mut batch);
        }
        Ok(issues)
    }

    pub async fn create_issue(
        &self,
        owner: &str,
        repo: &str,
        issue: &NewIssue,
    ) -> Result<Issue, ApiError> {
        let target = Target::endpoint(&self.base, format!("/repos/{owner}/{repo}/issues"));
        self.api
            .fetch_json(&target, &self.authed(RequestOptions::post(issue)?))
            .await
    }

    pub async fn create_issue_comment(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        comment: &NewComment,
    ) -> Result<IssueComment, ApiError> {
        let target = Target::endpoint(
            &self.base,
            format!("/repos/{owner}/{repo}/issues/{number}/comments"),
        );
        self.api
            .fetch_json(&target, &self.authed(RequestOptions::post(comment)?))
            .await
    }
}
