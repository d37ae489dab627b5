//! Clubhouse service fetchers.
//!
//! Typed wrappers over [`ApiClient`] for the Clubhouse endpoints the sync
//! needs. Clubhouse authenticates with a `token` query parameter rather than
//! a header.

use serde::{Deserialize, Serialize};

use crate::api::{ApiClient, ApiError, RequestOptions, Target};

pub const CLUBHOUSE_API_URL: &str = "https://api.clubhouse.io/api/v2";

// ── Wire types ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub id: String,
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Story {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub comments: Vec<StoryComment>,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryComment {
    pub author_id: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub complete: bool,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClubhouseLabel {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewStory {
    pub project_id: u64,
    pub name: String,
    pub description: String,
    pub comments: Vec<NewStoryComment>,
    pub labels: Vec<LabelRef>,
    pub created_at: String,
    pub updated_at: String,
    pub external_id: String,
    pub requested_by_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewStoryComment {
    pub author_id: String,
    pub text: String,
    pub created_at: String,
    pub updated_at: String,
    pub external_id: String,
}

/// Labels are attached to a new story by name.
#[derive(Debug, Clone, Serialize)]
pub struct LabelRef {
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewLabel {
    pub name: String,
    /// Hex color with the leading `#`.
    pub color: String,
}

// ── Client ─────────────────────────────────────────────────────────

/// Authenticated Clubhouse API client.
pub struct Clubhouse {
    api: ApiClient,
    token: String,
    base: String,
}

impl Clubhouse {
    pub fn new(token: impl Into<String>) -> Result<Self, ApiError> {
        Self::with_base_url(token, CLUBHOUSE_API_URL)
    }

    /// Point the client at a different API root (tests).
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

    fn target(&self, path: impl Into<String>) -> Target {
        Target::endpoint(&self.base, path).query("token", &self.token)
    }

    pub async fn get_story(&self, story_id: u64) -> Result<Story, ApiError> {
        self.api
            .fetch_json(&self.target(format!("/stories/{story_id}")), &RequestOptions::get())
            .await
    }

    pub async fn list_members(&self) -> Result<Vec<Member>, ApiError> {
        self.api
            .fetch_all_pages_as(&self.target("/members"), &RequestOptions::get())
            .await
    }

    pub async fn list_labels(&self) -> Result<Vec<ClubhouseLabel>, ApiError> {
        self.api
            .fetch_all_pages_as(&self.target("/labels"), &RequestOptions::get())
            .await
    }

    pub async fn list_projects(&self) -> Result<Vec<Project>, ApiError> {
        self.api
            .fetch_all_pages_as(&self.target("/projects"), &RequestOptions::get())
            .await
    }

    pub async fn create_story(&self, story: &NewStory) -> Result<Story, ApiError> {
        self.api
            .fetch_json(&self.target("/stories"), &RequestOptions::post(story)?)
            .await
    }

    pub async fn create_label(&self, label: &NewLabel) -> Result<ClubhouseLabel, ApiError> {
        self.api
            .fetch_json(&self.target("/labels"), &RequestOptions::post(label)?)
            .await
    }
}
