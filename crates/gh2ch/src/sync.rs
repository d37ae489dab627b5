//! Issue ↔ story field mapping and the two import directions.
//!
//! The mapping functions are pure; the two async entry points wire them to
//! the service fetchers. An import either fully succeeds or returns an error;
//! partially imported comment lists are possible only on the create side
//! (the target service has no transactions), never on the fetch side.

use std::collections::{HashMap, HashSet};

use serde_json::Value;
use tracing::{info, warn};

use crate::clubhouse::{
    Clubhouse, LabelRef, Member, NewLabel, NewStory, NewStoryComment, Story, StoryComment,
};
use crate::github::{Github, Issue, IssueComment, IssueLabel, NewComment, NewIssue};
use crate::urls::{parse_clubhouse_story_url, parse_github_issue_url, parse_github_repo_url};

/// Tokens and knobs for one import run.
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    pub github_token: String,
    pub clubhouse_token: String,
    /// GitHub login → Clubhouse username overrides.
    pub user_mappings: HashMap<String, String>,
    /// Build and return the payload without creating anything.
    pub dry_run: bool,
}

/// What an import produced.
#[derive(Debug)]
pub enum SyncOutcome {
    /// The record created in the target service.
    Created(Value),
    /// Dry run: the payload that would have been sent.
    DryRun(Value),
}

/// Import a GitHub issue into the named Clubhouse project.
pub async fn github_issue_to_clubhouse_story(
    issue_url: &str,
    project_name: &str,
    options: &SyncOptions,
) -> Result<SyncOutcome, String> {
    let (owner, repo, number) = parse_github_issue_url(issue_url)?;
    let github = Github::new(&options.github_token).map_err(|e| e.to_string())?;
    let clubhouse = Clubhouse::new(&options.clubhouse_token).map_err(|e| e.to_string())?;
    import_issue(
        &github,
        &clubhouse,
        &owner,
        &repo,
        number,
        project_name,
        options,
    )
    .await
}

/// Import a Clubhouse story into the given GitHub repository.
pub async fn clubhouse_story_to_github_issue(
    story_url: &str,
    repo_url: &str,
    options: &SyncOptions,
) -> Result<SyncOutcome, String> {
    let story_id = parse_clubhouse_story_url(story_url)?;
    let (owner, repo) = parse_github_repo_url(repo_url)?;
    let github = Github::new(&options.github_token).map_err(|e| e.to_string())?;
    let clubhouse = Clubhouse::new(&options.clubhouse_token).map_err(|e| e.to_string())?;
    import_story(&github, &clubhouse, story_id, story_url, &owner, &repo, options).await
}

async fn import_issue(
    github: &Github,
    clubhouse: &Clubhouse,
    owner: &str,
    repo: &str,
    number: u64,
    project_name: &str,
    options: &SyncOptions,
) -> Result<SyncOutcome, String> {
    let members = clubhouse.list_members().await.map_err(|e| e.to_string())?;

    let mut existing_labels: HashSet<String> = clubhouse
        .list_labels()
        .await
        .map_err(|e| e.to_string())?
        .into_iter()
        .map(|label| label.name)
        .collect();

    let projects = clubhouse.list_projects().await.map_err(|e| e.to_string())?;
    let project = projects
        .iter()
        .find(|p| p.name == project_name)
        .ok_or_else(|| format!("the '{project_name}' project wasn't found in your Clubhouse"))?;

    let issue = github
        .get_issue(owner, repo, number)
        .await
        .map_err(|e| e.to_string())?;
    let comments = github
        .get_comments_for_issue(owner, repo, number)
        .await
        .map_err(|e| e.to_string())?;
    let labels = github
        .get_labels_for_issue(owner, repo, number)
        .await
        .map_err(|e| e.to_string())?;

    // Create any labels Clubhouse doesn't have yet, so the story can
    // reference them by name.
    for label in &labels {
        if existing_labels.insert(label.name.clone()) {
            info!("creating Clubhouse label '{}'", label.name);
            if !options.dry_run {
                clubhouse
                    .create_label(&NewLabel {
                        name: label.name.clone(),
                        color: format!("#{}", label.color),
                    })
                    .await
                    .map_err(|e| e.to_string())?;
            }
        }
    }

    let story = issue_to_story(
        &members,
        &options.user_mappings,
        project.id,
        &issue,
        &comments,
        &labels,
    )?;

    if options.dry_run {
        return Ok(SyncOutcome::DryRun(
            serde_json::to_value(&story).map_err(|e| e.to_string())?,
        ));
    }
    let created = clubhouse
        .create_story(&story)
        .await
        .map_err(|e| e.to_string())?;
    Ok(SyncOutcome::Created(
        serde_json::to_value(&created).map_err(|e| e.to_string())?,
    ))
}

async fn import_story(
    github: &Github,
    clubhouse: &Clubhouse,
    story_id: u64,
    story_url: &str,
    owner: &str,
    repo: &str,
    options: &SyncOptions,
) -> Result<SyncOutcome, String> {
    let members = clubhouse.list_members().await.map_err(|e| e.to_string())?;
    let members_by_id: HashMap<&str, &Member> =
        members.iter().map(|m| (m.id.as_str(), m)).collect();

    let story = clubhouse
        .get_story(story_id)
        .await
        .map_err(|e| e.to_string())?;
    let issue = story_to_issue(story_url, &story);
    let comments = story_comments_to_issue_comments(&story.comments, &members_by_id);

    if options.dry_run {
        let payload = serde_json::json!({ "issue": issue, "comments": comments });
        return Ok(SyncOutcome::DryRun(payload));
    }

    let created = github
        .create_issue(owner, repo, &issue)
        .await
        .map_err(|e| e.to_string())?;
    for comment in &comments {
        github
            .create_issue_comment(owner, repo, created.number, comment)
            .await
            .map_err(|e| e.to_string())?;
    }
    Ok(SyncOutcome::Created(
        serde_json::to_value(&created).map_err(|e| e.to_string())?,
    ))
}

// ── Mapping ────────────────────────────────────────────────────────

/// Resolve a GitHub login to a Clubhouse member id.
///
/// The configured username overrides apply first; an unknown user falls back
/// to the first member (with a warning) so imports of issues from departed
/// contributors still go through.
fn map_user(
    members: &[Member],
    mappings: &HashMap<String, String>,
    github_login: &str,
) -> Option<String> {
    let username = mappings
        .get(github_login)
        .map(String::as_str)
        .unwrap_or(github_login);
    if let Some(member) = members.iter().find(|m| m.username == username) {
        return Some(member.id.clone());
    }
    warn!("user '{username}' is missing from Clubhouse, falling back to the first member");
    members.first().map(|m| m.id.clone())
}

fn issue_to_story(
    members: &[Member],
    mappings: &HashMap<String, String>,
    project_id: u64,
    issue: &Issue,
    comments: &[IssueComment],
    labels: &[IssueLabel],
) -> Result<NewStory, String> {
    let requested_by_id = map_user(members, mappings, &issue.user.login)
        .ok_or_else(|| "no Clubhouse members available to assign".to_string())?;

    Ok(NewStory {
        project_id,
        name: issue.title.clone(),
        description: issue.body.clone().unwrap_or_default(),
        comments: comments
            .iter()
            .map(|c| NewStoryComment {
                author_id: map_user(members, mappings, &c.user.login)
                    .unwrap_or_else(|| requested_by_id.clone()),
                text: c.body.clone(),
                created_at: c.created_at.clone(),
                updated_at: c.updated_at.clone(),
                external_id: c.url.clone(),
            })
            .collect(),
        labels: labels
            .iter()
            .map(|l| LabelRef {
                name: l.name.clone(),
            })
            .collect(),
        created_at: issue.created_at.clone(),
        updated_at: issue.updated_at.clone(),
        external_id: issue.html_url.clone(),
        requested_by_id,
    })
}

fn story_to_issue(story_url: &str, story: &Story) -> NewIssue {
    let rendered_tasks = story
        .tasks
        .iter()
        .map(|task| {
            format!(
                "- [{}] {}",
                if task.complete { 'x' } else { ' ' },
                task.description
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    let tasks_section = if rendered_tasks.is_empty() {
        String::new()
    } else {
        format!("\n### Tasks\n\n{rendered_tasks}")
    };
    let provenance = format!("From [ch{}]({story_url})", story.id);

    NewIssue {
        title: story.name.clone(),
        body: format!("{provenance}\n\n{}{tasks_section}", story.description),
    }
}

fn story_comments_to_issue_comments(
    comments: &[StoryComment],
    members_by_id: &HashMap<&str, &Member>,
) -> Vec<NewComment> {
    comments
        .iter()
        .map(|comment| {
            let username = members_by_id
                .get(comment.author_id.as_str())
                .map(|m| m.username.as_str())
                .unwrap_or(comment.author_id.as_str());
            NewComment {
                body: format!(
                    "**[Comment from Clubhouse user @{username}:]** {}",
                    comment.text
                ),
            }
        })
        .collect()
}
