//! Single-purpose URL parsers for the two services.

/// Parse `https://github.com/<owner>/<repo>` (a plain `owner/repo` works
/// too) into `(owner, repo)`.
pub fn parse_github_repo_url(url: &str) -> Result<(String, String), String> {
    let trimmed = url.trim_end_matches('/');
    let path = trimmed
        .strip_prefix("https://github.com/")
        .or_else(|| trimmed.strip_prefix("http://github.com/"))
        .unwrap_or(trimmed);

    let mut parts = path.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(owner), Some(repo), None) if !owner.is_empty() && !repo.is_empty() => {
            Ok((owner.to_string(), repo.to_string()))
        }
        _ => Err(format!("'{url}' is not a GitHub repo URL")),
    }
}

/// Parse `https://github.com/<owner>/<repo>/issues/<number>` into
/// `(owner, repo, number)`.
pub fn parse_github_issue_url(url: &str) -> Result<(String, String, u64), String> {
    let trimmed = url.trim_end_matches('/');
    let path = trimmed
        .strip_prefix("https://github.com/")
        .or_else(|| trimmed.strip_prefix("http://github.com/"))
        .ok_or_else(|| format!("'{url}' is not a GitHub issue URL"))?;

    let mut parts = path.split('/');
    match (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) {
        (Some(owner), Some(repo), Some("issues"), Some(number), None)
            if !owner.is_empty() && !repo.is_empty() =>
        {
            let number = number
                .parse()
                .map_err(|_| format!("'{number}' is not an issue number"))?;
            Ok((owner.to_string(), repo.to_string(), number))
        }
        _ => Err(format!("'{url}' is not a GitHub issue URL")),
    }
}

/// Parse `https://app.clubhouse.io/<org>/story/<id>[/<slug>]` into the
/// story id.
pub fn parse_clubhouse_story_url(url: &str) -> Result<u64, String> {
    let trimmed = url.trim_end_matches('/');
    let path = trimmed
        .strip_prefix("https://app.clubhouse.io/")
        .or_else(|| trimmed.strip_prefix("http://app.clubhouse.io/"))
        .ok_or_else(|| format!("'{url}' is not a Clubhouse story URL"))?;

    let mut parts = path.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(org), Some("story"), Some(id)) if !org.is_empty() => id
            .parse()
            .map_err(|_| format!("'{id}' is not a story id")),
        _ => Err(format!("'{url}' is not a Clubhouse story URL")),
    }
}
