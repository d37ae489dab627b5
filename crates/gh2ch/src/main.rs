//! Import GitHub issues into Clubhouse stories, or the other way around.
//!
//! Tokens come from `~/.github-clubhouse` or from flags.
//!
//! # Examples
//!
//! ```sh
//! # Import one GitHub issue into the "Backend" Clubhouse project
//! gh2ch https://github.com/acme/widget/issues/42 Backend
//!
//! # Import every open bug into "Backend"
//! gh2ch --query "repo:acme/widget is:open label:bug" Backend
//!
//! # Export a Clubhouse story as a GitHub issue
//! gh2ch https://app.clubhouse.io/acme/story/123 acme/widget
//!
//! # Store tokens for later runs
//! gh2ch --github-token XXX --clubhouse-token YYY --save-config
//!
//! # See what would be created without creating it
//! gh2ch --dry-run https://github.com/acme/widget/issues/42 Backend
//! ```

use clap::Parser;
use gh2ch::config::{Config, load_config, save_config};
use gh2ch::github::Github;
use gh2ch::progress::ProgressLogger;
use gh2ch::sync::{
    SyncOptions, SyncOutcome, clubhouse_story_to_github_issue, github_issue_to_clubhouse_story,
};
use gh2ch::urls::{parse_clubhouse_story_url, parse_github_issue_url};
use std::process;

/// Import GitHub issues into Clubhouse stories, or the other way around.
///
/// The direction is inferred from the source argument: a GitHub issue URL
/// imports into Clubhouse, a Clubhouse story URL exports to GitHub.
#[derive(Parser)]
#[command(name = "gh2ch", version)]
struct Cli {
    /// GitHub issue URL or Clubhouse story URL to import from
    source: Option<String>,

    /// Clubhouse project name (importing) or GitHub repo (exporting)
    target: Option<String>,

    /// Import every issue matching a GitHub search query instead of a
    /// single URL (the one positional argument is the Clubhouse project
    /// name)
    #[arg(long)]
    query: Option<String>,

    /// GitHub API token (overrides the config file)
    #[arg(long)]
    github_token: Option<String>,

    /// Clubhouse API token (overrides the config file)
    #[arg(long)]
    clubhouse_token: Option<String>,

    /// Save the provided tokens to ~/.github-clubhouse and exit
    #[arg(short = 's', long)]
    save_config: bool,

    /// Print what would be created without creating anything
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Verbose logging on stderr
    #[arg(long)]
    verbose: bool,
}

/// Merge the config file with command-line overrides.
fn resolve_config(cli: &Cli) -> Result<Config, String> {
    let mut config = load_config()?;
    if let Some(token) = &cli.github_token {
        config.github_token = Some(token.clone());
    }
    if let Some(token) = &cli.clubhouse_token {
        config.clubhouse_token = Some(token.clone());
    }
    Ok(config)
}

fn sync_options(cli: &Cli, config: &Config) -> Result<SyncOptions, String> {
    let github_token = config
        .github_token
        .clone()
        .ok_or_else(|| "no GitHub token; pass --github-token or save one with --save-config".to_string())?;
    let clubhouse_token = config
        .clubhouse_token
        .clone()
        .ok_or_else(|| "no Clubhouse token; pass --clubhouse-token or save one with --save-config".to_string())?;
    Ok(SyncOptions {
        github_token,
        clubhouse_token,
        user_mappings: config.user_mappings.clone(),
        dry_run: cli.dry_run,
    })
}

fn render_outcome(outcome: SyncOutcome) -> Result<String, String> {
    match outcome {
        SyncOutcome::Created(record) => {
            serde_json::to_string_pretty(&record).map_err(|e| e.to_string())
        }
        SyncOutcome::DryRun(payload) => {
            let rendered =
                serde_json::to_string_pretty(&payload).map_err(|e| e.to_string())?;
            Ok(format!("would create:\n{rendered}"))
        }
    }
}

/// The Clubhouse project a `--query` import goes into. Query mode takes a
/// single positional, which clap binds to `source`.
fn query_project(cli: &Cli) -> Result<&String, String> {
    match (&cli.target, &cli.source) {
        (Some(project), _) | (None, Some(project)) => Ok(project),
        (None, None) => Err("provide the Clubhouse project name (see --help)".to_string()),
    }
}

fn render_query_summary(
    dry_run: bool,
    imported: usize,
    payloads: &[serde_json::Value],
) -> Result<String, String> {
    if dry_run {
        let rendered = serde_json::to_string_pretty(payloads).map_err(|e| e.to_string())?;
        Ok(format!("would create {} stories:\n{rendered}", payloads.len()))
    } else {
        Ok(format!("Imported {imported} stories"))
    }
}

/// Import every issue matching a GitHub search query.
async fn import_query(
    query: &str,
    project_name: &str,
    options: &SyncOptions,
) -> Result<String, String> {
    let github = Github::new(&options.github_token).map_err(|e| e.to_string())?;
    let issues = github.search_issues(query).await.map_err(|e| e.to_string())?;

    let mut progress = ProgressLogger::new(std::io::stderr());
    let mut imported = 0usize;
    let mut payloads = Vec::new();
    for issue in &issues {
        progress.log(format!("importing into '{project_name}'"));
        match github_issue_to_clubhouse_story(&issue.html_url, project_name, options).await? {
            SyncOutcome::Created(_) => imported += 1,
            SyncOutcome::DryRun(payload) => payloads.push(payload),
        }
    }
    progress.finish();
    render_query_summary(options.dry_run, imported, &payloads)
}

async fn run(cli: &Cli) -> Result<String, String> {
    let config = resolve_config(cli)?;

    if cli.save_config {
        if cli.github_token.is_none() || cli.clubhouse_token.is_none() {
            return Err(
                "cannot save configuration unless both --github-token and --clubhouse-token are provided"
                    .to_string(),
            );
        }
        save_config(&config)?;
        return Ok("Configuration saved".to_string());
    }

    if let Some(query) = &cli.query {
        let project = query_project(cli)?;
        let options = sync_options(cli, &config)?;
        return import_query(query, project, &options).await;
    }

    let (source, target) = match (&cli.source, &cli.target) {
        (Some(source), Some(target)) => (source, target),
        _ => return Err("provide a source URL and a target (see --help)".to_string()),
    };
    let options = sync_options(cli, &config)?;

    let outcome = if parse_github_issue_url(source).is_ok() {
        github_issue_to_clubhouse_story(source, target, &options).await?
    } else if parse_clubhouse_story_url(source).is_ok() {
        clubhouse_story_to_github_issue(source, target, &options).await?
    } else {
        return Err(format!(
            "'{source}' is neither a GitHub issue URL nor a Clubhouse story URL"
        ));
    };
    render_outcome(outcome)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::WARN
        })
        .with_writer(std::io::stderr)
        .init();

    match run(&cli).await {
        Ok(output) => println!("{output}"),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}
