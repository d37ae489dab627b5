//! Import GitHub issues into Clubhouse stories and back.
//!
//! The interesting machinery lives in [`api`]: a retrying, paginating HTTP
//! client shared by the [`github`] and [`clubhouse`] fetchers. [`sync`] maps
//! records between the two services and drives an import end to end.

pub mod api;
pub mod clubhouse;
pub mod config;
pub mod github;
pub mod progress;
pub mod sync;
pub mod urls;

pub use api::{ApiClient, ApiError, RequestOptions, RetryPolicy, Target};
pub use config::Config;
pub use sync::{SyncOptions, SyncOutcome, clubhouse_story_to_github_issue, github_issue_to_clubhouse_story};
