//! Structured API errors and deferred error-body logging.

use reqwest::{Response, Url};
use thiserror::Error;
use tracing::debug;

/// Terminal failure from the API layer.
///
/// Constructed only once a call chain has given up: a non-ok response that
/// will not be retried, an exhausted transport budget, or an unusable target.
/// The failing response's body is never carried on the error; it is logged
/// on a detached task instead (see [`log_error_body`]).
#[derive(Debug, Error)]
pub enum ApiError {
    /// Non-ok HTTP status that was not (or no longer) retryable.
    #[error("API error {status} ({status_text}) trying to invoke {url}")]
    Status {
        status: u16,
        status_text: String,
        url: String,
    },
    /// The transport call itself failed (connect, DNS, reset) with no
    /// retry budget left.
    #[error("transport error trying to invoke {url}: {message}")]
    Transport { message: String, url: String },
    /// The request target could not be resolved into a URL.
    #[error("invalid request target '{target}': {message}")]
    Target { target: String, message: String },
    /// The response body was not the JSON the caller asked for.
    #[error("failed to decode response from {url}: {message}")]
    Decode { message: String, url: String },
    /// The request body could not be encoded as JSON.
    #[error("failed to encode request body: {0}")]
    Body(String),
    /// The HTTP client itself could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Init(String),
}

impl ApiError {
    pub(crate) fn status(resp: &Response) -> Self {
        let status = resp.status();
        ApiError::Status {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("unknown").to_string(),
            url: resp.url().to_string(),
        }
    }

    pub(crate) fn transport(err: &reqwest::Error, url: &Url) -> Self {
        ApiError::Transport {
            message: err.to_string(),
            url: url.to_string(),
        }
    }

    pub(crate) fn target(target: &str, err: impl std::fmt::Display) -> Self {
        ApiError::Target {
            target: target.to_string(),
            message: err.to_string(),
        }
    }

    pub(crate) fn decode(err: impl std::fmt::Display, url: &Url) -> Self {
        ApiError::Decode {
            message: err.to_string(),
            url: url.to_string(),
        }
    }
}

/// Log a failing response's body for diagnostics on a detached task.
///
/// The body is read after the error value has already been handed to the
/// caller, so error propagation never waits on log I/O.
pub(crate) fn log_error_body(resp: Response) {
    let url = resp.url().to_string();
    tokio::spawn(async move {
        match resp.text().await {
            Ok(body) if !body.is_empty() => debug!(%url, "error response body: {body}"),
            Ok(_) => {}
            Err(e) => debug!(%url, "error response body unavailable: {e}"),
        }
    });
}
