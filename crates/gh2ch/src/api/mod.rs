//! The resilient, paginated JSON API layer.
//!
//! Everything between the service fetchers ([`crate::github`],
//! [`crate::clubhouse`]) and the wire:
//!
//! - [`target`]: request descriptors and URL resolution.
//! - [`client`]: raw transport, bounded retry (rate-limit signals retried
//!   for free, transport failures consume a budget), single-call JSON fetch,
//!   and ordered `Link`-header pagination.
//! - [`link`]: continuation-link parsing, including the `results`
//!   availability attribute.
//! - [`error`]: terminal [`ApiError`] and detached error-body logging.

pub mod client;
pub mod error;
pub mod link;
pub mod target;

pub use client::{ApiClient, RequestOptions, RetryPolicy};
pub use error::ApiError;
pub use target::Target;
