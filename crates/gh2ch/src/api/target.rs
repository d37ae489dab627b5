//! Request target descriptors and URL resolution.
//!
//! A [`Target`] is either a structured endpoint (base + path + query) or an
//! already-resolved URL string. Continuation links lifted from `Link` headers
//! arrive in the second form and are passed through unchanged.

use reqwest::Url;

use crate::api::error::ApiError;

/// Where a request goes.
#[derive(Debug, Clone)]
pub enum Target {
    /// An already-resolved absolute URL.
    Url(String),
    /// Base + path + query parameters, joined at send time.
    Endpoint {
        base: String,
        path: String,
        query: Vec<(String, String)>,
    },
}

impl Target {
    /// A structured endpoint with no query parameters.
    pub fn endpoint(base: impl Into<String>, path: impl Into<String>) -> Self {
        Target::Endpoint {
            base: base.into(),
            path: path.into(),
            query: Vec::new(),
        }
    }

    /// Append a query parameter. No-op on an already-resolved URL.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if let Target::Endpoint { query, .. } = &mut self {
            query.push((key.into(), value.into()));
        }
        self
    }

    /// Resolve into an absolute [`Url`].
    ///
    /// The query string is appended only when parameters are present, so an
    /// endpoint without parameters never ends in a dangling `?`.
    pub fn resolve(&self) -> Result<Url, ApiError> {
        match self {
            Target::Url(raw) => Url::parse(raw).map_err(|e| ApiError::target(raw, e)),
            Target::Endpoint { base, path, query } => {
                let raw = format!("{base}{path}");
                let mut url = Url::parse(&raw).map_err(|e| ApiError::target(&raw, e))?;
                if !query.is_empty() {
                    url.query_pairs_mut()
                        .extend_pairs(query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
                }
                Ok(url)
            }
        }
    }
}
