//! `Link` continuation-header parsing.
//!
//! List endpoints advertise the next page of results as
//! `<https://…>; rel="next"`. Some endpoints additionally attach a `results`
//! attribute to the relation; `results="false"` means the advertised page is
//! known to be empty and the chain ends even though a URL is present.

use std::collections::HashMap;

use reqwest::header::{HeaderMap, LINK};

/// One relation parsed out of a `Link` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRelation {
    pub url: String,
    /// The relation's attributes (`rel` included), lowercased keys, quotes
    /// stripped from values.
    pub params: HashMap<String, String>,
}

/// Parse a raw `Link` header value into a `rel → relation` map.
///
/// Malformed segments and entries without a `rel` attribute are skipped
/// rather than failing the whole header.
pub fn parse_link_header(raw: &str) -> HashMap<String, LinkRelation> {
    let mut relations = HashMap::new();
    for entry in raw.split(',') {
        let mut parts = entry.split(';');
        let Some(url_part) = parts.next() else {
            continue;
        };
        let Some(url) = url_part
            .trim()
            .strip_prefix('<')
            .and_then(|s| s.strip_suffix('>'))
        else {
            continue;
        };

        let mut params = HashMap::new();
        for param in parts {
            let Some((key, value)) = param.split_once('=') else {
                continue;
            };
            params.insert(
                key.trim().to_ascii_lowercase(),
                value.trim().trim_matches('"').to_string(),
            );
        }
        let Some(rel) = params.get("rel").cloned() else {
            continue;
        };
        relations.insert(
            rel,
            LinkRelation {
                url: url.to_string(),
                params,
            },
        );
    }
    relations
}

/// The URL of the next page advertised by `headers`, if pagination continues.
///
/// The `results` attribute is matched against the fixed literals `"true"` and
/// `"false"` only: `"false"` ends the chain, and anything else (including
/// unrecognized values) continues it.
pub fn next_page_url(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(LINK)?.to_str().ok()?;
    let relations = parse_link_header(raw);
    let next = relations.get("next")?;
    match next.params.get("results").map(String::as_str) {
        Some("false") => None,
        _ => Some(next.url.clone()),
    }
}
