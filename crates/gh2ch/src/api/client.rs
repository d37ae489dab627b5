//! The resilient JSON API client: raw transport, bounded retry, single-call
//! fetch, and ordered pagination.
//!
//! [`ApiClient::send_with_retry`] is the heart of the module. It returns only
//! a successful response or a terminal [`ApiError`], classifying everything
//! in between:
//!
//! - **Rate-limit signals** (status 429, or 403 carrying the service's
//!   rate-limit-reset header) are retried after a fixed delay without
//!   consuming the budget. Throttling is not a failing endpoint.
//! - **Transport failures** (connect, DNS, reset) consume one unit of the
//!   bounded retry budget each.
//! - Any other non-ok status is terminal immediately.
//!
//! [`ApiClient::fetch_all_pages`] follows server-advertised `next`
//! continuation links, concatenating page results in strict chain order. A
//! terminal failure anywhere in the chain discards the whole accumulation:
//! callers get the full sequence or an error, never a truncated result.

use std::time::Duration;

use reqwest::header::ACCEPT;
use reqwest::{Method, Response, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::api::error::{ApiError, log_error_body};
use crate::api::link::next_page_url;
use crate::api::target::Target;

/// Response header whose presence turns a 403 into a rate-limit signal
/// (how GitHub reports throttling). The reset timestamp it carries is
/// deliberately not parsed; the fixed retry delay applies instead.
const RATE_LIMIT_RESET_HEADER: &str = "x-ratelimit-reset";

/// Default transport-failure retry budget.
pub const MAX_RETRIES: u32 = 3;
/// Default fixed delay between retries.
pub const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Fixed-delay bounded retry policy.
///
/// `max_retries` bounds transport-failure retries only; rate-limit retries
/// are free. The remaining budget lives in a local variable inside each call;
/// nothing is shared across concurrent calls.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            delay: RETRY_DELAY,
        }
    }
}

/// Options for one request: method, extra headers, optional JSON body.
///
/// Caller headers override the default `Accept: application/json` on name
/// collision.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::get()
    }
}

impl RequestOptions {
    /// A GET request with no extra headers.
    pub fn get() -> Self {
        Self {
            method: Method::GET,
            headers: Vec::new(),
            body: None,
        }
    }

    /// A POST request with a JSON body.
    pub fn post<T: Serialize>(body: &T) -> Result<Self, ApiError> {
        let body = serde_json::to_value(body).map_err(|e| ApiError::Body(e.to_string()))?;
        Ok(Self {
            method: Method::POST,
            headers: Vec::new(),
            body: Some(body),
        })
    }

    /// Append a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Async JSON client with bounded retry and `Link`-header pagination.
pub struct ApiClient {
    http: reqwest::Client,
    policy: RetryPolicy,
}

impl ApiClient {
    /// Create a client with the default retry policy.
    pub fn new() -> Result<Self, ApiError> {
        Self::with_policy(RetryPolicy::default())
    }

    /// Create a client with an explicit retry policy.
    pub fn with_policy(policy: RetryPolicy) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("gh2ch/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| ApiError::Init(e.to_string()))?;
        Ok(Self { http, policy })
    }

    /// One raw HTTP request. Merges the default `Accept` header under the
    /// caller's headers; no retry, no status validation.
    async fn send_raw(&self, url: &Url, opts: &RequestOptions) -> Result<Response, reqwest::Error> {
        let mut req = self.http.request(opts.method.clone(), url.clone());
        if !opts
            .headers
            .iter()
            .any(|(name, _)| name.eq_ignore_ascii_case("accept"))
        {
            req = req.header(ACCEPT, "application/json");
        }
        for (name, value) in &opts.headers {
            req = req.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &opts.body {
            req = req.json(body);
        }
        debug!("api request: {} {url}", opts.method);
        req.send().await
    }

    /// Send with bounded retry, returning only an ok response or a terminal
    /// error.
    pub async fn send_with_retry(
        &self,
        target: &Target,
        opts: &RequestOptions,
    ) -> Result<Response, ApiError> {
        let url = target.resolve()?;
        let mut budget = self.policy.max_retries;
        loop {
            match self.send_raw(&url, opts).await {
                Ok(resp) if resp.status().is_success() => return Ok(resp),
                Ok(resp) if is_rate_limited(&resp) && budget > 0 => {
                    warn!(
                        "rate limited by {url}, retrying in {:?}",
                        self.policy.delay
                    );
                    tokio::time::sleep(self.policy.delay).await;
                }
                Ok(resp) => {
                    let err = ApiError::status(&resp);
                    log_error_body(resp);
                    return Err(err);
                }
                // A builder error (e.g. an invalid header value) will fail
                // identically on every attempt; only genuine transport
                // failures consume budget.
                Err(e) if budget > 0 && !e.is_builder() => {
                    budget -= 1;
                    warn!("request to {url} failed ({e}), {budget} retries left");
                    tokio::time::sleep(self.policy.delay).await;
                }
                Err(e) => return Err(ApiError::transport(&e, &url)),
            }
        }
    }

    /// Fetch one JSON document. No pagination.
    pub async fn fetch_json<T: DeserializeOwned>(
        &self,
        target: &Target,
        opts: &RequestOptions,
    ) -> Result<T, ApiError> {
        let resp = self.send_with_retry(target, opts).await?;
        let url = resp.url().clone();
        resp.json().await.map_err(|e| ApiError::decode(e, &url))
    }

    /// Follow `next` continuation links, concatenating page results in
    /// server-advertised order.
    ///
    /// Array pages are flattened; a non-array page is appended as a single
    /// value. Termination is guaranteed because every iteration consumes a
    /// distinct server-issued URL; there is no artificial page cap.
    pub async fn fetch_all_pages(
        &self,
        target: &Target,
        opts: &RequestOptions,
    ) -> Result<Vec<Value>, ApiError> {
        let mut results = Vec::new();
        let mut current = target.clone();
        loop {
            let resp = self.send_with_retry(&current, opts).await?;
            let url = resp.url().clone();
            let next = next_page_url(resp.headers());
            let page: Value = resp.json().await.map_err(|e| ApiError::decode(e, &url))?;
            match page {
                Value::Array(items) => results.extend(items),
                other => results.push(other),
            }
            match next {
                Some(next_url) => {
                    debug!("following next page: {next_url}");
                    current = Target::Url(next_url);
                }
                None => return Ok(results),
            }
        }
    }

    /// [`fetch_all_pages`](Self::fetch_all_pages), deserializing every
    /// accumulated record into `T`.
    pub async fn fetch_all_pages_as<T: DeserializeOwned>(
        &self,
        target: &Target,
        opts: &RequestOptions,
    ) -> Result<Vec<T>, ApiError> {
        let url = target.resolve()?;
        self.fetch_all_pages(target, opts)
            .await?
            .into_iter()
            .map(|item| serde_json::from_value(item).map_err(|e| ApiError::decode(e, &url)))
            .collect()
    }
}

/// 429 always; 403 only when the service attaches its rate-limit-reset
/// header.
fn is_rate_limited(resp: &Response) -> bool {
    resp.status() == StatusCode::TOO_MANY_REQUESTS
        || (resp.status() == StatusCode::FORBIDDEN
            && resp.headers().contains_key(RATE_LIMIT_RESET_HEADER))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(max_retries: u32) -> ApiClient {
        ApiClient::with_policy(RetryPolicy {
            max_retries,
            delay: Duration::from_millis(5),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn fetch_json_returns_parsed_body_with_one_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/widget"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 7, "name": "x"})))
            .expect(1)
            .mount(&server)
            .await;

        let target = Target::endpoint(server.uri(), "/widget");
        let body: Value = client(3)
            .fetch_json(&target, &RequestOptions::get())
            .await
            .unwrap();
        assert_eq!(body, json!({"id": 7, "name": "x"}));
    }

    #[tokio::test]
    async fn default_accept_header_is_sent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/accept"))
            .and(header("accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let target = Target::endpoint(server.uri(), "/accept");
        let body: Value = client(0)
            .fetch_json(&target, &RequestOptions::get())
            .await
            .unwrap();
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn caller_accept_header_overrides_default() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/accept"))
            .and(header("accept", "application/vnd.github.v3+json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let target = Target::endpoint(server.uri(), "/accept");
        let opts = RequestOptions::get().header("Accept", "application/vnd.github.v3+json");
        let body: Value = client(0).fetch_json(&target, &opts).await.unwrap();
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn post_sends_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/stories"))
            .and(body_json(json!({"name": "a story"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 1})))
            .expect(1)
            .mount(&server)
            .await;

        let target = Target::endpoint(server.uri(), "/stories");
        let opts = RequestOptions::post(&json!({"name": "a story"})).unwrap();
        let body: Value = client(0).fetch_json(&target, &opts).await.unwrap();
        assert_eq!(body, json!({"id": 1}));
    }

    #[tokio::test]
    async fn rate_limit_retries_are_free() {
        let server = MockServer::start().await;
        // Two 429s, then success. A budget of 1 survives both because
        // rate-limit retries don't consume it.
        Mock::given(method("GET"))
            .and(path("/limited"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/limited"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(["ok"])))
            .expect(1)
            .mount(&server)
            .await;

        let target = Target::endpoint(server.uri(), "/limited");
        let body: Value = client(1)
            .fetch_json(&target, &RequestOptions::get())
            .await
            .unwrap();
        assert_eq!(body, json!(["ok"]));
    }

    #[tokio::test]
    async fn forbidden_with_reset_header_is_a_rate_limit_signal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/throttled"))
            .respond_with(
                ResponseTemplate::new(403).insert_header("x-ratelimit-reset", "1700000000"),
            )
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/throttled"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let target = Target::endpoint(server.uri(), "/throttled");
        let body: Value = client(1)
            .fetch_json(&target, &RequestOptions::get())
            .await
            .unwrap();
        assert_eq!(body, json!({"ok": true}));
    }

    #[tokio::test]
    async fn forbidden_without_reset_header_is_terminal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/forbidden"))
            .respond_with(ResponseTemplate::new(403))
            .expect(1)
            .mount(&server)
            .await;

        let target = Target::endpoint(server.uri(), "/forbidden");
        let err = client(3)
            .fetch_json::<Value>(&target, &RequestOptions::get())
            .await
            .unwrap_err();
        match err {
            ApiError::Status { status, .. } => assert_eq!(status, 403),
            other => panic!("expected status error, got: {other}"),
        }
    }

    #[tokio::test]
    async fn rate_limit_with_exhausted_budget_is_terminal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/limited"))
            .respond_with(ResponseTemplate::new(429))
            .expect(1)
            .mount(&server)
            .await;

        let target = Target::endpoint(server.uri(), "/limited");
        let err = client(0)
            .fetch_json::<Value>(&target, &RequestOptions::get())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 429, .. }));
    }

    #[tokio::test]
    async fn not_found_carries_status_text_and_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let target = Target::endpoint(server.uri(), "/missing");
        let err = client(3)
            .fetch_json::<Value>(&target, &RequestOptions::get())
            .await
            .unwrap_err();
        match err {
            ApiError::Status {
                status,
                status_text,
                url,
            } => {
                assert_eq!(status, 404);
                assert_eq!(status_text, "Not Found");
                assert!(url.ends_with("/missing"));
            }
            other => panic!("expected status error, got: {other}"),
        }
    }

    #[tokio::test]
    async fn transport_failure_exhausts_budget_then_fails() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicUsize, Ordering};

        // A listener that accepts and immediately drops every connection, so
        // each attempt fails in transport and can be counted.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                counter.fetch_add(1, Ordering::SeqCst);
                drop(stream);
            }
        });

        let target = Target::Url(format!("http://{addr}/"));
        let err = client(2)
            .fetch_json::<Value>(&target, &RequestOptions::get())
            .await
            .unwrap_err();
        match err {
            ApiError::Transport { message, url } => {
                assert!(!message.is_empty());
                assert!(url.contains(&addr.port().to_string()));
            }
            other => panic!("expected transport error, got: {other}"),
        }
        // The initial attempt plus one per unit of budget.
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    fn next_link(server: &MockServer, page: &str) -> String {
        format!("<{}{page}>; rel=\"next\"", server.uri())
    }

    #[tokio::test]
    async fn pagination_concatenates_pages_in_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/p1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([1, 2]))
                    .insert_header("link", next_link(&server, "/p2").as_str()),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/p2"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([3]))
                    .insert_header("link", next_link(&server, "/p3").as_str()),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/p3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([4, 5])))
            .expect(1)
            .mount(&server)
            .await;

        let target = Target::endpoint(server.uri(), "/p1");
        let results = client(3)
            .fetch_all_pages(&target, &RequestOptions::get())
            .await
            .unwrap();
        assert_eq!(results, vec![json!(1), json!(2), json!(3), json!(4), json!(5)]);
    }

    #[tokio::test]
    async fn results_false_halts_despite_next_url() {
        let server = MockServer::start().await;
        let link = format!("<{}/p2>; rel=\"next\"; results=\"false\"", server.uri());
        Mock::given(method("GET"))
            .and(path("/p1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!(["only"]))
                    .insert_header("link", link.as_str()),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/p2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(["never"])))
            .expect(0)
            .mount(&server)
            .await;

        let target = Target::endpoint(server.uri(), "/p1");
        let results = client(3)
            .fetch_all_pages(&target, &RequestOptions::get())
            .await
            .unwrap();
        assert_eq!(results, vec![json!("only")]);
    }

    #[tokio::test]
    async fn mid_chain_failure_discards_partial_accumulation() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/p1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([1]))
                    .insert_header("link", next_link(&server, "/p2").as_str()),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/p2"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let target = Target::endpoint(server.uri(), "/p1");
        let err = client(3)
            .fetch_all_pages(&target, &RequestOptions::get())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn non_array_pages_accumulate_as_single_values() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"total_count": 1, "items": [{"n": 1}]})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let target = Target::endpoint(server.uri(), "/search");
        let results = client(3)
            .fetch_all_pages(&target, &RequestOptions::get())
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["total_count"], 1);
    }
}
