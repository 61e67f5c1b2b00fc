//! Roam graph HTTP client
//!
//! Reads go to `POST {base}/{graph}/q`, writes to `POST {base}/{graph}/write`.
//!
//! ## Host fallback
//!
//! Writes walk a fixed host list: the primary API host, then each peer. For
//! every host a `308 Permanent Redirect` is followed exactly once via its
//! `location` header, a `404` moves on to the next host, and any other
//! failure is remembered as the last error. Only when the list is exhausted
//! does the call fail with [`StoreError::Remote`].
//!
//! Reads use the same per-host handling but never leave the primary host, and
//! a read whose success body is unreadable or not JSON fails with
//! [`StoreError::Response`] instead of being treated as an empty result.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue, LOCATION};
use serde_json::{Map, Value, json};

use crate::errors::{Result, StoreError};
use crate::ops::BlockOp;

/// Public Roam backend API.
pub const ROAM_API_BASE: &str = "https://api.roamresearch.com/api/graph";

/// Peer hosts tried, in order, when the primary host rejects a write.
pub const DEFAULT_PEER_HOSTS: &[&str] = &[
    "peer-24.api.roamresearch.com:3001",
    "peer-25.api.roamresearch.com:3001",
    "peer-23.api.roamresearch.com:3001",
];

/// Upper bound for a single HTTP attempt against one host.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(30);

/// Read/write access to a Roam graph.
///
/// Implementations:
/// - [`HttpGraphStore`] - the real backend API with host fallback
/// - `MockGraphStore` (feature `test-utils`) - in-memory graph for tests
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Run a Datalog query. Never falls back to peer hosts.
    async fn query(&self, query: &str) -> Result<Value>;

    /// Run a write action; `payload` is merged next to the `action` field.
    async fn write(&self, action: &str, payload: Map<String, Value>) -> Result<Value>;

    /// Submit `ops` as one `batch-actions` write.
    async fn batch_actions(&self, ops: &[BlockOp]) -> Result<Value> {
        let actions = serde_json::to_value(ops)
            .map_err(|e| StoreError::response(format!("failed to encode batch: {e}")))?;
        let mut payload = Map::new();
        payload.insert("actions".to_string(), actions);
        self.write("batch-actions", payload).await
    }
}

/// Connection settings for [`HttpGraphStore`].
#[derive(Debug, Clone)]
pub struct StoreSettings {
    /// Graph name, the path segment after the API base.
    pub graph: String,
    /// Graph API token, sent as a bearer token.
    pub token: String,
    /// Primary API base, e.g. `https://api.roamresearch.com/api/graph`.
    pub api_base: String,
    /// Fallback API bases tried for writes, in order.
    pub peer_bases: Vec<String>,
    pub attempt_timeout: Duration,
}

impl StoreSettings {
    /// Settings for the public backend with the default peers.
    pub fn new(graph: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            graph: graph.into(),
            token: token.into(),
            api_base: ROAM_API_BASE.to_string(),
            peer_bases: DEFAULT_PEER_HOSTS
                .iter()
                .map(|host| format!("https://{host}/api/graph"))
                .collect(),
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_peer_bases(mut self, peer_bases: Vec<String>) -> Self {
        self.peer_bases = peer_bases;
        self
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    fn url(base: &str, graph: &str, endpoint: &str) -> String {
        format!("{}/{graph}/{endpoint}", base.trim_end_matches('/'))
    }
}

/// Outcome of one attempt against one host.
enum Attempt {
    Done(Value),
    /// Host does not serve this graph (404, or a redirect that went nowhere).
    NextHost,
    Failed(String),
    /// Host answered 2xx with a body the caller cannot use.
    Unusable(String),
}

/// How a successful response body is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyPolicy {
    /// Queries: the body must be readable JSON.
    Json,
    /// Writes: an empty or non-JSON body still means the write landed.
    Lenient,
}

/// Roam backend client over reqwest.
pub struct HttpGraphStore {
    client: reqwest::Client,
    headers: HeaderMap,
    settings: StoreSettings,
}

impl HttpGraphStore {
    pub fn new(settings: StoreSettings) -> Result<Self> {
        // Redirects are handled by hand so that a 308 costs exactly one hop.
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| StoreError::InvalidConfig(format!("failed to build HTTP client: {e}")))?;

        let bearer = HeaderValue::from_str(&format!("Bearer {}", settings.token))
            .map_err(|_| StoreError::InvalidConfig("invalid API token".to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, bearer.clone());
        headers.insert("x-authorization", bearer);
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=utf-8"),
        );

        Ok(Self {
            client,
            headers,
            settings,
        })
    }

    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    fn candidate_urls(&self, endpoint: &str, use_peers: bool) -> Vec<String> {
        let graph = &self.settings.graph;
        let mut urls = vec![StoreSettings::url(&self.settings.api_base, graph, endpoint)];
        if use_peers {
            urls.extend(
                self.settings
                    .peer_bases
                    .iter()
                    .map(|base| StoreSettings::url(base, graph, endpoint)),
            );
        }
        urls
    }

    async fn request(&self, endpoint: &str, body: &Value, use_peers: bool) -> Result<Value> {
        let body = serde_json::to_vec(body)
            .map_err(|e| StoreError::response(format!("failed to encode request: {e}")))?;
        // Writes tolerate empty or non-JSON success bodies, queries do not.
        let policy = if use_peers {
            BodyPolicy::Lenient
        } else {
            BodyPolicy::Json
        };

        let mut last_error = String::new();
        for url in self.candidate_urls(endpoint, use_peers) {
            match self.attempt(&url, &body, policy).await {
                Attempt::Done(value) => return Ok(value),
                Attempt::NextHost => {
                    tracing::debug!(url = %url, "host did not serve request, trying next");
                }
                Attempt::Failed(error) => {
                    tracing::warn!(url = %url, error = %error, "store request failed");
                    last_error = error;
                }
                Attempt::Unusable(error) => {
                    tracing::warn!(url = %url, error = %error, "store response unusable");
                    return Err(StoreError::response(error));
                }
            }
        }

        if last_error.is_empty() {
            last_error = "no host served the request".to_string();
        }
        Err(StoreError::remote(last_error))
    }

    async fn attempt(&self, url: &str, body: &[u8], policy: BodyPolicy) -> Attempt {
        let response = match self.post(url, body).await {
            Ok(response) => response,
            Err(e) => return Attempt::Failed(e.to_string()),
        };

        let status = response.status();
        if status == StatusCode::PERMANENT_REDIRECT {
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string);
            let Some(location) = location else {
                return Attempt::NextHost;
            };

            tracing::debug!(from = %url, to = %location, "following permanent redirect");
            return match self.post(&location, body).await {
                Ok(redirected) => settle(redirected, &location, policy).await,
                Err(e) => Attempt::Failed(e.to_string()),
            };
        }

        settle(response, url, policy).await
    }

    async fn post(&self, url: &str, body: &[u8]) -> reqwest::Result<reqwest::Response> {
        self.client
            .post(url)
            .headers(self.headers.clone())
            .timeout(self.settings.attempt_timeout)
            .body(body.to_vec())
            .send()
            .await
    }
}

/// Classify a response that will not be redirected again.
async fn settle(response: reqwest::Response, url: &str, policy: BodyPolicy) -> Attempt {
    let status = response.status();
    if status.is_success() {
        return read_body(response, url, policy).await;
    }
    if status == StatusCode::NOT_FOUND {
        return Attempt::NextHost;
    }
    Attempt::Failed(error_text(response).await)
}

/// Body of a failed response, or `HTTP <status>` when there is none.
async fn error_text(response: reqwest::Response) -> String {
    let status = response.status();
    match response.text().await {
        Ok(text) if !text.trim().is_empty() => text,
        Ok(_) => format!("HTTP {status}"),
        Err(e) => format!("HTTP {status} (body unreadable: {e})"),
    }
}

async fn read_body(response: reqwest::Response, url: &str, policy: BodyPolicy) -> Attempt {
    let text = match response.text().await {
        Ok(text) => text,
        Err(e) if policy == BodyPolicy::Lenient => {
            tracing::warn!(url = %url, error = %e, "write accepted but body unreadable");
            return Attempt::Done(Value::Null);
        }
        Err(e) => return Attempt::Unusable(format!("failed to read response body: {e}")),
    };

    match (serde_json::from_str::<Value>(&text), policy) {
        (Ok(value), _) => Attempt::Done(value),
        (Err(_), BodyPolicy::Lenient) if text.trim().is_empty() => Attempt::Done(Value::Null),
        (Err(e), BodyPolicy::Lenient) => {
            tracing::warn!(url = %url, error = %e, "write accepted with non-JSON body");
            Attempt::Done(Value::String(text))
        }
        (Err(e), BodyPolicy::Json) => {
            let preview: String = text.chars().take(100).collect();
            Attempt::Unusable(format!("response is not JSON ({e}): {preview}"))
        }
    }
}

#[async_trait]
impl GraphStore for HttpGraphStore {
    async fn query(&self, query: &str) -> Result<Value> {
        let preview: String = query.chars().take(100).collect();
        tracing::debug!(query = %preview, "running query");
        self.request("q", &json!({ "query": query, "args": [] }), false)
            .await
    }

    async fn write(&self, action: &str, payload: Map<String, Value>) -> Result<Value> {
        let mut body = Map::new();
        body.insert("action".to_string(), Value::String(action.to_string()));
        body.extend(payload);
        self.request("write", &Value::Object(body), true).await
    }
}
