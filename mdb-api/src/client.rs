//! Management API client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::{ApiError, Result};
use crate::models::{Task, TaskQuery};

/// Operations the reconciliation engine needs from the remote side.
///
/// Paths are relative to the API root, see [`crate::Scope`]. Successful calls
/// return the unwrapped `data` value of the response envelope.
#[async_trait]
pub trait ManagementApi: Send + Sync {
    /// Fetch an entity or collection.
    async fn get(&self, path: &str) -> Result<Value>;

    /// Submit a create-style mutation.
    async fn post(&self, path: &str, body: Value) -> Result<Value>;

    /// Submit an edit-style mutation.
    async fn put(&self, path: &str, body: Value) -> Result<Value>;

    /// Submit a delete.
    async fn delete(&self, path: &str) -> Result<()>;

    /// List tasks matching the query, newest first, at most `limit` entries.
    async fn list_tasks(&self, query: &TaskQuery, limit: u32) -> Result<Vec<Task>>;
}

/// Decode an unwrapped `data` value into a model type.
pub fn decode<T: DeserializeOwned>(value: Value) -> Result<T> {
    Ok(serde_json::from_value(value)?)
}

/// Encode a request body.
pub fn encode<T: Serialize>(body: &T) -> Result<Value> {
    Ok(serde_json::to_value(body)?)
}

/// GET and decode.
pub async fn get_json<T: DeserializeOwned>(api: &dyn ManagementApi, path: &str) -> Result<T> {
    decode(api.get(path).await?)
}

/// POST an encoded body and decode the response.
pub async fn post_json<B: Serialize, T: DeserializeOwned>(
    api: &dyn ManagementApi,
    path: &str,
    body: &B,
) -> Result<T> {
    decode(api.post(path, encode(body)?).await?)
}

/// PUT an encoded body and decode the response.
pub async fn put_json<B: Serialize, T: DeserializeOwned>(
    api: &dyn ManagementApi,
    path: &str,
    body: &B,
) -> Result<T> {
    decode(api.put(path, encode(body)?).await?)
}

/// Connection settings, supplied once at startup.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Host name, optionally with port (`cloud.example.com`, `127.0.0.1:8080`).
    pub host: String,
    /// Bearer API key attached to every request.
    pub api_key: String,
    /// Use https (default) or plain http.
    pub use_secure: bool,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl ClientConfig {
    pub fn new(host: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            api_key: api_key.into(),
            use_secure: true,
            request_timeout: Duration::from_secs(60),
        }
    }

    /// Root URL all relative paths are joined onto.
    pub fn base_url(&self) -> String {
        let host = self.host.trim_end_matches('/');
        if host.starts_with("http://") || host.starts_with("https://") {
            format!("{}/api/public/v1", host)
        } else {
            let scheme = if self.use_secure { "https" } else { "http" };
            format!("{}://{}/api/public/v1", scheme, host)
        }
    }
}

/// HTTP implementation of [`ManagementApi`].
#[derive(Clone)]
pub struct HttpClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl HttpClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        if config.host.trim().is_empty() {
            return Err(ApiError::Config("host must not be empty".to_string()));
        }
        if config.api_key.trim().is_empty() {
            return Err(ApiError::Config("api key must not be empty".to_string()));
        }

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("mdb/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Config(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url(),
            api_key: config.api_key.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> Result<Value> {
        debug!(method = %method, path = %path, "Sending request");

        let mut request = self
            .http
            .request(method, self.url(path))
            .bearer_auth(&self.api_key);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if status.is_success() {
            return unwrap_envelope(&bytes);
        }

        let detail = error_detail(&bytes).unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string()
        });
        debug!(status = status.as_u16(), path = %path, detail = %detail, "Request failed");

        if status == StatusCode::NOT_FOUND {
            Err(ApiError::NotFound(format!("{}: {}", path, detail)))
        } else {
            Err(ApiError::Status {
                status: status.as_u16(),
                detail,
            })
        }
    }
}

/// Strip the `{"data": ...}` envelope. Empty bodies decode as null.
fn unwrap_envelope(bytes: &[u8]) -> Result<Value> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    match serde_json::from_slice::<Value>(bytes)? {
        Value::Object(mut map) => match map.remove("data") {
            Some(data) => Ok(data),
            None => Ok(Value::Object(map)),
        },
        other => Ok(other),
    }
}

/// Pull `error.detail` out of an error payload, falling back to the raw text.
fn error_detail(bytes: &[u8]) -> Option<String> {
    if let Ok(value) = serde_json::from_slice::<Value>(bytes) {
        if let Some(detail) = value
            .pointer("/error/detail")
            .and_then(Value::as_str)
            .filter(|d| !d.is_empty())
        {
            return Some(detail.to_string());
        }
    }
    let text = String::from_utf8_lossy(bytes).trim().to_string();
    (!text.is_empty()).then_some(text)
}

#[async_trait]
impl ManagementApi for HttpClient {
    async fn get(&self, path: &str) -> Result<Value> {
        self.send(Method::GET, path, &[], None).await
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value> {
        self.send(Method::POST, path, &[], Some(body)).await
    }

    async fn put(&self, path: &str, body: Value) -> Result<Value> {
        self.send(Method::PUT, path, &[], Some(body)).await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.send(Method::DELETE, path, &[], None).await.map(|_| ())
    }

    async fn list_tasks(&self, query: &TaskQuery, limit: u32) -> Result<Vec<Task>> {
        let params = [
            ("entity_id", query.entity_id.clone()),
            ("entity_type", query.entity_type.as_str().to_string()),
            ("task_type", query.task_type.as_str().to_string()),
            ("limit", limit.to_string()),
        ];
        let data = self
            .send(Method::GET, &query.scope.tasks(), &params, None)
            .await?;
        decode(data)
    }
}
