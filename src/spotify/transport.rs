//! HTTP transport used by the Spotify client.
//!
//! The client and the pager only see [`RawResponse`] values, so the
//! production `reqwest` transport can be swapped for a scripted one.

use crate::error::{ApiError, ApiResult};
use async_trait::async_trait;
use reqwest::header;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Status, rate-limit header and body of one HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    /// Raw `Retry-After` header value, if any.
    pub retry_after: Option<String>,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_rate_limited(&self) -> bool {
        self.status == 429
    }
}

/// Bearer-authenticated requests against the Web API.
#[async_trait]
pub trait Transport: Send + Sync {
    /// `GET url` with the bearer token.
    async fn get(&self, url: &str, bearer: &str) -> ApiResult<RawResponse>;

    /// `POST url` with a JSON body and the bearer token.
    async fn post_json(&self, url: &str, bearer: &str, body: &Value) -> ApiResult<RawResponse>;
}

/// Production transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> ApiResult<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .user_agent(concat!("trackdex/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Transport(format!("build client: {e}")))?;

        Ok(Self { client })
    }

    async fn read(response: reqwest::Response) -> ApiResult<RawResponse> {
        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await?;

        Ok(RawResponse {
            status,
            retry_after,
            body,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str, bearer: &str) -> ApiResult<RawResponse> {
        debug!("GET {}", url);
        let response = self.client.get(url).bearer_auth(bearer).send().await?;
        Self::read(response).await
    }

    async fn post_json(&self, url: &str, bearer: &str, body: &Value) -> ApiResult<RawResponse> {
        debug!("POST {}", url);
        let response = self
            .client
            .post(url)
            .bearer_auth(bearer)
            .json(body)
            .send()
            .await?;
        Self::read(response).await
    }
}
