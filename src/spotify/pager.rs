//! Cursor pagination over Spotify collection endpoints.
//!
//! Spotify collections answer with `{ "items": [...], "next": url|null }`.
//! The pager follows `next` until it is null and flattens the items.
//! HTTP 429 suspends only the request that was limited, then repeats it.

use super::transport::{RawResponse, Transport};
use crate::error::{ApiError, ApiResult};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// One page of a paginated collection.
#[derive(Debug, Deserialize)]
struct Page {
    items: Vec<Value>,
    #[serde(default)]
    next: Option<String>,
}

/// How long to wait after a 429.
///
/// Uses the `Retry-After` header (whole seconds) when it is readable.
pub fn retry_delay(retry_after: Option<&str>, fallback: Duration) -> Duration {
    retry_after
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(fallback)
}

/// Append `limit=<page_size>` unless the URL already carries a limit.
pub fn with_page_size(url: &str, page_size: u32) -> String {
    let has_limit = url
        .split_once('?')
        .map(|(_, query)| query.split('&').any(|pair| pair.starts_with("limit=")))
        .unwrap_or(false);

    if has_limit {
        url.to_string()
    } else if url.contains('?') {
        format!("{}&limit={}", url, page_size)
    } else {
        format!("{}?limit={}", url, page_size)
    }
}

/// Run `request` until it answers something other than 429.
///
/// Non-success responses become `FetchFailed`.
pub async fn send_with_backoff<F, Fut>(
    url: &str,
    fallback_wait: Duration,
    mut request: F,
) -> ApiResult<RawResponse>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = ApiResult<RawResponse>>,
{
    loop {
        let response = request().await?;

        if response.is_rate_limited() {
            let wait = retry_delay(response.retry_after.as_deref(), fallback_wait);
            warn!(
                url = %url,
                wait_ms = wait.as_millis() as u64,
                "Rate limited, waiting before retry"
            );
            tokio::time::sleep(wait).await;
            continue;
        }

        if !response.is_success() {
            return Err(ApiError::FetchFailed {
                status: response.status,
                body: response.body,
            });
        }

        return Ok(response);
    }
}

/// Fetches every page of a collection.
pub struct Pager<'a> {
    transport: &'a dyn Transport,
    bearer: &'a str,
    page_size: u32,
    fallback_wait: Duration,
}

impl<'a> Pager<'a> {
    pub fn new(
        transport: &'a dyn Transport,
        bearer: &'a str,
        page_size: u32,
        fallback_wait: Duration,
    ) -> Self {
        Self {
            transport,
            bearer,
            page_size,
            fallback_wait,
        }
    }

    /// Fetch all items starting at `start_url`, in page order.
    pub async fn fetch_all(&self, start_url: &str) -> ApiResult<Vec<Value>> {
        let mut items = Vec::new();
        let mut next_url = Some(start_url.to_string());
        let mut pages = 0usize;

        while let Some(url) = next_url {
            let url = with_page_size(&url, self.page_size);
            let response = send_with_backoff(&url, self.fallback_wait, || {
                self.transport.get(&url, self.bearer)
            })
            .await?;

            let page: Page = serde_json::from_str(&response.body).map_err(|e| {
                ApiError::MalformedRecord(format!("page {} of {}: {}", pages + 1, start_url, e))
            })?;

            pages += 1;
            items.extend(page.items);
            next_url = page.next;
        }

        debug!(
            "Fetched {} items in {} pages from {}",
            items.len(),
            pages,
            start_url
        );
        Ok(items)
    }
}
