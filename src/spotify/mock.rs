//! Scripted in-memory transport for tests.

use super::transport::{RawResponse, Transport};
use crate::error::ApiResult;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

/// A request seen by the mock.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub url: String,
    pub body: Option<Value>,
}

/// Answers requests from per-route response queues.
///
/// Responses are popped in order; the last one stays and is replayed for
/// every further request on that route. Unknown routes answer 404.
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<String, VecDeque<RawResponse>>>,
    requests: Mutex<Vec<Recorded>>,
    latency: Option<Duration>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every response by `latency` (tokio time).
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Queue a response for `GET url`.
    pub fn on_get(&self, url: &str, response: RawResponse) -> &Self {
        self.push(format!("GET {}", url), response);
        self
    }

    /// Queue a response for `POST url`.
    pub fn on_post(&self, url: &str, response: RawResponse) -> &Self {
        self.push(format!("POST {}", url), response);
        self
    }

    fn push(&self, key: String, response: RawResponse) {
        self.routes
            .lock()
            .unwrap()
            .entry(key)
            .or_default()
            .push_back(response);
    }

    /// All requests seen so far, in order.
    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of requests seen for `method url`.
    pub fn count(&self, method: &str, url: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == method && r.url == url)
            .count()
    }

    async fn answer(&self, method: &str, url: &str, body: Option<&Value>) -> RawResponse {
        self.requests.lock().unwrap().push(Recorded {
            method: method.to_string(),
            url: url.to_string(),
            body: body.cloned(),
        });

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let key = format!("{} {}", method, url);
        let mut routes = self.routes.lock().unwrap();
        match routes.get_mut(&key) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) if !queue.is_empty() => queue[0].clone(),
            _ => status(404, &format!("no route for {}", key)),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, url: &str, _bearer: &str) -> ApiResult<RawResponse> {
        Ok(self.answer("GET", url, None).await)
    }

    async fn post_json(&self, url: &str, _bearer: &str, body: &Value) -> ApiResult<RawResponse> {
        Ok(self.answer("POST", url, Some(body)).await)
    }
}

pub fn ok_json(value: Value) -> RawResponse {
    RawResponse {
        status: 200,
        retry_after: None,
        body: value.to_string(),
    }
}

pub fn status(code: u16, body: &str) -> RawResponse {
    RawResponse {
        status: code,
        retry_after: None,
        body: body.to_string(),
    }
}

pub fn rate_limited(retry_after: Option<&str>) -> RawResponse {
    RawResponse {
        status: 429,
        retry_after: retry_after.map(str::to_string),
        body: "rate limited".to_string(),
    }
}

/// One page of a paginated collection.
pub fn page(items: Vec<Value>, next: Option<&str>) -> RawResponse {
    ok_json(json!({ "items": items, "next": next }))
}

/// A playlist-track / saved-track item wrapping a track object.
pub fn track_item(id: &str, name: &str, release_date: &str, popularity: u32) -> Value {
    json!({
        "added_at": "2024-01-01T00:00:00Z",
        "track": {
            "id": id,
            "name": name,
            "artists": [{ "name": "First" }, { "name": "Second" }],
            "album": { "name": format!("{} album", name), "release_date": release_date },
            "duration_ms": 210000,
            "popularity": popularity
        }
    })
}

pub fn playlist_item(id: &str, owner: &str, total: usize) -> Value {
    json!({
        "id": id,
        "name": format!("Playlist {}", id),
        "description": "",
        "owner": { "id": owner, "display_name": owner },
        "tracks": { "total": total },
        "external_urls": { "spotify": format!("https://open.spotify.com/playlist/{}", id) }
    })
}

pub fn created(value: Value) -> RawResponse {
    RawResponse {
        status: 201,
        retry_after: None,
        body: value.to_string(),
    }
}
