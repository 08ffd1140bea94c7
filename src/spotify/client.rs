//! Spotify Web API client.
//!
//! Thin typed wrappers over the endpoints the track index needs. All
//! collection endpoints go through [`Pager`]; mutations share its 429
//! handling.

use super::pager::{send_with_backoff, Pager};
use super::schema::{parse_playlist, parse_track_item, parse_user};
use super::transport::Transport;
use crate::error::{ApiError, ApiResult};
use crate::models::{Playlist, Track, User};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Maximum number of URIs per add-tracks request.
pub const ADD_TRACKS_BATCH: usize = 100;

/// Settings for the client.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// API root without trailing slash, e.g. `https://api.spotify.com/v1`.
    pub base_url: String,
    /// Page-size hint sent as `limit`.
    pub page_size: u32,
    /// Wait after a 429 without a readable `Retry-After`.
    pub rate_limit_fallback: Duration,
    /// Display name of the liked-tracks pseudo-playlist.
    pub liked_tracks_name: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: "https://api.spotify.com/v1".to_string(),
            page_size: 50,
            rate_limit_fallback: Duration::from_millis(1020),
            liked_tracks_name: "Liked Songs".to_string(),
        }
    }
}

/// Tracks fetched from one playlist.
#[derive(Debug, Clone)]
pub struct PlaylistTracks {
    /// The playlist, with `num_tracks` set to the fetched item count.
    pub playlist: Playlist,
    /// Parsed tracks, each with `playlist` as sole membership.
    pub tracks: Vec<Track>,
}

pub struct SpotifyClient {
    transport: Arc<dyn Transport>,
    token: String,
    options: ClientOptions,
}

impl SpotifyClient {
    pub fn new(transport: Arc<dyn Transport>, token: String, options: ClientOptions) -> Self {
        let base_url = options.base_url.trim_end_matches('/').to_string();
        Self {
            transport,
            token,
            options: ClientOptions {
                base_url,
                ..options
            },
        }
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.options.base_url, path)
    }

    fn pager(&self) -> Pager<'_> {
        Pager::new(
            self.transport.as_ref(),
            &self.token,
            self.options.page_size,
            self.options.rate_limit_fallback,
        )
    }

    async fn post(&self, url: &str, body: &Value) -> ApiResult<Value> {
        let response = send_with_backoff(url, self.options.rate_limit_fallback, || {
            self.transport.post_json(url, &self.token, body)
        })
        .await?;

        if response.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&response.body)
            .map_err(|e| ApiError::MalformedRecord(format!("response of POST {}: {}", url, e)))
    }

    /// `GET /me`
    pub async fn current_user(&self) -> ApiResult<User> {
        let url = self.url("me");
        let response = send_with_backoff(&url, self.options.rate_limit_fallback, || {
            self.transport.get(&url, &self.token)
        })
        .await?;
        parse_user(&response.body)
    }

    /// `GET /me/playlists`, keeping only playlists owned by `user_id`.
    pub async fn owned_playlists(&self, user_id: &str) -> ApiResult<Vec<Playlist>> {
        let items = self.pager().fetch_all(&self.url("me/playlists")).await?;
        let playlists = items
            .iter()
            .map(parse_playlist)
            .collect::<ApiResult<Vec<_>>>()?;

        let total = playlists.len();
        let owned: Vec<Playlist> = playlists
            .into_iter()
            .filter(|p| p.owner.id == user_id)
            .collect();

        info!(
            "Found {} playlists, {} owned by {}",
            total,
            owned.len(),
            user_id
        );
        Ok(owned)
    }

    /// `GET /playlists/{id}/tracks`
    pub async fn playlist_tracks(&self, playlist: &Playlist) -> ApiResult<PlaylistTracks> {
        let url = self.url(&format!("playlists/{}/tracks", playlist.id));
        let items = self.pager().fetch_all(&url).await?;
        let playlist = playlist.with_track_count(items.len());

        debug!("Playlist '{}': {} items", playlist.name, items.len());
        tag_items(&items, playlist)
    }

    /// `GET /me/tracks`, tagged with the liked-tracks pseudo-playlist.
    pub async fn liked_tracks(&self) -> ApiResult<PlaylistTracks> {
        let items = self.pager().fetch_all(&self.url("me/tracks")).await?;
        let playlist = Playlist::liked_tracks(&self.options.liked_tracks_name, items.len());

        debug!("Liked tracks: {} items", items.len());
        tag_items(&items, playlist)
    }

    /// `POST /users/{id}/playlists`
    pub async fn create_playlist(
        &self,
        user_id: &str,
        name: &str,
        num_tracks: usize,
    ) -> ApiResult<Playlist> {
        let url = self.url(&format!("users/{}/playlists", user_id));
        let created = self.post(&url, &json!({ "name": name })).await?;
        let playlist = parse_playlist(&created)?;

        info!("Created playlist '{}' ({})", playlist.name, playlist.id);
        Ok(playlist.with_track_count(num_tracks))
    }

    /// `POST /playlists/{id}/tracks` in batches of [`ADD_TRACKS_BATCH`].
    pub async fn add_tracks(&self, playlist: &Playlist, tracks: &[Track]) -> ApiResult<Playlist> {
        let url = self.url(&format!("playlists/{}/tracks", playlist.id));

        for (i, chunk) in tracks.chunks(ADD_TRACKS_BATCH).enumerate() {
            let uris: Vec<String> = chunk.iter().map(Track::uri).collect();
            debug!("Adding batch {} ({} tracks) to {}", i + 1, uris.len(), playlist.id);
            self.post(&url, &json!({ "uris": uris })).await?;
        }

        Ok(playlist.with_track_count(tracks.len()))
    }
}

fn tag_items(items: &[Value], playlist: Playlist) -> ApiResult<PlaylistTracks> {
    let tracks = items
        .iter()
        .map(|item| parse_track_item(item, &playlist))
        .collect::<ApiResult<Vec<_>>>()?;
    Ok(PlaylistTracks { playlist, tracks })
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::models::{fixtures, LIKED_TRACKS_ID};
    use crate::spotify::mock::{self, MockTransport};
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn test_current_user() {
        let transport = Arc::new(MockTransport::new());
        transport.on_get(
            &format!("{}/me", BASE),
            mock::ok_json(json!({ "id": "alice", "display_name": "Alice" })),
        );

        let user = assert_ok!(client(transport).current_user().await);
        assert_eq!(user.id, "alice");
        assert_eq!(user.display_name, "Alice");
    }

    #[tokio::test]
    async fn test_owned_playlists_filters_by_owner() {
        let transport = Arc::new(MockTransport::new());
        transport.on_get(
            &first_page("me/playlists"),
            mock::page(
                vec![
                    mock::playlist_item("A", "alice", 3),
                    mock::playlist_item("F", "bob", 9),
                    mock::playlist_item("B", "alice", 1),
                ],
                None,
            ),
        );

        let owned = assert_ok!(client(transport).owned_playlists("alice").await);
        let ids: Vec<_> = owned.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B"]);
        assert_eq!(owned[0].num_tracks, 3);
    }

    #[tokio::test]
    async fn test_playlist_tracks_corrects_count() {
        let transport = Arc::new(MockTransport::new());
        transport.on_get(
            &first_page("playlists/A/tracks"),
            mock::page(
                vec![
                    mock::track_item("t1", "One", "2001-01-01", 10),
                    mock::track_item("t2", "Two", "2002", 20),
                ],
                None,
            ),
        );

        let mut listed = fixtures::playlist("A", "alice");
        listed.num_tracks = 5;

        let fetched = assert_ok!(client(transport).playlist_tracks(&listed).await);
        assert_eq!(fetched.playlist.num_tracks, 2);
        assert_eq!(fetched.tracks.len(), 2);
        assert_eq!(fetched.tracks[0].in_playlists, vec![fetched.playlist.clone()]);
    }

    #[tokio::test]
    async fn test_liked_tracks_use_pseudo_playlist() {
        let transport = Arc::new(MockTransport::new());
        transport.on_get(
            &first_page("me/tracks"),
            mock::page(vec![mock::track_item("t3", "Three", "1990-10", 30)], None),
        );

        let liked = assert_ok!(client(transport).liked_tracks().await);
        assert_eq!(liked.playlist.id, LIKED_TRACKS_ID);
        assert_eq!(liked.playlist.name, "Liked Songs");
        assert_eq!(liked.playlist.num_tracks, 1);
        assert!(liked.tracks[0].belongs_to(LIKED_TRACKS_ID));
    }

    #[tokio::test]
    async fn test_create_playlist() {
        let transport = Arc::new(MockTransport::new());
        let url = format!("{}/users/alice/playlists", BASE);
        transport.on_post(
            &url,
            mock::created(mock::playlist_item("NEW", "alice", 0)),
        );

        let created = assert_ok!(client(transport.clone()).create_playlist("alice", "Mix", 12).await);
        assert_eq!(created.id, "NEW");
        assert_eq!(created.num_tracks, 12);

        let requests = transport.requests();
        assert_eq!(requests[0].body, Some(json!({ "name": "Mix" })));
    }

    #[tokio::test]
    async fn test_add_tracks_in_batches_of_100() {
        let transport = Arc::new(MockTransport::new());
        let url = format!("{}/playlists/NEW/tracks", BASE);
        transport.on_post(&url, mock::created(json!({ "snapshot_id": "x" })));

        let tracks: Vec<Track> = (0..250)
            .map(|i| fixtures::track(&format!("t{}", i), "Song", 2000, 1))
            .collect();
        let playlist = fixtures::playlist("NEW", "alice");

        let updated = assert_ok!(client(transport.clone()).add_tracks(&playlist, &tracks).await);
        assert_eq!(updated.num_tracks, 250);

        let sizes: Vec<usize> = transport
            .requests()
            .iter()
            .map(|r| r.body.as_ref().unwrap()["uris"].as_array().unwrap().len())
            .collect();
        assert_eq!(sizes, vec![100, 100, 50]);

        let first_uri = transport.requests()[0].body.as_ref().unwrap()["uris"][0].clone();
        assert_eq!(first_uri, json!("spotify:track:t0"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_tracks_waits_out_rate_limit() {
        let transport = Arc::new(MockTransport::new());
        let url = format!("{}/playlists/NEW/tracks", BASE);
        transport
            .on_post(&url, mock::rate_limited(Some("1")))
            .on_post(&url, mock::created(json!({ "snapshot_id": "x" })));

        let tracks = vec![fixtures::track("t1", "Song", 2000, 1)];
        let start = tokio::time::Instant::now();
        let updated = assert_ok!(
            client(transport.clone())
                .add_tracks(&fixtures::playlist("NEW", "alice"), &tracks)
                .await
        );

        assert!(start.elapsed() >= Duration::from_secs(1));
        assert_eq!(updated.num_tracks, 1);
        assert_eq!(transport.count("POST", &url), 2);
    }

    #[tokio::test]
    async fn test_add_tracks_failure_propagates() {
        let transport = Arc::new(MockTransport::new());
        let url = format!("{}/playlists/NEW/tracks", BASE);
        transport.on_post(&url, mock::status(403, "forbidden"));

        let tracks = vec![fixtures::track("t1", "Song", 2000, 1)];
        let err = assert_err!(
            client(transport)
                .add_tracks(&fixtures::playlist("NEW", "alice"), &tracks)
                .await
        );
        assert_eq!(err.status(), Some(403));
    }
}
