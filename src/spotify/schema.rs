//! Wire shapes of Spotify Web API responses.
//!
//! Items are validated here and converted into domain models. Anything
//! that does not match fails with `MalformedRecord` instead of being
//! skipped.

use crate::error::{ApiError, ApiResult};
use crate::models::{Playlist, Track, User};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct ApiUser {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl From<ApiUser> for User {
    fn from(user: ApiUser) -> Self {
        let display_name = user.display_name.unwrap_or_else(|| user.id.clone());
        User {
            id: user.id,
            display_name,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ExternalUrls {
    spotify: String,
}

#[derive(Debug, Deserialize)]
struct TrackTotal {
    total: usize,
}

#[derive(Debug, Deserialize)]
struct ApiPlaylist {
    id: String,
    name: String,
    #[serde(default)]
    description: Option<String>,
    owner: ApiUser,
    tracks: TrackTotal,
    external_urls: ExternalUrls,
}

#[derive(Debug, Deserialize)]
struct ApiArtist {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ApiAlbum {
    name: String,
    release_date: String,
}

#[derive(Debug, Deserialize)]
struct ApiTrack {
    id: String,
    name: String,
    artists: Vec<ApiArtist>,
    album: ApiAlbum,
    duration_ms: u64,
    popularity: u32,
}

/// Playlist-track and saved-track items both wrap the track object.
#[derive(Debug, Deserialize)]
struct ApiTrackItem {
    track: ApiTrack,
}

/// Year component of a `YYYY`, `YYYY-MM` or `YYYY-MM-DD` release date.
pub fn release_year(release_date: &str) -> ApiResult<i32> {
    let year = release_date.trim().split('-').next().unwrap_or_default();

    if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ApiError::MalformedRecord(format!(
            "release date '{}' has no year",
            release_date
        )));
    }

    year.parse::<i32>()
        .map_err(|e| ApiError::MalformedRecord(format!("release date '{}': {}", release_date, e)))
}

/// Parse a user object (`GET /me`).
pub fn parse_user(body: &str) -> ApiResult<User> {
    let user: ApiUser = serde_json::from_str(body)
        .map_err(|e| ApiError::MalformedRecord(format!("user: {}", e)))?;
    Ok(user.into())
}

/// Parse a playlist object from a `GET /me/playlists` item or a create response.
pub fn parse_playlist(item: &Value) -> ApiResult<Playlist> {
    let playlist = ApiPlaylist::deserialize(item)
        .map_err(|e| ApiError::MalformedRecord(format!("playlist: {}", e)))?;

    Ok(Playlist {
        id: playlist.id,
        name: playlist.name,
        description: playlist.description.unwrap_or_default(),
        owner: playlist.owner.into(),
        num_tracks: playlist.tracks.total,
        link: playlist.external_urls.spotify,
    })
}

/// Parse one track-wrapping page item; `playlist` becomes its sole membership.
pub fn parse_track_item(item: &Value, playlist: &Playlist) -> ApiResult<Track> {
    let item = ApiTrackItem::deserialize(item).map_err(|e| {
        ApiError::MalformedRecord(format!("track item in '{}': {}", playlist.name, e))
    })?;
    let track = item.track;

    Ok(Track {
        release_year: release_year(&track.album.release_date)?,
        id: track.id,
        name: track.name,
        artists: track.artists.into_iter().map(|a| a.name).collect(),
        album: track.album.name,
        duration_ms: track.duration_ms,
        popularity: track.popularity,
        in_playlists: vec![playlist.clone()],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures;
    use serde_json::json;

    const TRACK_PAGE: &str = include_str!("../../fixtures/spotify/playlist_tracks_page.json");
    const PLAYLIST_PAGE: &str = include_str!("../../fixtures/spotify/playlists_page.json");

    #[test]
    fn test_release_year_precisions() {
        assert_eq!(release_year("1999-05-01").unwrap(), 1999);
        assert_eq!(release_year("1987-11").unwrap(), 1987);
        assert_eq!(release_year("2021").unwrap(), 2021);
        assert!(release_year("").is_err());
        assert!(release_year("May 1999").is_err());
    }

    #[test]
    fn test_parse_track_page_fixture() {
        let page: Value = serde_json::from_str(TRACK_PAGE).unwrap();
        let playlist = fixtures::playlist("37i9dQZF1DX0XUsuxWHRQd", "alice");

        let tracks: Vec<Track> = page["items"]
            .as_array()
            .unwrap()
            .iter()
            .map(|item| parse_track_item(item, &playlist))
            .collect::<ApiResult<_>>()
            .unwrap();

        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].id, "4uLU6hMCjMI75M1A2tKUQC");
        assert_eq!(tracks[0].artists, vec!["Rick Astley"]);
        assert_eq!(tracks[0].release_year, 1987);
        assert_eq!(tracks[1].artists, vec!["Daft Punk", "Pharrell Williams"]);
        assert_eq!(tracks[1].release_year, 2013);
        assert_eq!(tracks[1].in_playlists, vec![playlist]);
    }

    #[test]
    fn test_parse_playlist_page_fixture() {
        let page: Value = serde_json::from_str(PLAYLIST_PAGE).unwrap();
        let first = parse_playlist(&page["items"][0]).unwrap();

        assert_eq!(first.name, "Road trip");
        assert_eq!(first.owner.id, "alice");
        assert_eq!(first.num_tracks, 42);
        assert_eq!(
            first.link,
            "https://open.spotify.com/playlist/3cEYpjA9oz9GiPac4AsH4n"
        );

        let second = parse_playlist(&page["items"][1]).unwrap();
        assert_eq!(second.description, "");
        assert_eq!(second.owner.display_name, "bob");
    }

    #[test]
    fn test_missing_track_wrapper_is_malformed() {
        let playlist = fixtures::playlist("A", "u");

        let no_wrapper = json!({ "id": "t1", "name": "Loose track" });
        assert!(matches!(
            parse_track_item(&no_wrapper, &playlist),
            Err(ApiError::MalformedRecord(_))
        ));

        let null_track = json!({ "added_at": "2024-01-01T00:00:00Z", "track": null });
        assert!(matches!(
            parse_track_item(&null_track, &playlist),
            Err(ApiError::MalformedRecord(_))
        ));
    }

    #[test]
    fn test_track_without_id_is_malformed() {
        let playlist = fixtures::playlist("A", "u");
        let local_file = json!({
            "track": {
                "id": null,
                "name": "Local file",
                "artists": [],
                "album": { "name": "", "release_date": "2000" },
                "duration_ms": 1000,
                "popularity": 0
            }
        });

        assert!(matches!(
            parse_track_item(&local_file, &playlist),
            Err(ApiError::MalformedRecord(_))
        ));
    }

    #[test]
    fn test_parse_user_falls_back_to_id() {
        let user = parse_user(r#"{"id": "alice", "display_name": null}"#).unwrap();
        assert_eq!(user.display_name, "alice");

        let user = parse_user(r#"{"id": "bob", "display_name": "Bob"}"#).unwrap();
        assert_eq!(user.display_name, "Bob");

        assert!(parse_user(r#"{"display_name": "Nobody"}"#).is_err());
    }
}
