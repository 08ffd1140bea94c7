//! Data models for the track index.
//!
//! This module contains the core data structures used throughout the
//! application: users, playlists, tracks, and the report built from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Sentinel id of the liked-tracks pseudo-playlist.
pub const LIKED_TRACKS_ID: &str = "liked-tracks";

/// Link to the user's saved-tracks collection.
pub const LIKED_TRACKS_LINK: &str = "https://open.spotify.com/collection/tracks";

/// A Spotify user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Provider user id.
    pub id: String,
    /// Human-readable name (falls back to the id).
    pub display_name: String,
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.display_name, self.id)
    }
}

/// A playlist, or the liked-tracks pseudo-playlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    /// Provider playlist id, or [`LIKED_TRACKS_ID`].
    pub id: String,
    pub name: String,
    pub description: String,
    pub owner: User,
    /// Track count; corrected to the fetched count after aggregation.
    pub num_tracks: usize,
    /// External link to the playlist.
    pub link: String,
}

impl Playlist {
    /// Build the liked-tracks pseudo-playlist.
    pub fn liked_tracks(name: &str, num_tracks: usize) -> Self {
        Self {
            id: LIKED_TRACKS_ID.to_string(),
            name: name.to_string(),
            description: String::new(),
            owner: User {
                id: "me".to_string(),
                display_name: "me".to_string(),
            },
            num_tracks,
            link: LIKED_TRACKS_LINK.to_string(),
        }
    }

    /// Whether this is the liked-tracks pseudo-playlist.
    pub fn is_liked_tracks(&self) -> bool {
        self.id == LIKED_TRACKS_ID
    }

    /// Same playlist with a different track count.
    pub fn with_track_count(&self, num_tracks: usize) -> Self {
        Self {
            num_tracks,
            ..self.clone()
        }
    }
}

/// A track with the set of playlists it was observed in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Provider track id.
    pub id: String,
    pub name: String,
    /// Artist names in credit order.
    pub artists: Vec<String>,
    pub album: String,
    pub release_year: i32,
    pub duration_ms: u64,
    /// Popularity score, 0-100.
    pub popularity: u32,
    /// Membership set, unique by playlist id, in first-seen order.
    pub in_playlists: Vec<Playlist>,
}

impl Track {
    /// Spotify URI used by the playlist mutation endpoints.
    pub fn uri(&self) -> String {
        format!("spotify:track:{}", self.id)
    }

    /// Whether this track was observed in the given playlist.
    pub fn belongs_to(&self, playlist_id: &str) -> bool {
        self.in_playlists.iter().any(|p| p.id == playlist_id)
    }

    /// Add a membership unless one with the same id is already present.
    ///
    /// Returns `true` if the membership was added.
    pub fn add_membership(&mut self, playlist: Playlist) -> bool {
        if self.belongs_to(&playlist.id) {
            return false;
        }
        self.in_playlists.push(playlist);
        true
    }

    /// Artist names joined for display.
    pub fn artist_line(&self) -> String {
        self.artists.join(", ")
    }

    /// Text matched by free-text search: name, artists and release year.
    pub fn search_text(&self) -> String {
        format!(
            "{} {} {}",
            self.name,
            self.artists.join(" "),
            self.release_year
        )
    }

    /// Duration as `m:ss`.
    pub fn duration_display(&self) -> String {
        let total_seconds = self.duration_ms / 1000;
        format!("{}:{:02}", total_seconds / 60, total_seconds % 60)
    }

    /// Membership names joined for display.
    pub fn playlist_names(&self) -> String {
        self.in_playlists
            .iter()
            .map(|p| p.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Summary statistics of a track index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LibrarySummary {
    /// Number of unique tracks.
    pub unique_tracks: usize,
    /// Tracks that appear in more than one playlist (liked counts as one).
    pub in_multiple_playlists: usize,
    /// Tracks whose only membership is the liked-tracks pseudo-playlist.
    pub liked_only: usize,
    /// Mean popularity over all tracks.
    pub average_popularity: f64,
    /// Tracks per release decade, e.g. `"1990s"`.
    pub by_decade: HashMap<String, usize>,
    /// Tracks per playlist id. Names are not unique, ids are.
    pub by_playlist: HashMap<String, usize>,
    /// Tracks in the most playlists, most shared first.
    pub most_shared: Vec<SharedTrack>,
}

/// A track listed in the most-shared table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedTrack {
    pub id: String,
    pub name: String,
    pub artists: String,
    /// Number of playlists the track is in.
    pub playlists: usize,
}

impl From<&Track> for SharedTrack {
    fn from(track: &Track) -> Self {
        Self {
            id: track.id.clone(),
            name: track.name.clone(),
            artists: track.artist_line(),
            playlists: track.in_playlists.len(),
        }
    }
}

/// Metadata about the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// The authenticated user.
    pub user: User,
    /// When the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Number of owned playlists scanned.
    pub playlists_scanned: usize,
    /// Sum of the playlist track counts, liked tracks included.
    pub total_entries: usize,
    /// Number of unique tracks in the index.
    pub unique_tracks: usize,
    /// Number of tracks selected by the query.
    pub selected_tracks: usize,
    /// Human-readable description of the query.
    pub query: String,
    /// Duration of the run in seconds.
    pub duration_seconds: f64,
}

/// The complete library report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub summary: LibrarySummary,
    /// Playlists with corrected track counts, liked tracks last.
    pub playlists: Vec<Playlist>,
    /// Tracks selected by the query, in query order.
    pub tracks: Vec<Track>,
}
