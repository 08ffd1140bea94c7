//! Selection and ordering of indexed tracks.

use crate::models::Track;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Field tracks are ordered by.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    /// Track name, case-insensitive
    #[default]
    Name,
    /// Number of playlists the track is in
    Playlists,
    /// Release year
    Released,
    /// Spotify popularity (0-100)
    Popularity,
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SortField::Name => "name",
            SortField::Playlists => "playlists",
            SortField::Released => "released",
            SortField::Popularity => "popularity",
        };
        write!(f, "{}", s)
    }
}

impl SortField {
    fn compare(&self, a: &Track, b: &Track) -> Ordering {
        match self {
            SortField::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            SortField::Playlists => a.in_playlists.len().cmp(&b.in_playlists.len()),
            SortField::Released => a.release_year.cmp(&b.release_year),
            SortField::Popularity => a.popularity.cmp(&b.popularity),
        }
    }
}

/// Filter and sort settings for a track listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackQuery {
    /// Keep tracks in any of these playlists. Empty keeps all.
    pub playlist_ids: Vec<String>,
    /// Case-insensitive substring of name, artists or release year.
    pub search: Option<String>,
    pub sort: SortField,
    pub descending: bool,
}

impl TrackQuery {
    fn matches(&self, track: &Track, needle: Option<&str>) -> bool {
        let in_selection = self.playlist_ids.is_empty()
            || self.playlist_ids.iter().any(|id| track.belongs_to(id));

        let found = match needle {
            Some(needle) => track.search_text().to_lowercase().contains(needle),
            None => true,
        };

        in_selection && found
    }

    /// Select and order `tracks`. The input is not modified.
    pub fn apply(&self, tracks: &[Track]) -> Vec<Track> {
        let needle = self
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        let mut selected: Vec<Track> = tracks
            .iter()
            .filter(|t| self.matches(t, needle.as_deref()))
            .cloned()
            .collect();

        // sort_by is stable; reversing the comparator keeps ties in input order
        if self.descending {
            selected.sort_by(|a, b| self.sort.compare(b, a));
        } else {
            selected.sort_by(|a, b| self.sort.compare(a, b));
        }

        selected
    }

    /// One-line summary used in report headers.
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();

        if self.playlist_ids.is_empty() {
            parts.push("all playlists".to_string());
        } else {
            parts.push(format!("playlists: {}", self.playlist_ids.join(", ")));
        }

        if let Some(search) = self.search.as_deref().filter(|s| !s.trim().is_empty()) {
            parts.push(format!("search: \"{}\"", search.trim()));
        }

        let direction = if self.descending { "desc" } else { "asc" };
        parts.push(format!("sorted by {} {}", self.sort, direction));

        parts.join("; ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{fixtures, Playlist};

    fn library() -> (Playlist, Playlist, Vec<Track>) {
        let a = fixtures::playlist("A", "u");
        let b = fixtures::playlist("B", "u");

        let mut t1 = fixtures::track_in("t1", &[&a]);
        t1.name = "banana".to_string();
        t1.artists = vec!["Daft Punk".to_string()];
        t1.release_year = 2013;
        t1.popularity = 70;

        let mut t2 = fixtures::track_in("t2", &[&a, &b]);
        t2.name = "Apple".to_string();
        t2.release_year = 1987;
        t2.popularity = 90;

        let mut t3 = fixtures::track_in("t3", &[&b]);
        t3.name = "cherry".to_string();
        t3.release_year = 2001;
        t3.popularity = 10;

        (a, b, vec![t1, t2, t3])
    }

    fn ids(tracks: &[Track]) -> Vec<&str> {
        tracks.iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn test_default_sorts_by_name_ignoring_case() {
        let (_, _, tracks) = library();
        let result = TrackQuery::default().apply(&tracks);
        assert_eq!(ids(&result), vec!["t2", "t1", "t3"]);
    }

    #[test]
    fn test_playlist_filter_keeps_any_membership() {
        let (_, _, tracks) = library();
        let query = TrackQuery {
            playlist_ids: vec!["A".to_string()],
            ..TrackQuery::default()
        };
        assert_eq!(ids(&query.apply(&tracks)), vec!["t2", "t1"]);

        let query = TrackQuery {
            playlist_ids: vec!["A".to_string(), "B".to_string()],
            ..TrackQuery::default()
        };
        assert_eq!(query.apply(&tracks).len(), 3);
    }

    #[test]
    fn test_search_matches_artist_and_year() {
        let (_, _, tracks) = library();

        let by_artist = TrackQuery {
            search: Some("daft".to_string()),
            ..TrackQuery::default()
        };
        assert_eq!(ids(&by_artist.apply(&tracks)), vec!["t1"]);

        let by_year = TrackQuery {
            search: Some("1987".to_string()),
            ..TrackQuery::default()
        };
        assert_eq!(ids(&by_year.apply(&tracks)), vec!["t2"]);
    }

    #[test]
    fn test_search_combines_with_playlist_filter() {
        let (_, _, tracks) = library();
        let query = TrackQuery {
            playlist_ids: vec!["B".to_string()],
            search: Some("CHERRY".to_string()),
            ..TrackQuery::default()
        };
        assert_eq!(ids(&query.apply(&tracks)), vec!["t3"]);
    }

    #[test]
    fn test_blank_search_is_ignored() {
        let (_, _, tracks) = library();
        let query = TrackQuery {
            search: Some("   ".to_string()),
            ..TrackQuery::default()
        };
        assert_eq!(query.apply(&tracks).len(), 3);
    }

    #[test]
    fn test_sort_fields_and_direction() {
        let (_, _, tracks) = library();

        let popular = TrackQuery {
            sort: SortField::Popularity,
            descending: true,
            ..TrackQuery::default()
        };
        assert_eq!(ids(&popular.apply(&tracks)), vec!["t2", "t1", "t3"]);

        let released = TrackQuery {
            sort: SortField::Released,
            ..TrackQuery::default()
        };
        assert_eq!(ids(&released.apply(&tracks)), vec!["t2", "t3", "t1"]);
    }

    #[test]
    fn test_sort_is_stable_for_ties() {
        let (_, _, tracks) = library();
        let query = TrackQuery {
            sort: SortField::Playlists,
            ..TrackQuery::default()
        };
        assert_eq!(ids(&query.apply(&tracks)), vec!["t1", "t3", "t2"]);

        let query = TrackQuery {
            sort: SortField::Playlists,
            descending: true,
            ..TrackQuery::default()
        };
        assert_eq!(ids(&query.apply(&tracks)), vec!["t2", "t1", "t3"]);
    }

    #[test]
    fn test_describe() {
        let query = TrackQuery {
            playlist_ids: vec!["A".to_string()],
            search: Some("daft".to_string()),
            sort: SortField::Popularity,
            descending: true,
        };
        assert_eq!(
            query.describe(),
            "playlists: A; search: \"daft\"; sorted by popularity desc"
        );
        assert_eq!(TrackQuery::default().describe(), "all playlists; sorted by name asc");
    }
}
