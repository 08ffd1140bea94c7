//! Track aggregation and library statistics.
//!
//! This module turns per-playlist track pages into one deduplicated
//! track set, and computes the summary statistics used by reports.

use crate::error::{ApiError, ApiResult};
use crate::models::{LibrarySummary, Playlist, SharedTrack, Track};
use crate::spotify::{PlaylistTracks, SpotifyClient};
use futures::future::try_join_all;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

/// Result of one aggregation run.
#[derive(Debug, Clone)]
pub struct Aggregate {
    /// Owned playlists with their fetched track counts, in input order.
    pub playlists: Vec<Playlist>,
    /// The liked-tracks pseudo-playlist with its fetched count.
    pub liked: Playlist,
    /// Deduplicated tracks in first-seen order.
    pub tracks: Vec<Track>,
}

impl Aggregate {
    /// Owned playlists followed by the liked-tracks pseudo-playlist.
    pub fn all_playlists(&self) -> Vec<Playlist> {
        let mut all = self.playlists.clone();
        all.push(self.liked.clone());
        all
    }
}

/// Fetch every owned playlist and the liked tracks concurrently, then merge.
///
/// The join is all-or-nothing: the first failure is returned and no
/// partial track set is produced.
pub async fn aggregate_user_tracks(
    client: &SpotifyClient,
    playlists: &[Playlist],
) -> ApiResult<Aggregate> {
    info!(
        "Fetching tracks for {} playlists and liked tracks",
        playlists.len()
    );

    let playlist_fetches = try_join_all(playlists.iter().map(|p| client.playlist_tracks(p)));
    let (fetched, liked): (Vec<PlaylistTracks>, PlaylistTracks) =
        futures::try_join!(playlist_fetches, client.liked_tracks())?;

    let mut corrected = Vec::with_capacity(fetched.len());
    let mut all_tracks = Vec::new();
    for batch in fetched {
        corrected.push(batch.playlist);
        all_tracks.extend(batch.tracks);
    }
    all_tracks.extend(liked.tracks);

    let observed = all_tracks.len();
    let tracks = merge_tracks(all_tracks);
    info!("Merged {} entries into {} unique tracks", observed, tracks.len());

    Ok(Aggregate {
        playlists: corrected,
        liked: liked.playlist,
        tracks,
    })
}

/// [`aggregate_user_tracks`] under an optional caller-level deadline.
pub async fn aggregate_with_timeout(
    client: &SpotifyClient,
    playlists: &[Playlist],
    limit: Option<Duration>,
) -> ApiResult<Aggregate> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, aggregate_user_tracks(client, playlists))
            .await
            .map_err(|_| ApiError::Timeout(limit))?,
        None => aggregate_user_tracks(client, playlists).await,
    }
}

/// Deduplicate tracks by id, merging playlist memberships.
///
/// The first occurrence of an id is kept as-is; later occurrences only
/// contribute memberships not already present.
pub fn merge_tracks(tracks: impl IntoIterator<Item = Track>) -> Vec<Track> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut merged: Vec<Track> = Vec::new();

    for track in tracks {
        match positions.get(&track.id) {
            Some(&index) => {
                let existing = &mut merged[index];
                for playlist in track.in_playlists {
                    existing.add_membership(playlist);
                }
            }
            None => {
                positions.insert(track.id.clone(), merged.len());
                merged.push(track);
            }
        }
    }

    debug!("Deduplicated into {} tracks", merged.len());
    merged
}

/// Count tracks per playlist id.
pub fn membership_counts(tracks: &[Track]) -> HashMap<String, usize> {
    let mut counts: HashMap<String, usize> = HashMap::new();

    for track in tracks {
        for playlist in &track.in_playlists {
            *counts.entry(playlist.id.clone()).or_default() += 1;
        }
    }

    counts
}

/// Count tracks per release decade (`"1980s"`).
pub fn decade_distribution(tracks: &[Track]) -> HashMap<String, usize> {
    let mut dist: HashMap<String, usize> = HashMap::new();

    for track in tracks {
        let decade = track.release_year - track.release_year.rem_euclid(10);
        *dist.entry(format!("{}s", decade)).or_default() += 1;
    }

    dist
}

/// The `n` tracks with the most memberships, ties broken by name.
pub fn most_shared_tracks(tracks: &[Track], n: usize) -> Vec<&Track> {
    let mut shared: Vec<&Track> = tracks
        .iter()
        .filter(|t| t.in_playlists.len() > 1)
        .collect();

    shared.sort_by(|a, b| {
        b.in_playlists
            .len()
            .cmp(&a.in_playlists.len())
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });
    shared.truncate(n);

    shared
}

/// Rows kept in [`LibrarySummary::most_shared`].
pub const MOST_SHARED_LIMIT: usize = 5;

/// Compute summary statistics of a track set.
pub fn summarize(tracks: &[Track]) -> LibrarySummary {
    let average_popularity = if tracks.is_empty() {
        0.0
    } else {
        tracks.iter().map(|t| t.popularity as f64).sum::<f64>() / tracks.len() as f64
    };

    LibrarySummary {
        unique_tracks: tracks.len(),
        in_multiple_playlists: tracks.iter().filter(|t| t.in_playlists.len() > 1).count(),
        liked_only: tracks
            .iter()
            .filter(|t| t.in_playlists.len() == 1 && t.in_playlists[0].is_liked_tracks())
            .count(),
        average_popularity,
        by_decade: decade_distribution(tracks),
        by_playlist: membership_counts(tracks),
        most_shared: most_shared_tracks(tracks, MOST_SHARED_LIMIT)
            .into_iter()
            .map(SharedTrack::from)
            .collect(),
    }
}
