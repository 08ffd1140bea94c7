//! Immutable track index produced by an aggregation run.

use crate::aggregate::Aggregate;
use crate::models::{Playlist, Track, User};
use std::collections::HashMap;

/// Snapshot of a user's library.
///
/// Updates never mutate an index in place; they return a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackIndex {
    pub user: User,
    /// Owned playlists followed by the liked-tracks pseudo-playlist.
    pub playlists: Vec<Playlist>,
    pub tracks: Vec<Track>,
    /// Owned playlists fetched by the scan.
    pub scanned_playlists: usize,
    /// Entries fetched by the scan, duplicates included.
    pub scanned_entries: usize,
}

impl TrackIndex {
    /// Index a scan result. The scan counts are taken from `playlists` here
    /// and are not changed by later updates.
    pub fn new(user: User, playlists: Vec<Playlist>, tracks: Vec<Track>) -> Self {
        let scanned_playlists = playlists.iter().filter(|p| !p.is_liked_tracks()).count();
        let scanned_entries = playlists.iter().map(|p| p.num_tracks).sum();

        Self {
            user,
            playlists,
            tracks,
            scanned_playlists,
            scanned_entries,
        }
    }

    pub fn from_aggregate(user: User, aggregate: Aggregate) -> Self {
        let playlists = aggregate.all_playlists();
        Self::new(user, playlists, aggregate.tracks)
    }

    pub fn playlist(&self, id: &str) -> Option<&Playlist> {
        self.playlists.iter().find(|p| p.id == id)
    }

    /// Record a newly created playlist holding `tracks`.
    ///
    /// Every given track gains the playlist as a membership; tracks not yet
    /// indexed are appended. `self` is left unchanged.
    pub fn with_created_playlist(&self, playlist: Playlist, tracks: &[Track]) -> TrackIndex {
        let mut next = self.clone();
        let positions: HashMap<String, usize> = next
            .tracks
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.clone(), i))
            .collect();

        for track in tracks {
            match positions.get(&track.id) {
                Some(&index) => {
                    next.tracks[index].add_membership(playlist.clone());
                }
                None => {
                    let mut added = track.clone();
                    added.add_membership(playlist.clone());
                    next.tracks.push(added);
                }
            }
        }

        match next.playlists.iter_mut().find(|p| p.id == playlist.id) {
            Some(existing) => *existing = playlist,
            None => next.playlists.push(playlist),
        }

        next
    }
}
