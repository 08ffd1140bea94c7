//! Aggregation of a user's playlists and liked tracks.

pub mod aggregator;

pub use aggregator::{aggregate_with_timeout, summarize, Aggregate};
