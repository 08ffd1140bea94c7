//! Spotify Web API access.
//!
//! Transport, pagination, response schemas and the typed client used by
//! the aggregator.

pub mod client;
#[cfg(test)]
pub mod mock;
pub mod pager;
pub mod schema;
pub mod transport;

pub use client::{ClientOptions, PlaylistTracks, SpotifyClient};
pub use transport::HttpTransport;
