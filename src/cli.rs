//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::query::{SortField, TrackQuery};
use clap::Parser;
use std::path::PathBuf;

/// trackdex - index every track in your Spotify library
///
/// Fetches your owned playlists and liked tracks, merges them into one
/// deduplicated index with playlist memberships, and writes a report.
///
/// Examples:
///   trackdex --token $TOKEN
///   trackdex --playlist 37i9dQZF1DX0XUsuxWHRQd --sort popularity --descending
///   trackdex --search "daft punk" --format json -o daft.json
///   trackdex --search 1987 --create-playlist "Class of 87"
///   trackdex --dry-run
///   trackdex --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Spotify user access token
    ///
    /// Needs the playlist-read-private and user-library-read scopes,
    /// plus playlist-modify-private for --create-playlist.
    #[arg(
        short,
        long,
        value_name = "TOKEN",
        env = "SPOTIFY_ACCESS_TOKEN",
        hide_env_values = true,
        required_unless_present = "init_config"
    )]
    pub token: Option<String>,

    /// Output file path for the report
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Path to configuration file
    ///
    /// If not specified, looks for .trackdex.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Spotify Web API base URL
    #[arg(long, value_name = "URL", env = "SPOTIFY_API_BASE")]
    pub api_base: Option<String>,

    /// Items requested per page (1-50)
    #[arg(long, value_name = "COUNT")]
    pub page_size: Option<u32>,

    /// Abort the whole fetch after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Only list tracks in these playlists (comma-separated ids)
    ///
    /// Use "liked-tracks" for the liked tracks.
    #[arg(short, long, value_name = "IDS", value_delimiter = ',')]
    pub playlist: Vec<String>,

    /// Only list tracks whose name, artists or release year contain TEXT
    #[arg(short, long, value_name = "TEXT")]
    pub search: Option<String>,

    /// Sort field for the track listing
    #[arg(long, default_value = "name", value_name = "FIELD")]
    pub sort: SortField,

    /// Reverse the sort order
    #[arg(long)]
    pub descending: bool,

    /// Create a playlist with this name from the selected tracks
    #[arg(long, value_name = "NAME")]
    pub create_playlist: Option<String>,

    /// Dry run: list owned playlists without fetching tracks
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .trackdex.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl OutputFormat {
    /// File extension of reports in this format.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Markdown => "md",
            OutputFormat::Json => "json",
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        match self.token.as_deref().map(str::trim) {
            None | Some("") => return Err("An access token is required".to_string()),
            _ => {}
        }

        if let Some(ref base) = self.api_base {
            if !base.starts_with("http://") && !base.starts_with("https://") {
                return Err("API base URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(page_size) = self.page_size {
            if !(1..=50).contains(&page_size) {
                return Err("Page size must be between 1 and 50".to_string());
            }
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if let Some(ref name) = self.create_playlist {
            if name.trim().is_empty() {
                return Err("Playlist name must not be empty".to_string());
            }
            if self.dry_run {
                return Err("Cannot use --create-playlist with --dry-run".to_string());
            }
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// `config_verbose` is the `[general] verbose` config key; `--quiet` wins
    /// over both.
    pub fn log_level(&self, config_verbose: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || config_verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// The track query described by the filter and sort flags.
    pub fn track_query(&self) -> TrackQuery {
        TrackQuery {
            playlist_ids: self
                .playlist
                .iter()
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty())
                .collect(),
            search: self.search.clone(),
            sort: self.sort,
            descending: self.descending,
        }
    }
}
