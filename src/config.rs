//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.trackdex.toml` files.

use crate::cli::OutputFormat;
use crate::spotify::ClientOptions;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default config file name, looked up in the current directory.
pub const CONFIG_FILE: &str = ".trackdex.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Spotify API settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Report file path. Unset means `trackdex_report.<md|json>` by format.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: None,
            verbose: false,
        }
    }
}

impl GeneralConfig {
    /// Path the report is written to.
    pub fn output_path(&self, format: OutputFormat) -> PathBuf {
        match self.output {
            Some(ref output) => PathBuf::from(output),
            None => PathBuf::from(format!("trackdex_report.{}", format.extension())),
        }
    }
}

/// Spotify Web API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API root URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Items requested per page (Spotify caps this at 50).
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Wait after a 429 that carries no usable Retry-After, in milliseconds.
    #[serde(default = "default_rate_limit_fallback_ms")]
    pub rate_limit_fallback_ms: u64,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,

    /// Deadline for the whole aggregation run. Unset means no deadline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregate_timeout_seconds: Option<u64>,

    /// Name shown for the liked-tracks pseudo-playlist.
    #[serde(default = "default_liked_tracks_name")]
    pub liked_tracks_name: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            page_size: default_page_size(),
            rate_limit_fallback_ms: default_rate_limit_fallback_ms(),
            request_timeout_seconds: default_request_timeout(),
            aggregate_timeout_seconds: None,
            liked_tracks_name: default_liked_tracks_name(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.spotify.com/v1".to_string()
}

fn default_page_size() -> u32 {
    50
}

fn default_rate_limit_fallback_ms() -> u64 {
    1020
}

fn default_request_timeout() -> u64 {
    30
}

fn default_liked_tracks_name() -> String {
    "Liked Songs".to_string()
}

impl ApiConfig {
    /// Client settings derived from this section.
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            base_url: self.base_url.clone(),
            page_size: self.page_size.clamp(1, 50),
            rate_limit_fallback: Duration::from_millis(self.rate_limit_fallback_ms),
            liked_tracks_name: self.liked_tracks_name.clone(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn aggregate_timeout(&self) -> Option<Duration> {
        self.aggregate_timeout_seconds.map(Duration::from_secs)
    }
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Show the playlists column in the track table.
    #[serde(default = "default_true")]
    pub include_memberships: bool,

    /// Maximum tracks listed in the report; 0 lists all.
    #[serde(default)]
    pub max_tracks: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            include_memberships: true,
            max_tracks: 0,
        }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load `.trackdex.toml` from `dir`.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(CONFIG_FILE);

        if path.exists() {
            Ok(Some(Self::load(&path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref output) = args.output {
            self.general.output = Some(output.display().to_string());
        }
        if args.verbose {
            self.general.verbose = true;
        }

        if let Some(ref base) = args.api_base {
            self.api.base_url = base.clone();
        }
        if let Some(page_size) = args.page_size {
            self.api.page_size = page_size;
        }
        if let Some(timeout) = args.timeout {
            self.api.aggregate_timeout_seconds = Some(timeout);
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}
