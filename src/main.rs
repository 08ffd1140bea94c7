//! trackdex - Spotify library indexer
//!
//! A CLI tool that fetches a user's owned playlists and liked tracks,
//! merges them into one deduplicated track index and writes a report.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (authentication, HTTP failure, malformed data, timeout, IO)

mod aggregate;
mod cli;
mod config;
mod error;
mod models;
mod query;
mod report;
mod spotify;
mod store;

use anyhow::{Context, Result};
use chrono::Utc;
use cli::Args;
use config::{Config, CONFIG_FILE};
use error::ApiError;
use indicatif::{ProgressBar, ProgressStyle};
use models::{Playlist, Report, ReportMetadata};
use spotify::{HttpTransport, SpotifyClient};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use store::TrackIndex;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Config is read before logging starts so `[general] verbose` applies
    let (mut config, source) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    init_logging(&args, &config);

    info!("trackdex v{}", env!("CARGO_PKG_VERSION"));
    match source {
        ConfigSource::File(path) => info!("Loaded config from {}", path.display()),
        ConfigSource::Defaults => debug!("No config file found, using defaults"),
        ConfigSource::Invalid(reason) => warn!("Failed to load config: {}", reason),
    }
    debug!("Output: {:?}, format: {:?}", args.output, args.format);

    if let Err(e) = run(args, config).await {
        error!("Run failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        if let Some(hint) = e.downcast_ref::<ApiError>().and_then(auth_hint) {
            eprintln!("   {}", hint);
        }
        std::process::exit(1);
    }

    Ok(())
}

fn auth_hint(e: &ApiError) -> Option<&'static str> {
    match e.status()? {
        401 => Some("The access token is invalid or expired."),
        403 => Some("The access token lacks a required scope."),
        _ => None,
    }
}

/// Handle --init-config: generate a default .trackdex.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to customize the API endpoint, page size, timeouts and report.");
    Ok(())
}

/// Initialize logging based on verbosity settings. `RUST_LOG` wins when set.
fn init_logging(args: &Args, config: &Config) {
    let level = args.log_level(config.general.verbose);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run the complete fetch, index and report workflow.
async fn run(args: Args, config: Config) -> Result<()> {
    let start_time = Instant::now();

    let token = args.token.clone().unwrap_or_default();
    let transport = HttpTransport::new(config.api.request_timeout())
        .context("Failed to build HTTP client")?;
    let client = SpotifyClient::new(
        Arc::new(transport),
        token.trim().to_string(),
        config.api.client_options(),
    );

    // Step 1: Who are we?
    println!("👤 Fetching profile from {}", client.options().base_url);
    let user = client
        .current_user()
        .await
        .context("Failed to fetch the current user")?;
    println!("   Signed in as {}", user);

    // Step 2: Owned playlists, largest first
    let mut playlists = client
        .owned_playlists(&user.id)
        .await
        .context("Failed to list playlists")?;
    playlists.sort_by(|a, b| b.num_tracks.cmp(&a.num_tracks));
    println!("   {} owned playlists", playlists.len());

    if args.dry_run {
        return handle_dry_run(&playlists);
    }

    // Step 3: Fetch every track
    println!("\n🎵 Fetching tracks...");
    let spinner = if args.quiet {
        None
    } else {
        Some(start_spinner(playlists.len())?)
    };

    let result =
        aggregate::aggregate_with_timeout(&client, &playlists, config.api.aggregate_timeout())
            .await;

    if let Some(pb) = spinner {
        match result {
            Ok(_) => pb.finish_with_message("Fetch complete"),
            Err(_) => pb.abandon_with_message("Fetch failed"),
        }
    }
    let aggregate = result.context("Failed to fetch tracks")?;

    let mut index = TrackIndex::from_aggregate(user, aggregate);
    info!(
        "Indexed {} unique tracks from {} playlist entries",
        index.tracks.len(),
        index.scanned_entries
    );

    // Step 4: Select
    let query = args.track_query();
    for id in &query.playlist_ids {
        if index.playlist(id).is_none() {
            warn!("Playlist '{}' is not among the scanned playlists", id);
        }
    }
    let selected = query.apply(&index.tracks);
    println!("   {} of {} tracks selected", selected.len(), index.tracks.len());

    // Step 5: Optionally save the selection as a playlist
    if let Some(ref name) = args.create_playlist {
        index = create_playlist_from(&client, index, name, &selected).await?;
    }

    // Step 6: Build and write the report
    println!("\n📝 Generating report...");

    let duration = start_time.elapsed().as_secs_f64();
    let summary = aggregate::summarize(&index.tracks);
    let report = Report {
        metadata: ReportMetadata {
            user: index.user.clone(),
            generated_at: Utc::now(),
            playlists_scanned: index.scanned_playlists,
            total_entries: index.scanned_entries,
            unique_tracks: index.tracks.len(),
            selected_tracks: selected.len(),
            query: query.describe(),
            duration_seconds: duration,
        },
        summary,
        playlists: index.playlists.clone(),
        tracks: selected,
    };

    let output = config.general.output_path(args.format);
    report::write_report(&report, args.format, &config.report, &output)?;

    println!("\n📊 Library Summary:");
    println!("   Unique tracks: {}", report.summary.unique_tracks);
    println!(
        "   In several playlists: {} | Liked only: {}",
        report.summary.in_multiple_playlists, report.summary.liked_only
    );
    println!("   Average popularity: {:.1}", report.summary.average_popularity);
    println!("   Duration: {:.1}s", duration);
    println!("\n✅ Done! Report saved to: {}", output.display());

    Ok(())
}

fn start_spinner(playlists: usize) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .context("Invalid progress template")?,
    );
    pb.set_message(format!("{} playlists and liked tracks", playlists));
    pb.enable_steady_tick(Duration::from_millis(120));
    Ok(pb)
}

/// Create a playlist named `name` holding `tracks` and record it in the index.
async fn create_playlist_from(
    client: &SpotifyClient,
    index: TrackIndex,
    name: &str,
    tracks: &[models::Track],
) -> Result<TrackIndex> {
    if tracks.is_empty() {
        warn!("No tracks selected, not creating playlist '{}'", name);
        return Ok(index);
    }

    println!("\n➕ Creating playlist '{}' with {} tracks", name, tracks.len());
    let created = client
        .create_playlist(&index.user.id, name, 0)
        .await
        .with_context(|| format!("Failed to create playlist '{}'", name))?;
    let filled = client
        .add_tracks(&created, tracks)
        .await
        .with_context(|| format!("Failed to add tracks to '{}'", name))?;

    println!("   {}", filled.link);
    Ok(index.with_created_playlist(filled, tracks))
}

/// Handle --dry-run: list the playlists that would be fetched, exit.
fn handle_dry_run(playlists: &[Playlist]) -> Result<()> {
    println!("\n🔍 Dry run: listing playlists (no tracks fetched)...\n");

    if playlists.is_empty() {
        println!("   No owned playlists found.");
    } else {
        for playlist in playlists {
            println!(
                "     📄 {} ({} tracks) [{}]",
                playlist.name, playlist.num_tracks, playlist.id
            );
        }
        println!("\n   Total: {} playlists, plus liked tracks", playlists.len());
    }

    println!("\n✅ Dry run complete. No tracks were fetched.");
    Ok(())
}

/// Where the configuration came from; logged once logging is up.
enum ConfigSource {
    File(PathBuf),
    Defaults,
    Invalid(String),
}

/// Load configuration from file or use defaults.
///
/// An explicit `--config` must load. A broken default file falls back to
/// defaults.
fn load_config(args: &Args) -> Result<(Config, ConfigSource)> {
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, ConfigSource::File(config_path.clone())));
    }

    match Config::load_default() {
        Ok(Some(config)) => Ok((config, ConfigSource::File(PathBuf::from(CONFIG_FILE)))),
        Ok(None) => Ok((Config::default(), ConfigSource::Defaults)),
        Err(e) => Ok((Config::default(), ConfigSource::Invalid(format!("{:#}", e)))),
    }
}
